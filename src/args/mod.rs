//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;


pub use cli::RunArgs;
pub use defaults::DEFAULT_BASE_URL;
