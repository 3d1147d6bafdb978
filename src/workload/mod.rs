//! Synthetic order payloads drawn from weighted distributions.
mod catalog;
mod choice;
mod generator;
mod order;


pub use catalog::{SymbolProfile, WorkloadCatalog};
pub use choice::{Weighted, weighted_choice};
pub use generator::{OrderContext, OrderGenerator};
pub use order::{OrderRequest, OrderType, Price, Side, TimeInForce};
