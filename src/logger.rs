use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Filter comes from `ORDERLOAD_LOG`, then `RUST_LOG`, then the verbosity
/// flag. Safe to call more than once.
pub fn init_logging(verbose: bool, no_color: bool) {
    let filter = std::env::var("ORDERLOAD_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| {
                if verbose {
                    EnvFilter::new("debug")
                } else {
                    EnvFilter::new("info")
                }
            },
            |value| EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new("info")),
        );

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_target(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}
