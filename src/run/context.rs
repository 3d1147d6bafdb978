use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::time::Instant;

use crate::metrics::MetricsCollector;
use crate::shutdown::{ShutdownSender, shutdown_channel};

const RUN_ID_PREFIX: &str = "OL";
const RUN_ID_SUFFIX_LEN: usize = 4;

/// State owned by one run, from setup to teardown.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: String,
    pub started: Instant,
    /// Wall-clock start, logged at teardown.
    pub started_at: DateTime<Utc>,
    pub collector: Arc<MetricsCollector>,
    pub shutdown_tx: ShutdownSender,
}

impl RunContext {
    #[must_use]
    pub fn new(run_id: String) -> Self {
        let (shutdown_tx, _) = shutdown_channel();
        Self {
            run_id,
            started: Instant::now(),
            started_at: Utc::now(),
            collector: Arc::new(MetricsCollector::new()),
            shutdown_tx,
        }
    }

    /// Restarts the run clock once setup is done.
    pub fn mark_started(&mut self) {
        self.started = Instant::now();
        self.started_at = Utc::now();
    }
}

/// `OL` followed by four random upper-case hex digits.
#[must_use]
pub fn generate_run_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..RUN_ID_SUFFIX_LEN)
        .filter_map(|_| char::from_digit(rng.gen_range(0..16), 16))
        .map(|digit| digit.to_ascii_uppercase())
        .collect();
    format!("{RUN_ID_PREFIX}{suffix}")
}
