//! Core library for the `orderload` CLI.
//!
//! Generates randomized order traffic against an order-management HTTP
//! service using k6-style executors (constant and ramping VUs, constant and
//! ramping arrival rates), records tagged metrics, and judges the run
//! against pass/fail thresholds. The binary is a thin wrapper around
//! [`entry::run`]; the building blocks are public for embedding and tests.
pub mod args;
pub mod config;
pub mod entry;
pub mod error;
pub mod executor;
pub mod logger;
pub mod metrics;
pub mod run;
pub mod runner;
pub mod scenario;
pub mod shutdown;
pub mod threshold;
pub mod workload;

#[cfg(test)]
mod test_server;
