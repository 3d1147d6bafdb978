//! Named scenarios: an executor plus the thresholds that decide the run.
mod builtin;


use std::collections::BTreeMap;

use crate::error::{ThresholdError, ValidationError};
use crate::executor::ExecutorSpec;
use crate::metrics::TrendStat;
use crate::threshold::Threshold;

pub const DEFAULT_SCENARIO: &str = "load";

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub executor: ExecutorSpec,
    pub thresholds: Vec<Threshold>,
    /// Overrides the run-wide summary statistics for this scenario.
    pub summary_trend_stats: Option<Vec<TrendStat>>,
}

/// Scenarios by name. Starts from the built-ins; config files add or replace
/// entries.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioCatalog {
    /// The built-in scenarios.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in threshold fails to parse.
    pub fn builtin() -> Result<Self, ThresholdError> {
        let mut catalog = Self::default();
        for scenario in builtin::scenarios()? {
            catalog.insert(scenario);
        }
        Ok(catalog)
    }

    /// Adds `scenario`, replacing any entry with the same name.
    pub fn insert(&mut self, scenario: Scenario) -> Option<Scenario> {
        self.scenarios.insert(scenario.name.clone(), scenario)
    }

    /// # Errors
    ///
    /// Returns an error naming the available scenarios when `name` is unknown.
    pub fn get(&self, name: &str) -> Result<&Scenario, ValidationError> {
        self.scenarios
            .get(name)
            .ok_or_else(|| ValidationError::UnknownScenario {
                name: name.to_owned(),
                available: self.names().join(", "),
            })
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.scenarios.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values()
    }
}
