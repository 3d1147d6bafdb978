use std::time::Duration;

use rand::Rng;

use super::draw_millis;
use crate::error::ValidationError;

pub const DEFAULT_THINK_MIN: Duration = Duration::from_millis(100);
pub const DEFAULT_THINK_MAX: Duration = Duration::from_millis(500);

/// Pause after each order, drawn uniformly from `[min, max)` in whole
/// milliseconds. `min == max` gives a fixed pause; zero disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkTime {
    min: Duration,
    max: Duration,
}

impl ThinkTime {
    /// # Errors
    ///
    /// Returns an error when `min` exceeds `max`.
    pub fn new(min: Duration, max: Duration) -> Result<Self, ValidationError> {
        if min > max {
            return Err(ValidationError::InvalidThinkTime {
                min_ms: duration_millis(min),
                max_ms: duration_millis(max),
            });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub const fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn min(&self) -> Duration {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    pub fn sample<R>(&self, rng: &mut R) -> Duration
    where
        R: Rng + ?Sized,
    {
        Duration::from_millis(draw_millis(
            rng,
            duration_millis(self.min),
            duration_millis(self.max),
        ))
    }
}

impl Default for ThinkTime {
    fn default() -> Self {
        Self {
            min: DEFAULT_THINK_MIN,
            max: DEFAULT_THINK_MAX,
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
