use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ValidationError;

/// Decimal places carried by every metric reading.
const FRACTION_DIGITS: u32 = 6;
const SCALE: i64 = 1_000_000;
const SCALE_WIDE: u128 = 1_000_000;
/// Trend histograms store thousandths of the trend's unit.
const PER_MICRO: u128 = 1_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// A metric reading or threshold limit in fixed point, six decimal places.
///
/// Ratios, per-second rates and trend statistics are all produced with
/// integer arithmetic and compared exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricValue(i64);

impl MetricValue {
    pub const ZERO: MetricValue = MetricValue(0);

    #[must_use]
    pub const fn from_int(value: i64) -> Self {
        Self(value.saturating_mul(SCALE))
    }

    #[must_use]
    pub fn from_count(value: u64) -> Self {
        Self::from_int(i64::try_from(value).unwrap_or(i64::MAX))
    }

    /// Value stored by a trend histogram, in thousandths of the trend unit.
    #[must_use]
    pub fn from_micros(micros: u64) -> Self {
        Self(saturate(u128::from(micros).saturating_mul(PER_MICRO)))
    }

    /// `numerator / denominator`, or zero when the denominator is zero.
    #[must_use]
    pub fn ratio(numerator: u64, denominator: u64) -> Self {
        Self::scaled_ratio(numerator, denominator, 1)
    }

    /// `numerator * factor / denominator`; `factor = 100` gives a percentage.
    #[must_use]
    pub fn scaled_ratio(numerator: u64, denominator: u64, factor: u64) -> Self {
        let raw = u128::from(numerator)
            .saturating_mul(u128::from(factor))
            .saturating_mul(SCALE_WIDE)
            .checked_div(u128::from(denominator))
            .unwrap_or(0);
        Self(saturate(raw))
    }

    /// Events per second over `elapsed`; zero for an empty window.
    #[must_use]
    pub fn per_second(count: u64, elapsed: Duration) -> Self {
        let raw = u128::from(count)
            .saturating_mul(SCALE_WIDE)
            .saturating_mul(NANOS_PER_SEC)
            .checked_div(elapsed.as_nanos())
            .unwrap_or(0);
        Self(saturate(raw))
    }

    /// The underlying millionths.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }
}

fn saturate(raw: u128) -> i64 {
    i64::try_from(raw).unwrap_or(i64::MAX)
}

/// Without a precision, trailing zeros are dropped (`0.95`, `500`). With one,
/// the value is rounded half away from zero to that many places.
impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = f
            .precision()
            .and_then(|precision| u32::try_from(precision).ok())
            .map_or(FRACTION_DIGITS, |precision| precision.min(FRACTION_DIGITS));
        let dropped = 10_u64
            .checked_pow(FRACTION_DIGITS.saturating_sub(digits))
            .unwrap_or(1);
        let magnitude = self.0.unsigned_abs();
        let rounded = magnitude
            .saturating_add(dropped / 2)
            .checked_div(dropped)
            .unwrap_or(magnitude);
        let unit = 10_u64.checked_pow(digits).unwrap_or(1);
        let whole = rounded.checked_div(unit).unwrap_or(rounded);
        let fraction = rounded.checked_rem(unit).unwrap_or(0);
        let sign = if self.0 < 0 && rounded != 0 { "-" } else { "" };
        let width = usize::try_from(digits).unwrap_or(0);

        if f.precision().is_some() {
            if width == 0 {
                return write!(f, "{sign}{whole}");
            }
            return write!(f, "{sign}{whole}.{fraction:0width$}");
        }
        if fraction == 0 {
            return write!(f, "{sign}{whole}");
        }
        let padded = format!("{fraction:0width$}");
        write!(f, "{sign}{whole}.{}", padded.trim_end_matches('0'))
    }
}

/// Plain decimal notation: optional sign, digits, optional fraction. Digits
/// past the sixth decimal place are ignored.
impl FromStr for MetricValue {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidDecimal {
            value: value.to_owned(),
        };
        let trimmed = value.trim();
        let (negative, body) = trimmed.strip_prefix('-').map_or_else(
            || (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
            |rest| (true, rest),
        );
        let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().chain(fraction.chars()).all(|ch| ch.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_overflow| invalid())?
        };
        let mut fraction_value = 0_i64;
        let mut fraction_digits = fraction.bytes();
        for _ in 0..FRACTION_DIGITS {
            let digit = fraction_digits
                .next()
                .map_or(0, |byte| i64::from(byte.saturating_sub(b'0')));
            fraction_value = fraction_value
                .checked_mul(10)
                .and_then(|shifted| shifted.checked_add(digit))
                .ok_or_else(invalid)?;
        }

        let raw = whole_value
            .checked_mul(SCALE)
            .and_then(|scaled| scaled.checked_add(fraction_value))
            .ok_or_else(invalid)?;
        let raw = if negative {
            raw.checked_neg().ok_or_else(invalid)?
        } else {
            raw
        };
        Ok(Self(raw))
    }
}
