use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::choice::Weighted;
use super::order::{OrderType, Price};
use crate::error::ValidationError;

/// One tradable symbol: selection weight and the price band limit orders
/// are placed around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolProfile {
    pub symbol: String,
    pub weight: u32,
    pub min_price: Price,
    pub max_price: Price,
}

impl SymbolProfile {
    /// Builds and validates a profile.
    ///
    /// # Errors
    ///
    /// Returns an error when the weight is zero or the price range is not
    /// strictly increasing and positive.
    pub fn new(
        symbol: impl Into<String>,
        weight: u32,
        min_price: Price,
        max_price: Price,
    ) -> Result<Self, ValidationError> {
        let profile = Self {
            symbol: symbol.into(),
            weight,
            min_price,
            max_price,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Checks weight and price range.
    ///
    /// # Errors
    ///
    /// Returns an error when the weight is zero or `min_price >= max_price`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.weight == 0 {
            return Err(ValidationError::SymbolWeightZero {
                symbol: self.symbol.clone(),
            });
        }
        if self.min_price.cents() == 0 || self.min_price >= self.max_price {
            return Err(ValidationError::InvalidPriceRange {
                symbol: self.symbol.clone(),
                min: self.min_price,
                max: self.max_price,
            });
        }
        Ok(())
    }

    /// Midpoint of the price band, in cents, rounded down.
    #[must_use]
    pub const fn mid_cents(&self) -> u64 {
        self.min_price.cents().midpoint(self.max_price.cents())
    }
}

impl Weighted for SymbolProfile {
    fn weight(&self) -> u32 {
        self.weight
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct WeightedOrderType {
    pub(crate) order_type: OrderType,
    pub(crate) weight: u32,
}

impl Weighted for WeightedOrderType {
    fn weight(&self) -> u32 {
        self.weight
    }
}

pub(crate) const ORDER_TYPES: [WeightedOrderType; 2] = [
    WeightedOrderType {
        order_type: OrderType::Limit,
        weight: 70,
    },
    WeightedOrderType {
        order_type: OrderType::Market,
        weight: 30,
    },
];

const DEFAULT_SYMBOLS: [(&str, u32, u64, u64); 15] = [
    ("AAPL", 15, 170_00, 200_00),
    ("MSFT", 15, 380_00, 420_00),
    ("GOOGL", 10, 140_00, 160_00),
    ("AMZN", 10, 175_00, 195_00),
    ("NVDA", 10, 450_00, 550_00),
    ("META", 6, 480_00, 550_00),
    ("TSLA", 6, 240_00, 280_00),
    ("JPM", 6, 180_00, 210_00),
    ("V", 6, 270_00, 300_00),
    ("JNJ", 6, 150_00, 170_00),
    ("WMT", 2, 160_00, 180_00),
    ("PG", 2, 150_00, 170_00),
    ("HD", 2, 350_00, 400_00),
    ("BAC", 2, 35_00, 45_00),
    ("DIS", 2, 90_00, 110_00),
];

const DEFAULT_ACCOUNTS: [&str; 10] = [
    "ACC-INST-001",
    "ACC-INST-002",
    "ACC-INST-003",
    "ACC-HF-001",
    "ACC-HF-002",
    "ACC-RET-001",
    "ACC-RET-002",
    "ACC-RET-003",
    "ACC-RET-004",
    "ACC-RET-005",
];

/// Validated symbol and account pools. Immutable once built; shared between
/// workers behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadCatalog {
    symbols: Arc<[SymbolProfile]>,
    accounts: Arc<[String]>,
}

impl WorkloadCatalog {
    /// # Errors
    ///
    /// Returns an error when either pool is empty or a symbol profile is
    /// invalid.
    pub fn new(symbols: Vec<SymbolProfile>, accounts: Vec<String>) -> Result<Self, ValidationError> {
        if symbols.is_empty() {
            return Err(ValidationError::EmptySymbols);
        }
        if accounts.is_empty() {
            return Err(ValidationError::EmptyAccounts);
        }
        for profile in &symbols {
            profile.validate()?;
        }
        Ok(Self {
            symbols: symbols.into(),
            accounts: accounts.into(),
        })
    }

    #[must_use]
    pub fn symbols(&self) -> &[SymbolProfile] {
        &self.symbols
    }

    #[must_use]
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    #[must_use]
    pub fn default_symbols() -> Vec<SymbolProfile> {
        DEFAULT_SYMBOLS
            .iter()
            .map(|&(symbol, weight, min, max)| SymbolProfile {
                symbol: symbol.to_owned(),
                weight,
                min_price: Price::from_cents(min),
                max_price: Price::from_cents(max),
            })
            .collect()
    }

    #[must_use]
    pub fn default_accounts() -> Vec<String> {
        DEFAULT_ACCOUNTS.iter().map(|&id| id.to_owned()).collect()
    }
}

impl Default for WorkloadCatalog {
    fn default() -> Self {
        Self {
            symbols: Self::default_symbols().into(),
            accounts: Self::default_accounts().into(),
        }
    }
}
