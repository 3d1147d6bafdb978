use rand::Rng;
use rand::seq::SliceRandom;

use super::catalog::{ORDER_TYPES, SymbolProfile, WorkloadCatalog};
use super::choice::weighted_choice;
use super::order::{OrderRequest, OrderType, Price, Side, TimeInForce};
use crate::error::ValidationError;

pub(crate) const LOT_SIZE: u32 = 10;
const HALF_LOT: u32 = 5;

/// Cumulative tier probability in percent with inclusive quantity bounds.
const QUANTITY_TIERS: [(u32, u32, u32); 4] = [
    (50, 10, 100),
    (85, 100, 500),
    (97, 500, 2_000),
    (100, 2_000, 10_000),
];

/// Limit prices move at most mid / 100 (1%) either way.
const SPREAD_DIVISOR: i128 = 100;
/// Side skew is at most mid / 200 (0.5%).
const SKEW_DIVISOR: i128 = 200;
const CLIENT_ID_SUFFIX_LEN: usize = 6;

/// Identity of the iteration an order is generated for.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext<'ctx> {
    pub run_id: &'ctx str,
    pub worker_id: u64,
    pub timestamp_ms: i64,
}

/// Draws orders from a catalog. Pure apart from the injected RNG: the same
/// seed and context always yield the same order.
#[derive(Debug, Clone, Default)]
pub struct OrderGenerator {
    catalog: WorkloadCatalog,
}

impl OrderGenerator {
    #[must_use]
    pub const fn new(catalog: WorkloadCatalog) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub const fn catalog(&self) -> &WorkloadCatalog {
        &self.catalog
    }

    /// Generates one order.
    ///
    /// # Errors
    ///
    /// Returns an error only if the catalog has an empty pool, which
    /// `WorkloadCatalog::new` rules out.
    pub fn generate<R>(&self, rng: &mut R, ctx: &OrderContext<'_>) -> Result<OrderRequest, ValidationError>
    where
        R: Rng + ?Sized,
    {
        let profile =
            weighted_choice(self.catalog.symbols(), rng).ok_or(ValidationError::EmptySymbols)?;
        let order_type = weighted_choice(ORDER_TYPES.as_slice(), rng)
            .map_or(OrderType::Market, |entry| entry.order_type);
        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let account_id = self
            .catalog
            .accounts()
            .choose(rng)
            .ok_or(ValidationError::EmptyAccounts)?
            .clone();
        let time_in_force = TimeInForce::ALL
            .choose(rng)
            .copied()
            .unwrap_or(TimeInForce::Day);
        let quantity = draw_quantity(rng);
        let limit_price = match order_type {
            OrderType::Limit => Some(limit_price(profile, side, rng)),
            OrderType::Market => None,
        };

        Ok(OrderRequest {
            client_order_id: client_order_id(ctx, rng),
            account_id,
            symbol: profile.symbol.clone(),
            side,
            order_type,
            quantity,
            time_in_force,
            limit_price,
        })
    }
}

/// Tiered quantity rounded half-up to the lot size; never zero.
pub(crate) fn draw_quantity<R>(rng: &mut R) -> u32
where
    R: Rng + ?Sized,
{
    let roll = rng.gen_range(0..100_u32);
    let (low, high) = QUANTITY_TIERS
        .iter()
        .find(|(cumulative, _, _)| roll < *cumulative)
        .map_or((2_000, 10_000), |&(_, low, high)| (low, high));
    let raw = rng.gen_range(low..=high);
    let rounded = raw
        .saturating_add(HALF_LOT)
        .checked_div(LOT_SIZE)
        .unwrap_or(0)
        .saturating_mul(LOT_SIZE);
    if rounded == 0 { LOT_SIZE } else { rounded }
}

/// Mid price moved by up to 1% either way, then skewed up to a further 0.5%
/// against the side (buyers bid lower, sellers ask higher).
pub(crate) fn limit_price<R>(profile: &SymbolProfile, side: Side, rng: &mut R) -> Price
where
    R: Rng + ?Sized,
{
    let mid = i128::from(profile.mid_cents());
    let spread = mid.checked_div(SPREAD_DIVISOR).unwrap_or(0);
    let skew_max = mid.checked_div(SKEW_DIVISOR).unwrap_or(0);
    let offset = rng.gen_range(spread.saturating_neg()..=spread);
    let skew = rng.gen_range(0..=skew_max);
    let moved = mid.saturating_add(offset);
    let cents = match side {
        Side::Buy => moved.saturating_sub(skew),
        Side::Sell => moved.saturating_add(skew),
    };
    Price::from_cents(u64::try_from(cents.max(1)).unwrap_or(u64::MAX))
}

fn client_order_id<R>(ctx: &OrderContext<'_>, rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    let suffix: String = (0..CLIENT_ID_SUFFIX_LEN)
        .filter_map(|_| char::from_digit(rng.gen_range(0..36), 36))
        .collect();
    format!(
        "{}-{}-{}-{}",
        ctx.run_id, ctx.worker_id, ctx.timestamp_ms, suffix
    )
}
