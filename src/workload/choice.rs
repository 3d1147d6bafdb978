use rand::Rng;

/// Anything that can take part in a weighted draw.
pub trait Weighted {
    fn weight(&self) -> u32;
}

/// Weighted random pick.
///
/// Draws `roll` uniformly from `[0, total_weight)` and walks the list in
/// order; the first item whose cumulative weight exceeds `roll` wins, so
/// zero-weight items are never picked while another item has weight. `None`
/// only for an empty slice; when every weight is zero the last item is
/// returned.
pub fn weighted_choice<'items, T, R>(items: &'items [T], rng: &mut R) -> Option<&'items T>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    let total = items
        .iter()
        .fold(0_u64, |total, item| total.saturating_add(u64::from(item.weight())));
    if total == 0 {
        return items.last();
    }
    let roll = rng.gen_range(0..total);
    let mut cumulative = 0_u64;
    for item in items {
        cumulative = cumulative.saturating_add(u64::from(item.weight()));
        if roll < cumulative {
            return Some(item);
        }
    }
    items.last()
}
