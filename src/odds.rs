/// Matches whose favorite price is at or above this are not worth a detail lookup.
pub const FAVORITE_ODDS_LIMIT: f64 = 1.75;

const DRAW_SLOT: usize = 1;

/// Parse a scraped decimal price. Accepts `,` as the decimal separator.
pub fn parse_odd(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    let value = cleaned.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Lowest price among the outcomes of one match row, ignoring the draw slot.
///
/// A row with any unreadable price (suspended, blank) yields `None`, since the
/// remaining cells can no longer be matched to their outcomes.
pub fn favorite_odds<S: AsRef<str>>(raw: &[S]) -> Option<f64> {
    let mut values = raw
        .iter()
        .map(|s| parse_odd(s.as_ref()))
        .collect::<Option<Vec<f64>>>()?;
    if values.len() > 1 {
        values.remove(DRAW_SLOT);
    }
    values.into_iter().reduce(f64::min)
}

pub fn passes_gate(favorite: f64) -> bool {
    favorite < FAVORITE_ODDS_LIMIT
}
