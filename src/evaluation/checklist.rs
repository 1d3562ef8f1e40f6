use crate::evaluation::IndicatorValue;

pub const MAX_TIER: u8 = 5;

/// Minimum checked ratio per tier, highest first.
pub const TIER_THRESHOLDS: [(f64, u8); 5] = [(0.8, 5), (0.6, 4), (0.4, 3), (0.2, 2), (0.1, 1)];

/// Band a checked ratio falls into. Unanswered lists and empty lists are
/// tier 0.
pub fn tier(checked: IndicatorValue, total_items: f64) -> u8 {
    let Some(checked) = checked.get() else {
        return 0;
    };
    if total_items <= 0.0 {
        return 0;
    }
    let ratio = f64::from(checked) / total_items;
    TIER_THRESHOLDS
        .iter()
        .find(|(min, _)| ratio >= *min)
        .map(|(_, tier)| *tier)
        .unwrap_or(0)
}

/// Normalised checklist score in `[0, 1]`.
pub fn score(checked: IndicatorValue, total_items: f64) -> f64 {
    f64::from(tier(checked, total_items)) / f64::from(MAX_TIER)
}
