//! Rounding and ratio helpers shared by the calculators.

use std::collections::BTreeMap;

use ledgerwise_domain::Month;

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `numerator / denominator * 100`, or `None` when the denominator is zero or
/// either side is not finite.
pub fn percent(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return None;
    }
    Some(numerator / denominator * 100.0)
}

/// Clamps a score into `[0, 100]`; non-finite input scores zero.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Period-over-period growth in percent, rounded to one decimal. The first
/// element is always `None`, as is any element whose predecessor is zero.
pub fn growth_rates(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            if idx == 0 {
                return None;
            }
            let previous = values[idx - 1];
            percent(value - previous, previous).map(round1)
        })
        .collect()
}

/// Mean of the values recorded in the `lookback` months ending at `reference`,
/// counting only months for which `has_data` holds.
pub fn trailing_average(
    values: &BTreeMap<Month, f64>,
    reference: Month,
    lookback: usize,
    has_data: impl Fn(Month) -> bool,
) -> Option<f64> {
    let months: Vec<Month> = reference
        .trailing(lookback.max(1))
        .into_iter()
        .filter(|month| has_data(*month))
        .collect();
    if months.is_empty() {
        return None;
    }
    let total: f64 = months
        .iter()
        .map(|month| values.get(month).copied().unwrap_or(0.0))
        .sum();
    Some(total / months.len() as f64)
}
