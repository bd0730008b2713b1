use std::cmp::Ordering;

use crate::types::PredictionResult;

/// Top `limit` predictions by probability, highest first. Ties keep their
/// input order; the input is left untouched.
pub fn rank(predictions: &[PredictionResult], limit: usize) -> Vec<PredictionResult> {
    let mut order: Vec<&PredictionResult> = predictions.iter().collect();
    // `sort_by` is stable.
    order.sort_by(|a, b| by_probability_desc(a.probability, b.probability));
    order.into_iter().take(limit).cloned().collect()
}

/// Flatten per-fixture batches (in the order given) and rank the lot.
pub fn merge_ranked<I>(batches: I, limit: usize) -> Vec<PredictionResult>
where
    I: IntoIterator<Item = Vec<PredictionResult>>,
{
    let all: Vec<PredictionResult> = batches.into_iter().flatten().collect();
    rank(&all, limit)
}

// NaN sorts last.
fn by_probability_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
