//! Stratified train/test split over credit score bins
//!
//! Scores are bucketed into equal-width bins between the observed min and
//! max. Each bin contributes to the test partition in proportion to its
//! size (largest-remainder rounding), so every score range is represented on
//! both sides.

use krishi_credit_core::{CreditError, Result};
use rand::seq::SliceRandom;

use crate::deterministic::{derived_rng, stream};

/// Row indices of each partition, ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Equal-width bin of each score. Requires `max > min`.
fn bin_of(score: f64, min: f64, width: f64, bins: usize) -> usize {
    let idx = ((score - min) / width).floor();
    if idx <= 0.0 {
        0
    } else {
        (idx as usize).min(bins - 1)
    }
}

/// Split rows into train and test partitions stratified by `scores`.
///
/// Bins with fewer than two members cannot be split and go entirely to
/// training. A splittable bin always keeps at least one training row.
pub fn stratified_split(
    scores: &[f64],
    test_fraction: f64,
    bins: usize,
    seed: u64,
) -> Result<SplitIndices> {
    let n = scores.len();
    if n < 2 {
        return Err(CreditError::InvalidInput(format!(
            "need at least 2 rows to split, got {n}"
        )));
    }
    if bins == 0 || !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(CreditError::InvalidInput(format!(
            "invalid split parameters: {bins} bins, test fraction {test_fraction}"
        )));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(CreditError::InvalidInput("non-finite credit score".into()));
    }

    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return Err(CreditError::InvalidInput(
            "all credit scores are identical; cannot stratify".into(),
        ));
    }
    let width = (max - min) / bins as f64;

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); bins];
    for (row, &score) in scores.iter().enumerate() {
        members[bin_of(score, min, width, bins)].push(row);
    }

    let quotas = allocate_test_rows(&members, (test_fraction * n as f64).ceil() as usize);

    let mut train = Vec::with_capacity(n);
    let mut test = Vec::with_capacity(n);
    for (bin, (rows, quota)) in members.iter_mut().zip(quotas).enumerate() {
        let mut rng = derived_rng(seed, stream::SPLIT, bin as u64);
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..quota]);
        train.extend_from_slice(&rows[quota..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(CreditError::InvalidInput(format!(
            "stratified split produced {} training and {} test rows",
            train.len(),
            test.len()
        )));
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(SplitIndices { train, test })
}

/// Largest-remainder allocation of `n_test` rows across splittable bins,
/// each capped at `len - 1`
fn allocate_test_rows(members: &[Vec<usize>], n_test: usize) -> Vec<usize> {
    let eligible: usize = members.iter().map(Vec::len).filter(|&len| len >= 2).sum();
    let mut quotas = vec![0usize; members.len()];
    if eligible == 0 {
        return quotas;
    }

    let mut remainders = Vec::new();
    let mut assigned = 0usize;
    for (bin, rows) in members.iter().enumerate() {
        if rows.len() < 2 {
            continue;
        }
        let exact = n_test as f64 * rows.len() as f64 / eligible as f64;
        let floor = (exact.floor() as usize).min(rows.len() - 1);
        quotas[bin] = floor;
        assigned += floor;
        remainders.push((bin, exact - exact.floor()));
    }

    // Largest remainder first; equal remainders go to the lower bin
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    for (bin, _) in remainders {
        if assigned >= n_test {
            break;
        }
        if quotas[bin] + 1 < members[bin].len() {
            quotas[bin] += 1;
            assigned += 1;
        }
    }

    quotas
}
