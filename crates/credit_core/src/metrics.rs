//! Held-out regression metrics (scikit-learn conventions)

use crate::errors::{CreditError, Result};
use serde::{Deserialize, Serialize};

/// Fit quality on a held-out partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.is_empty() || actual.len() != predicted.len() {
            return Err(CreditError::InvalidInput(format!(
                "cannot score {} predictions against {} targets",
                predicted.len(),
                actual.len()
            )));
        }

        Ok(Self {
            rmse: mean_squared_error(actual, predicted).sqrt(),
            mae: mean_absolute_error(actual, predicted),
            r2: r2_score(actual, predicted),
        })
    }
}

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    sum / actual.len() as f64
}

pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let sum: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum();
    sum / actual.len() as f64
}

/// Coefficient of determination.
///
/// With a constant target, a perfect prediction scores 1.0 and anything else 0.0.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
