//! Standard scaling fitted on the training partition only.
//!
//! Non-finite inputs at transform time (e.g. a missing land area) are imputed
//! with the column's training mean, i.e. they scale to exactly zero.

use crate::errors::{CreditError, Result};
use serde::{Deserialize, Serialize};

/// Per-column mean / population standard deviation scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on a row-major table. Every row must have the same width and
    /// every value must be finite.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| CreditError::InvalidInput("cannot fit scaler on zero rows".into()))?;

        let n = rows.len() as f64;
        let mut means = vec![0.0; width];
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(CreditError::InvalidInput(format!(
                    "row {} has {} features, expected {}",
                    row_idx,
                    row.len(),
                    width
                )));
            }
            for (col, &v) in row.iter().enumerate() {
                if !v.is_finite() {
                    return Err(CreditError::InvalidInput(format!(
                        "non-finite value in row {row_idx}, column {col}"
                    )));
                }
                means[col] += v;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        let mut variances = vec![0.0; width];
        for row in rows {
            for (col, &v) in row.iter().enumerate() {
                let d = v - means[col];
                variances[col] += d * d;
            }
        }

        let scales = variances
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std.is_finite() && std > 0.0 {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { means, scales })
    }

    /// Number of columns this scaler was fitted on
    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Scale a single row
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.width() {
            return Err(CreditError::InvalidInput(format!(
                "feature vector has {} columns, scaler expects {}",
                row.len(),
                self.width()
            )));
        }

        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(&v, (&mean, &scale))| {
                if v.is_finite() {
                    (v - mean) / scale
                } else {
                    0.0
                }
            })
            .collect())
    }

    /// Scale a table
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    pub(crate) fn validate(&self, expected_width: usize) -> Result<()> {
        if self.means.len() != expected_width || self.scales.len() != expected_width {
            return Err(CreditError::Artifact(format!(
                "scaler fitted on {} columns, expected {}",
                self.means.len(),
                expected_width
            )));
        }
        if self.scales.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(CreditError::Artifact("scaler has a non-positive scale".into()));
        }
        Ok(())
    }
}
