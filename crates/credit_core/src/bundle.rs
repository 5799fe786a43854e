//! The trained artifact: model, scaler, encoders, importances and metrics.
//!
//! A bundle is only ever constructed fully populated; there is no partially
//! trained state.

use crate::ensemble::TreeEnsemble;
use crate::errors::{CreditError, Result};
use crate::features::{CategoryEncoder, CATEGORICAL_FIELDS, FEATURE_COUNT, FEATURE_NAMES};
use crate::scaler::StandardScaler;
use crate::types::{FeatureImportance, TrainingMetrics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: TreeEnsemble,
    pub scaler: StandardScaler,
    /// Categorical field name → fitted encoder
    pub encoders: BTreeMap<String, CategoryEncoder>,
    /// Sorted descending by importance
    pub feature_importance: Option<Vec<FeatureImportance>>,
    pub metrics: TrainingMetrics,
}

impl ModelBundle {
    /// Check that every component agrees on the feature layout
    pub fn validate(&self) -> Result<()> {
        self.model.validate(FEATURE_COUNT)?;
        self.scaler.validate(FEATURE_COUNT)?;

        for field in CATEGORICAL_FIELDS {
            if !self.encoders.contains_key(field.name()) {
                return Err(CreditError::Artifact(format!(
                    "missing encoder for '{}'",
                    field.name()
                )));
            }
        }

        if let Some(table) = &self.feature_importance {
            if table.len() > FEATURE_COUNT {
                return Err(CreditError::Artifact(format!(
                    "importance table has {} rows for {} features",
                    table.len(),
                    FEATURE_COUNT
                )));
            }
        }

        Ok(())
    }

    /// Blake3 hex digest of the encoded bundle
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = bincode::serialize(self)?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }

    /// First `k` rows of the importance table (empty if the model has none)
    pub fn top_features(&self, k: usize) -> &[FeatureImportance] {
        match &self.feature_importance {
            Some(table) => &table[..k.min(table.len())],
            None => &[],
        }
    }
}

/// Pair raw importances with feature names and sort descending.
///
/// The sort is stable, so equal importances keep feature order.
pub fn importance_table(importances: &[f64]) -> Vec<FeatureImportance> {
    let mut table: Vec<FeatureImportance> = FEATURE_NAMES
        .iter()
        .zip(importances)
        .map(|(name, &importance)| FeatureImportance {
            feature: (*name).to_string(),
            importance,
        })
        .collect();
    table.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_table_sorts_descending_and_keeps_ties_in_order() {
        let mut raw = vec![0.0; FEATURE_COUNT];
        raw[12] = 0.5; // annual_income_inr
        raw[14] = 0.3; // loan_repayment_history
        raw[0] = 0.1;
        raw[1] = 0.1;

        let table = importance_table(&raw);
        assert_eq!(table.len(), FEATURE_COUNT);
        assert_eq!(table[0].feature, "annual_income_inr");
        assert_eq!(table[1].feature, "loan_repayment_history");
        assert_eq!(table[2].feature, "land_area_acres");
        assert_eq!(table[3].feature, "ndvi_current");
        assert!(table.windows(2).all(|w| w[0].importance >= w[1].importance));
    }
}
