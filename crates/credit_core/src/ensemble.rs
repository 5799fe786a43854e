//! Tree-ensemble regressor used for credit score inference
//!
//! One model type covers every candidate the selector can produce:
//! - bagged forests average their trees
//! - boosted ensembles add `learning_rate * tree` on top of a base score

use crate::errors::{CreditError, Result};
use crate::tree::Tree;
use crate::types::ModelKind;
use serde::{Deserialize, Serialize};

/// How tree outputs combine into a prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Aggregation {
    /// Average of all trees
    Mean,
    /// `base_score + learning_rate * Σ tree`
    Boosted { base_score: f64, learning_rate: f64 },
}

/// A fitted tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub kind: ModelKind,
    pub aggregation: Aggregation,
    pub trees: Vec<Tree>,
    /// Width of the feature vectors the trees were trained on
    pub feature_count: usize,
}

impl TreeEnsemble {
    pub fn new(
        kind: ModelKind,
        aggregation: Aggregation,
        trees: Vec<Tree>,
        feature_count: usize,
    ) -> Self {
        Self {
            kind,
            aggregation,
            trees,
            feature_count,
        }
    }

    /// Predict a single scaled feature vector
    pub fn predict(&self, features: &[f64]) -> f64 {
        match self.aggregation {
            Aggregation::Mean => {
                if self.trees.is_empty() {
                    return 0.0;
                }
                let sum: f64 = self.trees.iter().map(|t| t.evaluate(features)).sum();
                sum / self.trees.len() as f64
            }
            Aggregation::Boosted {
                base_score,
                learning_rate,
            } => {
                let mut score = base_score;
                for tree in &self.trees {
                    score += learning_rate * tree.evaluate(features);
                }
                score
            }
        }
    }

    /// Predict every row of a scaled table
    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Impurity-based importances, one per feature, summing to 1.
    ///
    /// Each tree's gains are normalised before averaging so that no single
    /// tree dominates. All zeros when no tree contains a split.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.feature_count];

        for tree in &self.trees {
            let mut per_tree = vec![0.0; self.feature_count];
            tree.accumulate_gains(&mut per_tree);
            let tree_total: f64 = per_tree.iter().sum();
            if tree_total > 0.0 {
                for (slot, gain) in totals.iter_mut().zip(per_tree) {
                    *slot += gain / tree_total;
                }
            }
        }

        let grand_total: f64 = totals.iter().sum();
        if grand_total > 0.0 {
            for slot in &mut totals {
                *slot /= grand_total;
            }
        }
        totals
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Validate structure before the ensemble is trusted for inference
    pub fn validate(&self, expected_features: usize) -> Result<()> {
        if self.feature_count != expected_features {
            return Err(CreditError::Artifact(format!(
                "model trained on {} features, expected {}",
                self.feature_count, expected_features
            )));
        }
        if self.trees.is_empty() {
            return Err(CreditError::Artifact("model has no trees".into()));
        }
        if let Aggregation::Boosted {
            base_score,
            learning_rate,
        } = self.aggregation
        {
            if !base_score.is_finite() || !(learning_rate.is_finite() && learning_rate > 0.0) {
                return Err(CreditError::Artifact(
                    "boosted model has invalid base score or learning rate".into(),
                ));
            }
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count).map_err(|e| {
                CreditError::Artifact(format!("Tree {} validation failed: {}", i, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    fn split_tree(feature: i32, threshold: f64, gain: f64, left: f64, right: f64) -> Tree {
        let mut root = Node::split(feature, threshold, gain);
        root.left = 1;
        root.right = 2;
        Tree::new(vec![root, Node::leaf(left), Node::leaf(right)])
    }

    #[test]
    fn mean_aggregation_averages_trees() {
        let model = TreeEnsemble::new(
            ModelKind::RandomForest,
            Aggregation::Mean,
            vec![
                split_tree(0, 0.0, 1.0, 500.0, 700.0),
                split_tree(1, 0.0, 1.0, 600.0, 800.0),
            ],
            2,
        );

        assert_eq!(model.predict(&[-1.0, 1.0]), (500.0 + 800.0) / 2.0);
        assert_eq!(model.predict(&[1.0, -1.0]), (700.0 + 600.0) / 2.0);
    }

    #[test]
    fn boosted_aggregation_adds_scaled_trees_to_base() {
        let model = TreeEnsemble::new(
            ModelKind::GradientBoosting,
            Aggregation::Boosted {
                base_score: 600.0,
                learning_rate: 0.1,
            },
            vec![
                split_tree(0, 0.0, 1.0, -100.0, 100.0),
                split_tree(0, 0.0, 1.0, -50.0, 50.0),
            ],
            1,
        );

        assert!((model.predict(&[1.0]) - 615.0).abs() < 1e-9);
        assert!((model.predict(&[-1.0]) - 585.0).abs() < 1e-9);
    }

    #[test]
    fn importances_are_normalised_per_tree() {
        let model = TreeEnsemble::new(
            ModelKind::RandomForest,
            Aggregation::Mean,
            vec![
                split_tree(0, 0.0, 1000.0, 0.0, 1.0),
                split_tree(1, 0.0, 1.0, 0.0, 1.0),
            ],
            3,
        );

        let importances = model.feature_importances();
        assert_eq!(importances, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn validate_rejects_width_mismatch_and_empty_models() {
        let model = TreeEnsemble::new(
            ModelKind::ExtraTrees,
            Aggregation::Mean,
            vec![split_tree(0, 0.0, 1.0, 0.0, 1.0)],
            1,
        );
        assert!(model.validate(1).is_ok());
        assert!(model.validate(26).is_err());

        let empty = TreeEnsemble::new(ModelKind::ExtraTrees, Aggregation::Mean, vec![], 1);
        assert!(empty.validate(1).is_err());
    }
}
