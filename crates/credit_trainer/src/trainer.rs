//! Ensemble trainers
//!
//! [`EnsembleTrainer`] is the seam the model selector iterates over. This
//! module also holds the gradient-boosted trainer; the bagged and randomized
//! forests live in [`crate::forest`].

use krishi_credit_core::{Aggregation, CreditError, ModelKind, Result, TreeEnsemble};
use tracing::debug;

use crate::cart::{CartBuilder, ThresholdStrategy, TreeConfig};
use crate::config::BoostingParams;

/// Fits one kind of tree ensemble on a scaled feature table
pub trait EnsembleTrainer: Send + Sync {
    fn kind(&self) -> ModelKind;

    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<TreeEnsemble>;
}

pub(crate) fn check_training_table(features: &[Vec<f64>], targets: &[f64]) -> Result<usize> {
    if features.is_empty() || features.len() != targets.len() {
        return Err(CreditError::InvalidInput(format!(
            "cannot fit on {} rows with {} targets",
            features.len(),
            targets.len()
        )));
    }
    Ok(features[0].len())
}

/// Second-order gradient boosting on squared error
#[derive(Clone, Debug)]
pub struct GbdtTrainer {
    params: BoostingParams,
}

impl GbdtTrainer {
    pub fn new(params: BoostingParams) -> Self {
        Self { params }
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.params.max_depth,
            min_samples_split: 2 * self.params.min_samples_leaf,
            min_samples_leaf: self.params.min_samples_leaf,
            lambda: self.params.lambda,
            thresholds: ThresholdStrategy::Exhaustive,
        }
    }
}

impl EnsembleTrainer for GbdtTrainer {
    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoosting
    }

    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<TreeEnsemble> {
        let feature_count = check_training_table(features, targets)?;

        let base_score = mean(targets);
        let learning_rate = self.params.learning_rate;
        let mut predictions = vec![base_score; targets.len()];
        // Squared error: hessian is constant 1
        let hessians = vec![1.0; targets.len()];
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for round in 0..self.params.n_estimators {
            let gradients: Vec<f64> = predictions
                .iter()
                .zip(targets)
                .map(|(p, y)| p - y)
                .collect();

            let builder = CartBuilder::new(features, &gradients, &hessians, self.tree_config())?;
            let tree = builder.build();

            for (pred, row) in predictions.iter_mut().zip(features) {
                *pred += learning_rate * tree.evaluate(row);
            }

            debug!(
                round = round + 1,
                nodes = tree.nodes.len(),
                "boosting round complete"
            );
            trees.push(tree);
        }

        Ok(TreeEnsemble::new(
            ModelKind::GradientBoosting,
            Aggregation::Boosted {
                base_score,
                learning_rate,
            },
            trees,
            feature_count,
        ))
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_table() -> (Vec<Vec<f64>>, Vec<f64>) {
        let features = vec![
            vec![-1.5, 0.2],
            vec![-0.5, 0.1],
            vec![0.5, -0.3],
            vec![1.5, 0.4],
        ];
        let targets = vec![400.0, 500.0, 600.0, 700.0];
        (features, targets)
    }

    fn params(n_estimators: usize) -> BoostingParams {
        BoostingParams {
            n_estimators,
            max_depth: 2,
            learning_rate: 0.3,
            lambda: 1.0,
            min_samples_leaf: 1,
        }
    }

    #[test]
    fn test_train_simple_model() {
        let (features, targets) = simple_table();
        let model = GbdtTrainer::new(params(4)).fit(&features, &targets).unwrap();

        assert_eq!(model.num_trees(), 4);
        assert_eq!(model.feature_count, 2);
        assert_eq!(model.kind, ModelKind::GradientBoosting);
        assert!(model.validate(2).is_ok());
        match model.aggregation {
            Aggregation::Boosted { base_score, .. } => assert_eq!(base_score, 550.0),
            Aggregation::Mean => panic!("boosted model expected"),
        }
    }

    #[test]
    fn test_more_rounds_fit_better() {
        let (features, targets) = simple_table();
        let sse = |model: &TreeEnsemble| -> f64 {
            features
                .iter()
                .zip(&targets)
                .map(|(row, y)| (model.predict(row) - y).powi(2))
                .sum()
        };

        let short = GbdtTrainer::new(params(2)).fit(&features, &targets).unwrap();
        let long = GbdtTrainer::new(params(40)).fit(&features, &targets).unwrap();
        assert!(sse(&long) < sse(&short));
        assert!((long.predict(&features[3]) - 700.0).abs() < 20.0);
    }

    #[test]
    fn test_determinism() {
        let (features, targets) = simple_table();
        let a = GbdtTrainer::new(params(5)).fit(&features, &targets).unwrap();
        let b = GbdtTrainer::new(params(5)).fit(&features, &targets).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = GbdtTrainer::new(params(1)).fit(&[], &[]).unwrap_err();
        assert!(matches!(err, CreditError::InvalidInput(_)));
    }
}
