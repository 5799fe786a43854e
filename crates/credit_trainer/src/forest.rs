//! Averaged tree ensembles: bootstrap random forests and extremely
//! randomized trees.
//!
//! Trees are grown in parallel. Tree `i` always draws from the RNG derived
//! from `(seed, kind, i)`, so the fitted forest is identical for any thread
//! count.

use krishi_credit_core::{Aggregation, ModelKind, Result, Tree, TreeEnsemble};
use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::cart::{CartBuilder, ThresholdStrategy, TreeConfig};
use crate::config::ForestParams;
use crate::deterministic::{derived_rng, stream};
use crate::trainer::{check_training_table, EnsembleTrainer};

#[derive(Clone, Debug)]
pub struct ForestTrainer {
    kind: ModelKind,
    params: ForestParams,
    seed: u64,
}

impl ForestTrainer {
    /// Bootstrap rows, exhaustive thresholds
    pub fn random_forest(params: ForestParams, seed: u64) -> Self {
        Self {
            kind: ModelKind::RandomForest,
            params,
            seed,
        }
    }

    /// All rows, one random threshold per feature per node
    pub fn extra_trees(params: ForestParams, seed: u64) -> Self {
        Self {
            kind: ModelKind::ExtraTrees,
            params,
            seed,
        }
    }

    fn bootstrap(&self) -> bool {
        self.kind == ModelKind::RandomForest
    }

    fn stream_tag(&self) -> u64 {
        match self.kind {
            ModelKind::ExtraTrees => stream::EXTRA_TREES,
            _ => stream::RANDOM_FOREST,
        }
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            lambda: 0.0,
            thresholds: match self.kind {
                ModelKind::ExtraTrees => ThresholdStrategy::Randomized,
                _ => ThresholdStrategy::Exhaustive,
            },
        }
    }

    fn grow_tree(&self, builder: &CartBuilder<'_>, n_rows: usize, tree_idx: usize) -> Tree {
        let mut rng = derived_rng(self.seed, self.stream_tag(), tree_idx as u64);
        let rows: Vec<usize> = if self.bootstrap() {
            (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect()
        } else {
            (0..n_rows).collect()
        };

        let tree = builder.build_on(&rows, Some(&mut rng));
        debug!(
            model = %self.kind,
            tree = tree_idx + 1,
            nodes = tree.nodes.len(),
            "tree grown"
        );
        tree
    }
}

impl EnsembleTrainer for ForestTrainer {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<TreeEnsemble> {
        let feature_count = check_training_table(features, targets)?;

        // g = −y, h = 1, λ = 0: leaves hold the mean target
        let gradients: Vec<f64> = targets.iter().map(|y| -y).collect();
        let hessians = vec![1.0; targets.len()];
        let builder = CartBuilder::new(features, &gradients, &hessians, self.tree_config())?;

        let trees: Vec<Tree> = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| self.grow_tree(&builder, features.len(), tree_idx))
            .collect();

        Ok(TreeEnsemble::new(
            self.kind,
            Aggregation::Mean,
            trees,
            feature_count,
        ))
    }
}
