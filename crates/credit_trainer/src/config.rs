//! Training configuration
//!
//! Defaults reproduce the reference training run. A TOML file may override
//! any subset of fields, and `KRISHI_*` environment variables are applied on
//! top of that.

use krishi_credit_core::{CreditError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Bagged / randomized forest parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Second-order gradient boosting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 penalty on leaf weights
    pub lambda: f64,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 6,
            learning_rate: 0.1,
            lambda: 1.0,
            min_samples_leaf: 1,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Base seed for the generator, the split and every ensemble
    pub seed: u64,
    /// Held-out share of the training records
    pub test_fraction: f64,
    /// Equal-width score bins used to stratify the split
    pub score_bins: usize,
    pub min_training_records: usize,
    pub gradient_boosting: BoostingParams,
    pub random_forest: ForestParams,
    pub extra_trees: ForestParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            score_bins: 5,
            min_training_records: 50,
            gradient_boosting: BoostingParams::default(),
            random_forest: ForestParams::default(),
            extra_trees: ForestParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML file and validate the result
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)
            .map_err(|e| CreditError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `KRISHI_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Unparsable values are
    /// reported and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = parse_override(&lookup, "KRISHI_SEED") {
            self.seed = seed;
        }
        if let Some(fraction) = parse_override(&lookup, "KRISHI_TEST_FRACTION") {
            self.test_fraction = fraction;
        }
        if let Some(bins) = parse_override(&lookup, "KRISHI_SCORE_BINS") {
            self.score_bins = bins;
        }
        if let Some(min) = parse_override(&lookup, "KRISHI_MIN_TRAINING_RECORDS") {
            self.min_training_records = min;
        }
        if let Some(n) = parse_override::<usize, _>(&lookup, "KRISHI_N_ESTIMATORS") {
            self.gradient_boosting.n_estimators = n;
            self.random_forest.n_estimators = n;
            self.extra_trees.n_estimators = n;
        }
    }

    /// Reject values the trainer cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(CreditError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.score_bins == 0 {
            return Err(CreditError::Config("score_bins must be at least 1".into()));
        }
        if self.min_training_records < 2 {
            return Err(CreditError::Config(
                "min_training_records must be at least 2".into(),
            ));
        }

        let forests = [
            ("random_forest", &self.random_forest),
            ("extra_trees", &self.extra_trees),
        ];
        for (name, params) in forests {
            if params.n_estimators == 0 || params.max_depth == 0 {
                return Err(CreditError::Config(format!(
                    "{name}: n_estimators and max_depth must be positive"
                )));
            }
            if params.min_samples_leaf == 0 || params.min_samples_split < 2 {
                return Err(CreditError::Config(format!(
                    "{name}: min_samples_leaf must be >= 1 and min_samples_split >= 2"
                )));
            }
        }

        let gb = &self.gradient_boosting;
        if gb.n_estimators == 0 || gb.max_depth == 0 || gb.min_samples_leaf == 0 {
            return Err(CreditError::Config(
                "gradient_boosting: n_estimators, max_depth and min_samples_leaf must be positive"
                    .into(),
            ));
        }
        if !(gb.learning_rate.is_finite() && gb.learning_rate > 0.0) {
            return Err(CreditError::Config(format!(
                "gradient_boosting: learning_rate must be positive, got {}",
                gb.learning_rate
            )));
        }
        if !(gb.lambda.is_finite() && gb.lambda >= 0.0) {
            return Err(CreditError::Config(format!(
                "gradient_boosting: lambda must be non-negative, got {}",
                gb.lambda
            )));
        }

        Ok(())
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => {
            info!(key, value = %raw.trim(), "configuration override");
            Some(value)
        }
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable configuration override");
            None
        }
    }
}
