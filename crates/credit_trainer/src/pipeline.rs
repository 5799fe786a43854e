//! The credit pipeline handle
//!
//! Owns the configuration and, once trained or loaded, exactly one
//! [`ModelBundle`]. `train` and `load` replace the bundle as a whole; every
//! scoring call goes through a read-only [`CreditScorer`].

use krishi_credit_core::{
    importance_table, load_bundle, save_bundle, CreditAssessment, CreditError, CreditScorer,
    FarmerRecord, FeatureEngineer, ModelBundle, Result, StandardScaler, TrainingMetrics,
};
use std::path::Path;
use tracing::info;

use crate::config::PipelineConfig;
use crate::selection::{default_candidates, select_model, Holdout};
use crate::split::stratified_split;

/// Number of importance rows logged after training
const LOGGED_IMPORTANCES: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct CreditPipeline {
    config: PipelineConfig,
    bundle: Option<ModelBundle>,
}

impl CreditPipeline {
    /// Untrained pipeline
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            bundle: None,
        }
    }

    /// Pipeline restored from a saved bundle
    pub fn from_artifact(config: PipelineConfig, path: &Path) -> Result<Self> {
        let mut pipeline = Self::new(config);
        pipeline.load(path)?;
        Ok(pipeline)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn bundle(&self) -> Option<&ModelBundle> {
        self.bundle.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.bundle.is_some()
    }

    /// Scoring handle over the current bundle
    pub fn scorer(&self) -> Result<CreditScorer<'_>> {
        self.bundle
            .as_ref()
            .map(CreditScorer::new)
            .ok_or(CreditError::NotTrained)
    }

    /// Fit encoders, scaler and every candidate model, keep the best.
    ///
    /// The previous bundle survives any failure.
    pub fn train(&mut self, records: &[FarmerRecord]) -> Result<TrainingMetrics> {
        self.config.validate()?;
        let targets = training_targets(records, self.config.min_training_records)?;

        let mut engineer = FeatureEngineer::new();
        let table = engineer.engineer(records);

        let split = stratified_split(
            &targets,
            self.config.test_fraction,
            self.config.score_bins,
            self.config.seed,
        )?;
        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            "stratified split"
        );

        let pick = |rows: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
            rows.iter()
                .map(|&r| (table[r].clone(), targets[r]))
                .unzip()
        };
        let (train_raw, train_y) = pick(&split.train);
        let (test_raw, test_y) = pick(&split.test);

        let scaler = StandardScaler::fit(&train_raw)?;
        let train_x = scaler.transform(&train_raw)?;
        let test_x = scaler.transform(&test_raw)?;

        let candidates = default_candidates(&self.config);
        let winner = select_model(
            &candidates,
            &train_x,
            &train_y,
            Holdout {
                features: &test_x,
                targets: &test_y,
            },
        )?;

        let metrics = TrainingMetrics {
            rmse: winner.metrics.rmse,
            mae: winner.metrics.mae,
            r2: winner.metrics.r2,
            model_type: winner.model.kind,
        };

        let importances = winner.model.feature_importances();
        let feature_importance = if importances.iter().any(|&w| w > 0.0) {
            Some(importance_table(&importances))
        } else {
            None
        };

        let bundle = ModelBundle {
            model: winner.model,
            scaler,
            encoders: engineer.into_encoders(),
            feature_importance,
            metrics: metrics.clone(),
        };
        bundle.validate()?;

        for (rank, row) in bundle.top_features(LOGGED_IMPORTANCES).iter().enumerate() {
            info!(
                rank = rank + 1,
                feature = %row.feature,
                importance = row.importance,
                "feature importance"
            );
        }
        info!(
            model = %metrics.model_type,
            rmse = metrics.rmse,
            mae = metrics.mae,
            r2 = metrics.r2,
            "training complete"
        );

        self.bundle = Some(bundle);
        Ok(metrics)
    }

    pub fn predict(&self, record: &FarmerRecord) -> Result<CreditAssessment> {
        self.scorer()?.predict(record)
    }

    pub fn predict_batch(&self, records: &[FarmerRecord]) -> Result<Vec<CreditAssessment>> {
        self.scorer()?.predict_batch(records)
    }

    /// Persist the current bundle
    pub fn save(&self, path: &Path) -> Result<()> {
        let bundle = self.bundle.as_ref().ok_or(CreditError::NotTrained)?;
        save_bundle(bundle, path)?;
        info!(path = %path.display(), fingerprint = %bundle.fingerprint()?, "pipeline saved");
        Ok(())
    }

    /// Replace the bundle with one read from `path`. On error the current
    /// bundle is left untouched.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let bundle = load_bundle(path)?;
        info!(path = %path.display(), fingerprint = %bundle.fingerprint()?, "pipeline loaded");
        self.bundle = Some(bundle);
        Ok(())
    }
}

/// Labels as regression targets, after checking the table is trainable
fn training_targets(records: &[FarmerRecord], min_records: usize) -> Result<Vec<f64>> {
    if records.len() < min_records {
        return Err(CreditError::InvalidInput(format!(
            "need at least {min_records} labelled records, got {}",
            records.len()
        )));
    }

    let mut targets = Vec::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        let score = record.credit_score.ok_or_else(|| {
            CreditError::InvalidInput(format!("record {row} has no credit_score label"))
        })?;
        match record.land_area_acres {
            Some(land) if land.is_finite() && land > 0.0 => {}
            Some(land) => {
                return Err(CreditError::InvalidInput(format!(
                    "record {row} has invalid land_area_acres {land}"
                )))
            }
            None => {
                return Err(CreditError::InvalidInput(format!(
                    "record {row} has no land_area_acres"
                )))
            }
        }
        targets.push(f64::from(score));
    }

    if targets.iter().all(|&t| t == targets[0]) {
        return Err(CreditError::InvalidInput(
            "all credit_score labels are identical".into(),
        ));
    }
    Ok(targets)
}
