//! Best-of-N model selection by held-out R²
//!
//! The candidate list is data: each entry is an [`EnsembleTrainer`]. Every
//! candidate is fitted on the same scaled training table and scored on the
//! same held-out rows. The first candidate with the strictly highest R² wins.

use krishi_credit_core::{CreditError, RegressionMetrics, Result, TreeEnsemble};
use tracing::info;

use crate::config::PipelineConfig;
use crate::forest::ForestTrainer;
use crate::trainer::{EnsembleTrainer, GbdtTrainer};

/// A fitted candidate and its held-out fit quality
#[derive(Debug, Clone)]
pub struct CandidateReport {
    pub model: TreeEnsemble,
    pub metrics: RegressionMetrics,
}

/// Candidates in evaluation order: gradient boosting, random forest, extra trees
pub fn default_candidates(config: &PipelineConfig) -> Vec<Box<dyn EnsembleTrainer>> {
    vec![
        Box::new(GbdtTrainer::new(config.gradient_boosting.clone())),
        Box::new(ForestTrainer::random_forest(
            config.random_forest.clone(),
            config.seed,
        )),
        Box::new(ForestTrainer::extra_trees(
            config.extra_trees.clone(),
            config.seed,
        )),
    ]
}

/// Index of the best score: first strictly greater wins, NaN never wins
pub fn pick_best(r2_scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &r2) in r2_scores.iter().enumerate() {
        if r2.is_nan() {
            continue;
        }
        match best {
            Some((_, best_r2)) if r2 <= best_r2 => {}
            _ => best = Some((idx, r2)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Held-out partition used to score candidates
pub struct Holdout<'a> {
    pub features: &'a [Vec<f64>],
    pub targets: &'a [f64],
}

/// Fit and score every candidate, returning the winner
pub fn select_model(
    candidates: &[Box<dyn EnsembleTrainer>],
    train_features: &[Vec<f64>],
    train_targets: &[f64],
    holdout: Holdout<'_>,
) -> Result<CandidateReport> {
    let mut reports = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        info!(model = %candidate.kind(), rows = train_features.len(), "training candidate");
        let model = candidate.fit(train_features, train_targets)?;
        let predictions = model.predict_rows(holdout.features);
        let metrics = RegressionMetrics::evaluate(holdout.targets, &predictions)?;

        info!(
            model = %candidate.kind(),
            rmse = metrics.rmse,
            mae = metrics.mae,
            r2 = metrics.r2,
            "candidate evaluated"
        );
        reports.push(CandidateReport { model, metrics });
    }

    let r2_scores: Vec<f64> = reports.iter().map(|r| r.metrics.r2).collect();
    let best = pick_best(&r2_scores).ok_or_else(|| {
        CreditError::InvalidInput("no candidate produced a finite R² on the test partition".into())
    })?;

    let winner = reports.swap_remove(best);
    info!(
        model = %winner.model.kind,
        r2 = winner.metrics.r2,
        "selected production model"
    );
    Ok(winner)
}
