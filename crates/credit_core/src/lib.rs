//! Agricultural credit scoring core
//!
//! Everything needed to score a borrower with a trained model, and nothing
//! needed to train one.
//!
//! Modules:
//! - `types`: Farmer records, risk categories, assessments and metrics
//! - `risk`: Credit score → risk tier / loan eligibility table
//! - `features`: Categorical encoding and composite feature engineering
//! - `scaler`: Standard scaling with mean imputation
//! - `tree` / `ensemble`: Regression trees and tree-ensemble inference
//! - `metrics`: RMSE / MAE / R² on held-out data
//! - `bundle`: The trained artifact and its importance table
//! - `artifact`: Atomic save/load of bundles
//! - `predictor`: Scoring handle over a bundle

pub mod artifact;
pub mod bundle;
pub mod ensemble;
pub mod errors;
pub mod features;
pub mod metrics;
pub mod predictor;
pub mod risk;
pub mod scaler;
pub mod tree;
pub mod types;

pub use artifact::{load_bundle, save_bundle, ArtifactEnvelope, ARTIFACT_FORMAT_VERSION};
pub use bundle::{importance_table, ModelBundle};
pub use ensemble::{Aggregation, TreeEnsemble};
pub use errors::{CreditError, Result};
pub use features::{
    feature_vector, CategoricalField, CategoryEncoder, DerivedFeatures, FeatureEngineer,
    CATEGORICAL_FIELDS, FEATURE_COUNT, FEATURE_NAMES, UNSEEN_CATEGORY_CODE,
};
pub use metrics::RegressionMetrics;
pub use predictor::{clamp_credit_score, CreditScorer, MAX_CONFIDENCE, MIN_CONFIDENCE};
pub use risk::classify;
pub use scaler::StandardScaler;
pub use tree::{Node, Tree};
pub use types::{
    CreditAssessment, FarmerRecord, FeatureImportance, ModelKind, RiskCategory,
    TrainingMetrics, DEFAULT_LAND_AREA_ACRES, MAX_CREDIT_SCORE, MIN_CREDIT_SCORE,
};

/// Crate version string, recorded in saved artifacts
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
