//! Krishi credit trainer: synthetic data, deterministic tree-ensemble
//! training and best-of-N model selection.
//!
//! Training is reproducible from one seed: the generator, the stratified
//! split and every forest tree draw from RNG streams derived from it.

pub mod cart;
pub mod config;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod forest;
pub mod generator;
pub mod pipeline;
pub mod selection;
pub mod split;
pub mod trainer;

pub use cart::{CartBuilder, ThresholdStrategy, TreeConfig};
pub use config::{BoostingParams, ForestParams, PipelineConfig};
pub use dataset::{read_applicant_json, read_records_csv, write_records_csv};
pub use errors::DatasetError;
pub use forest::ForestTrainer;
pub use generator::{
    generate, scale_to_credit_score, ScoreComponents, SyntheticGenerator, CROPS,
    IRRIGATION_TYPES, REGIONS,
};
pub use pipeline::CreditPipeline;
pub use selection::{default_candidates, pick_best, select_model, CandidateReport, Holdout};
pub use split::{stratified_split, SplitIndices};
pub use trainer::{EnsembleTrainer, GbdtTrainer};
