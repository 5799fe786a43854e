//! Common data structures shared by the generator, trainer and predictor

use serde::{Deserialize, Serialize};
use std::fmt;

/// Land area assumed for eligibility when an applicant omits it
pub const DEFAULT_LAND_AREA_ACRES: f64 = 1.0;

/// Lowest credit score a borrower can receive
pub const MIN_CREDIT_SCORE: u16 = 300;

/// Highest credit score a borrower can receive
pub const MAX_CREDIT_SCORE: u16 = 850;

/// One borrower observation.
///
/// The struct is flat so the same shape round-trips through CSV rows and JSON
/// objects. Label fields are only present on generated or historical records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerRecord {
    // Location and crop
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub land_area_acres: Option<f64>,
    #[serde(default)]
    pub primary_crop: String,
    #[serde(default)]
    pub irrigation_type: String,

    // Satellite
    pub ndvi_current: f64,
    pub ndvi_3month_avg: f64,
    pub soil_moisture: f64,
    pub crop_health_index: f64,

    // Weather
    pub rainfall_annual_mm: f64,
    pub avg_temperature_c: f64,
    pub weather_risk_score: f64,

    // Market
    pub market_price_stability: f64,
    pub distance_to_market_km: f64,

    // History
    pub years_farming_experience: u32,
    pub avg_yield_last_3_years: f64,

    // Financial
    pub annual_income_inr: f64,
    pub existing_loans_count: u32,
    pub loan_repayment_history: f64,

    // Technology
    pub smartphone_usage: u8,
    pub modern_techniques_adoption: f64,

    // Labels
    #[serde(default)]
    pub credit_score: Option<u16>,
    #[serde(default)]
    pub risk_category: Option<RiskCategory>,
    #[serde(default)]
    pub loan_eligibility_inr: Option<u64>,
}

impl FarmerRecord {
    /// Land area used for eligibility, falling back to one acre when absent
    pub fn eligibility_land_area(&self) -> f64 {
        self.land_area_acres.unwrap_or(DEFAULT_LAND_AREA_ACRES)
    }

    /// Copy of this record with the label fields removed
    pub fn without_labels(&self) -> Self {
        Self {
            credit_score: None,
            risk_category: None,
            loan_eligibility_inr: None,
            ..self.clone()
        }
    }
}

/// Ordinal risk label derived from a credit score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "LOW",
            RiskCategory::Medium => "MEDIUM",
            RiskCategory::High => "HIGH",
            RiskCategory::VeryHigh => "VERY_HIGH",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring result for a single applicant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAssessment {
    pub credit_score: u16,
    pub risk_category: RiskCategory,
    pub loan_eligibility_inr: u64,
    /// Held-out R² of the production model, capped at 0.95
    pub confidence: f64,
}

/// Regressor families the selector can choose between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    GradientBoosting,
    RandomForest,
    ExtraTrees,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::GradientBoosting => "GradientBoosting",
            ModelKind::RandomForest => "RandomForest",
            ModelKind::ExtraTrees => "ExtraTrees",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Held-out fit quality of the selected model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    pub model_type: ModelKind,
}

/// One row of the feature-importance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}
