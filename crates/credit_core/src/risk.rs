//! Credit score → risk tier and loan ceiling.
//!
//! The generator uses this table to label synthetic truth and the predictor
//! uses it to interpret model output, so both go through [`classify`].

use crate::types::RiskCategory;

/// Lower bound (inclusive), category, rupees per acre, and ceiling for each tier.
/// Ordered from the best tier down; the last entry catches everything below.
const RISK_TIERS: [(u16, RiskCategory, f64, f64); 4] = [
    (750, RiskCategory::Low, 50_000.0, 200_000.0),
    (650, RiskCategory::Medium, 30_000.0, 100_000.0),
    (550, RiskCategory::High, 15_000.0, 50_000.0),
    (0, RiskCategory::VeryHigh, 5_000.0, 20_000.0),
];

/// Map a credit score and land holding to `(risk_category, loan_eligibility_inr)`.
///
/// Eligibility is `min(land_area * per_acre, ceiling)` truncated to whole rupees.
/// Negative or non-finite land areas yield zero eligibility.
pub fn classify(credit_score: u16, land_area_acres: f64) -> (RiskCategory, u64) {
    let (_, category, per_acre, ceiling) = RISK_TIERS
        .iter()
        .copied()
        .find(|(floor, ..)| credit_score >= *floor)
        .unwrap_or(RISK_TIERS[RISK_TIERS.len() - 1]);

    // f64::min would pick the ceiling over a NaN product
    let eligibility = if land_area_acres.is_finite() && land_area_acres > 0.0 {
        (land_area_acres * per_acre).min(ceiling).trunc() as u64
    } else {
        0
    };

    (category, eligibility)
}
