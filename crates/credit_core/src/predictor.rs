//! Inference over a trained [`ModelBundle`].
//!
//! Applies the fitted encoders (never refitting), scales with the stored
//! scaler, runs the stored model and interprets the score with [`classify`].

use crate::bundle::ModelBundle;
use crate::errors::Result;
use crate::features::feature_vector;
use crate::risk::classify;
use crate::types::{CreditAssessment, FarmerRecord, MAX_CREDIT_SCORE, MIN_CREDIT_SCORE};

/// Ceiling on the reported confidence
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Floor on the reported confidence, used when the model's R² is not positive
pub const MIN_CONFIDENCE: f64 = 0.01;

/// Read-only scoring handle borrowed from a bundle
#[derive(Debug, Clone, Copy)]
pub struct CreditScorer<'a> {
    bundle: &'a ModelBundle,
}

impl<'a> CreditScorer<'a> {
    pub fn new(bundle: &'a ModelBundle) -> Self {
        Self { bundle }
    }

    /// Raw (unclamped) model output for a record
    pub fn raw_score(&self, record: &FarmerRecord) -> Result<f64> {
        let features = feature_vector(&self.bundle.encoders, record);
        let scaled = self.bundle.scaler.transform_row(&features)?;
        Ok(self.bundle.model.predict(&scaled))
    }

    /// Score one applicant
    pub fn predict(&self, record: &FarmerRecord) -> Result<CreditAssessment> {
        let credit_score = clamp_credit_score(self.raw_score(record)?);
        let (risk_category, loan_eligibility_inr) =
            classify(credit_score, record.eligibility_land_area());

        Ok(CreditAssessment {
            credit_score,
            risk_category,
            loan_eligibility_inr,
            confidence: self.confidence(),
        })
    }

    /// Score many applicants with the same transforms
    pub fn predict_batch(&self, records: &[FarmerRecord]) -> Result<Vec<CreditAssessment>> {
        records.iter().map(|r| self.predict(r)).collect()
    }

    /// Held-out R² of the stored model, clamped into `[MIN_CONFIDENCE, MAX_CONFIDENCE]`.
    ///
    /// This is the same value for every applicant, not a per-record estimate.
    pub fn confidence(&self) -> f64 {
        let r2 = self.bundle.metrics.r2;
        if r2.is_nan() {
            return MIN_CONFIDENCE;
        }
        r2.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }
}

/// Truncate a model output toward zero and clamp it into the credit score range.
/// A NaN output maps to the floor.
pub fn clamp_credit_score(raw: f64) -> u16 {
    if raw.is_nan() {
        return MIN_CREDIT_SCORE;
    }
    raw.trunc()
        .clamp(f64::from(MIN_CREDIT_SCORE), f64::from(MAX_CREDIT_SCORE)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_truncates_and_bounds() {
        assert_eq!(clamp_credit_score(712.9), 712);
        assert_eq!(clamp_credit_score(120.0), 300);
        assert_eq!(clamp_credit_score(1200.0), 850);
        assert_eq!(clamp_credit_score(f64::NAN), 300);
        assert_eq!(clamp_credit_score(f64::INFINITY), 850);
        assert_eq!(clamp_credit_score(f64::NEG_INFINITY), 300);
    }
}
