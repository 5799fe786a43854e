//! Feature engineering shared by training and inference.
//!
//! Turns a [`FarmerRecord`] into the fixed, ordered 26-column vector the
//! scaler and model expect:
//! - 17 raw numeric attributes
//! - 3 label-encoded categorical codes
//! - 6 derived composite features
//!
//! Encoders are fitted once per pipeline and reused afterwards. A category
//! the encoder has never seen maps to [`UNSEEN_CATEGORY_CODE`].

use crate::types::FarmerRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Number of columns in an engineered feature vector
pub const FEATURE_COUNT: usize = 26;

/// Code substituted for categories absent from a fitted encoder
pub const UNSEEN_CATEGORY_CODE: u32 = 0;

/// Column names in model order. The fitted scaler and model depend on this order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "land_area_acres",
    "ndvi_current",
    "ndvi_3month_avg",
    "soil_moisture",
    "crop_health_index",
    "rainfall_annual_mm",
    "avg_temperature_c",
    "weather_risk_score",
    "market_price_stability",
    "distance_to_market_km",
    "years_farming_experience",
    "avg_yield_last_3_years",
    "annual_income_inr",
    "existing_loans_count",
    "loan_repayment_history",
    "smartphone_usage",
    "modern_techniques_adoption",
    "state_encoded",
    "primary_crop_encoded",
    "irrigation_type_encoded",
    "land_productivity_score",
    "weather_resilience",
    "financial_stability",
    "experience_yield_ratio",
    "market_accessibility",
    "tech_adoption_score",
];

/// Categorical attributes that receive an integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalField {
    State,
    PrimaryCrop,
    IrrigationType,
}

/// Encoded fields in feature order
pub const CATEGORICAL_FIELDS: [CategoricalField; 3] = [
    CategoricalField::State,
    CategoricalField::PrimaryCrop,
    CategoricalField::IrrigationType,
];

impl CategoricalField {
    pub fn name(&self) -> &'static str {
        match self {
            CategoricalField::State => "state",
            CategoricalField::PrimaryCrop => "primary_crop",
            CategoricalField::IrrigationType => "irrigation_type",
        }
    }

    pub fn value<'a>(&self, record: &'a FarmerRecord) -> &'a str {
        match self {
            CategoricalField::State => &record.state,
            CategoricalField::PrimaryCrop => &record.primary_crop,
            CategoricalField::IrrigationType => &record.irrigation_type,
        }
    }
}

/// Label encoder: sorted distinct training values, code = index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Fit on the observed values
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(str::to_owned).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Code for a known category, `None` when the value was never seen
    pub fn lookup(&self, value: &str) -> Option<u32> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
            .map(|idx| idx as u32)
    }

    /// Code for a value, substituting [`UNSEEN_CATEGORY_CODE`] for unknown ones
    pub fn encode(&self, value: &str) -> u32 {
        self.lookup(value).unwrap_or(UNSEEN_CATEGORY_CODE)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Composite features computed from raw attributes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFeatures {
    pub land_productivity_score: f64,
    pub weather_resilience: f64,
    pub financial_stability: f64,
    pub experience_yield_ratio: f64,
    pub market_accessibility: f64,
    pub tech_adoption_score: f64,
}

impl DerivedFeatures {
    /// Missing land area propagates as NaN and is imputed by the scaler.
    pub fn from_record(record: &FarmerRecord) -> Self {
        let land_area = record.land_area_acres.unwrap_or(f64::NAN);
        Self {
            land_productivity_score: land_area * record.crop_health_index,
            weather_resilience: (record.rainfall_annual_mm / 1000.0)
                * (1.0 - record.weather_risk_score),
            financial_stability: record.annual_income_inr
                / (f64::from(record.existing_loans_count) + 1.0),
            experience_yield_ratio: f64::from(record.years_farming_experience)
                * record.avg_yield_last_3_years,
            market_accessibility: record.market_price_stability
                / (record.distance_to_market_km + 1.0),
            tech_adoption_score: 0.3 * f64::from(record.smartphone_usage)
                + 0.7 * record.modern_techniques_adoption,
        }
    }
}

/// Build the ordered feature vector for one record using fitted encoders.
///
/// Fields without an encoder, and values the encoder never saw, fall back to
/// [`UNSEEN_CATEGORY_CODE`].
pub fn feature_vector(
    encoders: &BTreeMap<String, CategoryEncoder>,
    record: &FarmerRecord,
) -> Vec<f64> {
    let mut row = Vec::with_capacity(FEATURE_COUNT);

    row.push(record.land_area_acres.unwrap_or(f64::NAN));
    row.push(record.ndvi_current);
    row.push(record.ndvi_3month_avg);
    row.push(record.soil_moisture);
    row.push(record.crop_health_index);
    row.push(record.rainfall_annual_mm);
    row.push(record.avg_temperature_c);
    row.push(record.weather_risk_score);
    row.push(record.market_price_stability);
    row.push(record.distance_to_market_km);
    row.push(f64::from(record.years_farming_experience));
    row.push(record.avg_yield_last_3_years);
    row.push(record.annual_income_inr);
    row.push(f64::from(record.existing_loans_count));
    row.push(record.loan_repayment_history);
    row.push(f64::from(record.smartphone_usage));
    row.push(record.modern_techniques_adoption);

    for field in CATEGORICAL_FIELDS {
        let value = field.value(record);
        let code = match encoders.get(field.name()).and_then(|enc| enc.lookup(value)) {
            Some(code) => code,
            None => {
                debug!(
                    field = field.name(),
                    value,
                    "unseen category, using fallback code {}",
                    UNSEEN_CATEGORY_CODE
                );
                UNSEEN_CATEGORY_CODE
            }
        };
        row.push(f64::from(code));
    }

    let derived = DerivedFeatures::from_record(record);
    row.push(derived.land_productivity_score);
    row.push(derived.weather_resilience);
    row.push(derived.financial_stability);
    row.push(derived.experience_yield_ratio);
    row.push(derived.market_accessibility);
    row.push(derived.tech_adoption_score);

    debug_assert_eq!(row.len(), FEATURE_COUNT);
    row
}

/// Stateful feature engineer owning the categorical encoders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureEngineer {
    encoders: BTreeMap<String, CategoryEncoder>,
}

impl FeatureEngineer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.encoders.is_empty()
    }

    /// Fit one encoder per categorical field, replacing any previous fit
    pub fn fit(&mut self, records: &[FarmerRecord]) {
        self.encoders = CATEGORICAL_FIELDS
            .iter()
            .map(|field| {
                let encoder = CategoryEncoder::fit(records.iter().map(|r| field.value(r)));
                (field.name().to_string(), encoder)
            })
            .collect();
    }

    /// Engineer a feature table. The first call fits the encoders; later
    /// calls reuse them.
    pub fn engineer(&mut self, records: &[FarmerRecord]) -> Vec<Vec<f64>> {
        if !self.is_fitted() {
            self.fit(records);
        }
        self.transform(records)
    }

    /// Engineer features with the current encoders, never refitting
    pub fn transform(&self, records: &[FarmerRecord]) -> Vec<Vec<f64>> {
        records
            .iter()
            .map(|record| feature_vector(&self.encoders, record))
            .collect()
    }

    pub fn encoders(&self) -> &BTreeMap<String, CategoryEncoder> {
        &self.encoders
    }

    pub fn into_encoders(self) -> BTreeMap<String, CategoryEncoder> {
        self.encoders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(state: &str, crop: &str, irrigation: &str) -> FarmerRecord {
        FarmerRecord {
            state: state.to_string(),
            land_area_acres: Some(3.5),
            primary_crop: crop.to_string(),
            irrigation_type: irrigation.to_string(),
            ndvi_current: 0.8,
            ndvi_3month_avg: 0.75,
            soil_moisture: 0.7,
            crop_health_index: 0.75,
            rainfall_annual_mm: 650.0,
            avg_temperature_c: 24.0,
            weather_risk_score: 0.2,
            market_price_stability: 0.8,
            distance_to_market_km: 12.0,
            years_farming_experience: 8,
            avg_yield_last_3_years: 7.5,
            annual_income_inr: 250_000.0,
            existing_loans_count: 1,
            loan_repayment_history: 0.95,
            smartphone_usage: 1,
            modern_techniques_adoption: 0.6,
            credit_score: None,
            risk_category: None,
            loan_eligibility_inr: None,
        }
    }

    #[test]
    fn encoder_assigns_sorted_codes() {
        let encoder = CategoryEncoder::fit(["wheat", "rice", "bajra", "rice"]);
        assert_eq!(encoder.classes(), &["bajra", "rice", "wheat"]);
        assert_eq!(encoder.lookup("bajra"), Some(0));
        assert_eq!(encoder.lookup("wheat"), Some(2));
    }

    #[test]
    fn unseen_category_is_distinguishable_from_code_zero() {
        let encoder = CategoryEncoder::fit(["Bihar", "Punjab"]);

        // "Bihar" legitimately encodes to 0 ...
        assert_eq!(encoder.lookup("Bihar"), Some(0));
        // ... while an unknown state has no code and only falls back to 0
        assert_eq!(encoder.lookup("Kerala"), None);
        assert_eq!(encoder.encode("Kerala"), UNSEEN_CATEGORY_CODE);
    }

    #[test]
    fn derived_features_follow_their_formulas() {
        let record = sample_record("Punjab", "wheat", "tube_well");
        let derived = DerivedFeatures::from_record(&record);

        assert!((derived.land_productivity_score - 3.5 * 0.75).abs() < 1e-12);
        assert!((derived.weather_resilience - 0.65 * 0.8).abs() < 1e-12);
        assert!((derived.financial_stability - 125_000.0).abs() < 1e-9);
        assert!((derived.experience_yield_ratio - 60.0).abs() < 1e-12);
        assert!((derived.market_accessibility - 0.8 / 13.0).abs() < 1e-12);
        assert!((derived.tech_adoption_score - (0.3 + 0.42)).abs() < 1e-12);
    }

    #[test]
    fn engineer_fits_once_then_reuses_encoders() {
        let training = vec![
            sample_record("Punjab", "wheat", "canal"),
            sample_record("Bihar", "rice", "drip"),
        ];
        let mut engineer = FeatureEngineer::new();
        let table = engineer.engineer(&training);

        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|row| row.len() == FEATURE_COUNT));
        assert_eq!(table[0][17], 1.0); // Punjab after Bihar
        assert_eq!(table[1][17], 0.0);

        // A later call must not refit on the new (unseen) category
        let later = vec![sample_record("Kerala", "wheat", "canal")];
        let row = &engineer.engineer(&later)[0];
        assert_eq!(row[17], f64::from(UNSEEN_CATEGORY_CODE));
        assert_eq!(engineer.encoders()["state"].classes(), &["Bihar", "Punjab"]);
    }

    #[test]
    fn feature_vector_matches_declared_order() {
        let record = sample_record("Punjab", "wheat", "tube_well");
        let mut engineer = FeatureEngineer::new();
        engineer.fit(std::slice::from_ref(&record));
        let row = feature_vector(engineer.encoders(), &record);

        let idx = |name: &str| FEATURE_NAMES.iter().position(|n| *n == name).unwrap();
        assert_eq!(row[idx("land_area_acres")], 3.5);
        assert_eq!(row[idx("annual_income_inr")], 250_000.0);
        assert_eq!(row[idx("financial_stability")], 125_000.0);
        assert_eq!(row[idx("irrigation_type_encoded")], 0.0);
    }

    #[test]
    fn missing_land_area_becomes_non_finite() {
        let mut record = sample_record("Punjab", "wheat", "canal");
        record.land_area_acres = None;
        let row = feature_vector(&BTreeMap::new(), &record);

        assert!(row[0].is_nan());
        assert!(row[20].is_nan());
        assert!(row[21].is_finite());
    }
}
