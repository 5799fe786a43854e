//! Synthetic farmer record generator
//!
//! Draws borrower attributes from fixed per-field distributions and labels
//! each record with a credit score composed from ten bounded components plus
//! Gaussian noise. The risk tier and eligibility come from the same
//! [`classify`] table the predictor uses.
//!
//! All draws come from one seeded [`StdRng`] in a fixed order, so the same
//! seed always yields the same table.

use krishi_credit_core::{clamp_credit_score, classify, CreditError, FarmerRecord, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution, Exp, Gamma, LogNormal, Normal};
use std::fmt::Display;
use tracing::debug;

/// Agro-climatic profile of a state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionProfile {
    pub state: &'static str,
    pub rainfall_mm: f64,
    pub temperature_c: f64,
    /// Soil fertility in [0, 1]
    pub fertility: f64,
}

pub const REGIONS: [RegionProfile; 10] = [
    region("Punjab", 650.0, 24.0, 0.85),
    region("Haryana", 600.0, 25.0, 0.82),
    region("Uttar Pradesh", 1000.0, 26.0, 0.75),
    region("Bihar", 1200.0, 26.0, 0.70),
    region("West Bengal", 1500.0, 27.0, 0.78),
    region("Maharashtra", 1100.0, 27.0, 0.72),
    region("Karnataka", 1200.0, 25.0, 0.74),
    region("Tamil Nadu", 950.0, 28.0, 0.76),
    region("Andhra Pradesh", 950.0, 28.0, 0.73),
    region("Rajasthan", 550.0, 27.0, 0.65),
];

const fn region(
    state: &'static str,
    rainfall_mm: f64,
    temperature_c: f64,
    fertility: f64,
) -> RegionProfile {
    RegionProfile {
        state,
        rainfall_mm,
        temperature_c,
        fertility,
    }
}

pub const CROPS: [&str; 8] = [
    "wheat",
    "rice",
    "cotton",
    "sugarcane",
    "maize",
    "soybean",
    "mustard",
    "bajra",
];

pub const IRRIGATION_TYPES: [&str; 5] = ["canal", "tube_well", "rain_fed", "drip", "sprinkler"];

/// Existing loan counts drawn uniformly (most farmers carry none)
const LOAN_COUNTS: [u32; 6] = [0, 0, 0, 1, 1, 2];

/// Score bonus for an irrigation type; unknown types earn nothing
pub fn irrigation_bonus(irrigation_type: &str) -> f64 {
    match irrigation_type {
        "drip" => 40.0,
        "sprinkler" => 35.0,
        "tube_well" => 25.0,
        "canal" => 20.0,
        _ => 0.0,
    }
}

/// The ten weighted parts of a synthetic credit score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreComponents {
    pub crop_health: f64,
    pub land_productivity: f64,
    pub weather_resilience: f64,
    pub market_access: f64,
    pub experience: f64,
    pub financial_stability: f64,
    pub repayment_history: f64,
    pub tech_adoption: f64,
    pub geographic_advantage: f64,
    pub irrigation_bonus: f64,
}

/// Inputs to [`ScoreComponents::compute`], taken before output rounding
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub crop_health_index: f64,
    pub land_area_acres: f64,
    pub weather_risk_score: f64,
    pub distance_to_market_km: f64,
    pub years_farming_experience: u32,
    pub annual_income_inr: f64,
    pub loan_repayment_history: f64,
    pub smartphone_usage: u8,
    pub modern_techniques_adoption: f64,
    pub fertility: f64,
    pub irrigation_type: &'a str,
}

impl ScoreComponents {
    pub fn compute(inputs: &ScoreInputs<'_>) -> Self {
        Self {
            crop_health: inputs.crop_health_index * 150.0,
            land_productivity: (inputs.land_area_acres * 10.0).min(100.0),
            weather_resilience: (1.0 - inputs.weather_risk_score) * 100.0,
            market_access: (50.0 / (inputs.distance_to_market_km + 1.0)).min(50.0),
            experience: (f64::from(inputs.years_farming_experience) * 5.0).min(50.0),
            financial_stability: inputs.annual_income_inr / 100_000.0 * 50.0,
            repayment_history: inputs.loan_repayment_history * 100.0,
            tech_adoption: (0.3 * f64::from(inputs.smartphone_usage)
                + 0.7 * inputs.modern_techniques_adoption)
                * 50.0,
            geographic_advantage: inputs.fertility * 100.0,
            irrigation_bonus: irrigation_bonus(inputs.irrigation_type),
        }
    }

    pub fn total(&self) -> f64 {
        self.crop_health
            + self.land_productivity
            + self.weather_resilience
            + self.market_access
            + self.experience
            + self.financial_stability
            + self.repayment_history
            + self.tech_adoption
            + self.geographic_advantage
            + self.irrigation_bonus
    }
}

/// Map a raw component total (nominally 0..1000) linearly onto [300, 850],
/// truncating to an integer
pub fn scale_to_credit_score(raw: f64) -> u16 {
    clamp_credit_score(300.0 + raw / 1000.0 * 550.0)
}

struct Distributions {
    land_area: LogNormal<f64>,
    ndvi: Beta<f64>,
    ndvi_drift: Normal<f64>,
    soil_moisture: Beta<f64>,
    health_noise: Normal<f64>,
    rainfall_noise: Normal<f64>,
    temperature_noise: Normal<f64>,
    weather_risk: Beta<f64>,
    price_stability: Beta<f64>,
    distance: Exp<f64>,
    experience: Exp<f64>,
    yield_per_acre: Gamma<f64>,
    repayment: Beta<f64>,
    modern_techniques: Beta<f64>,
    score_noise: Normal<f64>,
}

fn dist<T, E: Display>(result: std::result::Result<T, E>, name: &str) -> Result<T> {
    result.map_err(|e| CreditError::Internal(format!("invalid {name} distribution: {e}")))
}

impl Distributions {
    fn new() -> Result<Self> {
        Ok(Self {
            land_area: dist(LogNormal::new(0.8, 0.6), "land area")?,
            ndvi: dist(Beta::new(6.0, 2.0), "ndvi")?,
            ndvi_drift: dist(Normal::new(0.0, 0.05), "ndvi drift")?,
            soil_moisture: dist(Beta::new(4.0, 3.0), "soil moisture")?,
            health_noise: dist(Normal::new(0.0, 0.1), "crop health noise")?,
            rainfall_noise: dist(Normal::new(0.0, 100.0), "rainfall noise")?,
            temperature_noise: dist(Normal::new(0.0, 2.0), "temperature noise")?,
            weather_risk: dist(Beta::new(3.0, 7.0), "weather risk")?,
            price_stability: dist(Beta::new(5.0, 3.0), "price stability")?,
            distance: dist(Exp::new(1.0 / 15.0), "market distance")?,
            experience: dist(Exp::new(1.0 / 8.0), "experience")?,
            yield_per_acre: dist(Gamma::new(2.0, 2.0), "yield")?,
            repayment: dist(Beta::new(8.0, 2.0), "repayment")?,
            modern_techniques: dist(Beta::new(3.0, 4.0), "modern techniques")?,
            score_noise: dist(Normal::new(0.0, 30.0), "score noise")?,
        })
    }
}

/// Seeded generator of labelled farmer records
pub struct SyntheticGenerator {
    rng: StdRng,
    dists: Distributions,
}

impl SyntheticGenerator {
    pub fn new(seed: u64) -> Result<Self> {
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            dists: Distributions::new()?,
        })
    }

    /// Generate `n` records, continuing this generator's stream
    pub fn generate(&mut self, n: usize) -> Result<Vec<FarmerRecord>> {
        if n == 0 {
            return Err(CreditError::InvalidInput(
                "cannot generate an empty data set".into(),
            ));
        }
        let records: Vec<FarmerRecord> = (0..n).map(|_| self.next_record()).collect();
        debug!(rows = records.len(), "generated synthetic records");
        Ok(records)
    }

    /// Draw one labelled record
    pub fn next_record(&mut self) -> FarmerRecord {
        let rng = &mut self.rng;
        let d = &self.dists;

        let region = REGIONS[rng.gen_range(0..REGIONS.len())];
        let land_area = round_to(d.land_area.sample(rng), 2).clamp(0.1, 50.0);
        let crop = CROPS[rng.gen_range(0..CROPS.len())];
        let irrigation = IRRIGATION_TYPES[rng.gen_range(0..IRRIGATION_TYPES.len())];

        let ndvi = d.ndvi.sample(rng);
        let ndvi_3month = (ndvi + d.ndvi_drift.sample(rng)).clamp(0.0, 1.0);
        let soil_moisture = d.soil_moisture.sample(rng);
        let crop_health = ((ndvi + soil_moisture) / 2.0 + d.health_noise.sample(rng)).clamp(0.0, 1.0);

        let rainfall = (region.rainfall_mm + d.rainfall_noise.sample(rng)).clamp(200.0, 3000.0);
        let temperature = region.temperature_c + d.temperature_noise.sample(rng);
        let weather_risk = d.weather_risk.sample(rng);

        let price_stability = d.price_stability.sample(rng);
        let distance = d.distance.sample(rng).min(200.0);

        let years = (d.experience.sample(rng).trunc() as u32).max(1);
        let avg_yield = d.yield_per_acre.sample(rng) * land_area;

        let income = avg_yield * rng.gen_range(15_000.0..45_000.0);
        let loans = LOAN_COUNTS[rng.gen_range(0..LOAN_COUNTS.len())];
        let repayment = if loans > 0 {
            d.repayment.sample(rng)
        } else {
            1.0
        };

        let smartphone: u8 = rng.gen_range(0..=1);
        let modern = d.modern_techniques.sample(rng);

        let components = ScoreComponents::compute(&ScoreInputs {
            crop_health_index: crop_health,
            land_area_acres: land_area,
            weather_risk_score: weather_risk,
            distance_to_market_km: distance,
            years_farming_experience: years,
            annual_income_inr: income,
            loan_repayment_history: repayment,
            smartphone_usage: smartphone,
            modern_techniques_adoption: modern,
            fertility: region.fertility,
            irrigation_type: irrigation,
        });
        let credit_score = scale_to_credit_score(components.total() + d.score_noise.sample(rng));
        let (risk_category, loan_eligibility_inr) = classify(credit_score, land_area);

        FarmerRecord {
            state: region.state.to_string(),
            land_area_acres: Some(land_area),
            primary_crop: crop.to_string(),
            irrigation_type: irrigation.to_string(),
            ndvi_current: round_to(ndvi, 3),
            ndvi_3month_avg: round_to(ndvi_3month, 3),
            soil_moisture: round_to(soil_moisture, 3),
            crop_health_index: round_to(crop_health, 3),
            rainfall_annual_mm: rainfall.trunc(),
            avg_temperature_c: round_to(temperature, 1),
            weather_risk_score: round_to(weather_risk, 3),
            market_price_stability: round_to(price_stability, 3),
            distance_to_market_km: round_to(distance, 1),
            years_farming_experience: years,
            avg_yield_last_3_years: round_to(avg_yield, 2),
            annual_income_inr: income.trunc(),
            existing_loans_count: loans,
            loan_repayment_history: round_to(repayment, 3),
            smartphone_usage: smartphone,
            modern_techniques_adoption: round_to(modern, 3),
            credit_score: Some(credit_score),
            risk_category: Some(risk_category),
            loan_eligibility_inr: Some(loan_eligibility_inr),
        }
    }
}

/// Generate `n` labelled records from a fresh generator seeded with `seed`
pub fn generate(n: usize, seed: u64) -> Result<Vec<FarmerRecord>> {
    SyntheticGenerator::new(seed)?.generate(n)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishi_credit_core::RiskCategory;

    #[test]
    fn same_seed_same_table() {
        let a = generate(200, 42).unwrap();
        let b = generate(200, 42).unwrap();
        assert_eq!(a, b);

        let c = generate(200, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn zero_rows_is_invalid() {
        assert!(matches!(generate(0, 1), Err(CreditError::InvalidInput(_))));
    }

    #[test]
    fn fields_stay_within_documented_ranges() {
        for r in generate(500, 7).unwrap() {
            let land = r.land_area_acres.unwrap();
            assert!((0.1..=50.0).contains(&land));
            assert!(REGIONS.iter().any(|p| p.state == r.state));
            assert!(CROPS.contains(&r.primary_crop.as_str()));
            assert!(IRRIGATION_TYPES.contains(&r.irrigation_type.as_str()));

            for unit in [
                r.ndvi_current,
                r.ndvi_3month_avg,
                r.soil_moisture,
                r.crop_health_index,
                r.weather_risk_score,
                r.market_price_stability,
                r.loan_repayment_history,
                r.modern_techniques_adoption,
            ] {
                assert!((0.0..=1.0).contains(&unit));
            }

            assert!((200.0..=3000.0).contains(&r.rainfall_annual_mm));
            assert!((0.0..=200.0).contains(&r.distance_to_market_km));
            assert!(r.years_farming_experience >= 1);
            assert!(r.existing_loans_count <= 2);
            assert!(r.smartphone_usage <= 1);
            if r.existing_loans_count == 0 {
                assert_eq!(r.loan_repayment_history, 1.0);
            }
        }
    }

    #[test]
    fn labels_agree_with_the_risk_table() {
        for r in generate(1000, 42).unwrap() {
            let score = r.credit_score.unwrap();
            assert!((300..=850).contains(&score));

            let (category, eligibility) = classify(score, r.land_area_acres.unwrap());
            assert_eq!(r.risk_category, Some(category));
            assert_eq!(r.loan_eligibility_inr, Some(eligibility));
        }
    }

    #[test]
    fn scores_are_spread_over_several_tiers() {
        let records = generate(1000, 42).unwrap();
        let tiers: std::collections::BTreeSet<RiskCategory> =
            records.iter().filter_map(|r| r.risk_category).collect();
        assert!(tiers.len() >= 2);

        let first = records[0].credit_score;
        assert!(records.iter().any(|r| r.credit_score != first));
    }

    #[test]
    fn components_follow_their_caps() {
        let inputs = ScoreInputs {
            crop_health_index: 0.8,
            land_area_acres: 25.0,
            weather_risk_score: 0.25,
            distance_to_market_km: 0.0,
            years_farming_experience: 30,
            annual_income_inr: 200_000.0,
            loan_repayment_history: 0.9,
            smartphone_usage: 1,
            modern_techniques_adoption: 0.5,
            fertility: 0.85,
            irrigation_type: "drip",
        };
        let c = ScoreComponents::compute(&inputs);

        assert!((c.crop_health - 120.0).abs() < 1e-9);
        assert_eq!(c.land_productivity, 100.0);
        assert!((c.weather_resilience - 75.0).abs() < 1e-9);
        assert_eq!(c.market_access, 50.0);
        assert_eq!(c.experience, 50.0);
        assert!((c.financial_stability - 100.0).abs() < 1e-9);
        assert!((c.repayment_history - 90.0).abs() < 1e-9);
        assert!((c.tech_adoption - 32.5).abs() < 1e-9);
        assert!((c.geographic_advantage - 85.0).abs() < 1e-9);
        assert_eq!(c.irrigation_bonus, 40.0);
    }

    #[test]
    fn scaling_truncates_and_clamps() {
        assert_eq!(scale_to_credit_score(0.0), 300);
        assert_eq!(scale_to_credit_score(500.0), 575);
        assert_eq!(scale_to_credit_score(501.0), 575); // 575.55 truncates
        assert_eq!(scale_to_credit_score(-200.0), 300);
        assert_eq!(scale_to_credit_score(1500.0), 850);
        assert_eq!(irrigation_bonus("rain_fed"), 0.0);
        assert_eq!(irrigation_bonus("flood"), 0.0);
    }
}
