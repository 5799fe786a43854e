//! End-to-end behaviour of the credit pipeline: generate, train, score,
//! save and load.

use krishi_credit_core::{
    classify, CreditError, FarmerRecord, ModelKind, MAX_CONFIDENCE, MAX_CREDIT_SCORE,
    MIN_CREDIT_SCORE,
};
use krishi_credit_trainer::{generate, CreditPipeline, PipelineConfig};
use std::fs;
use tempfile::tempdir;

/// Default pipeline with fewer trees so the suite stays quick
fn quick_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.gradient_boosting.n_estimators = 40;
    config.random_forest.n_estimators = 12;
    config.extra_trees.n_estimators = 12;
    config
}

fn trained_pipeline() -> CreditPipeline {
    let records = generate(600, 42).expect("generate");
    let mut pipeline = CreditPipeline::new(quick_config());
    pipeline.train(&records).expect("train");
    pipeline
}

fn applicants() -> Vec<FarmerRecord> {
    generate(25, 2024)
        .expect("generate")
        .iter()
        .map(FarmerRecord::without_labels)
        .collect()
}

#[test]
fn generation_is_deterministic_under_a_fixed_seed() {
    let first = generate(1000, 42).unwrap();
    let second = generate(1000, 42).unwrap();
    assert_eq!(first.len(), 1000);
    assert_eq!(first, second);
}

#[test]
fn generated_labels_match_the_risk_table() {
    for record in generate(1000, 42).unwrap() {
        let score = record.credit_score.unwrap();
        assert!((MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&score));

        let (category, eligibility) = classify(score, record.land_area_acres.unwrap());
        assert_eq!(record.risk_category, Some(category));
        assert_eq!(record.loan_eligibility_inr, Some(eligibility));
    }
}

#[test]
fn untrained_pipeline_raises_not_trained() {
    let pipeline = CreditPipeline::new(PipelineConfig::default());
    let applicant = applicants().remove(0);

    assert!(matches!(pipeline.predict(&applicant), Err(CreditError::NotTrained)));
    assert!(matches!(pipeline.scorer(), Err(CreditError::NotTrained)));
}

#[test]
fn training_selects_a_model_and_scores_in_range() {
    let pipeline = trained_pipeline();
    let bundle = pipeline.bundle().unwrap();

    assert!(bundle.metrics.r2 > 0.5, "r2 = {}", bundle.metrics.r2);
    assert!(bundle.metrics.rmse > 0.0);
    assert!(matches!(
        bundle.metrics.model_type,
        ModelKind::GradientBoosting | ModelKind::RandomForest | ModelKind::ExtraTrees
    ));
    assert_eq!(bundle.model.kind, bundle.metrics.model_type);

    let importances = bundle.feature_importance.as_ref().unwrap();
    assert!(importances
        .windows(2)
        .all(|w| w[0].importance >= w[1].importance));

    for applicant in applicants() {
        let assessment = pipeline.predict(&applicant).unwrap();
        assert!((MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&assessment.credit_score));
        assert!(assessment.confidence > 0.0 && assessment.confidence <= MAX_CONFIDENCE);

        let expected = classify(assessment.credit_score, applicant.eligibility_land_area());
        assert_eq!(
            (assessment.risk_category, assessment.loan_eligibility_inr),
            expected
        );
    }
}

#[test]
fn unseen_categories_and_missing_land_area_degrade_gracefully() {
    let pipeline = trained_pipeline();
    let mut applicant = applicants().remove(0);
    applicant.state = "Kerala".to_string();
    applicant.primary_crop.clear();
    applicant.irrigation_type = "flood".to_string();
    applicant.land_area_acres = None;

    let assessment = pipeline.predict(&applicant).unwrap();
    assert!((MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&assessment.credit_score));
    assert_eq!(
        (assessment.risk_category, assessment.loan_eligibility_inr),
        classify(assessment.credit_score, 1.0)
    );
}

#[test]
fn training_is_reproducible() {
    let a = trained_pipeline();
    let b = trained_pipeline();
    assert_eq!(
        a.bundle().unwrap().fingerprint().unwrap(),
        b.bundle().unwrap().fingerprint().unwrap()
    );
}

#[test]
fn save_then_load_reproduces_predictions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("krishi_credit_model.bin");

    let original = trained_pipeline();
    original.save(&path).unwrap();

    let restored = CreditPipeline::from_artifact(PipelineConfig::default(), &path).unwrap();
    assert_eq!(restored.bundle(), original.bundle());

    let batch = applicants();
    assert_eq!(
        restored.predict_batch(&batch).unwrap(),
        original.predict_batch(&batch).unwrap()
    );
}

#[test]
fn failed_load_keeps_the_previous_bundle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.bin");

    let mut pipeline = trained_pipeline();
    let before = pipeline.bundle().unwrap().fingerprint().unwrap();
    let applicant = applicants().remove(3);
    let expected = pipeline.predict(&applicant).unwrap();

    pipeline.save(&path).unwrap();
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 17]).unwrap();

    assert!(pipeline.load(&path).is_err());
    assert!(pipeline.load(&dir.path().join("absent.bin")).is_err());

    assert_eq!(pipeline.bundle().unwrap().fingerprint().unwrap(), before);
    assert_eq!(pipeline.predict(&applicant).unwrap(), expected);
}

#[test]
fn too_few_records_is_invalid_input() {
    let records = generate(30, 42).unwrap();
    let mut pipeline = CreditPipeline::new(quick_config());
    assert!(matches!(
        pipeline.train(&records),
        Err(CreditError::InvalidInput(_))
    ));
}
