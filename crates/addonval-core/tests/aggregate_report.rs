//! Cross-run aggregation over hand-built run results.

use addonval_core::aggregate::report::{SECTION_ANALYSIS, SECTION_DISTRIBUTION};
use addonval_core::model::UnitConfig;
use addonval_core::{
    aggregate, AggregateReport, Confidence, ErrorType, MissingInput, OfferingIdentity, RunResult,
    ValidationResult,
};

fn dep(name: &str, enabled: bool) -> UnitConfig {
    UnitConfig {
        offering_name: name.to_string(),
        enabled: Some(enabled),
        ..UnitConfig::default()
    }
}

fn run_disabling(name: &str, disabled: &[&str], missing: &[(&str, &str)]) -> RunResult {
    let config = UnitConfig {
        offering_name: "cloud-logs".to_string(),
        offering_flavor: "standard".to_string(),
        dependencies: disabled.iter().map(|d| dep(d, false)).collect(),
        ..UnitConfig::default()
    };
    let mut run = RunResult::new(name, format!("av-{name}"), config);
    let mut validation = ValidationResult::default();
    validation.finalize();
    let inputs: Vec<MissingInput> = missing
        .iter()
        .map(|(offering, input)| MissingInput {
            config_name: "logs-cfg".to_string(),
            offering_name: offering.to_string(),
            input_name: input.to_string(),
        })
        .collect();
    validation.record_missing_inputs(&inputs);
    run.passed = validation.is_valid;
    run.validation_result = Some(validation);
    run
}

#[test]
fn shared_disabled_dependency_is_high_confidence_root_cause() {
    let runs = vec![
        run_disabling("r1", &["cos"], &[("cloud-logs", "cos_crn")]),
        run_disabling("r2", &["cos", "kms"], &[("cloud-logs", "cos_crn")]),
        run_disabling("r3", &["cos", "en"], &[("cloud-logs", "cos_crn")]),
    ];
    let report = AggregateReport::from_results(runs);
    let analysis = aggregate(&report);

    assert_eq!(analysis.root_cause_patterns.len(), 1);
    let pattern = &analysis.root_cause_patterns[0];
    assert_eq!(pattern.offering_name, "cloud-logs");
    assert_eq!(pattern.input_name, "cos_crn");
    assert_eq!(pattern.count, 3);
    assert_eq!(pattern.confidence, Confidence::High);
    assert!(pattern.suspected_root_cause.as_deref().unwrap().contains("cos"));

    assert_eq!(analysis.action_items.len(), 1);
    assert!(analysis.action_items[0].contains("3 runs"));
    assert!(analysis.completeness.is_complete());
}

#[test]
fn ambiguous_intersection_uses_name_correlation() {
    let runs = vec![
        run_disabling("r1", &["cos", "kms"], &[("cloud-logs", "kms_crn")]),
        run_disabling("r2", &["cos", "kms"], &[("cloud-logs", "kms_crn")]),
        run_disabling("r3", &["cos", "kms"], &[("cloud-logs", "region")]),
    ];
    let analysis = aggregate(&AggregateReport::from_results(runs));

    let kms = analysis
        .root_cause_patterns
        .iter()
        .find(|p| p.input_name == "kms_crn")
        .unwrap();
    assert_eq!(kms.suspected_root_cause.as_deref(), Some("kms"));
    assert_eq!(kms.confidence, Confidence::High);

    let region = analysis
        .root_cause_patterns
        .iter()
        .find(|p| p.input_name == "region")
        .unwrap();
    assert_eq!(region.suspected_root_cause, None);
    assert_eq!(region.confidence, Confidence::Unknown);
    assert_eq!(region.common_disabled, vec!["cos".to_string(), "kms".to_string()]);
}

#[test]
fn validation_patterns_are_counted_and_sorted() {
    let cos = OfferingIdentity::new("cos", "1.2.0", "standard");
    let en = OfferingIdentity::new("en", "1.0.0", "standard");
    let make = |name: &str, missing: Vec<OfferingIdentity>, cycle: bool| {
        let mut run = RunResult::new(name, format!("av-{name}"), UnitConfig::default());
        let mut v = ValidationResult::default();
        v.missing_configs = missing;
        if cycle {
            v.configuration_errors
                .push("circular dependency detected: a -> b -> a".to_string());
        }
        v.finalize();
        run.validation_result = Some(v);
        run
    };
    let runs = vec![
        make("r1", vec![cos.clone()], false),
        make("r2", vec![cos.clone(), en.clone()], true),
        make("r3", vec![cos.clone()], false),
    ];
    let analysis = aggregate(&AggregateReport::from_results(runs));

    let patterns = &analysis.validation_patterns;
    assert_eq!(patterns[0].error_type, ErrorType::MissingConfig);
    assert_eq!(patterns[0].pattern, cos.composite_key());
    assert_eq!(patterns[0].count, 3);
    assert!(patterns
        .iter()
        .any(|p| p.error_type == ErrorType::CircularDependency && p.pattern == "a -> b -> a"));
    assert!(analysis
        .action_items
        .iter()
        .any(|a| a.contains("circular dependency a -> b -> a")));
}

#[test]
fn rendered_report_lists_failures_and_distribution() {
    let mut ok = RunResult::new("default", "av-default", UnitConfig::default());
    ok.passed = true;
    let runs = vec![
        ok,
        run_disabling("r1", &["cos"], &[("cloud-logs", "cos_crn")]),
    ];
    let report = AggregateReport::from_results(runs);
    let analysis = aggregate(&report);
    let text = addonval_core::aggregate::render_batch_report(&report, &analysis);

    assert!(text.contains("FAILED: r1"));
    assert!(text.contains("logs-cfg (cloud-logs): cos_crn"));
    let distribution = text.find(SECTION_DISTRIBUTION).unwrap();
    let analysis_at = text.find(SECTION_ANALYSIS).unwrap();
    assert!(text[distribution..analysis_at].contains("input validation"));
    assert!(text[analysis_at..].contains("suspected root cause: 'cos' disabled (HIGH)"));
}
