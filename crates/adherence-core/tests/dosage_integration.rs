//! Integration tests for dosage constraint validation.
//!
//! Medications are decoded from JSON records the way the persistence layer
//! hands them over, then checked against dose logs.

use adherence_core::{
    ConstraintKind, CoreError, DosageConstraint, DosageConstraintValidator, DoseEvent, EngineConfig,
    Medication,
};
use chrono::{DateTime, Duration, Utc};

fn parse(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
}

fn ibuprofen() -> Medication {
    serde_json::from_str(
        r#"{
            "id": "ibuprofen",
            "name": "Ibuprofen",
            "constraints": [
                { "type": "min_time_between_doses", "minutes": 480 },
                { "type": "max_count_per_period", "count": 3, "period_minutes": 1440 },
                { "type": "max_cumulative_amount_per_period", "amount": 1000, "unit": "mg", "period_minutes": 1440 },
                { "type": "custom", "parameters": { "with_food": true }, "description": "Take with food" }
            ]
        }"#,
    )
    .unwrap()
}

#[test]
fn test_min_time_between_doses_boundary() {
    let validator = DosageConstraintValidator::new();
    let constraints = vec![DosageConstraint::min_time_between_doses(Duration::hours(8)).unwrap()];
    let t = parse("2024-05-01T06:00:00Z");
    let log = vec![DoseEvent::at(t)];

    let refused = validator.check_dose(&constraints, &log, t + Duration::minutes(7 * 60 + 59), None);
    assert!(!refused.permitted);
    assert_eq!(refused.next_permitted_time, Some(t + Duration::hours(8)));

    let permitted = validator.check_dose(&constraints, &log, t + Duration::hours(8), None);
    assert!(permitted.permitted);
    assert_eq!(permitted.violated_constraint, None);
}

#[test]
fn test_max_count_ages_out() {
    let validator = DosageConstraintValidator::new();
    let constraints = vec![DosageConstraint::max_count_per_period(3, Duration::hours(24)).unwrap()];
    let log = vec![
        DoseEvent::at(parse("2024-05-01T08:00:00Z")),
        DoseEvent::at(parse("2024-05-01T14:00:00Z")),
        DoseEvent::at(parse("2024-05-01T20:00:00Z")),
    ];

    let refused = validator.check_dose(&constraints, &log, parse("2024-05-02T02:00:00Z"), None);
    assert!(!refused.permitted);
    let next = refused.next_permitted_time.unwrap();
    assert_eq!(next, parse("2024-05-02T08:00:00Z"));

    // The oldest dose still counts at exactly one period old
    assert!(!validator.check_dose(&constraints, &log, next, None).permitted);

    let permitted = validator.check_dose(&constraints, &log, next + Duration::seconds(1), None);
    assert!(permitted.permitted);
}

#[test]
fn test_cumulative_cap_scenario() {
    let validator = DosageConstraintValidator::new();
    let constraints = vec![
        DosageConstraint::max_cumulative_amount_per_period(1000.0, "mg", Duration::hours(24)).unwrap(),
    ];
    let log = vec![DoseEvent::with_amount(parse("2024-05-01T08:00:00Z"), 800.0, "mg")];
    let proposal = parse("2024-05-01T20:00:00Z");

    let refused = validator.check_dose(&constraints, &log, proposal, Some(300.0));
    assert!(!refused.permitted);
    assert!(refused.next_permitted_time.is_none());
    assert!(refused.reason.is_some());

    assert!(validator.check_dose(&constraints, &log, proposal, Some(200.0)).permitted);
}

#[test]
fn test_medication_reports_first_violation() {
    let validator = DosageConstraintValidator::new();
    let medication = ibuprofen();
    let log = vec![
        DoseEvent::with_amount(parse("2024-05-01T00:00:00Z"), 400.0, "mg"),
        DoseEvent::with_amount(parse("2024-05-01T08:00:00Z"), 400.0, "mg"),
    ];

    // Both the interval and the cumulative cap fail; the interval is listed first
    let result = validator.check_medication(&medication, &log, parse("2024-05-01T10:00:00Z"), Some(400.0));
    assert!(!result.permitted);
    assert!(matches!(
        result.violated_constraint.as_ref().map(|c| c.kind()),
        Some(ConstraintKind::MinTimeBetweenDoses { .. })
    ));

    // Interval satisfied, cumulative cap still fails
    let result = validator.check_medication(&medication, &log, parse("2024-05-01T16:00:00Z"), Some(400.0));
    assert!(!result.permitted);
    assert!(matches!(
        result.violated_constraint.as_ref().map(|c| c.kind()),
        Some(ConstraintKind::MaxCumulativeAmountPerPeriod { .. })
    ));

    // A smaller dose fits
    let result = validator.check_medication(&medication, &log, parse("2024-05-01T16:00:00Z"), Some(200.0));
    assert!(result.permitted);
}

#[test]
fn test_custom_advisory_surfaces_reason() {
    let validator = DosageConstraintValidator::new();
    let medication = ibuprofen();

    let result = validator.check_dose_with(
        &medication.constraints,
        &[],
        parse("2024-05-01T08:00:00Z"),
        Some(200.0),
        |params| params.contains_key("with_food"),
    );

    assert!(result.permitted);
    assert_eq!(result.reason.as_deref(), Some("Take with food"));
}

#[test]
fn test_active_window_with_configured_offset() {
    let config = EngineConfig::from_toml_str("[dosage]\nutc_offset_minutes = 540\n").unwrap();
    let validator = config.dosage_validator().unwrap();
    let medication: Medication = serde_json::from_str(
        r#"{
            "id": "melatonin",
            "name": "Melatonin",
            "constraints": [ { "type": "active_time_window", "start": "21:00", "end": "02:00" } ]
        }"#,
    )
    .unwrap();

    // 13:30 UTC is 22:30 at UTC+9
    let evening = parse("2024-05-01T13:30:00Z");
    assert!(validator.check_medication(&medication, &[], evening, None).permitted);

    // 03:00 UTC is 12:00 at UTC+9; window opens at 21:00 local = 12:00 UTC
    let midday = parse("2024-05-01T03:00:00Z");
    let refused = validator.check_medication(&medication, &[], midday, None);
    assert!(!refused.permitted);
    assert_eq!(refused.next_permitted_time, Some(parse("2024-05-01T12:00:00Z")));
}

#[test]
fn test_invalid_record_rejected_at_decode() {
    let result: Result<Medication, _> = serde_json::from_str(
        r#"{
            "id": "bad",
            "name": "Bad",
            "constraints": [ { "type": "max_count_per_period", "count": 0, "period_minutes": 60 } ]
        }"#,
    );
    let err = CoreError::from(result.unwrap_err());
    assert!(err.to_string().contains("count"));
}

#[test]
fn test_check_result_serializes_for_presentation() {
    let validator = DosageConstraintValidator::new();
    let constraints = vec![DosageConstraint::min_time_between_doses(Duration::hours(4)).unwrap()];
    let log = vec![DoseEvent::at(parse("2024-05-01T08:00:00Z"))];

    let result = validator.check_dose(&constraints, &log, parse("2024-05-01T09:00:00Z"), None);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["permitted"], false);
    assert_eq!(json["violated_constraint"]["type"], "min_time_between_doses");
    assert_eq!(json["violated_constraint"]["minutes"], 240);
    assert_eq!(json["next_permitted_time"], "2024-05-01T12:00:00Z");
}

#[test]
fn test_engine_types_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DosageConstraintValidator>();
    assert_send_sync::<Medication>();
    assert_send_sync::<adherence_core::StreakCalculator>();
    assert_send_sync::<adherence_core::SummaryRegenerationPolicy>();

    let validator = &DosageConstraintValidator::new();
    let medication = &ibuprofen();
    let log = &vec![DoseEvent::with_amount(parse("2024-05-01T08:00:00Z"), 400.0, "mg")];
    let proposal = parse("2024-05-01T20:00:00Z");

    let results: Vec<bool> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(move || {
                    validator
                        .check_medication(medication, log, proposal, Some(400.0))
                        .permitted
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().all(|p| *p));
}
