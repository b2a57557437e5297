use chrono::{TimeZone, Utc};
use mshield_domain::{
    AnalysisResult, EmailMessage, RiskFactors, Severity, SubScores, ThreatLogEntry, ThreatStatus,
    ThreatType,
};
use serde_json::json;
use std::str::FromStr;

#[test]
fn risk_factors_serialize_as_stable_names() {
    let factors = RiskFactors::EXTERNAL_LINKS | RiskFactors::URGENT_LANGUAGE;

    let value = serde_json::to_value(factors).expect("serialize");
    assert_eq!(value, json!(["urgent_language", "external_links"]));

    let back: RiskFactors = serde_json::from_value(value).expect("deserialize");
    assert_eq!(back, factors);
    assert_eq!(factors.to_string(), "urgent_language, external_links");
}

#[test]
fn unknown_risk_factor_is_rejected() {
    let result = serde_json::from_value::<RiskFactors>(json!(["urgent_language", "bogus"]));
    assert!(result.is_err());
}

#[test]
fn wire_names_differ_from_constant_names() {
    assert_eq!(RiskFactors::from_wire_name("urgent_language"), Some(RiskFactors::URGENT_LANGUAGE));
    assert_eq!(RiskFactors::from_wire_name("URGENT_LANGUAGE"), None);
    assert_eq!(RiskFactors::from_name("URGENT_LANGUAGE"), Some(RiskFactors::URGENT_LANGUAGE));

    let err = serde_json::from_value::<RiskFactors>(json!(["bogus"])).expect_err("unknown name");
    assert!(err.to_string().contains("bogus"), "{err}");
}

#[test]
fn risk_factor_labels_are_human_readable() {
    let labels: Vec<_> = RiskFactors::PERSONAL_INFO_REQUEST.labels().collect();
    assert_eq!(labels, ["Requests personal information"]);
    assert_eq!(RiskFactors::empty().names().count(), 0);
}

#[test]
fn severity_is_ordered() {
    assert!(Severity::Critical > Severity::High);
    assert!(Severity::Medium > Severity::Low);
    assert_eq!(Severity::from_str("High").ok(), Some(Severity::High));
}

#[test]
fn threat_log_record_follows_field_order() {
    let entry = ThreatLogEntry {
        id: "TL-abc".to_owned(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid timestamp"),
        sender: "phisher@bad.example".to_owned(),
        threat_type: ThreatType::Phishing,
        severity: Severity::Low,
        status: ThreatStatus::Quarantined,
        confidence: 27.857,
    };

    assert_eq!(ThreatLogEntry::FIELDS[3], "type");
    assert_eq!(
        entry.record(),
        [
            "TL-abc",
            "2024-05-01T12:00:00.000Z",
            "phisher@bad.example",
            "Phishing",
            "Low",
            "Quarantined",
            "27.9",
        ]
    );

    let value = serde_json::to_value(&entry).expect("serialize");
    assert_eq!(value["type"], "Phishing");
    assert_eq!(value["status"], "Quarantined");
}

#[test]
fn analysis_result_uses_camel_case() {
    let result = AnalysisResult {
        is_phishing: false,
        confidence: 95.0,
        risk_factors: RiskFactors::empty(),
        sub_scores: SubScores {
            url_safety: 100.0,
            content_analysis: 100.0,
            sender_reputation: 95.0,
            overall: 98.5,
        },
    };

    let value = serde_json::to_value(&result).expect("serialize");
    assert_eq!(value["isPhishing"], false);
    assert_eq!(value["subScores"]["urlSafety"], 100.0);
    assert_eq!(value["riskFactors"], json!([]));
}

#[test]
fn blank_messages_are_detected() {
    assert!(EmailMessage::new("a@b.c", "  ", "\n").is_blank());
    assert!(!EmailMessage::new("a@b.c", "Hi", "").is_blank());
}
