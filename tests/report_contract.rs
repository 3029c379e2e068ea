//! JSON shape of `SolveReport` under the `serde` feature.
#![cfg(feature = "serde")]

use puzzlematch::{MatchMethod, Parameter, SolveReport};
use serde_json::json;

#[test]
fn angle_report_serializes_flat() {
    let report = SolveReport {
        success: true,
        parameter: Some(Parameter::Angle(42.5)),
        confidence: 0.9,
        method: Some(MatchMethod::PolarDisc),
        error: None,
    };
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["success"], json!(true));
    // Untagged parameter: an angle is a bare number.
    assert_eq!(value["parameter"], json!(42.5));
    assert_eq!(value["method"], json!("polar_disc"));
    assert_eq!(value["error"], json!(null));
}

#[test]
fn offset_report_serializes_as_object() {
    let report = SolveReport {
        success: true,
        parameter: Some(Parameter::Offset { x: 120, y: 130 }),
        confidence: 0.8,
        method: Some(MatchMethod::Direct),
        error: None,
    };
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["parameter"], json!({ "x": 120, "y": 130 }));
    assert_eq!(value["method"], json!("direct"));
}

#[test]
fn failed_report_round_trips() {
    let report = SolveReport {
        success: false,
        parameter: Some(Parameter::Angle(0.0)),
        confidence: 0.0,
        method: None,
        error: Some("decode failed: empty input".to_string()),
    };
    let text = serde_json::to_string(&report).unwrap();
    let back: SolveReport = serde_json::from_str(&text).unwrap();
    assert!(!back.success);
    assert_eq!(back.parameter, Some(Parameter::Angle(0.0)));
    assert_eq!(back.error.as_deref(), Some("decode failed: empty input"));
}
