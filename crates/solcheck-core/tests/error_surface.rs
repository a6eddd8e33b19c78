use solcheck_core::errors::{ErrorInfo, SolcheckError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("field", "final_answer")
        .with_context("reason", "example")
}

#[test]
fn parse_error_surface() {
    let err = SolcheckError::Parse(sample_info("P001", "unbalanced bracket"));
    assert_eq!(err.code(), "P001");
    assert!(err.is_input_error());
    assert!(err.info().context.contains_key("field"));
}

#[test]
fn config_error_surface() {
    let err = SolcheckError::Config(sample_info("C001", "negative tolerance").with_hint("use 1e-6"));
    assert_eq!(err.info().hint.as_deref(), Some("use 1e-6"));
    let rendered = err.to_string();
    assert_eq!(
        rendered,
        "config error: [C001] negative tolerance (field=final_answer, reason=example); hint: use 1e-6"
    );
    assert!(!err.is_input_error());
}

#[test]
fn errors_round_trip_through_json() {
    let err = SolcheckError::Symbolic(sample_info("S001", "division by zero"));
    let json = serde_json::to_string(&err).unwrap();
    assert!(json.contains("\"family\":\"Symbolic\""));
    let back: SolcheckError = serde_json::from_str(&json).unwrap();
    assert_eq!(back, err);
}
