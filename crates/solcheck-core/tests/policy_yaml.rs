use solcheck_core::{Policy, SolcheckError};

#[test]
fn empty_yaml_yields_defaults() -> Result<(), SolcheckError> {
    let policy = Policy::from_yaml_slice(b"{}")?;
    assert_eq!(policy, Policy::default());
    assert_eq!(policy.limit_eps, vec![1e-2, 1e-3, 1e-4]);
    assert_eq!(policy.min_statement_chars, 40);
    Ok(())
}

#[test]
fn partial_yaml_overrides_selected_fields() -> Result<(), SolcheckError> {
    let policy = Policy::from_yaml_slice(b"seed: 99\nx_tol: 0.01\nlocal_search_iterations: 10\n")?;
    assert_eq!(policy.seed, 99);
    assert_eq!(policy.x_tol, 0.01);
    assert_eq!(policy.local_search_iterations, 10);
    assert_eq!(policy.f_tol, Policy::default().f_tol);
    Ok(())
}

#[test]
fn non_positive_tolerance_is_rejected() {
    let err = Policy::from_yaml_slice(b"root_tol: -1.0\n").unwrap_err();
    assert_eq!(err.info().code, "policy_tolerance");
    assert_eq!(err.info().context.get("field").map(String::as_str), Some("root_tol"));
}

#[test]
fn empty_limit_offsets_are_rejected() {
    let err = Policy::from_yaml_slice(b"limit_eps: []\n").unwrap_err();
    assert_eq!(err.info().code, "policy_limit_eps");
}

#[test]
fn malformed_yaml_is_a_config_error() {
    let err = Policy::from_yaml_slice(b"seed: [unterminated").unwrap_err();
    assert!(matches!(err, SolcheckError::Config(_)));
}
