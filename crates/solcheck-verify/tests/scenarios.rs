mod common;

use common::{failing, policy, solution, STATEMENT};
use solcheck_core::ReportFlag;
use solcheck_verify::{verify, verify_normalized, Verifier};

#[test]
fn linear_equation_after_padding() {
    let text = "SOLUTION:\nOn isole x.\nFINAL_ANSWER:\n2\nCHECK:\nEq(2*x+1,5)";
    let report = verify_normalized("équation", "Résoudre 2x+1=5", text, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert!(report.flags.contains(&ReportFlag::StatementPadded));
    assert!(report.flags.contains(&ReportFlag::AutoFixed));
    assert_eq!(report.item("symbolic.substitution").map(|i| i.ok), Some(true));
}

#[test]
fn wrong_root_of_single_equation() {
    let report = verify("équation", STATEMENT, &solution("3", "Eq(2*x+1,5)"), &policy());
    assert!(!report.ok());
    assert_eq!(report.item("symbolic.substitution").map(|i| i.ok), Some(false));
    assert!(failing(&report).contains(&"symbolic.substitution".to_string()));
}

#[test]
fn list_of_roots_checks_every_entry() {
    let check = "Eq(x**2-5*x+6, 0)";
    let report = verify("équation", STATEMENT, &solution("[2, 3]", check), &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));

    let report = verify("équation", STATEMENT, &solution("[2, 4]", check), &policy());
    assert!(!report.ok());
    assert_eq!(report.item("symbolic.substitution").map(|i| i.ok), Some(false));
}

#[test]
fn derivative_directive() {
    let text = solution("(1 - log(x))/x**2", "DERIVATIVE; var=x; func=log(x)/x");
    let report = verify("Dérivées", STATEMENT, &text, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert!(report.item("symbolic.derivative").is_some());
    assert!(report.item("numeric.derivative").is_some());
}

#[test]
fn wrong_derivative_fails_both_ways() {
    let text = solution("1/x**2", "DERIVATIVE; var=x; func=log(x)/x");
    let report = verify("Dérivées", STATEMENT, &text, &policy());
    assert!(!report.ok());
    assert_eq!(
        failing(&report),
        vec!["symbolic.derivative".to_string(), "numeric.derivative".to_string()]
    );
}

#[test]
fn limit_directive() {
    let text = solution("1", "LIMIT; var=x; expr=sin(x)/x; point=0");
    let report = verify("Limites", STATEMENT, &text, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert!(report.item("numeric.limit").is_some_and(|i| i.ok));
}

#[test]
fn linear_system() {
    let text = solution("{x: 2, y: -1}", "SYSTEM; Eq(x+y,1); Eq(x-y,3)");
    let report = verify("Systèmes", STATEMENT, &text, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert_eq!(report.item("symbolic.system_substitution").map(|i| i.ok), Some(true));
}

#[test]
fn wrong_system_answer_fails() {
    let text = solution("{x: 1, y: 0}", "SYSTEM; Eq(x+y,1); Eq(x-y,3)");
    let report = verify("Systèmes", STATEMENT, &text, &policy());
    assert_eq!(failing(&report), vec!["symbolic.system_substitution".to_string()]);
}

#[test]
fn bounded_single_variable_maximum() {
    let check = "OPTIMIZE; var=x; func=-2*x**2+8*x-3; domain=[0,5]; goal=max";
    let report = verify("Optimisation", STATEMENT, &solution("{x_star:2, f_star:5}", check), &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert_eq!(report.details.get("x_star_true"), Some(&serde_json::json!("2")));

    let report = verify("Optimisation", STATEMENT, &solution("{x_star:2, f_star:4}", check), &policy());
    assert!(!report.ok());
    assert_eq!(report.item("opt.compare_f_star").map(|i| i.ok), Some(false));
    assert_eq!(report.item("opt.compare_x").map(|i| i.ok), Some(true));
}

#[test]
fn absolute_value_minimum_at_its_corner() {
    let check = "OPTIMIZE; var=x; func=abs(x); domain=[-1,1]; goal=min";
    let report = verify("Optimisation", STATEMENT, &solution("{x_star:0, f_star:0}", check), &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert_eq!(report.item("opt.corner_points").map(|i| i.ok), Some(true));
    assert_eq!(report.details.get("x_star_true"), Some(&serde_json::json!("0")));

    let report = verify("Optimisation", STATEMENT, &solution("{x_star:1, f_star:1}", check), &policy());
    assert!(!report.ok());
    assert_eq!(report.item("opt.compare_x").map(|i| i.ok), Some(false));
}

#[test]
fn symbolic_point_still_reports_local_check() {
    let check = "OPTIMIZE; var=[x,y]; func=x+y; domain=[x+y<=10, x>=0, y>=0]; goal=max";
    let report = verify("Optimisation", STATEMENT, &solution("{x: a, y: 4, f_star: 12}", check), &policy());
    assert_eq!(report.item("opt.eval_f_claimed").map(|i| i.ok), Some(false));
    let local = report.item("opt.local_check").expect("local check item present");
    assert!(local.ok);
    assert!(local.message.contains("skipped"), "message: {}", local.message);
}

#[test]
fn infeasible_point_is_reported() {
    let check = "OPTIMIZE; var=[x,y]; func=x+y; domain=[x+y<=10, x>=0, y>=0]; goal=max";
    let report = verify("Optimisation", STATEMENT, &solution("{x: 8, y: 4, f_star: 12}", check), &policy());
    assert_eq!(report.item("opt.constraints_parsed").map(|i| i.ok), Some(true));
    assert_eq!(report.item("opt.feasible").map(|i| i.ok), Some(false));
}

#[test]
fn local_search_refutes_interior_point() {
    let check = "OPTIMIZE; var=[x,y]; func=x+y; domain=[x+y<=10, x>=0, y>=0]; goal=max";
    let report = verify("Optimisation", STATEMENT, &solution("{x: 2, y: 2, f_star: 4}", check), &policy());
    assert_eq!(report.item("opt.feasible").map(|i| i.ok), Some(true));
    assert_eq!(report.item("opt.compare_f_star").map(|i| i.ok), Some(true));
    assert_eq!(report.item("opt.local_check").map(|i| i.ok), Some(false));
}

#[test]
fn short_statement_fails_structurally() {
    let text = solution("{x: 2, y: -1}", "SYSTEM; Eq(x+y,1); Eq(x-y,3)");
    let report = verify("Systèmes", "Résoudre le système.", &text, &policy());
    assert!(!report.ok());
    assert_eq!(failing(&report), vec!["structure.enonce".to_string()]);
}

#[test]
fn directive_runs_a_single_verifier() {
    let text = solution("{x: 2, y: -1}", "SYSTEM; Eq(x+y,1); Eq(x-y,3)");
    let report = verify("système, dérivée, optimisation, suites", STATEMENT, &text, &policy());
    assert_eq!(
        report.details.get("verifiers"),
        Some(&serde_json::to_value([Verifier::EquationsSystem]).unwrap_or_default())
    );
}

#[test]
fn unmatched_topic_is_structural_only() {
    let text = solution("12", "");
    let report = verify("géométrie", STATEMENT, &text, &policy());
    assert!(report.ok());
    assert_eq!(report.kind, solcheck_core::ReportKind::Structural);
    assert_eq!(report.summary, "no verifier applicable");
}
