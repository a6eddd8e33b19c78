mod common;

use common::{failing, policy, submission, STATEMENT};
use solcheck_verify::{verify, Verifier};

#[test]
fn regression_slope_in_solution() {
    let statement = "Les ventes mensuelles sur 5 mois (mois 1 2 3 4 5) valent 10 12 14 16 18 unités.";
    let text = "SOLUTION:\nLa droite de régression a pour pente 2.\nFINAL_ANSWER:\n{a: 2, b: 10}";
    let report = verify("Statistiques", statement, text, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert_eq!(report.details.get("slope"), Some(&serde_json::json!(2.0)));
}

#[test]
fn regression_mismatch() {
    let statement = "Les ventes mensuelles sur 5 mois (mois 1 2 3 4 5) valent 10 12 14 16 18 unités.";
    let text = "SOLUTION:\nLa pente vaut 5.\nFINAL_ANSWER:\n5";
    let report = verify("Statistiques", statement, text, &policy());
    assert_eq!(failing(&report), vec!["numeric.consistency".to_string()]);
}

#[test]
fn too_few_numbers_in_table() {
    let text = "SOLUTION:\nr = 0.9\nFINAL_ANSWER:\n0.9";
    let report = verify("corrélation", STATEMENT, text, &policy());
    assert_eq!(failing(&report), vec!["extract.table".to_string()]);
}

#[test]
fn recurrence_terms() {
    let ok = submission("suites", "{u0: 1, u1: 3, u2: 7, u3: 15}", "Eq(u(n+1), 2*u(n) + 1)");
    let report = Verifier::Sequences.verify(&ok, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert!(report.item("numeric.sequence_terms").is_some());

    let broken = submission("suites", "{u0: 1, u1: 3, u2: 8}", "Eq(u(n+1), 2*u(n) + 1)");
    let report = Verifier::Sequences.verify(&broken, &policy());
    assert_eq!(failing(&report), vec!["numeric.sequence_terms".to_string()]);
}

#[test]
fn sequence_without_recurrence_is_accepted() {
    let sub = submission("suites", "{u0: 1, u1: 2}", "");
    let report = Verifier::Sequences.verify(&sub, &policy());
    assert!(report.ok());
    assert!(report.item("numeric.sequence_terms").is_none());
}

#[test]
fn determinant_identity() {
    let sub = submission("matrices", "-2", "Eq(det(Matrix([[1, 2], [3, 4]])), -2)");
    assert!(Verifier::LinearAlgebra.can_handle("matrices", &sub));
    let report = Verifier::LinearAlgebra.verify(&sub, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));

    let wrong = submission("matrices", "2", "Eq(det(Matrix([[1, 2], [3, 4]])), 2)");
    assert!(!Verifier::LinearAlgebra.verify(&wrong, &policy()).ok());
}

#[test]
fn complex_identity_with_bare_i() {
    let sub = submission("nombres complexes", "2", "Eq((1+i)*(1-i), 2)");
    let report = Verifier::ComplexNumbers.verify(&sub, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
}

#[test]
fn integral_by_differentiation() {
    let sub = submission("intégrales", "x**3/3 + sin(x)", "INTEGRAL; var=x; integrand=x**2 + cos(x)");
    let report = Verifier::Calculus.verify(&sub, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert!(report.item("symbolic.integral").is_some_and(|i| i.ok));
}

#[test]
fn legacy_derivative_check() {
    let sub = submission("dérivées", "3*x**2", "x**3");
    assert_eq!(sub.directive, None);
    let report = Verifier::Calculus.verify(&sub, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert_eq!(report.item("parse.check_directive").map(|i| i.ok), Some(true));
}

#[test]
fn one_sided_infinite_limit() {
    let sub = submission("limites", "oo", "LIMIT; var=x; expr=1/x; point=0; dir=+");
    let report = Verifier::Calculus.verify(&sub, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
}

#[test]
fn short_table_reports_the_enforced_threshold() {
    let mut strict = policy();
    strict.stat_min_numbers = 3;
    strict.stat_series_len = 10;
    let statement = "Les ventes sur 6 mois valent 10 12 14 16 18 unités au total.";
    let sub = submission("régression", "2", "");
    let sub = solcheck_verify::Submission { statement, ..sub };
    let report = Verifier::Statistics.verify(&sub, &strict);
    let item = report.item("extract.table").expect("table item present");
    assert!(!item.ok);
    assert!(item.message.ends_with("need 10"), "message: {}", item.message);
}

#[test]
fn derivative_of_a_high_power() {
    let sub = submission("dérivées", "60*(3*x+7)**59*3", "DERIVATIVE; var=x; func=(3*x+7)**60");
    let report = Verifier::Calculus.verify(&sub, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert_eq!(report.item("symbolic.derivative").map(|i| i.ok), Some(true));
}

#[test]
fn double_angle_derivative() {
    let sub = submission("dérivées", "sin(2*x)", "DERIVATIVE; var=x; func=sin(x)**2");
    let report = Verifier::Calculus.verify(&sub, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
    assert_eq!(report.item("symbolic.derivative").map(|i| i.ok), Some(true));
}

#[test]
fn product_limits_at_zero() {
    let sub = submission("limites", "0", "LIMIT; var=x; expr=x*log(x); point=0; dir=+");
    let report = Verifier::Calculus.verify(&sub, &policy());
    assert_eq!(report.item("symbolic.limit").map(|i| i.ok), Some(true));
    let mut close = policy();
    close.limit_eps = vec![1e-3, 1e-4, 1e-5];
    let report = Verifier::Calculus.verify(&sub, &close);
    assert!(report.ok(), "failures: {:?}", failing(&report));

    let sub = submission("limites", "0", "LIMIT; var=x; expr=x*sin(1/x); point=0");
    let report = Verifier::Calculus.verify(&sub, &policy());
    assert!(report.ok(), "failures: {:?}", failing(&report));
}
