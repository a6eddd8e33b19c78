use std::collections::BTreeMap;

use solcheck_sym::{equals, evaluate_real, parse, solve_system, solve_univariate, Root, SolveOptions, SymError};

fn real_values(roots: &[Root]) -> Vec<f64> {
    let mut values: Vec<f64> = roots.iter().filter_map(|r| r.value().ok()).map(|z| z.re).collect();
    values.sort_by(f64::total_cmp);
    values
}

#[test]
fn linear_equation_from_equality() -> Result<(), SymError> {
    let roots = solve_univariate(&parse("2*x + 1 = 5")?, "x", &SolveOptions::default())?;
    assert_eq!(roots.len(), 1);
    assert!(equals(&roots[0].to_expr(), &parse("2")?)?);
    Ok(())
}

#[test]
fn complex_roots_are_filtered_when_real_only() -> Result<(), SymError> {
    let opts = SolveOptions {
        real_only: true,
        ..SolveOptions::default()
    };
    let roots = solve_univariate(&parse("(x - 1)*(x**2 + 1)")?, "x", &opts)?;
    assert_eq!(real_values(&roots), vec![1.0]);
    let all = solve_univariate(&parse("x**2 + 1")?, "x", &SolveOptions::default())?;
    assert_eq!(all.len(), 2);
    Ok(())
}

#[test]
fn quintic_falls_back_to_numeric_roots() -> Result<(), SymError> {
    let roots = solve_univariate(&parse("x**5 - x - 1")?, "x", &SolveOptions { real_only: true, ..SolveOptions::default() })?;
    assert_eq!(roots.len(), 1);
    let x = roots[0].value()?.re;
    assert!((x.powi(5) - x - 1.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn transcendental_roots_by_scanning() -> Result<(), SymError> {
    let roots = solve_univariate(&parse("cos(x) - x")?, "x", &SolveOptions::default())?;
    assert_eq!(roots.len(), 1);
    assert!((roots[0].value()?.re - 0.739_085_133).abs() < 1e-6);
    Ok(())
}

#[test]
fn excluded_poles() -> Result<(), SymError> {
    let roots = solve_univariate(&parse("(x**2 - 1)/(x - 1)")?, "x", &SolveOptions::default())?;
    assert_eq!(real_values(&roots), vec![-1.0]);
    Ok(())
}

#[test]
fn linear_system_is_exact() -> Result<(), SymError> {
    let eqs = [parse("x + y = 3")?, parse("x - y = 1")?];
    let vars = ["x".to_string(), "y".to_string()];
    let solutions = solve_system(&eqs, &vars)?;
    assert_eq!(solutions.len(), 1);
    assert!(equals(&solutions[0]["x"].to_expr(), &parse("2")?)?);
    assert!(equals(&solutions[0]["y"].to_expr(), &parse("1")?)?);
    Ok(())
}

#[test]
fn inconsistent_system_has_no_solution() -> Result<(), SymError> {
    let eqs = [parse("x + y = 3")?, parse("x + y = 4")?];
    let vars = ["x".to_string(), "y".to_string()];
    assert!(solve_system(&eqs, &vars)?.is_empty());
    Ok(())
}

#[test]
fn nonlinear_system_by_substitution() -> Result<(), SymError> {
    let eqs = [parse("x**2 + y**2 = 25")?, parse("y = x + 1")?];
    let vars = ["x".to_string(), "y".to_string()];
    let solutions = solve_system(&eqs, &vars)?;
    assert_eq!(solutions.len(), 2);
    for s in &solutions {
        let bindings: BTreeMap<String, f64> = s.iter().map(|(k, r)| (k.clone(), r.value().map(|z| z.re).unwrap_or(f64::NAN))).collect();
        let residual = evaluate_real(&parse("x**2 + y**2 - 25")?, &bindings)?;
        assert!(residual.abs() < 1e-9);
    }
    Ok(())
}
