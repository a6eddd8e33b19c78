use solcheck_sym::{differentiate, equals, limit, parse, Direction, Expr, LimitValue, SymError};

fn check_derivative(f: &str, expected: &str, order: u32) -> Result<(), SymError> {
    let d = differentiate(&parse(f)?, "x", order)?;
    assert!(equals(&d, &parse(expected)?)?, "d/dx {f} gave {d}");
    Ok(())
}

#[test]
fn elementary_derivatives() -> Result<(), SymError> {
    check_derivative("x**3 + 2*x", "3*x**2 + 2", 1)?;
    check_derivative("sin(x)*exp(x)", "exp(x)*(sin(x) + cos(x))", 1)?;
    check_derivative("log(x)", "1/x", 1)?;
    check_derivative("sqrt(x)", "1/(2*sqrt(x))", 1)?;
    check_derivative("tan(x)", "1/cos(x)**2", 1)?;
    check_derivative("atan(x)", "1/(1 + x**2)", 1)?;
    check_derivative("x**4", "12*x**2", 2)?;
    Ok(())
}

#[test]
fn derivative_nodes_evaluate() -> Result<(), SymError> {
    let e = parse("Derivative(x**2, x) - 2*x")?;
    assert!(solcheck_sym::is_zero(&e)?);
    Ok(())
}

fn finite(value: LimitValue) -> Expr {
    match value {
        LimitValue::Finite(e) => e,
        other => panic!("expected a finite limit, got {other:?}"),
    }
}

#[test]
fn indeterminate_forms() -> Result<(), SymError> {
    let l = limit(&parse("sin(x)/x")?, "x", &Expr::int(0), Direction::Plus)?;
    assert!(equals(&finite(l), &Expr::int(1))?);
    let l = limit(&parse("(1 - cos(x))/x**2")?, "x", &Expr::int(0), Direction::Both)?;
    assert!(equals(&finite(l), &parse("1/2")?)?);
    let l = limit(&parse("(x**2 - 4)/(x - 2)")?, "x", &Expr::int(2), Direction::Plus)?;
    assert!(equals(&finite(l), &Expr::int(4))?);
    Ok(())
}

#[test]
fn limits_at_infinity() -> Result<(), SymError> {
    let l = limit(&parse("(3*x**2 + 1)/(x**2 - 5)")?, "x", &parse("oo")?, Direction::Plus)?;
    assert!(equals(&finite(l), &Expr::int(3))?);
    let l = limit(&parse("(1 + 1/x)**x")?, "x", &parse("oo")?, Direction::Plus)?;
    assert!(equals(&finite(l), &parse("E")?)?);
    Ok(())
}

#[test]
fn one_sided_divergence() -> Result<(), SymError> {
    assert_eq!(
        limit(&parse("1/x")?, "x", &Expr::int(0), Direction::Plus)?,
        LimitValue::PositiveInfinity
    );
    assert_eq!(
        limit(&parse("1/x")?, "x", &Expr::int(0), Direction::Minus)?,
        LimitValue::NegativeInfinity
    );
    assert!(limit(&parse("1/x")?, "x", &Expr::int(0), Direction::Both).is_err());
    Ok(())
}

#[test]
fn zero_times_infinity_products() -> Result<(), SymError> {
    let l = limit(&parse("x*log(x)")?, "x", &Expr::int(0), Direction::Plus)?;
    assert!(equals(&finite(l), &Expr::int(0))?);
    let l = limit(&parse("x**2*log(x)")?, "x", &Expr::int(0), Direction::Plus)?;
    assert!(equals(&finite(l), &Expr::int(0))?);
    Ok(())
}

#[test]
fn bounded_factor_squeezed_to_zero() -> Result<(), SymError> {
    let l = limit(&parse("x*sin(1/x)")?, "x", &Expr::int(0), Direction::Both)?;
    assert!(equals(&finite(l), &Expr::int(0))?);
    let l = limit(&parse("x**2*cos(1/x)")?, "x", &Expr::int(0), Direction::Plus)?;
    assert!(equals(&finite(l), &Expr::int(0))?);
    Ok(())
}

#[test]
fn high_powers_differentiate_exactly() -> Result<(), SymError> {
    check_derivative("(3*x + 7)**60", "60*(3*x + 7)**59*3", 1)?;
    check_derivative("sin(x)**2", "sin(2*x)", 1)?;
    Ok(())
}
