//! Reading `FINAL_ANSWER` and directive payloads into expressions.

use serde_json::Value;
use solcheck_core::{ErrorInfo, SolcheckError};
use solcheck_sym::{parse_with, Expr, ParseOptions, Rational, SymError};

/// Maps an engine error onto the shared error surface.
pub fn lift_sym_error(code: &str, err: SymError) -> SolcheckError {
    let info = ErrorInfo::new(code, err.to_string());
    match err {
        SymError::Parse { position, .. } => {
            SolcheckError::Parse(info.with_context("position", position.to_string()))
        }
        SymError::Domain(_) | SymError::Unbound(_) => SolcheckError::Numeric(info),
        _ => SolcheckError::Symbolic(info),
    }
}

/// Parses one expression, lifting failures to [`SolcheckError::Parse`].
pub fn parse_expr(text: &str, options: &ParseOptions) -> Result<Expr, SolcheckError> {
    parse_with(text.trim(), options).map_err(|err| {
        let position = match &err {
            SymError::Parse { position, .. } => *position,
            _ => 0,
        };
        SolcheckError::Parse(
            ErrorInfo::new("expression", err.to_string())
                .with_context("input", text.trim())
                .with_context("position", position.to_string()),
        )
    })
}

/// Parses a final answer: scalar, list or mapping.
///
/// The expression grammar is tried first; JSON literals (`{"x": 2}`,
/// `[1, 2]`) are accepted as a fallback.
pub fn parse_answer(text: &str, options: &ParseOptions) -> Result<Expr, SolcheckError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SolcheckError::Parse(ErrorInfo::new(
            "answer_empty",
            "final answer is empty",
        )));
    }
    let sym_err = match parse_with(text, options) {
        Ok(expr) => return Ok(unquote_values(&expr, options)),
        Err(err) => err,
    };
    let json: Value = serde_json::from_str(text).map_err(|json_err| {
        SolcheckError::Parse(
            ErrorInfo::new("answer", sym_err.to_string())
                .with_context("input", text)
                .with_context("json", json_err.to_string()),
        )
    })?;
    json_to_expr(&json, options).map_err(|reason| {
        SolcheckError::Parse(
            ErrorInfo::new("answer_literal", reason).with_context("input", text),
        )
    })
}

/// Quoted values such as `{"x": "2"}` are read as expressions when possible.
fn unquote_values(expr: &Expr, options: &ParseOptions) -> Expr {
    expr.map_nodes(&|node| match node {
        Expr::Str(s) => parse_with(s, options).ok(),
        _ => None,
    })
}

fn json_to_expr(value: &Value, options: &ParseOptions) -> Result<Expr, String> {
    match value {
        Value::Number(n) => Rational::from_decimal_str(&n.to_string())
            .map(Expr::Num)
            .map_err(|err| err.to_string()),
        Value::String(s) => Ok(parse_with(s, options).unwrap_or_else(|_| Expr::Str(s.clone()))),
        Value::Array(items) => items
            .iter()
            .map(|item| json_to_expr(item, options))
            .collect::<Result<Vec<_>, _>>()
            .map(Expr::List),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| json_to_expr(v, options).map(|e| (k.clone(), e)))
            .collect::<Result<Vec<_>, _>>()
            .map(Expr::Dict),
        Value::Bool(_) | Value::Null => Err(format!("`{value}` is not a mathematical value")),
    }
}

/// Looks up the first of `names` present in a mapping answer.
pub fn dict_lookup<'a>(answer: &'a Expr, names: &[&str]) -> Option<&'a Expr> {
    names.iter().find_map(|name| answer.dict_get(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_with_bare_keys() -> Result<(), SolcheckError> {
        let answer = parse_answer("{x: 2, y: -1}", &ParseOptions::default())?;
        assert_eq!(answer.dict_get("y"), Some(&Expr::int(-1)));
        Ok(())
    }

    #[test]
    fn quoted_values_are_expressions() -> Result<(), SolcheckError> {
        let answer = parse_answer(r#"{"f_star": 5e0, "x_star": "2"}"#, &ParseOptions::default())?;
        assert_eq!(dict_lookup(&answer, &["max", "f_star"]), Some(&Expr::int(5)));
        assert_eq!(answer.dict_get("x_star"), Some(&Expr::int(2)));
        Ok(())
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_answer("2x + ", &ParseOptions::default());
        assert!(matches!(err, Err(SolcheckError::Parse(_))));
    }
}
