//! Tokenizer and recursive-descent parser for the expression language.
//!
//! Accepted syntax: numbers (decimals are exact), identifiers, `+ - * / ** ^`,
//! function calls, `Eq(a, b)`, a top-level `=` or `==` equality, lists,
//! tuples, sets, mappings with bare or quoted keys, `Matrix([[..]])` and the
//! matrix methods `.det()`, `.T`, `.inv()`, `.transpose()`, `.trace()`.
//! Multiplication must be explicit.

use crate::error::{Result, SymError};
use crate::expr::{Constant, Direction, Expr, Func, MatOp};
use crate::rational::Rational;

/// Parser switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Read a bare `i` as the imaginary unit.
    pub imaginary_i: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(String),
    Ident(String),
    Str(String),
    Op(&'static str),
}

const OPERATORS: [&str; 17] = [
    "**", "==", "<=", ">=", "+", "-", "*", "/", "^", "(", ")", "[", "]", "{", "}", ",", ":",
];

fn tokenize(text: &str) -> Result<Vec<(Tok, usize)>> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        let Some(ch) = rest.chars().next() else { break };
        if ch.is_whitespace() {
            i += ch.len_utf8();
            continue;
        }
        if ch.is_ascii_digit() || (ch == '.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let start = i;
            while i < text.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if i < text.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                let mut j = i + 1;
                if j < text.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                    j += 1;
                }
                if j < text.len() && bytes[j].is_ascii_digit() {
                    i = j;
                    while i < text.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            out.push((Tok::Num(text[start..i].to_string()), start));
            continue;
        }
        if ch.is_alphabetic() || ch == '_' {
            let start = i;
            for c in rest.chars() {
                if c.is_alphanumeric() || c == '_' {
                    i += c.len_utf8();
                } else {
                    break;
                }
            }
            out.push((Tok::Ident(text[start..i].to_string()), start));
            continue;
        }
        if ch == '"' || ch == '\'' {
            let start = i;
            let body_start = i + 1;
            let Some(len) = text[body_start..].find(ch) else {
                return Err(SymError::Parse {
                    position: start,
                    message: "unterminated string literal".to_string(),
                });
            };
            out.push((Tok::Str(text[body_start..body_start + len].to_string()), start));
            i = body_start + len + 1;
            continue;
        }
        if ch == '=' {
            let width = if rest.starts_with("==") { 2 } else { 1 };
            out.push((Tok::Op("=="), i));
            i += width;
            continue;
        }
        if ch == '.' {
            out.push((Tok::Op("."), i));
            i += 1;
            continue;
        }
        match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            Some(op) => {
                out.push((Tok::Op(op), i));
                i += op.len();
            }
            None => {
                return Err(SymError::Parse {
                    position: i,
                    message: format!("unexpected character `{ch}`"),
                })
            }
        }
    }
    Ok(out)
}

struct Parser<'a> {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
    end: usize,
    options: &'a ParseOptions,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, p)| *p).unwrap_or(self.end)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(SymError::Parse {
            position: self.offset(),
            message: message.into(),
        })
    }

    fn eat(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Tok::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, op: &str) -> Result<()> {
        if self.eat(op) {
            Ok(())
        } else {
            self.error(format!("expected `{op}`"))
        }
    }

    fn top(&mut self) -> Result<Expr> {
        let lhs = self.expr()?;
        if self.eat("==") {
            let rhs = self.expr()?;
            return Ok(Expr::eq(lhs, rhs));
        }
        Ok(lhs)
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut terms = vec![self.term()?];
        loop {
            if self.eat("+") {
                terms.push(self.term()?);
            } else if self.eat("-") {
                terms.push(Expr::neg(self.term()?));
            } else {
                break;
            }
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Expr::Add(terms) })
    }

    fn term(&mut self) -> Result<Expr> {
        let mut factors = vec![self.unary()?];
        loop {
            if self.eat("*") {
                factors.push(self.unary()?);
            } else if self.eat("/") {
                factors.push(Expr::pow(self.unary()?, Expr::int(-1)));
            } else {
                break;
            }
        }
        Ok(if factors.len() == 1 { factors.remove(0) } else { Expr::Mul(factors) })
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat("-") {
            return Ok(Expr::neg(self.unary()?));
        }
        if self.eat("+") {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.postfix()?;
        if self.eat("**") || self.eat("^") {
            let exp = self.unary()?;
            return Ok(Expr::pow(base, exp));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut value = self.primary()?;
        while self.eat(".") {
            let Some(Tok::Ident(name)) = self.peek().cloned() else {
                return self.error("expected a method name after `.`");
            };
            self.pos += 1;
            let called = self.eat("(");
            if called {
                self.expect(")")?;
            }
            let op = match name.as_str() {
                "det" => MatOp::Det,
                "T" | "transpose" => MatOp::Transpose,
                "inv" => MatOp::Inverse,
                "trace" => MatOp::Trace,
                other => return self.error(format!("unknown method `{other}`")),
            };
            value = Expr::MatOp(op, Box::new(value));
        }
        Ok(value)
    }

    fn args(&mut self, close: &str) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.top()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(",")?;
            if self.eat(close) {
                return Ok(items);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let start = self.offset();
        match self.peek().cloned() {
            Some(Tok::Num(text)) => {
                self.pos += 1;
                Rational::from_decimal_str(&text)
                    .map(Expr::Num)
                    .map_err(|_| SymError::Parse {
                        position: start,
                        message: format!("invalid number `{text}`"),
                    })
            }
            Some(Tok::Str(text)) => {
                self.pos += 1;
                Ok(Expr::Str(text))
            }
            Some(Tok::Ident(name)) => {
                self.pos += 1;
                if self.eat("(") {
                    let args = self.args(")")?;
                    return self.call(&name, args, start);
                }
                Ok(self.identifier(name))
            }
            Some(Tok::Op("(")) => {
                self.pos += 1;
                let items = self.args(")")?;
                match items.len() {
                    0 => self.error("empty parentheses"),
                    1 => Ok(items.into_iter().next().unwrap_or(Expr::int(0))),
                    _ => Ok(Expr::List(items)),
                }
            }
            Some(Tok::Op("[")) => {
                self.pos += 1;
                Ok(Expr::List(self.args("]")?))
            }
            Some(Tok::Op("{")) => {
                self.pos += 1;
                self.braces()
            }
            Some(other) => self.error(format!("unexpected token {other:?}")),
            None => self.error("unexpected end of input"),
        }
    }

    fn identifier(&self, name: String) -> Expr {
        match name.as_str() {
            "pi" => Expr::Const(Constant::Pi),
            "E" => Expr::Const(Constant::E),
            "I" => Expr::Const(Constant::I),
            "i" if self.options.imaginary_i => Expr::Const(Constant::I),
            "oo" => Expr::Const(Constant::Infinity),
            _ => Expr::Sym(name),
        }
    }

    fn braces(&mut self) -> Result<Expr> {
        if self.eat("}") {
            return Ok(Expr::Dict(Vec::new()));
        }
        let first = self.top()?;
        if !self.eat(":") {
            let mut items = vec![first];
            while self.eat(",") {
                if matches!(self.peek(), Some(Tok::Op("}"))) {
                    break;
                }
                items.push(self.top()?);
            }
            self.expect("}")?;
            return Ok(Expr::List(items));
        }
        let mut entries: Vec<(String, Expr)> = Vec::new();
        let mut key = first;
        loop {
            let value = self.top()?;
            let name = match key {
                Expr::Str(s) => s,
                other => other.to_string(),
            };
            match entries.iter_mut().find(|(k, _)| *k == name) {
                Some(slot) => slot.1 = value,
                None => entries.push((name, value)),
            }
            if self.eat("}") {
                break;
            }
            self.expect(",")?;
            if self.eat("}") {
                break;
            }
            key = self.top()?;
            self.expect(":")?;
        }
        Ok(Expr::Dict(entries))
    }

    fn call(&self, name: &str, mut args: Vec<Expr>, start: usize) -> Result<Expr> {
        let arity = |n: usize| -> Result<()> {
            if args.len() == n {
                Ok(())
            } else {
                Err(SymError::Parse {
                    position: start,
                    message: format!("`{name}` takes {n} argument(s), got {}", args.len()),
                })
            }
        };
        let symbol_at = |args: &[Expr], idx: usize| -> Result<String> {
            match args.get(idx) {
                Some(Expr::Sym(s)) => Ok(s.clone()),
                _ => Err(SymError::Parse {
                    position: start,
                    message: format!("`{name}` expects a variable as argument {}", idx + 1),
                }),
            }
        };
        if let Some(func) = Func::from_name(name) {
            if func == Func::Log && args.len() == 2 {
                let base = args.pop().unwrap_or(Expr::Const(Constant::E));
                let value = args.pop().unwrap_or(Expr::int(1));
                return Ok(Expr::div(
                    Expr::func(Func::Log, value),
                    Expr::func(Func::Log, base),
                ));
            }
            arity(1)?;
            return Ok(Expr::func(func, args.remove(0)));
        }
        match name {
            "sqrt" => {
                arity(1)?;
                Ok(Expr::pow(args.remove(0), Expr::Num(Rational::half())))
            }
            "Eq" => {
                arity(2)?;
                let rhs = args.remove(1);
                Ok(Expr::eq(args.remove(0), rhs))
            }
            "Rational" => {
                arity(2)?;
                match (args[0].as_rational(), args[1].as_rational()) {
                    (Some(p), Some(q)) => p.try_div(&q).map(Expr::Num),
                    _ => Ok(Expr::div(args.remove(0), args.remove(0))),
                }
            }
            "Matrix" => {
                arity(1)?;
                match args.remove(0) {
                    Expr::List(rows) if rows.iter().all(|r| matches!(r, Expr::List(_))) => {
                        let rows: Vec<Vec<Expr>> = rows
                            .into_iter()
                            .map(|r| match r {
                                Expr::List(items) => items,
                                other => vec![other],
                            })
                            .collect();
                        let width = rows.first().map_or(0, Vec::len);
                        if rows.iter().any(|r| r.len() != width) {
                            return Err(SymError::Parse {
                                position: start,
                                message: "matrix rows have different lengths".to_string(),
                            });
                        }
                        Ok(Expr::Matrix(rows))
                    }
                    Expr::List(items) => Ok(Expr::Matrix(items.into_iter().map(|e| vec![e]).collect())),
                    _ => Err(SymError::Parse {
                        position: start,
                        message: "`Matrix` expects a list of rows".to_string(),
                    }),
                }
            }
            "det" | "transpose" | "inverse" | "inv" | "trace" => {
                arity(1)?;
                let op = match name {
                    "det" => MatOp::Det,
                    "transpose" => MatOp::Transpose,
                    "trace" => MatOp::Trace,
                    _ => MatOp::Inverse,
                };
                Ok(Expr::MatOp(op, Box::new(args.remove(0))))
            }
            "Derivative" | "diff" => {
                if args.len() < 2 {
                    return Err(SymError::Parse {
                        position: start,
                        message: format!("`{name}` needs an expression and a variable"),
                    });
                }
                let var = symbol_at(&args, 1)?;
                let mut order = 1u32;
                for extra in &args[2..] {
                    match extra {
                        Expr::Sym(s) if *s == var => order += 1,
                        Expr::Num(r) if r.is_integer() && !r.is_negative() && !r.is_zero() && args.len() == 3 => {
                            order = r.to_i64().and_then(|k| u32::try_from(k).ok()).unwrap_or(u32::MAX);
                        }
                        _ => {
                            return Err(SymError::Parse {
                                position: start,
                                message: "mixed or malformed derivative orders".to_string(),
                            })
                        }
                    }
                }
                Ok(Expr::Derivative {
                    expr: Box::new(args.remove(0)),
                    var,
                    order,
                })
            }
            "Limit" | "limit" => {
                if !(3..=4).contains(&args.len()) {
                    return Err(SymError::Parse {
                        position: start,
                        message: format!("`{name}` takes 3 or 4 arguments"),
                    });
                }
                let var = symbol_at(&args, 1)?;
                let dir = match args.get(3) {
                    Some(Expr::Str(s)) => Direction::from_token(s).ok_or_else(|| SymError::Parse {
                        position: start,
                        message: format!("unknown limit direction `{s}`"),
                    })?,
                    Some(_) => {
                        return Err(SymError::Parse {
                            position: start,
                            message: "limit direction must be a string".to_string(),
                        })
                    }
                    None => Direction::Plus,
                };
                let point = args.remove(2);
                Ok(Expr::Limit {
                    expr: Box::new(args.remove(0)),
                    var,
                    point: Box::new(point),
                    dir,
                })
            }
            _ => Ok(Expr::Apply(name.to_string(), args)),
        }
    }
}

/// Parses `text` with default options.
pub fn parse(text: &str) -> Result<Expr> {
    parse_with(text, &ParseOptions::default())
}

/// Parses `text`.
pub fn parse_with(text: &str, options: &ParseOptions) -> Result<Expr> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(SymError::Parse {
            position: 0,
            message: "empty expression".to_string(),
        });
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: text.len(),
        options,
    };
    let expr = parser.top()?;
    if parser.pos < parser.tokens.len() {
        return parser.error("unexpected trailing input");
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(parse("-x**2").unwrap().to_string(), "-x**2");
        assert_eq!(parse("2**3**2").unwrap(), Expr::pow(Expr::int(2), Expr::pow(Expr::int(3), Expr::int(2))));
        assert_eq!(parse("x^2").unwrap(), parse("x**2").unwrap());
    }

    #[test]
    fn top_level_equality_forms() {
        let expected = Expr::eq(Expr::sym("x"), Expr::int(2));
        assert_eq!(parse("x = 2").unwrap(), expected);
        assert_eq!(parse("x == 2").unwrap(), expected);
        assert_eq!(parse("Eq(x, 2)").unwrap(), expected);
    }

    #[test]
    fn mappings_accept_quoted_keys() {
        let e = parse("{'x_star': 1.5, y: -2}").unwrap();
        assert_eq!(e.dict_get("x_star"), Some(&Expr::Num(Rational::new(3, 2).unwrap())));
        assert_eq!(e.dict_get("y"), Some(&Expr::int(-2)));
    }

    #[test]
    fn implicit_multiplication_is_rejected() {
        assert!(matches!(parse("2x"), Err(SymError::Parse { .. })));
    }

    #[test]
    fn matrix_methods() {
        let e = parse("Matrix([[1, 2], [3, 4]]).det()").unwrap();
        assert!(matches!(e, Expr::MatOp(MatOp::Det, _)));
    }
}
