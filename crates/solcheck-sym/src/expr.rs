//! Expression tree, constructors and the textual printer.
//!
//! Subtraction and division are not separate nodes: `a - b` is stored as
//! `a + (-1)*b` and `a / b` as `a * b**(-1)`. The printer restores the
//! conventional notation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use num_traits::One;

use crate::rational::Rational;

/// Elementary functions of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Func {
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Inverse sine.
    Asin,
    /// Inverse cosine.
    Acos,
    /// Inverse tangent.
    Atan,
    /// Hyperbolic sine.
    Sinh,
    /// Hyperbolic cosine.
    Cosh,
    /// Hyperbolic tangent.
    Tanh,
    /// Natural exponential.
    Exp,
    /// Natural logarithm.
    Log,
    /// Absolute value or complex modulus.
    Abs,
    /// Real part.
    Re,
    /// Imaginary part.
    Im,
    /// Complex conjugate.
    Conjugate,
    /// Complex argument.
    Arg,
}

impl Func {
    /// Looks a function up by any of its accepted spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" | "arcsin" => Func::Asin,
            "acos" | "arccos" => Func::Acos,
            "atan" | "arctan" => Func::Atan,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "exp" => Func::Exp,
            "log" | "ln" => Func::Log,
            "Abs" | "abs" => Func::Abs,
            "re" => Func::Re,
            "im" => Func::Im,
            "conjugate" | "conj" => Func::Conjugate,
            "arg" => Func::Arg,
            _ => return None,
        })
    }

    /// Printed name.
    pub fn name(&self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Abs => "Abs",
            Func::Re => "re",
            Func::Im => "im",
            Func::Conjugate => "conjugate",
            Func::Arg => "arg",
        }
    }
}

/// Named constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Constant {
    /// π.
    Pi,
    /// Euler's number.
    E,
    /// Imaginary unit.
    I,
    /// Unsigned infinity marker, used as a limit point or value.
    Infinity,
}

/// Matrix-valued operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatOp {
    /// Determinant.
    Det,
    /// Transpose.
    Transpose,
    /// Inverse.
    Inverse,
    /// Trace.
    Trace,
}

impl MatOp {
    /// Printed name.
    pub fn name(&self) -> &'static str {
        match self {
            MatOp::Det => "det",
            MatOp::Transpose => "transpose",
            MatOp::Inverse => "inverse",
            MatOp::Trace => "trace",
        }
    }
}

/// Side from which a limit is approached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Direction {
    /// From above.
    #[default]
    Plus,
    /// From below.
    Minus,
    /// Both sides must agree.
    Both,
}

impl Direction {
    /// Parses `+`, `-` or `+-`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "+" => Some(Direction::Plus),
            "-" => Some(Direction::Minus),
            "+-" | "-+" => Some(Direction::Both),
            _ => None,
        }
    }

    fn token(&self) -> &'static str {
        match self {
            Direction::Plus => "+",
            Direction::Minus => "-",
            Direction::Both => "+-",
        }
    }
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    /// Exact rational literal.
    Num(Rational),
    /// Free symbol.
    Sym(String),
    /// Named constant.
    Const(Constant),
    /// String literal (mapping keys, directive values).
    Str(String),
    /// Sum of terms.
    Add(Vec<Expr>),
    /// Product of factors.
    Mul(Vec<Expr>),
    /// Power.
    Pow(Box<Expr>, Box<Expr>),
    /// Elementary function application.
    Func(Func, Box<Expr>),
    /// Application of an undefined function such as `u(n + 1)`.
    Apply(String, Vec<Expr>),
    /// Unevaluated derivative.
    Derivative {
        /// Differentiated expression.
        expr: Box<Expr>,
        /// Variable.
        var: String,
        /// Order, at least 1.
        order: u32,
    },
    /// Unevaluated limit.
    Limit {
        /// Expression under the limit.
        expr: Box<Expr>,
        /// Variable.
        var: String,
        /// Approached point.
        point: Box<Expr>,
        /// Side.
        dir: Direction,
    },
    /// Equality between two sides.
    Eq(Box<Expr>, Box<Expr>),
    /// List, tuple or set literal.
    List(Vec<Expr>),
    /// Mapping literal with unique keys.
    Dict(Vec<(String, Expr)>),
    /// Matrix literal given by rows.
    Matrix(Vec<Vec<Expr>>),
    /// Matrix operation.
    MatOp(MatOp, Box<Expr>),
}

impl Expr {
    /// Integer literal.
    pub fn int(value: i64) -> Self {
        Expr::Num(Rational::from(value))
    }

    /// Rational literal.
    pub fn num(value: Rational) -> Self {
        Expr::Num(value)
    }

    /// Symbol.
    pub fn sym(name: impl Into<String>) -> Self {
        Expr::Sym(name.into())
    }

    /// `a + b`.
    pub fn add(a: Expr, b: Expr) -> Self {
        Expr::Add(vec![a, b])
    }

    /// `a - b`.
    pub fn sub(a: Expr, b: Expr) -> Self {
        Expr::Add(vec![a, Expr::neg(b)])
    }

    /// `a * b`.
    pub fn mul(a: Expr, b: Expr) -> Self {
        Expr::Mul(vec![a, b])
    }

    /// `a / b`.
    pub fn div(a: Expr, b: Expr) -> Self {
        Expr::Mul(vec![a, Expr::pow(b, Expr::int(-1))])
    }

    /// `-a`.
    pub fn neg(a: Expr) -> Self {
        match a {
            Expr::Num(r) => Expr::Num(r.neg()),
            other => Expr::Mul(vec![Expr::int(-1), other]),
        }
    }

    /// `a ** b`.
    pub fn pow(a: Expr, b: Expr) -> Self {
        Expr::Pow(Box::new(a), Box::new(b))
    }

    /// `f(a)`.
    pub fn func(f: Func, a: Expr) -> Self {
        Expr::Func(f, Box::new(a))
    }

    /// `Eq(a, b)`.
    pub fn eq(a: Expr, b: Expr) -> Self {
        Expr::Eq(Box::new(a), Box::new(b))
    }

    /// Rational value of a literal.
    pub fn as_rational(&self) -> Option<Rational> {
        match self {
            Expr::Num(r) => Some(r.clone()),
            _ => None,
        }
    }

    /// Name of a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Sym(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this is the infinity marker, possibly negated.
    pub fn infinity_sign(&self) -> Option<i8> {
        match self {
            Expr::Const(Constant::Infinity) => Some(1),
            Expr::Mul(factors) if factors.len() == 2 => match (&factors[0], &factors[1]) {
                (Expr::Num(r), Expr::Const(Constant::Infinity)) if *r == Rational::minus_one() => Some(-1),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether the expression is a scalar (not a list, mapping, matrix or equality).
    pub fn is_scalar_like(&self) -> bool {
        !matches!(
            self,
            Expr::List(_) | Expr::Dict(_) | Expr::Matrix(_) | Expr::Eq(..) | Expr::Str(_)
        )
    }

    /// Looks a mapping entry up by key.
    pub fn dict_get(&self, key: &str) -> Option<&Expr> {
        match self {
            Expr::Dict(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Immediate sub-expressions.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Num(_) | Expr::Sym(_) | Expr::Const(_) | Expr::Str(_) => Vec::new(),
            Expr::Add(items) | Expr::Mul(items) | Expr::Apply(_, items) | Expr::List(items) => {
                items.iter().collect()
            }
            Expr::Pow(a, b) | Expr::Eq(a, b) => vec![a, b],
            Expr::Func(_, a) | Expr::MatOp(_, a) => vec![a],
            Expr::Derivative { expr, .. } => vec![expr],
            Expr::Limit { expr, point, .. } => vec![expr, point],
            Expr::Dict(entries) => entries.iter().map(|(_, v)| v).collect(),
            Expr::Matrix(rows) => rows.iter().flatten().collect(),
        }
    }

    /// Whether any node satisfies `pred`.
    pub fn any(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|c| c.any(pred))
    }

    /// Free symbols, excluding variables bound by derivatives and limits.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Sym(name) => {
                out.insert(name.clone());
            }
            Expr::Limit { expr, var, point, .. } => {
                let mut inner = expr.free_symbols();
                inner.remove(var);
                out.extend(inner);
                point.collect_symbols(out);
            }
            other => {
                for child in other.children() {
                    child.collect_symbols(out);
                }
            }
        }
    }

    /// Whether `name` occurs free.
    pub fn depends_on(&self, name: &str) -> bool {
        self.free_symbols().contains(name)
    }

    /// Renames symbols without evaluating anything.
    pub fn rename_symbols(&self, map: &BTreeMap<String, String>) -> Expr {
        self.map_nodes(&|e| match e {
            Expr::Sym(name) => map.get(name).map(|n| Expr::Sym(n.clone())),
            _ => None,
        })
    }

    /// Rebuilds the tree bottom-up, replacing nodes for which `f` returns a value.
    pub fn map_nodes(&self, f: &dyn Fn(&Expr) -> Option<Expr>) -> Expr {
        if let Some(replaced) = f(self) {
            return replaced;
        }
        let rec = |e: &Expr| e.map_nodes(f);
        match self {
            Expr::Num(_) | Expr::Sym(_) | Expr::Const(_) | Expr::Str(_) => self.clone(),
            Expr::Add(items) => Expr::Add(items.iter().map(rec).collect()),
            Expr::Mul(items) => Expr::Mul(items.iter().map(rec).collect()),
            Expr::Apply(name, items) => Expr::Apply(name.clone(), items.iter().map(rec).collect()),
            Expr::List(items) => Expr::List(items.iter().map(rec).collect()),
            Expr::Pow(a, b) => Expr::pow(rec(a), rec(b)),
            Expr::Eq(a, b) => Expr::eq(rec(a), rec(b)),
            Expr::Func(func, a) => Expr::func(*func, rec(a)),
            Expr::MatOp(op, a) => Expr::MatOp(*op, Box::new(rec(a))),
            Expr::Derivative { expr, var, order } => Expr::Derivative {
                expr: Box::new(rec(expr)),
                var: var.clone(),
                order: *order,
            },
            Expr::Limit { expr, var, point, dir } => Expr::Limit {
                expr: Box::new(rec(expr)),
                var: var.clone(),
                point: Box::new(rec(point)),
                dir: *dir,
            },
            Expr::Dict(entries) => Expr::Dict(entries.iter().map(|(k, v)| (k.clone(), rec(v))).collect()),
            Expr::Matrix(rows) => Expr::Matrix(rows.iter().map(|r| r.iter().map(rec).collect()).collect()),
        }
    }
}

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_NEG: u8 = 3;
const PREC_POW: u8 = 4;

fn negative_coefficient(expr: &Expr) -> bool {
    match expr {
        Expr::Num(r) => r.is_negative(),
        Expr::Mul(factors) => factors
            .iter()
            .filter_map(Expr::as_rational)
            .fold(Rational::one(), |acc, r| if r.is_negative() { acc.neg() } else { acc })
            .is_negative(),
        _ => false,
    }
}

fn negate_for_print(expr: &Expr) -> Expr {
    match expr {
        Expr::Num(r) => Expr::Num(r.neg()),
        Expr::Mul(factors) => {
            let mut flipped = false;
            let mut out = Vec::with_capacity(factors.len());
            for f in factors {
                match f {
                    Expr::Num(r) if r.is_negative() && !flipped => {
                        flipped = true;
                        if *r != Rational::minus_one() {
                            out.push(Expr::Num(r.neg()));
                        }
                    }
                    other => out.push(other.clone()),
                }
            }
            match out.len() {
                0 => Expr::int(1),
                1 => out.remove(0),
                _ => Expr::Mul(out),
            }
        }
        other => Expr::neg(other.clone()),
    }
}

fn wrap(text: String, own: u8, parent: u8) -> String {
    if own < parent {
        format!("({text})")
    } else {
        text
    }
}

fn join(items: &[Expr]) -> String {
    items.iter().map(|e| render(e, 0)).collect::<Vec<_>>().join(", ")
}

fn render_mul(factors: &[Expr], parent: u8) -> String {
    if negative_coefficient(&Expr::Mul(factors.to_vec())) {
        let inner = render(&negate_for_print(&Expr::Mul(factors.to_vec())), PREC_NEG);
        return wrap(format!("-{inner}"), PREC_NEG, parent);
    }
    let mut coeff = Rational::one();
    let mut numer = Vec::new();
    let mut denom = Vec::new();
    for f in factors {
        match f {
            Expr::Num(r) => coeff = &coeff * r,
            Expr::Pow(base, exp) => match exp.as_rational() {
                Some(e) if e.is_negative() => {
                    if e == Rational::minus_one() {
                        denom.push((**base).clone());
                    } else {
                        denom.push(Expr::pow((**base).clone(), Expr::Num(e.neg())));
                    }
                }
                _ => numer.push(f.clone()),
            },
            other => numer.push(other.clone()),
        }
    }
    let mut num_parts: Vec<String> = Vec::new();
    if !coeff.numer().is_one() || numer.is_empty() {
        num_parts.push(coeff.numer().to_string());
    }
    num_parts.extend(numer.iter().map(|f| render(f, PREC_MUL + 1)));
    let mut text = num_parts.join("*");
    let mut den_parts: Vec<String> = Vec::new();
    if !coeff.denom().is_one() {
        den_parts.push(coeff.denom().to_string());
    }
    den_parts.extend(denom.iter().map(|f| render(f, PREC_MUL + 1)));
    if !den_parts.is_empty() {
        let den = if den_parts.len() == 1 {
            den_parts.remove(0)
        } else {
            format!("({})", den_parts.join("*"))
        };
        text = format!("{text}/{den}");
    }
    wrap(text, PREC_MUL, parent)
}

fn render(expr: &Expr, parent: u8) -> String {
    match expr {
        Expr::Num(r) => {
            let own = if r.is_negative() {
                PREC_NEG
            } else if r.is_integer() {
                u8::MAX
            } else {
                PREC_MUL
            };
            wrap(r.to_string(), own, parent)
        }
        Expr::Sym(name) => name.clone(),
        Expr::Str(text) => format!("{text:?}"),
        Expr::Const(c) => match c {
            Constant::Pi => "pi".to_string(),
            Constant::E => "E".to_string(),
            Constant::I => "I".to_string(),
            Constant::Infinity => "oo".to_string(),
        },
        Expr::Add(terms) => {
            if terms.is_empty() {
                return "0".to_string();
            }
            let mut text = render(&terms[0], PREC_ADD);
            for term in &terms[1..] {
                if negative_coefficient(term) {
                    text.push_str(" - ");
                    text.push_str(&render(&negate_for_print(term), PREC_ADD + 1));
                } else {
                    text.push_str(" + ");
                    text.push_str(&render(term, PREC_ADD));
                }
            }
            wrap(text, PREC_ADD, parent)
        }
        Expr::Mul(factors) => match factors.len() {
            0 => "1".to_string(),
            1 => render(&factors[0], parent),
            _ => render_mul(factors, parent),
        },
        Expr::Pow(base, exp) => {
            if exp.as_rational() == Some(Rational::half()) {
                return format!("sqrt({})", render(base, 0));
            }
            if exp.as_rational().is_some_and(|e| e.is_negative()) {
                return render_mul(std::slice::from_ref(expr), parent);
            }
            let text = format!("{}**{}", render(base, PREC_POW + 1), render(exp, PREC_POW + 1));
            wrap(text, PREC_POW, parent)
        }
        Expr::Func(f, arg) => format!("{}({})", f.name(), render(arg, 0)),
        Expr::Apply(name, args) => format!("{name}({})", join(args)),
        Expr::Derivative { expr, var, order } => {
            if *order == 1 {
                format!("Derivative({}, {var})", render(expr, 0))
            } else {
                format!("Derivative({}, {var}, {order})", render(expr, 0))
            }
        }
        Expr::Limit { expr, var, point, dir } => format!(
            "Limit({}, {var}, {}, \"{}\")",
            render(expr, 0),
            render(point, 0),
            dir.token()
        ),
        Expr::Eq(a, b) => format!("Eq({}, {})", render(a, 0), render(b, 0)),
        Expr::List(items) => format!("[{}]", join(items)),
        Expr::Dict(entries) => {
            let body = entries
                .iter()
                .map(|(k, v)| {
                    let key = if is_identifier(k) { k.clone() } else { format!("{k:?}") };
                    format!("{key}: {}", render(v, 0))
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{body}}}")
        }
        Expr::Matrix(rows) => {
            let body = rows
                .iter()
                .map(|r| format!("[{}]", join(r)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("Matrix([{body}])")
        }
        Expr::MatOp(op, m) => format!("{}({})", op.name(), render(m, 0)),
    }
}

/// Whether `text` is a plain identifier.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printer_restores_subtraction_and_division() {
        let x = Expr::sym("x");
        let e = Expr::sub(Expr::pow(x.clone(), Expr::int(2)), Expr::div(x.clone(), Expr::int(2)));
        assert_eq!(e.to_string(), "x**2 - x/2");
        let neg = Expr::neg(Expr::pow(x, Expr::int(2)));
        assert_eq!(neg.to_string(), "-x**2");
    }

    #[test]
    fn free_symbols_skip_limit_variable() {
        let e = Expr::Limit {
            expr: Box::new(Expr::mul(Expr::sym("a"), Expr::sym("x"))),
            var: "x".into(),
            point: Box::new(Expr::int(0)),
            dir: Direction::Plus,
        };
        assert_eq!(e.free_symbols().into_iter().collect::<Vec<_>>(), vec!["a".to_string()]);
    }
}
