#![deny(missing_docs)]
#![doc = "Exact symbolic computation for verifying exercise answers: parsing, canonical simplification, calculus, solving and numeric evaluation."]

pub mod calculus;
pub mod canon;
pub mod error;
pub mod eval;
pub mod expr;
pub mod matrix;
pub mod parser;
pub mod rational;
pub mod solve;
pub mod subs;

pub use calculus::{differentiate, differentiate_unexpanded, limit, LimitValue};
pub use canon::{equals, is_zero, simplify};
pub use error::{Result, SymError};
pub use eval::{evaluate, evaluate_real, Complex64};
pub use expr::{Constant, Direction, Expr, Func, MatOp};
pub use parser::{parse, parse_with, ParseOptions};
pub use rational::Rational;
pub use solve::{solve_system, solve_univariate, Root, Solution, SolveOptions};
pub use subs::{substitute, substitute_one};
