//! Error type for the symbolic engine.

use thiserror::Error;

/// Failures raised while parsing, simplifying or evaluating expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymError {
    /// Input text is not a well-formed expression.
    #[error("parse error at offset {position}: {message}")]
    Parse {
        /// Byte offset of the offending token.
        position: usize,
        /// What the parser expected.
        message: String,
    },
    /// Division by zero, `log(0)` and similar.
    #[error("undefined: {0}")]
    Undefined(String),
    /// Exact rational arithmetic left the representable range.
    #[error("exact arithmetic overflow")]
    Overflow,
    /// The engine has no rule for this operation.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// A scalar was required but a matrix, list, mapping or equality was given.
    #[error("not a scalar: {0}")]
    NotScalar(String),
    /// Matrix dimensions do not agree.
    #[error("shape mismatch: {0}")]
    Shape(String),
    /// Numeric evaluation left the function's domain or produced a non-finite value.
    #[error("domain error: {0}")]
    Domain(String),
    /// Numeric evaluation met a symbol without a binding.
    #[error("unbound symbol `{0}`")]
    Unbound(String),
}

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, SymError>;
