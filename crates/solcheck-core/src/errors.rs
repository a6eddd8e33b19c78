//! Error surface shared by the solcheck crates.
//!
//! Verifiers turn these into failing report items; they only escape as
//! `Err` from configuration loading and serialization.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code, message and optional context carried by every [`SolcheckError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Short stable identifier such as `policy_tolerance` or `answer`.
    pub code: String,
    /// What went wrong.
    pub message: String,
    /// Offending field, input excerpt, parser position.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// How to fix the input, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload without context or hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records `key=value`; a repeated key keeps the last value.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Attaches a remediation hint.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        Self {
            hint: Some(hint.into()),
            ..self
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        let mut pairs = self.context.iter();
        if let Some((key, value)) = pairs.next() {
            write!(f, " ({key}={value}")?;
            for (key, value) in pairs {
                write!(f, ", {key}={value}")?;
            }
            f.write_str(")")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "; hint: {hint}")?;
        }
        Ok(())
    }
}

/// Failure families of the verification pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SolcheckError {
    /// `FINAL_ANSWER`, `CHECK` or a directive parameter could not be read.
    #[error("parse error: {0}")]
    Parse(ErrorInfo),
    /// The tolerance policy is unreadable or out of range.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// The symbolic engine rejected an operation.
    #[error("symbolic error: {0}")]
    Symbolic(ErrorInfo),
    /// An expression had no finite value where one was needed.
    #[error("numeric error: {0}")]
    Numeric(ErrorInfo),
    /// JSON or YAML encoding failed.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl SolcheckError {
    /// The payload, whatever the family.
    pub fn info(&self) -> &ErrorInfo {
        let (Self::Parse(info)
        | Self::Config(info)
        | Self::Symbolic(info)
        | Self::Numeric(info)
        | Self::Serde(info)) = self;
        info
    }

    /// Shorthand for `self.info().code`.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// True when the submitted text, not the policy or the engine, is at fault.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
