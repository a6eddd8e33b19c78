use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ErrorInfo, SolcheckError};

/// Broad category of evidence a report is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Text-shape checks only.
    Structural,
    /// Exact symbolic comparisons.
    Symbolic,
    /// Numeric recomputation or sampling.
    Numeric,
    /// Any combination of the above.
    Mixed,
}

/// Observable markers describing how the verified input was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFlag {
    /// The normalizer rewrote the input before verification.
    AutoFixed,
    /// The normalizer appended a clause to a short statement.
    StatementPadded,
}

/// Atomic, named verification outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckItem {
    /// Dotted identifier such as `symbolic.derivative`.
    pub name: String,
    /// Whether the check passed.
    pub ok: bool,
    /// Human readable explanation.
    pub message: String,
}

impl CheckItem {
    /// Creates a check item.
    pub fn new(name: impl Into<String>, ok: bool, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok,
            message: message.into(),
        }
    }
}

/// Aggregated verification report.
///
/// `ok` is the conjunction of every item. Items can only be appended, so once a
/// failing item is recorded the report stays failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReportRepr")]
pub struct VerifyReport {
    ok: bool,
    /// Category of evidence.
    pub kind: ReportKind,
    /// One-line description of what was verified.
    pub summary: String,
    items: Vec<CheckItem>,
    /// Free-form diagnostics (solutions found, symbols used, ...).
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
    /// Provenance markers.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub flags: BTreeSet<ReportFlag>,
}

#[derive(Deserialize)]
struct ReportRepr {
    ok: bool,
    kind: ReportKind,
    summary: String,
    items: Vec<CheckItem>,
    #[serde(default)]
    details: BTreeMap<String, Value>,
    #[serde(default)]
    flags: BTreeSet<ReportFlag>,
}

impl TryFrom<ReportRepr> for VerifyReport {
    type Error = SolcheckError;

    fn try_from(repr: ReportRepr) -> Result<Self, Self::Error> {
        let expected = repr.items.iter().all(|item| item.ok);
        if repr.ok != expected {
            return Err(SolcheckError::Serde(
                ErrorInfo::new("report_ok_mismatch", "`ok` disagrees with the check items")
                    .with_context("ok", repr.ok.to_string()),
            ));
        }
        Ok(Self {
            ok: repr.ok,
            kind: repr.kind,
            summary: repr.summary,
            items: repr.items,
            details: repr.details,
            flags: repr.flags,
        })
    }
}

impl VerifyReport {
    /// Creates an empty, passing report.
    pub fn new(kind: ReportKind, summary: impl Into<String>) -> Self {
        Self {
            ok: true,
            kind,
            summary: summary.into(),
            items: Vec::new(),
            details: BTreeMap::new(),
            flags: BTreeSet::new(),
        }
    }

    /// Records a check outcome.
    pub fn add(&mut self, name: impl Into<String>, ok: bool, message: impl Into<String>) {
        self.push(CheckItem::new(name, ok, message));
    }

    /// Records a prebuilt item.
    pub fn push(&mut self, item: CheckItem) {
        self.ok &= item.ok;
        self.items.push(item);
    }

    /// Appends several items in order.
    pub fn extend<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = CheckItem>,
    {
        for item in items {
            self.push(item);
        }
    }

    /// Stores a serializable diagnostic under `key`.
    pub fn detail(&mut self, key: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.details.insert(key.into(), value);
    }

    /// Sets a provenance flag.
    pub fn flag(&mut self, flag: ReportFlag) {
        self.flags.insert(flag);
    }

    /// Whether every recorded check passed.
    pub fn ok(&self) -> bool {
        self.ok
    }

    /// Recorded checks in insertion order.
    pub fn items(&self) -> &[CheckItem] {
        &self.items
    }

    /// Consumes the report and returns its items.
    pub fn into_items(self) -> Vec<CheckItem> {
        self.items
    }

    /// Returns the item recorded under `name`, if any.
    pub fn item(&self, name: &str) -> Option<&CheckItem> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Iterates over failing items.
    pub fn failures(&self) -> impl Iterator<Item = &CheckItem> {
        self.items.iter().filter(|item| !item.ok)
    }
}
