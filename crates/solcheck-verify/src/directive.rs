//! `CHECK` directive classification and `key=value` parameter parsing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use solcheck_sym::expr::is_identifier;

/// Keyword leading a directive-form `CHECK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectiveKind {
    /// `SYSTEM; eq1; eq2; ...`
    System,
    /// `DERIVATIVE; var=..; func=..`
    Derivative,
    /// `INTEGRAL; var=..; integrand=..`
    Integral,
    /// `LIMIT; var=..; expr=..; point=..`
    Limit,
    /// `OPTIMIZE; var=..; func=..; domain=..; goal=..`
    Optimize,
}

impl DirectiveKind {
    /// Upper-case keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::System => "SYSTEM",
            DirectiveKind::Derivative => "DERIVATIVE",
            DirectiveKind::Integral => "INTEGRAL",
            DirectiveKind::Limit => "LIMIT",
            DirectiveKind::Optimize => "OPTIMIZE",
        }
    }

    /// Case-insensitive keyword lookup.
    pub fn from_keyword(word: &str) -> Option<Self> {
        let word = word.trim().to_uppercase();
        [
            DirectiveKind::System,
            DirectiveKind::Derivative,
            DirectiveKind::Integral,
            DirectiveKind::Limit,
            DirectiveKind::Optimize,
        ]
        .into_iter()
        .find(|kind| kind.keyword() == word)
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Classifies `check` by the token before its first `;`.
pub fn classify(check: Option<&str>) -> Option<DirectiveKind> {
    let check = check?.trim();
    let head = check.split(';').next().unwrap_or(check);
    DirectiveKind::from_keyword(head)
}

/// A parsed directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Leading keyword.
    pub kind: DirectiveKind,
    /// Every non-empty segment after the keyword, in order.
    pub segments: Vec<String>,
    /// `key=value` segments; keys are lower-cased, later duplicates win.
    pub params: BTreeMap<String, String>,
}

impl Directive {
    /// Parses a directive-form `CHECK`; `None` when the keyword is unknown.
    pub fn parse(check: &str) -> Option<Self> {
        let mut parts = check.trim().split(';');
        let kind = DirectiveKind::from_keyword(parts.next()?)?;
        let segments: Vec<String> = parts
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        let params = segments
            .iter()
            .filter_map(|segment| {
                let (key, value) = segment.split_once('=')?;
                let key = key.trim().to_lowercase();
                is_identifier(&key).then(|| (key, value.trim().to_string()))
            })
            .collect();
        Some(Self {
            kind,
            segments,
            params,
        })
    }

    /// Value of `key`, when present and non-empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Value of `var`, defaulting to `x`.
    pub fn var(&self) -> &str {
        self.get("var").unwrap_or("x")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_uses_leading_token_only() {
        assert_eq!(classify(Some(" derivative ; var=x")), Some(DirectiveKind::Derivative));
        assert_eq!(classify(Some("LIMIT")), Some(DirectiveKind::Limit));
        assert_eq!(classify(Some("Eq(x, LIMIT)")), None);
        assert_eq!(classify(None), None);
    }

    #[test]
    fn params_split_on_first_equals() {
        let directive = Directive::parse("OPTIMIZE; VAR=[x,y]; domain=[x+y<=10, x>=0]; goal=min")
            .expect("optimize directive");
        assert_eq!(directive.kind, DirectiveKind::Optimize);
        assert_eq!(directive.var(), "[x,y]");
        assert_eq!(directive.get("domain"), Some("[x+y<=10, x>=0]"));
        assert_eq!(directive.get("func"), None);
    }

    #[test]
    fn system_segments_are_kept_in_order() {
        let directive = Directive::parse("SYSTEM; Eq(x+y,1); ; Eq(x-y,3)").expect("system");
        assert_eq!(directive.segments, vec!["Eq(x+y,1)", "Eq(x-y,3)"]);
        assert!(directive.params.is_empty());
    }
}
