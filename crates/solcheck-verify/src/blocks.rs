//! Heading-delimited block layout of a solution blob.
//!
//! A heading line is exactly `HEADING:` (spaces around the colon are
//! tolerated) and the content of a block runs until the next heading or the
//! end of the text.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The four recognised headings, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Heading {
    /// Exercise statement (`EXERCICE:`).
    #[serde(rename = "EXERCICE")]
    Statement,
    /// Worked solution (`SOLUTION:`).
    #[serde(rename = "SOLUTION")]
    Solution,
    /// Machine-readable final answer (`FINAL_ANSWER:`).
    #[serde(rename = "FINAL_ANSWER")]
    FinalAnswer,
    /// Machine-checkable assertion (`CHECK:`).
    #[serde(rename = "CHECK")]
    Check,
}

impl Heading {
    /// Every heading in canonical order.
    pub const ALL: [Heading; 4] = [
        Heading::Statement,
        Heading::Solution,
        Heading::FinalAnswer,
        Heading::Check,
    ];

    /// Literal token used on the wire.
    pub fn token(self) -> &'static str {
        match self {
            Heading::Statement => "EXERCICE",
            Heading::Solution => "SOLUTION",
            Heading::FinalAnswer => "FINAL_ANSWER",
            Heading::Check => "CHECK",
        }
    }

    /// Parses a wire token.
    pub fn from_token(token: &str) -> Option<Self> {
        Heading::ALL.into_iter().find(|h| h.token() == token)
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Trimmed block contents keyed by heading.
pub type Blocks = BTreeMap<Heading, String>;

fn heading_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(EXERCICE|SOLUTION|FINAL_ANSWER|CHECK)[ \t]*:[ \t]*$")
            .expect("valid heading regex")
    })
}

/// Heading-level view of a text, before the two-heading rule is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Scan {
    /// Trimmed text preceding the first heading.
    pub preamble: String,
    /// Blocks found, later duplicates winning.
    pub blocks: Blocks,
    /// Number of heading lines, duplicates included.
    pub headings: usize,
}

pub(crate) fn scan(text: &str) -> Scan {
    let text = text.replace("\r\n", "\n");
    let headings: Vec<(Heading, usize, usize)> = heading_line()
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let heading = Heading::from_token(caps.get(1)?.as_str())?;
            Some((heading, whole.start(), whole.end()))
        })
        .collect();
    let preamble_end = headings.first().map_or(text.len(), |(_, start, _)| *start);
    let mut blocks = Blocks::new();
    for (idx, (heading, _, content_start)) in headings.iter().enumerate() {
        let content_end = headings
            .get(idx + 1)
            .map_or(text.len(), |(_, next_start, _)| *next_start);
        blocks.insert(*heading, text[*content_start..content_end].trim().to_string());
    }
    Scan {
        preamble: text[..preamble_end].trim().to_string(),
        blocks,
        headings: headings.len(),
    }
}

/// Splits `text` into blocks.
///
/// Returns an empty mapping when fewer than two headings are present; the
/// caller is expected to synthesize blocks in that case. A heading repeated
/// later in the text overrides the earlier occurrence.
pub fn extract_blocks(text: &str) -> Blocks {
    let scan = scan(text);
    if scan.headings < 2 {
        return Blocks::new();
    }
    scan.blocks
}

fn non_empty_block(text: &str, heading: Heading) -> Option<String> {
    extract_blocks(text)
        .remove(&heading)
        .filter(|content| !content.is_empty())
}

/// Trimmed `FINAL_ANSWER` content, absent when missing or empty.
pub fn final_answer(text: &str) -> Option<String> {
    non_empty_block(text, Heading::FinalAnswer)
}

/// Trimmed `CHECK` content, absent when missing or empty.
pub fn check(text: &str) -> Option<String> {
    non_empty_block(text, Heading::Check)
}

/// Renders blocks back to heading text in canonical order.
///
/// Statement and solution headings are always written so the output parses
/// back into blocks; the final answer and check only when non-empty.
pub fn rebuild_blocks(blocks: &Blocks) -> String {
    let parts: Vec<String> = Heading::ALL
        .into_iter()
        .filter_map(|heading| {
            let content = blocks.get(&heading).map_or("", |c| c.trim());
            let always = matches!(heading, Heading::Statement | Heading::Solution);
            (always || !content.is_empty()).then(|| format!("{}:\n{}", heading.token(), content))
        })
        .collect();
    parts.join("\n\n").trim().to_string()
}

/// Coerces raw generator output into the strict four-heading layout.
///
/// Structured output keeps its blocks and gains the statement when it lacks
/// one. Unstructured output becomes the solution block, followed by empty
/// final answer and check headings.
pub fn build_solution_blocks(statement: &str, raw_solution: &str) -> String {
    let statement = statement.trim();
    let raw_solution = raw_solution.trim();
    let mut blocks = extract_blocks(raw_solution);
    let structured = [Heading::Solution, Heading::FinalAnswer, Heading::Check]
        .iter()
        .any(|h| blocks.contains_key(h));
    if structured {
        blocks
            .entry(Heading::Statement)
            .or_insert_with(|| statement.to_string());
        return rebuild_blocks(&blocks);
    }
    format!(
        "EXERCICE:\n{statement}\n\nSOLUTION:\n{raw_solution}\n\nFINAL_ANSWER:\n\nCHECK:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_heading_is_unstructured() {
        assert!(extract_blocks("CHECK:\nEq(x, 1)").is_empty());
    }

    #[test]
    fn tolerates_spaces_and_crlf() {
        let blocks = extract_blocks("SOLUTION :\r\nsteps\r\nFINAL_ANSWER:  \r\n 3 \r\n");
        assert_eq!(blocks.get(&Heading::Solution).map(String::as_str), Some("steps"));
        assert_eq!(blocks.get(&Heading::FinalAnswer).map(String::as_str), Some("3"));
    }

    #[test]
    fn later_duplicate_wins() {
        let blocks = extract_blocks("CHECK:\na\nFINAL_ANSWER:\n1\nCHECK:\nb");
        assert_eq!(blocks.get(&Heading::Check).map(String::as_str), Some("b"));
    }

    #[test]
    fn empty_answer_is_absent() {
        let text = "SOLUTION:\nwork\n\nFINAL_ANSWER:\n\nCHECK:\nEq(x, 1)";
        assert_eq!(final_answer(text), None);
        assert_eq!(check(text).as_deref(), Some("Eq(x, 1)"));
    }

    #[test]
    fn unstructured_output_gets_four_headings() {
        let text = build_solution_blocks("Enoncé", "juste du texte");
        let blocks = extract_blocks(&text);
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks.get(&Heading::Solution).map(String::as_str), Some("juste du texte"));
    }
}
