//! Raw output cleaning.
//!
//! Removes what reasoning models wrap around the answer:
//! - `<think>...</think>` reasoning blocks
//! - markdown code fences around JSON

use lazy_static::lazy_static;
use regex::Regex;

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

lazy_static! {
    /// Balanced reasoning span, non-greedy across lines
    static ref THINK_SPAN: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();
}

/// Drop reasoning content, keeping only the answer body.
pub fn strip_thinking(text: &str) -> String {
    let text = text.trim();
    let has_open = text.contains(THINK_OPEN);

    if let Some(close) = text.rfind(THINK_CLOSE) {
        let tail = text[close + THINK_CLOSE.len()..].trim();
        if !tail.is_empty() {
            return tail.to_string();
        }

        // Nothing after the last close marker: the answer, if any, sits around the spans
        let mut body = THINK_SPAN.replace_all(text, "").to_string();
        if let Some(orphan) = body.rfind(THINK_CLOSE) {
            body = body[orphan + THINK_CLOSE.len()..].to_string();
        }
        if let Some(orphan) = body.find(THINK_OPEN) {
            body.truncate(orphan);
        }
        return body.trim().to_string();
    }

    if has_open {
        // Unterminated reasoning runs to the end of the text
        if let Some(open) = text.find(THINK_OPEN) {
            return text[..open].trim().to_string();
        }
    }

    text.to_string()
}

/// Strip a leading "```json" fence and a trailing "```".
///
/// A bare "```" opening fence is stripped as well. Any other language tag
/// after the backticks stays in the output and fails the structured parse.
pub fn strip_fences(text: &str) -> String {
    let mut result = text.trim();

    if let Some(rest) = result.strip_prefix("```json") {
        result = rest;
    } else if let Some(rest) = result.strip_prefix("```") {
        result = rest;
    }
    if let Some(rest) = result.strip_suffix("```") {
        result = rest;
    }

    result.trim().to_string()
}

/// Full cleaning pass applied before any parse strategy
pub fn clean(raw: &str) -> String {
    strip_fences(&strip_thinking(raw))
}
