//! Section grammar for free-text diagnoses.
//!
//! The model is asked to answer under three fixed headers, in this order:
//!
//! ```text
//! TÌNH TRẠNG CÓ THỂ:
//! - condition
//! ĐỀ XUẤT VÀ LỜI KHUYÊN:
//! - advice
//! MỨC ĐỘ NGHIÊM TRỌNG:
//! severity
//! ```
//!
//! Every section is optional. A missing header yields an empty field.

use crate::cleaner;
use serde::Serialize;

pub const CONDITIONS_HEADER: &str = "TÌNH TRẠNG CÓ THỂ:";
pub const RECOMMENDATIONS_HEADER: &str = "ĐỀ XUẤT VÀ LỜI KHUYÊN:";
pub const SEVERITY_HEADER: &str = "MỨC ĐỘ NGHIÊM TRỌNG:";

/// Prefix of the synthetic advice entry echoing the severity
pub const SEVERITY_ECHO_PREFIX: &str = "Mức độ nghiêm trọng: ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedSections {
    pub conditions: Vec<String>,
    pub recommendations: Vec<String>,
    pub severity: Option<String>,
}

impl ParsedSections {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.recommendations.is_empty() && self.severity.is_none()
    }
}

/// Parse raw model text. Never fails; absent sections come back empty.
pub fn parse_sections(raw: &str) -> ParsedSections {
    let text = cleaner::clean(raw);

    let conditions = section_block(&text, CONDITIONS_HEADER, Some(RECOMMENDATIONS_HEADER))
        .map(bullets)
        .unwrap_or_default();

    let mut recommendations = section_block(&text, RECOMMENDATIONS_HEADER, Some(SEVERITY_HEADER))
        .map(bullets)
        .unwrap_or_default();

    let severity = section_block(&text, SEVERITY_HEADER, None).and_then(|block| {
        block
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    });

    if let Some(level) = &severity {
        recommendations.push(format!("{}{}", SEVERITY_ECHO_PREFIX, level));
    }

    tracing::debug!(
        conditions = conditions.len(),
        recommendations = recommendations.len(),
        has_severity = severity.is_some(),
        "parsed free-text sections"
    );

    ParsedSections {
        conditions,
        recommendations,
        severity,
    }
}

/// Text between `header` and the first `end` header after it (or end of text)
fn section_block<'a>(text: &'a str, header: &str, end: Option<&str>) -> Option<&'a str> {
    let start = text.find(header)? + header.len();
    let rest = &text[start..];
    let stop = end.and_then(|h| rest.find(h)).unwrap_or(rest.len());
    Some(&rest[..stop])
}

/// Lines starting with `-`, with the marker and surrounding whitespace stripped
fn bullets(block: &str) -> Vec<String> {
    block
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-'))
        .map(|line| line.trim_start_matches(['-', ' ']).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
