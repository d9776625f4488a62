//! Triage Parse: raw LLM text to parse results
//!
//! Two grammars are understood:
//!
//! - free text with fixed Vietnamese section headers ([`parse_sections`])
//! - a single JSON object with six required keys ([`parse_candidate`])
//!
//! Both run the same cleaning pass first (reasoning blocks, code fences).
//!
//! # Example
//!
//! ```
//! use triage_parse::parse_sections;
//!
//! let parsed = parse_sections("TÌNH TRẠNG CÓ THỂ:\n- Cảm cúm\nMỨC ĐỘ NGHIÊM TRỌNG:\nNhẹ");
//! assert_eq!(parsed.conditions, vec!["Cảm cúm"]);
//! assert_eq!(parsed.severity.as_deref(), Some("Nhẹ"));
//! ```

pub mod cleaner;
pub mod sections;
pub mod structured;

pub use cleaner::clean;
pub use sections::{parse_sections, ParsedSections};
pub use structured::{parse_candidate, DiagnosisCandidate, PRIMARY_KEYS, REQUIRED_KEYS};
