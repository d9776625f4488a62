//! Integration tests for triage-parse with realistic model responses.

use triage_core::StageError;
use triage_parse::{parse_candidate, parse_sections};

// =============================================================================
// Free-text grammar
// =============================================================================

#[test]
fn test_thinking_block_then_sections() {
    let raw = "<think>reasoning</think>TÌNH TRẠNG CÓ THỂ:\n- Cảm cúm\nĐỀ XUẤT VÀ LỜI KHUYÊN:\n- Nghỉ ngơi\nMỨC ĐỘ NGHIÊM TRỌNG:\nNhẹ";
    let parsed = parse_sections(raw);

    assert_eq!(parsed.conditions, vec!["Cảm cúm"]);
    assert_eq!(parsed.recommendations, vec!["Nghỉ ngơi", "Mức độ nghiêm trọng: Nhẹ"]);
    assert_eq!(parsed.severity.as_deref(), Some("Nhẹ"));
}

#[test]
fn test_thinking_never_leaks() {
    let body = "TÌNH TRẠNG CÓ THỂ:\n- Viêm họng\n- Cảm lạnh\nĐỀ XUẤT VÀ LỜI KHUYÊN:\n- Súc miệng nước muối\n- Uống nhiều nước";
    let thinking = "<think>\nTÌNH TRẠNG CÓ THỂ:\n- Ung thư\nMaybe something else\n</think>\n";

    assert_eq!(parse_sections(&format!("{}{}", thinking, body)), parse_sections(body));
}

#[test]
fn test_full_response_order_preserved() {
    let raw = r#"
TÌNH TRẠNG CÓ THỂ:
  - Viêm dạ dày cấp
  -  Ngộ độc thực phẩm
  - Hội chứng ruột kích thích

ĐỀ XUẤT VÀ LỜI KHUYÊN:
  - Ăn nhẹ, chia nhỏ bữa
  - Bù nước bằng oresol
  - Đi khám nếu đau kéo dài quá 24 giờ

MỨC ĐỘ NGHIÊM TRỌNG:
Trung bình
"#;
    let parsed = parse_sections(raw);

    assert_eq!(
        parsed.conditions,
        vec!["Viêm dạ dày cấp", "Ngộ độc thực phẩm", "Hội chứng ruột kích thích"]
    );
    assert_eq!(parsed.recommendations.len(), 4);
    assert_eq!(parsed.recommendations[0], "Ăn nhẹ, chia nhỏ bữa");
    assert_eq!(parsed.recommendations[3], "Mức độ nghiêm trọng: Trung bình");
}

#[test]
fn test_unterminated_thinking_yields_nothing() {
    let parsed = parse_sections("<think>TÌNH TRẠNG CÓ THỂ:\n- Cảm cúm");
    assert!(parsed.is_empty());
}

// =============================================================================
// Structured grammar
// =============================================================================

#[test]
fn test_fenced_json_after_thinking() {
    let raw = r#"<think>Bệnh nhân sốt cao</think>
```json
{
  "primary_diagnosis": {
    "diagnosis_name": "Sốt xuất huyết",
    "confidence_percentage": 75,
    "description": "Nhiễm virus Dengue",
    "reasons": ["Sốt cao", "Đau cơ", "Phát ban"]
  },
  "alternative_diagnoses": [
    {"diagnosis_name": "Cúm", "confidence_percentage": 40, "description": "Nhiễm cúm", "reasons": ["Sốt"]}
  ],
  "general_advice": ["Uống nhiều nước", "Nghỉ ngơi"],
  "overall_severity_level": "nghiêm trọng",
  "related_symptoms": ["Chảy máu chân răng"],
  "recommended_actions": ["Xét nghiệm máu"]
}
```"#;
    let candidate = parse_candidate(raw).unwrap();

    assert_eq!(candidate.primary_diagnosis.diagnosis_name, "Sốt xuất huyết");
    assert_eq!(candidate.alternative_diagnoses.len(), 1);
    assert_eq!(candidate.general_advice, vec!["Uống nhiều nước", "Nghỉ ngơi"]);
}

#[test]
fn test_free_text_is_not_a_structured_candidate() {
    let raw = "TÌNH TRẠNG CÓ THỂ:\n- Cảm cúm";
    assert!(matches!(parse_candidate(raw), Err(StageError::Syntax(_))));
}

#[test]
fn test_array_top_level_is_malformed() {
    assert!(matches!(parse_candidate("[1, 2, 3]"), Err(StageError::Malformed(_))));
}
