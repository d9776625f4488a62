//! Repair profiles
//!
//! Cardinalities and default content used when a parsed diagnosis comes
//! back short. All texts are Vietnamese, matching what the model is asked
//! to produce.

use serde::{Deserialize, Serialize};
use triage_core::{SeverityLevel, SingleDiagnosis};

/// Repair profile defining target sizes and padding content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairProfile {
    /// Profile name (e.g., "standard@1.0")
    pub name: String,

    // === Structured results ===

    /// Exact number of alternative diagnoses after repair
    pub alternative_count: usize,

    /// Minimum length of every list field
    pub min_list_len: usize,

    /// Minimum reasons per diagnosis; short lists are reported, never padded
    pub min_reasons: usize,

    /// Appended until `alternative_count` is reached
    pub placeholder_alternative: SingleDiagnosis,

    pub general_advice_defaults: Vec<String>,
    pub related_symptoms_defaults: Vec<String>,
    pub recommended_actions_defaults: Vec<String>,

    /// Used when the model's severity label is missing or unknown
    pub default_severity: SeverityLevel,

    // === Free-text results ===

    pub unknown_condition: String,
    pub consult_doctor: String,
    pub disclaimer: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl RepairProfile {
    pub fn standard() -> Self {
        Self {
            name: "standard@1.0".to_string(),
            alternative_count: 2,
            min_list_len: 3,
            min_reasons: 3,
            placeholder_alternative: SingleDiagnosis::new(
                "Cần thêm thông tin",
                30,
                "Cần thêm triệu chứng để chẩn đoán",
                &["Triệu chứng chưa rõ", "Cần gặp bác sĩ", "Theo dõi thêm"],
            ),
            general_advice_defaults: strings(&["Nghỉ ngơi", "Uống nước", "Theo dõi"]),
            related_symptoms_defaults: strings(&["Mệt mỏi", "Khó chịu", "Lo lắng"]),
            recommended_actions_defaults: strings(&["Gặp bác sĩ", "Theo dõi", "Nghỉ ngơi"]),
            default_severity: SeverityLevel::Moderate,
            unknown_condition: "Không thể xác định rõ dựa trên triệu chứng đã cung cấp".to_string(),
            consult_doctor: "Vui lòng tham khảo ý kiến bác sĩ để được chẩn đoán chính xác"
                .to_string(),
            disclaimer: "Lưu ý: Đây chỉ là chẩn đoán sơ bộ dựa trên AI và không thay thế cho tư vấn y tế chuyên nghiệp. Vui lòng tham khảo ý kiến bác sĩ.".to_string(),
        }
    }

    /// Load profile from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        let profile: Self = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
        profile.validate()?;
        Ok(profile)
    }

    /// Padding needs at least `min_list_len` defaults per field
    pub fn validate(&self) -> Result<(), String> {
        for (field, defaults) in [
            ("general_advice_defaults", &self.general_advice_defaults),
            ("related_symptoms_defaults", &self.related_symptoms_defaults),
            ("recommended_actions_defaults", &self.recommended_actions_defaults),
        ] {
            if defaults.len() < self.min_list_len {
                return Err(format!(
                    "{} has {} entries, need at least {}",
                    field,
                    defaults.len(),
                    self.min_list_len
                ));
            }
        }
        Ok(())
    }
}

impl Default for RepairProfile {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_profile() {
        let profile = RepairProfile::standard();
        assert_eq!(profile.alternative_count, 2);
        assert_eq!(profile.min_list_len, 3);
        assert_eq!(profile.placeholder_alternative.confidence_percentage, 30);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip_validates() {
        let mut profile = RepairProfile::standard();
        profile.general_advice_defaults.truncate(1);
        let yaml = serde_yaml::to_string(&profile).unwrap();
        assert!(RepairProfile::from_yaml(&yaml).is_err());
    }
}
