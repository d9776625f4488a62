//! Diagnosis request input, accepted as JSON or as an urlencoded form.
//!
//! Both encodings carry the same fields and normalize into one
//! [`SymptomQuery`] plus the caller's user id.
use crate::error::ApiError;
use axum::{
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::Deserialize;
use triage_core::{SymptomQuery, TriageError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymptomFields {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub patient_age: Option<AgeValue>,
    #[serde(default)]
    pub patient_gender: Option<String>,
}

/// Form fields arrive as text, JSON callers may send either
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AgeValue {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone)]
pub enum SymptomInput {
    Json(SymptomFields),
    Form(SymptomFields),
}

impl SymptomInput {
    pub fn encoding(&self) -> &'static str {
        match self {
            SymptomInput::Json(_) => "json",
            SymptomInput::Form(_) => "form",
        }
    }

    /// Validate and normalize. Every problem is reported at once.
    pub fn into_query(self) -> Result<(String, SymptomQuery), TriageError> {
        let fields = match self {
            SymptomInput::Json(fields) | SymptomInput::Form(fields) => fields,
        };

        let mut errors = Vec::new();
        let user_id = fields
            .user_id
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        if user_id.is_none() {
            errors.push("user_id không được để trống".to_string());
        }

        let age = match fields.patient_age {
            None => None,
            Some(AgeValue::Number(age)) => Some(age),
            Some(AgeValue::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    None
                } else {
                    match text.parse::<i64>() {
                        Ok(age) => Some(age),
                        Err(_) => {
                            errors.push("Tuổi phải là số nguyên".to_string());
                            None
                        }
                    }
                }
            }
        };

        let query = SymptomQuery::new(
            fields.symptoms.unwrap_or_default(),
            age,
            fields.patient_gender,
        );

        match (query, user_id) {
            (Ok(query), Some(user_id)) if errors.is_empty() => Ok((user_id, query)),
            (Err(TriageError::InvalidInput(more)), _) => {
                errors.extend(more);
                Err(TriageError::InvalidInput(errors))
            }
            (Err(other), _) => Err(other),
            _ => Err(TriageError::InvalidInput(errors)),
        }
    }
}

impl<S> FromRequest<S> for SymptomInput
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match content_type.as_str() {
            "application/json" => {
                let Json(fields) = Json::<SymptomFields>::from_request(req, state)
                    .await
                    .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
                Ok(SymptomInput::Json(fields))
            }
            "application/x-www-form-urlencoded" => {
                let Form(fields) = Form::<SymptomFields>::from_request(req, state)
                    .await
                    .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
                Ok(SymptomInput::Form(fields))
            }
            "" => Err(ApiError::UnsupportedMediaType("missing Content-Type".to_string())),
            other => Err(ApiError::UnsupportedMediaType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(user: Option<&str>, symptoms: Option<&str>, age: Option<AgeValue>) -> SymptomFields {
        SymptomFields {
            user_id: user.map(str::to_string),
            symptoms: symptoms.map(str::to_string),
            patient_age: age,
            patient_gender: Some(" nam ".to_string()),
        }
    }

    #[test]
    fn test_json_and_form_normalize_alike() {
        let json = SymptomInput::Json(fields(Some("u1"), Some(" ho "), Some(AgeValue::Number(30))));
        let form = SymptomInput::Form(fields(Some("u1"), Some("ho"), Some(AgeValue::Text("30".into()))));

        assert_eq!(json.into_query().unwrap(), form.into_query().unwrap());
    }

    #[test]
    fn test_blank_form_age_is_absent() {
        let input = SymptomInput::Form(fields(Some("u1"), Some("ho"), Some(AgeValue::Text(" ".into()))));
        let (_, query) = input.into_query().unwrap();
        assert_eq!(query.patient_age(), None);
        assert_eq!(query.patient_gender(), Some("nam"));
    }

    #[test]
    fn test_all_errors_reported() {
        let input = SymptomInput::Json(fields(None, Some("  "), Some(AgeValue::Number(200))));
        match input.into_query() {
            Err(TriageError::InvalidInput(errors)) => {
                assert_eq!(
                    errors,
                    vec![
                        "user_id không được để trống".to_string(),
                        "Triệu chứng không được để trống".to_string(),
                        "Tuổi phải từ 0 đến 150".to_string(),
                    ]
                );
            }
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_age() {
        let input = SymptomInput::Form(fields(Some("u1"), Some("ho"), Some(AgeValue::Text("ba mươi".into()))));
        match input.into_query() {
            Err(TriageError::InvalidInput(errors)) => {
                assert_eq!(errors, vec!["Tuổi phải là số nguyên".to_string()]);
            }
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn test_untagged_age_from_json() {
        let fields: SymptomFields =
            serde_json::from_str(r#"{"user_id":"u","symptoms":"ho","patient_age":"41"}"#).unwrap();
        assert!(matches!(fields.patient_age, Some(AgeValue::Text(ref t)) if t == "41"));
    }
}
