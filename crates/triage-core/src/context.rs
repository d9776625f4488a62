//! Request context: per-request identifiers carried through the pipeline
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub provider: String,
    pub user_id: Option<String>,
    pub locale: String,
}

impl RequestContext {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            provider: provider.into(),
            user_id: None,
            locale: "vi".to_string(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}
