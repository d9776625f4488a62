//! Unified Error Model
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("INPUT/{}", .0.join("; "))]
    InvalidInput(Vec<String>),

    #[error("NOTFOUND/{0}")]
    NotFound(String),

    #[error("TRANSPORT/{0}")]
    Transport(String),

    #[error("PARSE/{0}")]
    Parse(String),

    #[error("VALIDATION/{0}")]
    Validation(String),

    #[error("STORAGE/{0}")]
    Storage(String),

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("TEMPLATE/{0}")]
    Template(String),

    #[error("UNAVAILABLE/{0}")]
    Unavailable(String),

    #[error("INTERNAL/{0}")]
    Internal(String),
}

/// Coarse classification used by the HTTP boundary to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Unavailable,
    Internal,
}

impl ErrorKind {
    /// HTTP status code mirrored into the response envelope
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::InvalidInput => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }
}

impl TriageError {
    pub fn invalid(message: impl Into<String>) -> Self {
        TriageError::InvalidInput(vec![message.into()])
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TriageError::InvalidInput(_) => ErrorKind::InvalidInput,
            TriageError::NotFound(_) => ErrorKind::NotFound,
            TriageError::Unavailable(_) => ErrorKind::Unavailable,
            TriageError::Transport(_)
            | TriageError::Parse(_)
            | TriageError::Validation(_)
            | TriageError::Storage(_)
            | TriageError::Config(_)
            | TriageError::Template(_)
            | TriageError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Individual messages, used for the `errors` field of the envelope
    pub fn messages(&self) -> Vec<String> {
        match self {
            TriageError::InvalidInput(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(TriageError::invalid("x").kind().status_code(), 400);
        assert_eq!(TriageError::NotFound("c1".into()).kind().status_code(), 404);
        assert_eq!(TriageError::Storage("down".into()).kind().status_code(), 500);
        assert_eq!(TriageError::Unavailable("vector".into()).kind().status_code(), 503);
    }

    #[test]
    fn test_invalid_input_display_joins_messages() {
        let err = TriageError::InvalidInput(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "INPUT/a; b");
        assert_eq!(err.messages(), vec!["a".to_string(), "b".to_string()]);
    }
}
