//! Caller-visible errors of the planning API.
//!
//! Only malformed requests, configuration problems, cancellation and fatal
//! collaborator failures surface here. Per-target and per-category anomalies
//! are absorbed by the planner and never become a `PlanError`.

use crate::db::RepositoryError;

pub type PlanResult<T> = Result<T, PlanError>;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// A request parameter is out of range; raised before any scoring.
    #[error("Invalid request field '{field}': {message}")]
    InvalidRequest { field: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Plan computation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PlanError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }
}

impl From<tokio::task::JoinError> for PlanError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            PlanError::Cancelled
        } else {
            PlanError::Internal(format!("Scoring worker panicked: {}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_message() {
        let err = PlanError::invalid("observer_lat", "must be within [-90, 90]");
        assert!(err.is_client_error());
        assert_eq!(
            err.to_string(),
            "Invalid request field 'observer_lat': must be within [-90, 90]"
        );
    }

    #[test]
    fn test_repository_error_is_transparent() {
        let err: PlanError = RepositoryError::not_found("profile 7").into();
        assert!(!err.is_client_error());
        assert!(err.to_string().starts_with("Not found: profile 7"));
    }
}
