//! Errors raised by the catalog, profile and GeoIP stores.

use std::fmt;

use crate::models::TargetCategory;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Where a repository call failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// Repository method, e.g. `cone_search`.
    pub operation: Option<String>,
    pub category: Option<TargetCategory>,
    /// Target identifier, user id or file the call was about.
    pub subject: Option<String>,
    pub details: Option<String>,
    pub retryable: bool,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: TargetCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_subject(mut self, subject: impl fmt::Display) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = Vec::with_capacity(5);
        if let Some(op) = &self.operation {
            fields.push(format!("op={}", op));
        }
        if let Some(category) = self.category {
            fields.push(format!("category={}", category));
        }
        if let Some(subject) = &self.subject {
            fields.push(format!("subject={}", subject));
        }
        if let Some(details) = &self.details {
            fields.push(details.clone());
        }
        if self.retryable {
            fields.push("retryable".to_string());
        }
        write!(f, "[{}]", fields.join(", "))
    }
}

/// Broad class of a repository failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The store (or one catalog in it) could not be reached.
    Connection,
    Query,
    NotFound,
    /// Stored or supplied data is malformed.
    Validation,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Connection => "Store unavailable",
            ErrorKind::Query => "Query failed",
            ErrorKind::NotFound => "Not found",
            ErrorKind::Validation => "Invalid data",
            ErrorKind::Internal => "Repository failure",
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message} {context}")]
pub struct RepositoryError {
    kind: ErrorKind,
    message: String,
    context: ErrorContext,
}

impl RepositoryError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Unreachable store; retryable unless a context says otherwise.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message).with_context(ErrorContext::default().retryable())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Query, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn is_retryable(&self) -> bool {
        self.context.retryable
    }

    /// Replaces the whole context.
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    /// Records the calling operation, keeping the rest of the context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::validation(err.to_string()).with_context(
            ErrorContext::default()
                .with_details(format!("line {}, column {}", err.line(), err.column())),
        )
    }
}
