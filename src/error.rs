//! Error taxonomy and HTTP mapping.
//!
//! Request-time failures (`CrudError`) convert straight into axum responses.
//! Configuration mistakes (`RegistrationError`) never reach request time:
//! they surface when a view is registered on the router.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::view::Action;

/// Failure inside a storage backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage backend failure: {0}")]
    Backend(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

/// One field-level problem found while binding a payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Structured payload-validation failure.
///
/// Collects every field issue found during one binding pass so clients see
/// the full picture instead of the first broken field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue::new(field, message)],
        }
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for issue in &self.issues {
            write!(f, "; {}: {}", issue.field, issue.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Request-time error for generated CRUD handlers.
#[derive(Debug, Clone, Error)]
pub enum CrudError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body for non-2xx responses that carry one.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldIssue>>,
}

impl IntoResponse for CrudError {
    fn into_response(self) -> Response {
        match self {
            // The generated surface promises empty 404 bodies.
            CrudError::NotFound(_) => StatusCode::NOT_FOUND.into_response(),
            CrudError::Validation(err) => {
                let body = Json(ErrorResponse {
                    error: err.to_string(),
                    code: "validation_error".to_string(),
                    details: Some(err.issues().to_vec()),
                });
                (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
            }
            CrudError::Store(err) => {
                let body = Json(ErrorResponse {
                    error: err.to_string(),
                    code: "storage_error".to_string(),
                    details: None,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
            CrudError::Internal(message) => {
                let body = Json(ErrorResponse {
                    error: message,
                    code: "internal_error".to_string(),
                    details: None,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CrudError>;

/// Programmer error detected while registering a view.
///
/// These fail loudly at startup; none of them can occur at request time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("View must configure a model or a queryset")]
    MissingCollection,

    #[error("No schema resolvable for the {0} action")]
    MissingSchema(Action),

    #[error("Filter field '{0}' is not part of the retrieve schema")]
    UnknownFilterField(String),

    #[error("Path prefix '{0}' is already registered")]
    DuplicatePrefix(String),

    #[error("Path prefix must not be empty")]
    EmptyPrefix,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_response_has_empty_body() {
        let response = CrudError::NotFound("entity '7' not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_display_lists_every_issue() {
        let err = ValidationError::new(vec![
            FieldIssue::new("sku", "missing required field"),
            FieldIssue::new("stock", "expects integer value"),
        ]);
        let rendered = err.to_string();
        assert!(rendered.contains("sku: missing required field"));
        assert!(rendered.contains("stock: expects integer value"));
    }

    #[test]
    fn poisoned_lock_maps_to_store_error() {
        let lock = std::sync::RwLock::new(());
        let guard = lock.read().unwrap();
        let poison = std::sync::PoisonError::new(guard);
        assert!(matches!(StoreError::from(poison), StoreError::Lock(_)));
    }
}
