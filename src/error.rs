//! # Error Responder
//!
//! Every failure on the request path is an [`ApiError`]. The enum is the only
//! place where error statuses and error bodies are decided: the server writes
//! whatever [`ApiError::status`] and [`ApiError::envelope`] return, and
//! handlers never build error JSON themselves.
//!
//! ## Envelope
//!
//! ```json
//! { "message": "Request validation failed",
//!   "errors": [ { "path": "/body/email", "message": "\"email\" is a required property" } ] }
//! ```
//!
//! `errors` is omitted when a failure carries no field-level detail.
//!
//! | Variant | Status |
//! |---|---|
//! | `SchemaViolation`, `MalformedRequest` | 400 |
//! | `RouteNotFound`, `NotFound` | 404 |
//! | `ResponseContract`, `Unhandled` | 500 |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One field-level problem found while validating a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer into the request part, e.g. `/body/email` or `/path/id`
    pub path: String,
    /// Human-readable description of the problem
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// JSON error body sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Violation>>,
}

/// Failure taxonomy of the request path.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request does not match the schema of its operation.
    #[error("request validation failed with {} violation(s)", errors.len())]
    SchemaViolation { errors: Vec<Violation> },

    /// Validated data could not be turned into the handler's typed request.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// No schema operation matches the method and path.
    #[error("{method} {path} not found in schema")]
    RouteNotFound { method: String, path: String },

    /// The addressed record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A handler produced a body that violates the declared response schema.
    #[error("response validation failed with {} violation(s)", errors.len())]
    ResponseContract { errors: Vec<Violation> },

    /// Anything else: handler panics, missing handlers, closed channels.
    #[error("unhandled fault: {0}")]
    Unhandled(String),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unhandled(detail: impl Into<String>) -> Self {
        Self::Unhandled(detail.into())
    }

    /// HTTP status for this failure.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            ApiError::SchemaViolation { .. } | ApiError::MalformedRequest(_) => 400,
            ApiError::RouteNotFound { .. } | ApiError::NotFound(_) => 404,
            ApiError::ResponseContract { .. } | ApiError::Unhandled(_) => 500,
        }
    }

    /// Client-facing body for this failure.
    ///
    /// `Unhandled` details stay in the logs; clients only see the generic message.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            ApiError::SchemaViolation { errors } => ErrorEnvelope {
                message: "Request validation failed".to_string(),
                errors: Some(errors.clone()),
            },
            ApiError::ResponseContract { errors } => ErrorEnvelope {
                message: "Response validation failed".to_string(),
                errors: Some(errors.clone()),
            },
            ApiError::Unhandled(_) => ErrorEnvelope {
                message: "Internal Server Error".to_string(),
                errors: None,
            },
            other => ErrorEnvelope {
                message: other.to_string(),
                errors: None,
            },
        }
    }

    /// Envelope as a JSON value.
    #[must_use]
    pub fn body(&self) -> serde_json::Value {
        serde_json::to_value(self.envelope())
            .unwrap_or_else(|_| serde_json::json!({ "message": "Internal Server Error" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(ApiError::SchemaViolation { errors: vec![] }.status(), 400);
        assert_eq!(ApiError::MalformedRequest("x".into()).status(), 400);
        assert_eq!(
            ApiError::RouteNotFound {
                method: "GET".into(),
                path: "/nope".into()
            }
            .status(),
            404
        );
        assert_eq!(ApiError::not_found("User not found").status(), 404);
        assert_eq!(ApiError::ResponseContract { errors: vec![] }.status(), 500);
        assert_eq!(ApiError::unhandled("boom").status(), 500);
    }

    #[test]
    fn not_found_envelope_has_no_errors_key() {
        let body = ApiError::not_found("User not found").body();
        assert_eq!(body, json!({ "message": "User not found" }));
    }

    #[test]
    fn schema_violation_lists_fields() {
        let err = ApiError::SchemaViolation {
            errors: vec![Violation::new("/body/email", "\"email\" is a required property")],
        };
        let body = err.body();
        assert_eq!(body["message"], "Request validation failed");
        assert_eq!(body["errors"][0]["path"], "/body/email");
    }

    #[test]
    fn route_not_found_names_operation() {
        let err = ApiError::RouteNotFound {
            method: "PATCH".into(),
            path: "/v1/users/1".into(),
        };
        assert_eq!(err.envelope().message, "PATCH /v1/users/1 not found in schema");
    }

    #[test]
    fn unhandled_hides_detail_from_client() {
        let err = ApiError::unhandled("index out of bounds");
        assert_eq!(err.status(), 500);
        assert_eq!(err.body(), json!({ "message": "Internal Server Error" }));
        assert!(err.to_string().contains("index out of bounds"));
    }
}
