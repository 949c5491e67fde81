use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application error type for web handlers.
#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    NotFound(String),
    Validation(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    /// Classify a storage-layer error message by its leading `<kind>: ` part.
    ///
    /// Only the fixed prefix is inspected; the detail after it may echo user
    /// input. A `form N: ` prefix is skipped and the inner message decides.
    pub fn from_db(msg: String) -> Self {
        match classify(&msg) {
            Class::Validation => AppError::Validation(msg),
            Class::Conflict => AppError::Conflict(msg),
            Class::NotFound => AppError::NotFound(msg),
            Class::Internal => AppError::Internal(msg),
        }
    }
}

enum Class {
    Validation,
    Conflict,
    NotFound,
    Internal,
}

fn classify(msg: &str) -> Class {
    let (head, rest) = msg.split_once(": ").unwrap_or((msg, ""));
    if head.starts_with("invalid") {
        Class::Validation
    } else if head == "slug already exists" {
        Class::Conflict
    } else if head.ends_with(" not found") || head.ends_with(" not found in scope") {
        Class::NotFound
    } else if is_form_prefix(head) {
        match classify(rest) {
            Class::Internal => Class::Validation,
            inner => inner,
        }
    } else {
        Class::Internal
    }
}

fn is_form_prefix(head: &str) -> bool {
    head.strip_prefix("form ")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::from_db(msg)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(format!("invalid path: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(format!("invalid query: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
