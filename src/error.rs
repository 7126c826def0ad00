use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use serde_json::json;

use crate::services::media::MediaError;
use crate::services::storage::StorageError;

/// Field name to the list of messages describing why it was rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            for err in errs {
                out.add(field, describe(field, err));
            }
        }
        out
    }
}

fn describe(field: &str, err: &validator::ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    let label = field.replace('_', " ");
    let param = |name: &str| {
        err.params
            .get(name)
            .map(|v| v.to_string())
            .unwrap_or_default()
    };
    match err.code.as_ref() {
        "length" if err.params.contains_key("max") => {
            format!("The {label} must not be greater than {} characters.", param("max"))
        }
        "length" => format!("The {label} must be at least {} characters.", param("min")),
        "email" => format!("The {label} must be a valid email address."),
        "url" => format!("The {label} must be a valid URL."),
        "range" => format!(
            "The {label} must be between {} and {}.",
            param("min"),
            param("max")
        ),
        code => format!("The {label} is invalid ({code})."),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("duplicate {field}: {message}")]
    Duplicate { field: String, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(entity: &str) -> Self {
        AppError::NotFound(format!("{entity} not found"))
    }

    /// Maps a unique-constraint violation onto the natural key that caused it,
    /// leaving every other database error untouched.
    pub fn unique_violation(err: DbErr, field: &str, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Duplicate {
                field: field.to_string(),
                message: message.to_string(),
            },
            _ => AppError::Database(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Duplicate { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Rejected(problems) => {
                let mut errors = FieldErrors::new();
                for problem in problems {
                    errors.add("file", problem);
                }
                AppError::Validation(errors)
            }
            MediaError::Storage(e) => AppError::Storage(e),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(errors) => json!({
                "message": "The given data was invalid.",
                "errors": errors,
            }),
            AppError::Duplicate { field, message } => json!({
                "message": message,
                "errors": FieldErrors::single(field, message.clone()),
            }),
            AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg) => json!({ "message": msg }),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                json!({ "message": "Internal server error" })
            }
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Storage error");
                json!({ "message": "Internal server error" })
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                json!({ "message": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}
