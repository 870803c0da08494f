use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use color_eyre::{eyre::eyre, Report};
use itertools::Itertools as _;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// An error on its way to becoming an HTTP response.
///
/// The status decides the body: validation failures render their field map,
/// other client errors their message, and server errors a fixed text while the
/// report itself only goes to the logs.
pub struct ServerError(pub(crate) Report, pub(crate) StatusCode);

impl ServerError {
    pub(crate) fn not_found() -> Self {
        Self(eyre!("Not found."), StatusCode::NOT_FOUND)
    }

    pub(crate) fn bad_request<M>(message: M) -> Self
    where
        M: Display + Debug + Send + Sync + 'static,
    {
        Self(eyre!(message), StatusCode::BAD_REQUEST)
    }

    pub(crate) fn invalid(errors: FieldErrors) -> Self {
        Self(errors.into(), StatusCode::BAD_REQUEST)
    }

    pub(crate) fn unauthorized<M>(message: M) -> Self
    where
        M: Display + Debug + Send + Sync + 'static,
    {
        Self(eyre!(message), StatusCode::UNAUTHORIZED)
    }

    pub(crate) fn forbidden<M>(message: M) -> Self
    where
        M: Display + Debug + Send + Sync + 'static,
    {
        Self(eyre!(message), StatusCode::FORBIDDEN)
    }
}

impl Debug for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Status Code: {}\n{:?}", self.1, self.0)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let ServerError(report, status) = self;

        if status.is_server_error() {
            tracing::error!(error = ?report, %status, "Request failed");

            return (
                status,
                Json(json!({ "detail": "Internal server error." })),
            )
                .into_response();
        }

        tracing::debug!(error = %report, %status, "Request rejected");

        if status == StatusCode::BAD_REQUEST {
            if let Some(fields) = report.downcast_ref::<FieldErrors>() {
                return (status, Json(fields)).into_response();
            }

            return (status, Json(json!({ "errors": report.to_string() }))).into_response();
        }

        (status, Json(json!({ "detail": report.to_string() }))).into_response()
    }
}

impl<E> From<E> for ServerError
where
    E: Into<Report>,
{
    fn from(err: E) -> Self {
        ServerError(err.into(), StatusCode::INTERNAL_SERVER_ERROR)
    }
}

pub(crate) trait WithStatus<T> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError>;
}

impl<T, E> WithStatus<T> for Result<T, E>
where
    E: Into<Report>,
{
    fn with_status(self, status: StatusCode) -> Result<T, ServerError> {
        self.map_err(|err| ServerError(err.into(), status))
    }
}

/// Per-field validation messages, rendered as `{"field": ["message", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
#[error("Invalid fields: {}", .0.keys().join(", "))]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub(crate) fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub(crate) fn not_blank(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "This field may not be blank.");
        }
    }

    /// Records a message when `value` is longer than `max` characters.
    pub(crate) fn max_length(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// `Ok(value)` when nothing was recorded, otherwise the errors as a 400.
    pub(crate) fn finish<T>(self, value: T) -> Result<T, ServerError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(ServerError::invalid(self))
        }
    }
}

/// Whether the report was caused by a database unique-constraint violation.
pub(crate) fn is_unique_violation(report: &Report) -> bool {
    report
        .downcast_ref::<sqlx::Error>()
        .and_then(sqlx::Error::as_database_error)
        .is_some_and(|e| e.is_unique_violation())
}

/// Whether the report was caused by a database check-constraint violation.
pub(crate) fn is_check_violation(report: &Report) -> bool {
    report
        .downcast_ref::<sqlx::Error>()
        .and_then(sqlx::Error::as_database_error)
        .is_some_and(|e| matches!(e.kind(), sqlx::error::ErrorKind::CheckViolation))
}

/// Unwraps a required field, recording the conventional message when it is missing.
pub(crate) fn required<T>(errors: &mut FieldErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, "This field is required.");
    }
    value
}
