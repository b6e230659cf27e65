use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use userhub_events::DispatchError;

/// Application-level error type for HTTP handlers.
///
/// Rendered as `{ "error": ..., "code": ... }`:
///
/// | Variant                       | Status | Code                   |
/// |-------------------------------|--------|------------------------|
/// | `Dispatch(InvalidOperation)`  | 400    | `INVALID_OPERATION`    |
/// | `MalformedBody`               | 400    | `INVALID_OPERATION`    |
/// | `Dispatch(Mail)`              | 502    | `MAIL_DELIVERY_FAILED` |
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The body is not a notification envelope.
    #[error("Malformed notification: {0}")]
    MalformedBody(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Dispatch(DispatchError::InvalidOperation(op)) => (
                StatusCode::BAD_REQUEST,
                "INVALID_OPERATION",
                format!("Invalid operation: {op:?}"),
            ),
            AppError::MalformedBody(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_OPERATION", msg.clone())
            }
            AppError::Dispatch(DispatchError::Mail(err)) => {
                tracing::error!(error = %err, "Mail delivery failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "MAIL_DELIVERY_FAILED",
                    "The notification could not be delivered".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
