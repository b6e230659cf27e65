//! Direct notification trigger.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use userhub_core::envelope::UserEvent;
use userhub_events::ClassifyPolicy;

use crate::error::AppResult;
use crate::state::AppState;

/// POST /notifications/send
///
/// Runs the dispatcher with the strict policy: an unrecognized operation is
/// rejected and no mail is sent. Returns `200` with an empty body once the
/// mail has been handed to the mail sender. No retry.
pub async fn send(
    State(state): State<AppState>,
    payload: Result<Json<UserEvent>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(event) = payload?;
    state
        .dispatcher
        .dispatch(&event, ClassifyPolicy::Strict)
        .await?;
    Ok(StatusCode::OK)
}
