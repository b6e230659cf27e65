use axum::routing::post;
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// POST   /send    -> send
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/send", post(notification::send))
}
