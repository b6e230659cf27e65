//! Router builder shared by `main.rs` and the integration tests.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use userhub_core::config::{ConfigError, HttpConfig};

use crate::routes;
use crate::state::AppState;

/// Build the notifier [`Router`] with the standard middleware stack
/// (CORS, request id, tracing, timeout, panic recovery).
pub fn build_app_router(state: AppState, config: &HttpConfig) -> Result<Router, ConfigError> {
    let request_id_header = HeaderName::from_static("x-request-id");

    Ok(Router::new()
        .merge(routes::health::router())
        .nest("/notifications", routes::notification::router())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors_layer(config)?)
        .with_state(state))
}

fn cors_layer(config: &HttpConfig) -> Result<CorsLayer, ConfigError> {
    let mut origins = Vec::with_capacity(config.cors_origins.len());
    for origin in &config.cors_origins {
        let value = HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
            key: "CORS_ORIGINS",
            expected: "origin",
            value: origin.clone(),
        })?;
        origins.push(value);
    }

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]))
}
