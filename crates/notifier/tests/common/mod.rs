#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use userhub_events::{InMemoryBroker, RecordingMailer};
use userhub_notifier::config::NotifierConfig;
use userhub_notifier::router::build_app_router;
use userhub_notifier::setup::build_dispatcher;
use userhub_notifier::state::AppState;

/// Default configuration with a short mail timeout.
pub fn test_config() -> NotifierConfig {
    let mut config = NotifierConfig::from_lookup(&|_| None).unwrap();
    config.mail_timeout = Duration::from_secs(1);
    config
}

/// Notifier router over an in-memory broker and a recording mailer.
pub fn build_test_app(broker: &InMemoryBroker, mailer: &Arc<RecordingMailer>) -> Router {
    let config = test_config();
    let state = AppState {
        dispatcher: build_dispatcher(&config, mailer.clone()),
        channel: Arc::new(broker.clone()),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config.http).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a raw body with a JSON content type.
pub async fn post_raw(app: Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    post_raw(app, uri, &body.to_string()).await
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
