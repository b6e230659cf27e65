#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use userhub_api::config::ServerConfig;
use userhub_api::router::build_app_router;
use userhub_api::service::UserService;
use userhub_api::state::AppState;
use userhub_core::envelope::UserEvent;
use userhub_db::InMemoryUserStore;
use userhub_events::{EventPublisher, InMemoryBroker};

pub const TOPIC: &str = "user-events";

/// Default configuration, as if no environment variable were set.
pub fn test_config() -> ServerConfig {
    ServerConfig::from_lookup(&|_| None).unwrap()
}

/// A user service wired to in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryUserStore>,
    pub broker: InMemoryBroker,
}

impl TestApp {
    pub fn new() -> Self {
        let config = test_config();
        let store = Arc::new(InMemoryUserStore::new());
        let broker = InMemoryBroker::default();
        let publisher = EventPublisher::new(Arc::new(broker.clone()), TOPIC);

        let state = AppState {
            users: Arc::new(UserService::new(store.clone(), publisher)),
            config: Arc::new(config.clone()),
        };
        let router = build_app_router(state, &config.http).unwrap();

        Self {
            router,
            store,
            broker,
        }
    }

    /// Every envelope published so far.
    pub async fn published(&self) -> Vec<UserEvent> {
        self.broker
            .records(TOPIC)
            .await
            .iter()
            .map(|r| UserEvent::from_bytes(&r.payload).unwrap())
            .collect()
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(Method::DELETE, uri, None).await
    }
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
