use std::sync::Arc;

use crate::config::ServerConfig;
use crate::service::UserService;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub config: Arc<ServerConfig>,
}
