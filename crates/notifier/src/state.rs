use std::sync::Arc;

use userhub_events::{ChannelHandle, NotificationDispatcher};

use crate::config::NotifierConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: NotificationDispatcher,
    /// The broker channel the subscriber reads from, for health reporting.
    pub channel: ChannelHandle,
    pub config: Arc<NotifierConfig>,
}
