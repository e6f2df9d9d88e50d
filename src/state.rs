use crate::adapters::{FileStore, TokioTimeProvider};
use crate::config::AppConfig;
use crate::feed::FeedHandle;
use crate::notify::NotificationCenter;
use crate::session::SessionStore;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub sessions: SessionStore<FileStore, TokioTimeProvider>,
    pub notifications: NotificationCenter<TokioTimeProvider>,
    pub(crate) feed: Arc<Option<FeedHandle>>,
}
