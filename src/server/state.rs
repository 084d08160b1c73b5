use std::sync::Arc;

use crate::config::Settings;
use crate::connection_manager::ConnectionManager;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub connection_manager: Arc<ConnectionManager>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            connection_manager: Arc::new(ConnectionManager::new()),
        }
    }
}
