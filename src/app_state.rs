use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionKeys;
use crate::task_store::TaskStore;
use crate::user_directory::UserDirectory;

#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserDirectory>,
    pub session: SessionKeys,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, tasks: Arc<dyn TaskStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self {
            tasks,
            users,
            session: SessionKeys::from_config(&config),
            config,
        }
    }
}
