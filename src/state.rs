use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::auth::SessionStore;
use crate::services::clock::Clock;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub clock: Box<dyn Clock>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig, clock: Box<dyn Clock>) -> Self {
        let sessions = SessionStore::new(config.admin_session_ttl_minutes);
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            clock,
            sessions,
        }
    }
}
