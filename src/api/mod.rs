// src/api/mod.rs
pub mod auto_stake;
pub mod health;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{AutoStakeAgent, NotificationService, SettingsStore};

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AutoStakeAgent>,
    pub store: Arc<SettingsStore>,
    pub notifications: NotificationService,
    pub persistence_backend: &'static str,
    pub config: Config,
}
