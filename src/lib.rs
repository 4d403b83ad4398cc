pub mod config;
pub mod controllers;
pub mod db;
pub mod errors;
pub mod services;
pub mod types;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::Services;
use crate::types::{AppState, Dependencies};

/// Wire the service set around an already-initialized pool.
pub fn build_state(db: sqlx::SqlitePool, config: &AppConfig) -> AppState {
    let deps = Arc::new(Dependencies {
        db,
        jwt_secret: config.jwt_secret.clone(),
    });
    let services = Services::new(deps.clone());
    AppState { deps, services }
}
