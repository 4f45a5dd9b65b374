use axum::{extract::State, Json};
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub persistence: String,
    pub agent_running: bool,
    pub notification_subscribers: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        persistence: state.persistence_backend.to_string(),
        agent_running: state.agent.is_running(),
        notification_subscribers: state.notifications.subscriber_count(),
    })
}
