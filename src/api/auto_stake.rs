use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES, MIN_THRESHOLD},
    error::{AppError, Result},
    models::{ApiResponse, AutoStakeAction, AutoStakeSettings, SettingsPatch},
    services::{
        auto_stake_agent::{AgentView, ExecuteOutcome, StartOutcome, TickOutcome},
        stake_tx_builder::normalize_address,
    },
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub cleared: bool,
}

/// Rejects settings that are out of range or inconsistent. Runs against the
/// merged result of a patch, under the store's write lock.
pub fn validate_settings(merged: &AutoStakeSettings) -> Result<()> {
    for (name, value) in [
        ("threshold", merged.threshold),
        ("max_stake_per_day", merged.max_stake_per_day),
        ("max_total_staked", merged.max_total_staked),
    ] {
        if !value.is_finite() {
            return Err(AppError::Validation(format!("{} must be a finite number", name)));
        }
    }

    if merged.threshold < MIN_THRESHOLD {
        return Err(AppError::Validation(format!(
            "threshold must be at least {}",
            MIN_THRESHOLD
        )));
    }
    if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&merged.interval_minutes) {
        return Err(AppError::Validation(format!(
            "interval_minutes must be between {} and {}",
            MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES
        )));
    }
    if merged.max_stake_per_day < merged.threshold {
        return Err(AppError::Validation(
            "max_stake_per_day must be at least the threshold".to_string(),
        ));
    }
    if merged.max_total_staked < merged.max_stake_per_day {
        return Err(AppError::Validation(
            "max_total_staked must be at least max_stake_per_day".to_string(),
        ));
    }
    if merged
        .preferred_validators
        .iter()
        .any(|v| v.trim().is_empty())
    {
        return Err(AppError::Validation(
            "preferred_validators must not contain empty entries".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/v1/auto-stake/settings
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AutoStakeSettings>>> {
    Ok(Json(ApiResponse::success(state.store.settings().await)))
}

/// PUT /api/v1/auto-stake/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<ApiResponse<AutoStakeSettings>>> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("No settings provided".to_string()));
    }
    let updated = state.agent.update_settings(&patch, validate_settings).await?;
    tracing::info!("Auto-stake settings updated: {:?}", patch);
    Ok(Json(ApiResponse::success(updated)))
}

/// GET /api/v1/auto-stake/status
pub async fn get_status(State(state): State<AppState>) -> Result<Json<ApiResponse<AgentView>>> {
    Ok(Json(ApiResponse::success(state.agent.view().await)))
}

/// POST /api/v1/auto-stake/start
pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<ApiResponse<StartOutcome>>> {
    let address = normalize_address(&req.address)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid address: {}", req.address)))?;
    let outcome = state.agent.start(address).await;
    Ok(Json(ApiResponse::success(outcome)))
}

/// POST /api/v1/auto-stake/stop
pub async fn stop(State(state): State<AppState>) -> Result<Json<ApiResponse<AgentView>>> {
    state.agent.stop().await;
    Ok(Json(ApiResponse::success(state.agent.view().await)))
}

/// POST /api/v1/auto-stake/check
pub async fn check_now(State(state): State<AppState>) -> Result<Json<ApiResponse<TickOutcome>>> {
    Ok(Json(ApiResponse::success(
        state.agent.check_and_propose().await,
    )))
}

/// POST /api/v1/auto-stake/execute
pub async fn execute(State(state): State<AppState>) -> Result<Json<ApiResponse<ExecuteOutcome>>> {
    let outcome = state.agent.execute_pending_stake().await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// DELETE /api/v1/auto-stake/pending
pub async fn clear_pending(State(state): State<AppState>) -> Result<Json<ApiResponse<AgentView>>> {
    state.agent.clear_pending_stake().await;
    Ok(Json(ApiResponse::success(state.agent.view().await)))
}

/// GET /api/v1/auto-stake/actions
pub async fn list_actions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AutoStakeAction>>>> {
    Ok(Json(ApiResponse::success(state.store.actions().await)))
}

/// DELETE /api/v1/auto-stake/actions
pub async fn clear_actions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ClearedResponse>>> {
    state.store.clear_actions().await;
    Ok(Json(ApiResponse::success(ClearedResponse { cleared: true })))
}

/// POST /api/v1/auto-stake/reset-daily
pub async fn reset_daily(State(state): State<AppState>) -> Result<Json<ApiResponse<AgentView>>> {
    state.store.reset_daily_stats().await;
    Ok(Json(ApiResponse::success(state.agent.view().await)))
}

/// POST /api/v1/wallet/disconnect
pub async fn disconnect_wallet(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AgentView>>> {
    state.agent.disconnect().await;
    Ok(Json(ApiResponse::success(state.agent.view().await)))
}
