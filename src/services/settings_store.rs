use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::{
    constants::{MAX_ACTIONS_IN_MEMORY, MAX_ACTIONS_PERSISTED, STORAGE_KEY},
    error::Result,
    models::{
        ActionStatus, ActionType, AgentStatus, AutoStakeAction, AutoStakeSettings, BlockReason,
        DailySummary, NewAction, PendingStake, RuntimeState, SettingsPatch,
    },
    services::persistence::KeyValueStore,
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    settings: AutoStakeSettings,
    runtime: RuntimeState,
    actions: Vec<AutoStakeAction>,
}

/// What survives a restart: settings, the daily summary and recent actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedDocument {
    settings: AutoStakeSettings,
    #[serde(default)]
    daily: DailySummary,
    #[serde(default)]
    actions: Vec<AutoStakeAction>,
}

/// Consistent view of settings and runtime state taken under one lock
#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub settings: AutoStakeSettings,
    pub runtime: RuntimeState,
}

/// Single owner of agent settings, runtime state and the action log.
///
/// Every mutation goes through the inner lock; persisted fields are flushed to
/// the key-value collaborator after each change.
pub struct SettingsStore {
    state: RwLock<StoreState>,
    persistence: Arc<dyn KeyValueStore>,
    flush: Mutex<()>,
}

impl SettingsStore {
    pub fn new(persistence: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            persistence,
            flush: Mutex::new(()),
        }
    }

    /// Restores the persisted document, falling back to defaults.
    pub async fn load(persistence: Arc<dyn KeyValueStore>) -> Self {
        let store = Self::new(persistence);

        let raw = match store.persistence.get(STORAGE_KEY).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Auto-stake settings load failed, using defaults: {}", e);
                None
            }
        };

        if let Some(raw) = raw {
            match serde_json::from_str::<PersistedDocument>(&raw) {
                Ok(doc) => {
                    let mut state = store.state.write().await;
                    state.settings = doc.settings;
                    state.runtime.total_staked_today = doc.daily.total_staked_today;
                    state.runtime.last_stake_time = doc.daily.last_stake_time;
                    state.actions = doc.actions;
                    state.actions.truncate(MAX_ACTIONS_PERSISTED);
                    tracing::info!(
                        "Loaded auto-stake settings from {} ({} actions)",
                        store.persistence.backend(),
                        state.actions.len()
                    );
                }
                Err(e) => {
                    tracing::warn!("Stored auto-stake settings are unreadable, using defaults: {}", e);
                }
            }
        }

        store
    }

    pub async fn settings(&self) -> AutoStakeSettings {
        self.state.read().await.settings.clone()
    }

    pub async fn runtime(&self) -> RuntimeState {
        self.state.read().await.runtime.clone()
    }

    pub async fn snapshot(&self) -> AgentSnapshot {
        let state = self.state.read().await;
        AgentSnapshot {
            settings: state.settings.clone(),
            runtime: state.runtime.clone(),
        }
    }

    pub async fn actions(&self) -> Vec<AutoStakeAction> {
        self.state.read().await.actions.clone()
    }

    /// Merges a partial update. Changing `threshold` or `max_stake_per_day`
    /// also resets the daily counters. No validation happens here.
    pub async fn update_settings(&self, patch: &SettingsPatch) -> AutoStakeSettings {
        let updated = {
            let mut state = self.state.write().await;
            state.settings.apply(patch);
            reset_daily_if_touched(&mut state, patch);
            state.settings.clone()
        };
        self.persist().await;
        updated
    }

    /// Like `update_settings`, but `validate` sees the merged settings under the
    /// write lock and nothing is committed when it fails.
    pub async fn try_update_settings<F>(
        &self,
        patch: &SettingsPatch,
        validate: F,
    ) -> Result<AutoStakeSettings>
    where
        F: FnOnce(&AutoStakeSettings) -> Result<()>,
    {
        let updated = {
            let mut state = self.state.write().await;
            let mut merged = state.settings.clone();
            merged.apply(patch);
            validate(&merged)?;

            state.settings = merged;
            reset_daily_if_touched(&mut state, patch);
            state.settings.clone()
        };
        self.persist().await;
        Ok(updated)
    }

    /// Sets the status; leaving Error clears the message, leaving Blocked clears the reason.
    pub async fn set_status(&self, status: AgentStatus) {
        let mut state = self.state.write().await;
        state.runtime.status = status;
        if status != AgentStatus::Error {
            state.runtime.error = None;
        }
        if status != AgentStatus::Blocked {
            state.runtime.block_reason = None;
        }
    }

    /// Sets `status` unless the current status is `unless`. Returns whether it changed.
    pub async fn set_status_unless(&self, unless: AgentStatus, status: AgentStatus) -> bool {
        let mut state = self.state.write().await;
        if state.runtime.status == unless {
            return false;
        }
        state.runtime.status = status;
        if status != AgentStatus::Error {
            state.runtime.error = None;
        }
        if status != AgentStatus::Blocked {
            state.runtime.block_reason = None;
        }
        true
    }

    pub async fn set_error(&self, message: impl Into<String>) {
        let mut state = self.state.write().await;
        state.runtime.status = AgentStatus::Error;
        state.runtime.error = Some(message.into());
        state.runtime.block_reason = None;
    }

    pub async fn set_blocked(&self, reason: BlockReason) {
        let mut state = self.state.write().await;
        state.runtime.status = AgentStatus::Blocked;
        state.runtime.block_reason = Some(reason);
        state.runtime.error = None;
    }

    pub async fn set_last_checked_balance(&self, balance: u128) {
        self.state.write().await.runtime.last_checked_balance = balance;
    }

    pub async fn set_account(&self, account: Option<String>) {
        self.state.write().await.runtime.account = account;
    }

    /// Replaces any previous candidate and marks the agent Ready.
    pub async fn set_pending_stake(&self, amount: f64, validator: String) {
        let mut state = self.state.write().await;
        state.runtime.pending = Some(PendingStake { amount, validator });
        state.runtime.status = AgentStatus::Ready;
        state.runtime.error = None;
        state.runtime.block_reason = None;
    }

    pub async fn clear_pending_stake(&self) {
        let mut state = self.state.write().await;
        state.runtime.pending = None;
        state.runtime.status = resting_status(&state.settings);
        state.runtime.error = None;
        state.runtime.block_reason = None;
    }

    /// Books a successful stake: daily rollover, Executed log entry, pending cleared.
    pub async fn record_stake(
        &self,
        amount: f64,
        validator: String,
        transaction_hash: String,
        now: DateTime<Utc>,
    ) -> AutoStakeAction {
        let action = {
            let mut state = self.state.write().await;
            let today = state.runtime.staked_today(now);
            state.runtime.total_staked_today = today + amount;
            state.runtime.last_stake_time = Some(now);
            state.runtime.pending = None;
            state.runtime.status = resting_status(&state.settings);
            state.runtime.error = None;
            state.runtime.block_reason = None;

            let action = NewAction {
                action_type: ActionType::Stake,
                amount,
                validator: Some(validator),
                status: ActionStatus::Executed,
                transaction_hash: Some(transaction_hash),
                error: None,
            }
            .into_action(now);
            push_action(&mut state.actions, action.clone());
            action
        };
        self.persist().await;
        action
    }

    /// Books a failed stake: Failed log entry, pending cleared, status Error.
    pub async fn record_failure(
        &self,
        amount: f64,
        validator: String,
        error: String,
        now: DateTime<Utc>,
    ) -> AutoStakeAction {
        let action = {
            let mut state = self.state.write().await;
            state.runtime.pending = None;
            state.runtime.status = AgentStatus::Error;
            state.runtime.error = Some(error.clone());
            state.runtime.block_reason = None;

            let action = NewAction {
                action_type: ActionType::Stake,
                amount,
                validator: Some(validator),
                status: ActionStatus::Failed,
                transaction_hash: None,
                error: Some(error),
            }
            .into_action(now);
            push_action(&mut state.actions, action.clone());
            action
        };
        self.persist().await;
        action
    }

    pub async fn clear_actions(&self) {
        self.state.write().await.actions.clear();
        self.persist().await;
    }

    pub async fn reset_daily_stats(&self) {
        {
            let mut state = self.state.write().await;
            state.runtime.total_staked_today = 0.0;
            state.runtime.last_stake_time = None;
        }
        self.persist().await;
    }

    /// Drops process-local state on stop. Daily counters survive so caps hold.
    pub async fn reset_runtime(&self) {
        let mut state = self.state.write().await;
        state.runtime.status = AgentStatus::Idle;
        state.runtime.pending = None;
        state.runtime.error = None;
        state.runtime.block_reason = None;
    }

    async fn persist(&self) {
        let _guard = self.flush.lock().await;
        let doc = {
            let state = self.state.read().await;
            PersistedDocument {
                settings: state.settings.clone(),
                daily: state.runtime.daily_summary(),
                actions: state
                    .actions
                    .iter()
                    .take(MAX_ACTIONS_PERSISTED)
                    .cloned()
                    .collect(),
            }
        };

        let raw = match serde_json::to_string(&doc) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Failed to encode auto-stake settings: {}", e);
                return;
            }
        };
        if let Err(e) = self.persistence.set(STORAGE_KEY, raw).await {
            tracing::error!("Failed to persist auto-stake settings: {}", e);
        }
    }
}

fn reset_daily_if_touched(state: &mut StoreState, patch: &SettingsPatch) {
    if patch.touches_daily_caps() {
        state.runtime.total_staked_today = 0.0;
        state.runtime.last_stake_time = None;
    }
}

fn resting_status(settings: &AutoStakeSettings) -> AgentStatus {
    if settings.enabled {
        AgentStatus::Monitoring
    } else {
        AgentStatus::Idle
    }
}

fn push_action(actions: &mut Vec<AutoStakeAction>, action: AutoStakeAction) {
    actions.insert(0, action);
    actions.truncate(MAX_ACTIONS_IN_MEMORY);
}
