// All service modules
pub mod auto_stake_agent;
pub mod collaborators;
pub mod notification_service;
pub mod persistence;
pub mod settings_store;
pub mod stake_policy;
pub mod stake_tx_builder;
pub mod validator_selector;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export for convenience
pub use auto_stake_agent::{AgentOptions, AutoStakeAgent};
pub use notification_service::NotificationService;
pub use persistence::{KeyValueStore, MemoryStore, RedisStore};
pub use settings_store::SettingsStore;
pub use stake_tx_builder::LiquidStakeBuilder;

use crate::config::Config;
use std::sync::Arc;

/// Starts the agent for the account configured at boot, if any.
pub async fn start_background_services(agent: Arc<AutoStakeAgent>, config: Config) {
    let Some(raw) = config.auto_stake_account.as_deref() else {
        tracing::info!("AUTO_STAKE_ACCOUNT not set; waiting for a wallet to connect");
        return;
    };
    let Some(account) = stake_tx_builder::normalize_address(raw) else {
        tracing::error!("AUTO_STAKE_ACCOUNT is not a valid address: {}", raw);
        return;
    };

    tracing::info!("Starting auto-stake agent for {}", account);
    let outcome = agent.start(account).await;
    tracing::info!("Auto-stake boot outcome: {:?}", outcome);
}
