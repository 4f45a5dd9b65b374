use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_COIN_DECIMALS, DEFAULT_COIN_TYPE, DEFAULT_NETWORK_TIMEOUT_SECS,
    DEFAULT_SIGNING_TIMEOUT_SECS, DEFAULT_STAKE_GAS_BUDGET,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Persistence
    pub redis_url: Option<String>,

    // Chain
    pub sui_rpc_url: String,
    pub coin_type: String,
    pub coin_decimals: u32,

    // Liquid staking contract
    pub liquid_stake_package_id: String,
    pub liquid_stake_pool_id: String,
    pub stake_gas_budget: u64,

    // Wallet bridge
    pub wallet_bridge_url: String,

    // Agent
    pub auto_stake_account: Option<String>,
    pub network_timeout_secs: u64,
    pub signing_timeout_secs: u64,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),

            sui_rpc_url: env::var("SUI_RPC_URL")?,
            coin_type: env::var("COIN_TYPE").unwrap_or_else(|_| DEFAULT_COIN_TYPE.to_string()),
            coin_decimals: env::var("COIN_DECIMALS")
                .unwrap_or_else(|_| DEFAULT_COIN_DECIMALS.to_string())
                .parse()?,

            liquid_stake_package_id: env::var("LIQUID_STAKE_PACKAGE_ID")
                .unwrap_or_else(|_| "0x0".to_string()),
            liquid_stake_pool_id: env::var("LIQUID_STAKE_POOL_ID")
                .unwrap_or_else(|_| "0x0".to_string()),
            stake_gas_budget: env::var("STAKE_GAS_BUDGET")
                .unwrap_or_else(|_| DEFAULT_STAKE_GAS_BUDGET.to_string())
                .parse()?,

            wallet_bridge_url: env::var("WALLET_BRIDGE_URL")?,

            auto_stake_account: env::var("AUTO_STAKE_ACCOUNT")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            network_timeout_secs: env::var("NETWORK_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_NETWORK_TIMEOUT_SECS.to_string())
                .parse()?,
            signing_timeout_secs: env::var("SIGNING_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_SIGNING_TIMEOUT_SECS.to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sui_rpc_url.trim().is_empty() {
            anyhow::bail!("SUI_RPC_URL is empty");
        }
        url::Url::parse(&self.sui_rpc_url)
            .map_err(|e| anyhow::anyhow!("SUI_RPC_URL is invalid: {}", e))?;
        if self.wallet_bridge_url.trim().is_empty() {
            anyhow::bail!("WALLET_BRIDGE_URL is empty");
        }
        url::Url::parse(&self.wallet_bridge_url)
            .map_err(|e| anyhow::anyhow!("WALLET_BRIDGE_URL is invalid: {}", e))?;
        if self.coin_decimals > 18 {
            anyhow::bail!("COIN_DECIMALS must be <= 18");
        }
        if self.network_timeout_secs == 0 || self.signing_timeout_secs == 0 {
            anyhow::bail!("Timeouts must be > 0");
        }

        if self.liquid_stake_package_id == "0x0" || self.liquid_stake_pool_id == "0x0" {
            tracing::warn!("Using placeholder liquid stake package/pool ids");
        }
        if self.redis_url.is_none() {
            tracing::warn!("REDIS_URL not set; settings will not survive restarts");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn is_testnet(&self) -> bool {
        if self.environment == "development" || self.environment == "testnet" {
            return true;
        }
        let rpc = self.sui_rpc_url.to_ascii_lowercase();
        rpc.contains("testnet") || rpc.contains("devnet") || rpc.contains("localhost")
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn signing_timeout(&self) -> Duration {
        Duration::from_secs(self.signing_timeout_secs)
    }

    /// Base units per display unit (10^decimals).
    pub fn base_units_per_coin(&self) -> u128 {
        10u128.pow(self.coin_decimals)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        environment: "development".to_string(),
        redis_url: None,
        sui_rpc_url: "http://localhost:9000".to_string(),
        coin_type: DEFAULT_COIN_TYPE.to_string(),
        coin_decimals: DEFAULT_COIN_DECIMALS,
        liquid_stake_package_id: "0xabc".to_string(),
        liquid_stake_pool_id: "0xdef".to_string(),
        stake_gas_budget: DEFAULT_STAKE_GAS_BUDGET,
        wallet_bridge_url: "http://localhost:7000".to_string(),
        auto_stake_account: None,
        network_timeout_secs: 1,
        signing_timeout_secs: 1,
        cors_allowed_origins: "*".to_string(),
    }
}
