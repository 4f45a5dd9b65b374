use crate::{
    config::Config,
    error::{AppError, Result},
    models::StakeTransaction,
    services::collaborators::TransactionBuilder,
};

/// Builds the `liquid_stake::stake` Move call for the configured package and pool
pub struct LiquidStakeBuilder {
    package_id: String,
    pool_id: String,
    gas_budget: u64,
}

impl LiquidStakeBuilder {
    pub fn new(package_id: String, pool_id: String, gas_budget: u64) -> Self {
        Self {
            package_id,
            pool_id,
            gas_budget,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.liquid_stake_package_id.clone(),
            config.liquid_stake_pool_id.clone(),
            config.stake_gas_budget,
        )
    }

    fn target(&self) -> String {
        format!("{}::liquid_stake::stake", self.package_id)
    }
}

impl TransactionBuilder for LiquidStakeBuilder {
    fn build_stake_transaction(
        &self,
        sender: &str,
        amount_base_units: u64,
        validator: &str,
    ) -> Result<StakeTransaction> {
        if amount_base_units == 0 {
            return Err(AppError::BadRequest("Stake amount must be > 0".to_string()));
        }
        if !is_object_address(sender) {
            return Err(AppError::BadRequest(format!("Invalid sender address: {}", sender)));
        }
        if !is_object_address(validator) {
            return Err(AppError::BadRequest(format!(
                "Invalid validator address: {}",
                validator
            )));
        }

        Ok(StakeTransaction {
            sender: sender.to_ascii_lowercase(),
            target: self.target(),
            pool_id: self.pool_id.clone(),
            validator: validator.to_ascii_lowercase(),
            amount_base_units,
            gas_budget: self.gas_budget,
        })
    }
}

/// Trims and lowercases an account address; `None` unless it is 0x-prefixed hex.
pub fn normalize_address(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let lowered = trimmed
        .strip_prefix("0X")
        .map(|rest| format!("0x{}", rest))
        .unwrap_or_else(|| trimmed.to_string())
        .to_ascii_lowercase();
    is_object_address(&lowered).then_some(lowered)
}

// 0x-prefixed hex, at most 32 bytes.
fn is_object_address(value: &str) -> bool {
    let Some(hex) = value.strip_prefix("0x") else {
        return false;
    };
    !hex.is_empty() && hex.len() <= 64 && hex.chars().all(|c| c.is_ascii_hexdigit())
}
