use rand::seq::IndexedRandom;

use crate::{
    error::{AppError, Result},
    models::{ValidatorInfo, ValidatorStrategy},
    services::collaborators::ChainClient,
};

/// Resolves the validator that receives a proposed stake.
pub async fn resolve_validator(
    strategy: ValidatorStrategy,
    preferred: &[String],
    chain: &dyn ChainClient,
) -> Result<String> {
    match strategy {
        ValidatorStrategy::Preferred => {
            if let Some(first) = first_preferred(preferred) {
                return Ok(first.to_string());
            }
            tracing::warn!("Preferred strategy with no preferred validators; using best APY");
            let validators = chain.get_active_validators().await?;
            best_apy(&validators)
                .map(|v| v.address.clone())
                .ok_or(AppError::NoValidators)
        }
        ValidatorStrategy::BestApy => {
            let validators = chain.get_active_validators().await?;
            best_apy(&validators)
                .map(|v| v.address.clone())
                .ok_or(AppError::NoValidators)
        }
        ValidatorStrategy::Random => {
            let validators = chain.get_active_validators().await?;
            let picked = validators
                .choose(&mut rand::rng())
                .map(|v| v.address.clone());
            picked.ok_or(AppError::NoValidators)
        }
    }
}

/// Highest APY; ties go to the earliest entry.
pub fn best_apy(validators: &[ValidatorInfo]) -> Option<&ValidatorInfo> {
    validators.iter().fold(None, |best, candidate| match best {
        Some(current) if current.apy_percent >= candidate.apy_percent => Some(current),
        _ if candidate.apy_percent.is_nan() => best,
        _ => Some(candidate),
    })
}

fn first_preferred(preferred: &[String]) -> Option<&str> {
    preferred
        .iter()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
}
