// Threshold and cap arithmetic behind each proposal.

use crate::{
    constants::MIN_STAKE_AMOUNT,
    error::{AppError, Result},
    models::{AutoStakeSettings, BlockReason},
};

#[derive(Debug, Clone, PartialEq)]
pub enum StakeDecision {
    /// Free balance is under the threshold; any pending candidate is dropped.
    BelowThreshold,
    /// A safety cap is exhausted; pending state is left alone.
    Blocked(BlockReason),
    /// Something is stakeable but under the dust floor.
    Dust { amount: f64 },
    Stake { amount: f64 },
}

/// Decides what a tick should propose.
///
/// `balance`, `staked_today` and `total_staked` are display units; `staked_today`
/// must already account for the calendar-day rollover.
pub fn decide(
    settings: &AutoStakeSettings,
    balance: f64,
    staked_today: f64,
    total_staked: f64,
) -> StakeDecision {
    if balance < settings.threshold {
        return StakeDecision::BelowThreshold;
    }
    if staked_today >= settings.max_stake_per_day {
        return StakeDecision::Blocked(BlockReason::DailyLimitReached);
    }
    if total_staked >= settings.max_total_staked {
        return StakeDecision::Blocked(BlockReason::TotalStakeCapReached);
    }

    let amount = (balance - settings.threshold)
        .min(settings.max_stake_per_day - staked_today)
        .min(settings.max_total_staked - total_staked);

    if amount < MIN_STAKE_AMOUNT {
        return StakeDecision::Dust { amount };
    }
    StakeDecision::Stake { amount }
}

pub fn to_display_units(base_units: u128, base_units_per_coin: u128) -> f64 {
    base_units as f64 / base_units_per_coin as f64
}

/// Rounds down so the wallet never signs for more than was proposed. Amounts
/// that do not fit a u64 of base units are rejected.
pub fn to_base_units(amount: f64, base_units_per_coin: u128) -> Result<u64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Ok(0);
    }
    let base = (amount * base_units_per_coin as f64).floor();
    if base >= u64::MAX as f64 {
        tracing::error!("Stake amount {} overflows base units", amount);
        return Err(AppError::BadRequest(format!(
            "Stake amount {} exceeds the largest transferable amount",
            amount
        )));
    }
    Ok(base as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn settings(threshold: f64, max_per_day: f64, max_total: f64) -> AutoStakeSettings {
        AutoStakeSettings {
            enabled: true,
            threshold,
            max_stake_per_day: max_per_day,
            max_total_staked: max_total,
            ..Default::default()
        }
    }

    #[test]
    fn proposes_balance_above_threshold() {
        let decision = decide(&settings(10.0, 100.0, 1_000.0), 25.0, 0.0, 0.0);
        assert_eq!(decision, StakeDecision::Stake { amount: 15.0 });
    }

    #[test]
    fn below_threshold_never_proposes() {
        let s = settings(10.0, 100.0, 1_000.0);
        for balance in [0.0, 1.0, 5.0, 9.999] {
            assert_eq!(decide(&s, balance, 0.0, 0.0), StakeDecision::BelowThreshold);
        }
    }

    #[test]
    fn daily_limit_blocks() {
        let decision = decide(&settings(10.0, 100.0, 1_000.0), 500.0, 100.0, 0.0);
        assert_eq!(decision, StakeDecision::Blocked(BlockReason::DailyLimitReached));
        assert_eq!(BlockReason::DailyLimitReached.to_string(), "Daily staking limit reached");
    }

    #[test]
    fn total_cap_blocks() {
        let decision = decide(&settings(10.0, 100.0, 1_000.0), 500.0, 0.0, 1_000.0);
        assert_eq!(decision, StakeDecision::Blocked(BlockReason::TotalStakeCapReached));
    }

    #[test]
    fn amount_is_capped_by_remaining_daily_allowance() {
        let decision = decide(&settings(10.0, 100.0, 1_000.0), 500.0, 70.0, 0.0);
        assert_eq!(decision, StakeDecision::Stake { amount: 30.0 });
    }

    #[test]
    fn amount_is_capped_by_remaining_total_allowance() {
        let decision = decide(&settings(10.0, 100.0, 1_000.0), 500.0, 0.0, 990.0);
        assert_eq!(decision, StakeDecision::Stake { amount: 10.0 });
    }

    #[test]
    fn dust_amounts_are_not_proposed() {
        let decision = decide(&settings(10.0, 100.0, 1_000.0), 10.5, 0.0, 0.0);
        assert_eq!(decision, StakeDecision::Dust { amount: 0.5 });
    }

    #[test]
    fn proposals_respect_bounds_across_grid() {
        let s = settings(10.0, 100.0, 1_000.0);
        for balance in [10.0, 11.0, 25.0, 80.5, 250.0] {
            for today in [0.0, 20.0, 99.5] {
                if let StakeDecision::Stake { amount } = decide(&s, balance, today, 0.0) {
                    assert!(amount >= MIN_STAKE_AMOUNT);
                    assert!(amount <= balance - s.threshold + EPSILON);
                    assert!(amount <= s.max_stake_per_day - today + EPSILON);
                }
            }
        }
    }

    #[test]
    fn unit_conversion_rounds_down() {
        assert!((to_display_units(25_000_000_000, 1_000_000_000) - 25.0).abs() < EPSILON);
        assert_eq!(to_base_units(15.0, 1_000_000_000).unwrap(), 15_000_000_000);
        assert_eq!(to_base_units(1.9999999999, 1_000_000_000).unwrap(), 1_999_999_999);
        assert_eq!(to_base_units(-3.0, 1_000_000_000).unwrap(), 0);
        assert_eq!(to_base_units(f64::NAN, 1_000_000_000).unwrap(), 0);
    }

    #[test]
    fn oversized_amount_is_rejected_not_saturated() {
        // u64::MAX base units is about 18.4 billion coins at 9 decimals.
        let err = to_base_units(2.0e10, 1_000_000_000).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(to_base_units(1.8e10, 1_000_000_000).is_ok());
    }
}
