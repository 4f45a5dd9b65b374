use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INTERVAL_MINUTES, DEFAULT_MAX_STAKE_PER_DAY, DEFAULT_MAX_TOTAL_STAKED,
    DEFAULT_THRESHOLD,
};

// ==================== SETTINGS ====================

/// How the agent picks a validator for a proposed stake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ValidatorStrategy {
    /// Highest APY in the active set, first in list order on ties (default)
    #[default]
    BestApy,
    /// First entry of the preferred list
    Preferred,
    /// Uniform pick from the active set
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoStakeSettings {
    pub enabled: bool,
    /// Minimum free balance (display units) kept in the wallet.
    pub threshold: f64,
    pub interval_minutes: u32,
    pub validator_strategy: ValidatorStrategy,
    pub preferred_validators: Vec<String>,
    pub max_stake_per_day: f64,
    pub max_total_staked: f64,
}

impl Default for AutoStakeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: DEFAULT_THRESHOLD,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            validator_strategy: ValidatorStrategy::BestApy,
            preferred_validators: Vec::new(),
            max_stake_per_day: DEFAULT_MAX_STAKE_PER_DAY,
            max_total_staked: DEFAULT_MAX_TOTAL_STAKED,
        }
    }
}

impl AutoStakeSettings {
    /// Merges `patch` into the settings. Unset fields are left alone.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(threshold) = patch.threshold {
            self.threshold = threshold;
        }
        if let Some(interval) = patch.interval_minutes {
            self.interval_minutes = interval;
        }
        if let Some(strategy) = patch.validator_strategy {
            self.validator_strategy = strategy;
        }
        if let Some(preferred) = &patch.preferred_validators {
            self.preferred_validators = preferred.clone();
        }
        if let Some(max_per_day) = patch.max_stake_per_day {
            self.max_stake_per_day = max_per_day;
        }
        if let Some(max_total) = patch.max_total_staked {
            self.max_total_staked = max_total;
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub threshold: Option<f64>,
    pub interval_minutes: Option<u32>,
    pub validator_strategy: Option<ValidatorStrategy>,
    pub preferred_validators: Option<Vec<String>>,
    pub max_stake_per_day: Option<f64>,
    pub max_total_staked: Option<f64>,
}

impl SettingsPatch {
    /// Whether applying this patch invalidates the daily counters.
    pub fn touches_daily_caps(&self) -> bool {
        self.threshold.is_some() || self.max_stake_per_day.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }
}

// ==================== RUNTIME STATE ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Monitoring,
    Ready,
    Executing,
    /// A safety cap stops proposals; not a failure.
    Blocked,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    DailyLimitReached,
    TotalStakeCapReached,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DailyLimitReached => write!(f, "Daily staking limit reached"),
            Self::TotalStakeCapReached => write!(f, "Total staking cap reached"),
        }
    }
}

/// The single candidate awaiting confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingStake {
    pub amount: f64,
    pub validator: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    pub status: AgentStatus,
    pub block_reason: Option<BlockReason>,
    pub error: Option<String>,
    pub account: Option<String>,
    /// Base units.
    pub last_checked_balance: u128,
    pub pending: Option<PendingStake>,
    pub total_staked_today: f64,
    pub last_stake_time: Option<DateTime<Utc>>,
}

impl RuntimeState {
    /// Amount staked on `now`'s calendar day; zero once the day rolled over.
    pub fn staked_today(&self, now: DateTime<Utc>) -> f64 {
        match self.last_stake_time {
            Some(last) if same_day(last, now) => self.total_staked_today,
            _ => 0.0,
        }
    }

    pub fn pending_stake_amount(&self) -> Option<f64> {
        self.pending.as_ref().map(|p| p.amount)
    }

    pub fn pending_validator(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.validator.as_str())
    }

    pub fn daily_summary(&self) -> DailySummary {
        DailySummary {
            total_staked_today: self.total_staked_today,
            last_stake_time: self.last_stake_time,
        }
    }
}

/// The persisted slice of runtime state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub total_staked_today: f64,
    pub last_stake_time: Option<DateTime<Utc>>,
}

pub fn same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

// ==================== ACTION LOG ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Stake,
    Unstake,
    Claim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Approved,
    Executed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoStakeAction {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub amount: f64,
    pub validator: Option<String>,
    pub status: ActionStatus,
    pub transaction_hash: Option<String>,
    pub error: Option<String>,
}

/// Log entry without id/timestamp; the store stamps those.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAction {
    pub action_type: ActionType,
    pub amount: f64,
    pub validator: Option<String>,
    pub status: ActionStatus,
    pub transaction_hash: Option<String>,
    pub error: Option<String>,
}

impl NewAction {
    pub fn into_action(self, now: DateTime<Utc>) -> AutoStakeAction {
        AutoStakeAction {
            id: action_id(now),
            timestamp: now,
            action_type: self.action_type,
            amount: self.amount,
            validator: self.validator,
            status: self.status,
            transaction_hash: self.transaction_hash,
            error: self.error,
        }
    }
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// action-<millis>-<9 base36 chars>
fn action_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("action-{}-{}", now.timestamp_millis(), suffix)
}

// ==================== CHAIN ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub address: String,
    pub apy_percent: f64,
}

/// Unsigned stake transaction handed to the wallet signer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeTransaction {
    pub sender: String,
    /// Move call target, `<package>::liquid_stake::stake`.
    pub target: String,
    pub pool_id: String,
    pub validator: String,
    pub amount_base_units: u64,
    pub gas_budget: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub transaction_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn patch_with_threshold_touches_caps() {
        let patch = SettingsPatch {
            threshold: Some(20.0),
            ..Default::default()
        };
        assert!(patch.touches_daily_caps());

        let patch = SettingsPatch {
            interval_minutes: Some(10),
            ..Default::default()
        };
        assert!(!patch.touches_daily_caps());
        assert!(SettingsPatch::default().is_empty());
    }

    #[test]
    fn apply_only_overwrites_set_fields() {
        let mut settings = AutoStakeSettings::default();
        settings.apply(&SettingsPatch {
            enabled: Some(true),
            preferred_validators: Some(vec!["0xv1".to_string()]),
            ..Default::default()
        });
        assert!(settings.enabled);
        assert_eq!(settings.preferred_validators, vec!["0xv1".to_string()]);
        assert_eq!(settings.threshold, DEFAULT_THRESHOLD);
        assert_eq!(settings.interval_minutes, DEFAULT_INTERVAL_MINUTES);
    }

    #[test]
    fn staked_today_rolls_over_at_midnight() {
        let last = Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).unwrap();
        let state = RuntimeState {
            total_staked_today: 40.0,
            last_stake_time: Some(last),
            ..Default::default()
        };
        let same = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 0).unwrap();
        let next = Utc.with_ymd_and_hms(2026, 3, 2, 0, 1, 0).unwrap();
        assert_eq!(state.staked_today(same), 40.0);
        assert_eq!(state.staked_today(next), 0.0);
        assert_eq!(RuntimeState::default().staked_today(next), 0.0);
    }

    #[test]
    fn action_ids_have_expected_shape() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let action = NewAction {
            action_type: ActionType::Stake,
            amount: 1.0,
            validator: None,
            status: ActionStatus::Pending,
            transaction_hash: None,
            error: None,
        }
        .into_action(now);

        let parts: Vec<&str> = action.id.splitn(3, '-').collect();
        assert_eq!(parts[0], "action");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn action_serializes_type_field() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let action = NewAction {
            action_type: ActionType::Claim,
            amount: 0.5,
            validator: Some("0xv".to_string()),
            status: ActionStatus::Executed,
            transaction_hash: Some("digest".to_string()),
            error: None,
        }
        .into_action(now);
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "claim");
        assert_eq!(json["status"], "executed");
    }
}
