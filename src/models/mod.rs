// src/models/mod.rs
pub mod auto_stake;
pub mod notification;

pub use auto_stake::{
    ActionStatus,
    ActionType,
    AgentStatus,
    AutoStakeAction,
    AutoStakeSettings,
    BlockReason,
    DailySummary,
    NewAction,
    PendingStake,
    RuntimeState,
    SettingsPatch,
    StakeTransaction,
    SubmitReceipt,
    ValidatorInfo,
    ValidatorStrategy,
};
pub use notification::{Notification, NotificationKind};

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_success_sets_flag() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, "ok");
    }
}
