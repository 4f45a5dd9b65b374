// Seams to the chain, the wallet and the user. Implementations live in
// `crate::integrations` and `notification_service`.

use async_trait::async_trait;

use crate::{
    error::Result,
    models::{Notification, StakeTransaction, SubmitReceipt, ValidatorInfo},
};

/// Read-only chain queries
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Free balance in base units.
    async fn get_balance(&self, address: &str) -> Result<u128>;

    async fn get_active_validators(&self) -> Result<Vec<ValidatorInfo>>;

    /// Principal currently delegated by `address`, in base units.
    async fn get_total_staked(&self, address: &str) -> Result<u128>;
}

pub trait TransactionBuilder: Send + Sync {
    fn build_stake_transaction(
        &self,
        sender: &str,
        amount_base_units: u64,
        validator: &str,
    ) -> Result<StakeTransaction>;
}

/// Signs and broadcasts; may wait on a human approving in the wallet.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn sign_and_submit(&self, tx: &StakeTransaction) -> Result<SubmitReceipt>;
}

/// Fire-and-forget user notifications
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}
