// In-process collaborators for agent tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::{
    error::{AppError, Result},
    models::{Notification, StakeTransaction, SubmitReceipt, ValidatorInfo},
    services::collaborators::{ChainClient, NotificationSink, WalletSigner},
};

pub const ONE_COIN: u128 = 1_000_000_000;

struct ChainState {
    balance: u128,
    total_staked: u128,
    validators: Vec<ValidatorInfo>,
    balance_error: Option<String>,
    balance_delay: Option<Duration>,
}

pub struct MockChain {
    state: Mutex<ChainState>,
    balance_calls: AtomicUsize,
    validator_calls: AtomicUsize,
}

impl MockChain {
    pub fn new(balance: u128) -> Self {
        Self {
            state: Mutex::new(ChainState {
                balance,
                total_staked: 0,
                validators: vec![
                    ValidatorInfo {
                        address: "0xa1".to_string(),
                        apy_percent: 3.2,
                    },
                    ValidatorInfo {
                        address: "0xb2".to_string(),
                        apy_percent: 4.8,
                    },
                    ValidatorInfo {
                        address: "0xc3".to_string(),
                        apy_percent: 4.8,
                    },
                ],
                balance_error: None,
                balance_delay: None,
            }),
            balance_calls: AtomicUsize::new(0),
            validator_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_validators(self, validators: Vec<ValidatorInfo>) -> Self {
        self.state.lock().unwrap().validators = validators;
        self
    }

    pub fn set_balance(&self, balance: u128) {
        self.state.lock().unwrap().balance = balance;
    }

    pub fn set_total_staked(&self, total: u128) {
        self.state.lock().unwrap().total_staked = total;
    }

    pub fn fail_balance(&self, message: Option<&str>) {
        self.state.lock().unwrap().balance_error = message.map(str::to_string);
    }

    pub fn delay_balance(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().balance_delay = delay;
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn validator_calls(&self) -> usize {
        self.validator_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_balance(&self, _address: &str) -> Result<u128> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, error, balance) = {
            let state = self.state.lock().unwrap();
            (state.balance_delay, state.balance_error.clone(), state.balance)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match error {
            Some(message) => Err(AppError::ChainRpc(message)),
            None => Ok(balance),
        }
    }

    async fn get_active_validators(&self) -> Result<Vec<ValidatorInfo>> {
        self.validator_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().validators.clone())
    }

    async fn get_total_staked(&self, _address: &str) -> Result<u128> {
        Ok(self.state.lock().unwrap().total_staked)
    }
}

pub struct MockSigner {
    outcome: std::result::Result<String, String>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    submitted: Mutex<Vec<StakeTransaction>>,
}

impl MockSigner {
    pub fn approving(digest: &str) -> Self {
        Self::with_outcome(Ok(digest.to_string()))
    }

    pub fn rejecting(message: &str) -> Self {
        Self::with_outcome(Err(message.to_string()))
    }

    fn with_outcome(outcome: std::result::Result<String, String>) -> Self {
        Self {
            outcome,
            gate: None,
            calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Holds every signature until the gate is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<StakeTransaction> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletSigner for MockSigner {
    async fn sign_and_submit(&self, tx: &StakeTransaction) -> Result<SubmitReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(tx.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.outcome {
            Ok(digest) => Ok(SubmitReceipt {
                transaction_hash: digest.clone(),
            }),
            Err(message) => Err(AppError::Signing(message.clone())),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}
