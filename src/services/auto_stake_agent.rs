//! Auto-stake agent: polls the monitored account's balance, proposes a single
//! pending stake when the configured rules allow it, and executes that stake
//! through the wallet signer once confirmed.
//!
//! Ticks never overlap: the loop awaits each tick before sleeping again, and a
//! manual `check_and_propose` shares the same in-flight latch. Tick results are
//! committed only while the run generation that started them is still current,
//! so a tick that outlives `stop()` leaves no trace.

use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;

use crate::{
    config::Config,
    constants::{COIN_SYMBOL, MAX_INTERVAL_MINUTES, MIN_INTERVAL_MINUTES},
    error::{AppError, Result},
    models::{
        AgentStatus, AutoStakeSettings, BlockReason, Notification, NotificationKind,
        SettingsPatch, SubmitReceipt,
    },
    services::{
        collaborators::{ChainClient, NotificationSink, TransactionBuilder, WalletSigner},
        settings_store::{AgentSnapshot, SettingsStore},
        stake_policy::{decide, to_base_units, to_display_units, StakeDecision},
        validator_selector::resolve_validator,
    },
};

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub base_units_per_coin: u128,
    pub network_timeout: Duration,
    pub signing_timeout: Duration,
}

impl AgentOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_units_per_coin: config.base_units_per_coin(),
            network_timeout: config.network_timeout(),
            signing_timeout: config.signing_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    Started { first_tick: TickOutcome },
    AlreadyRunning,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Agent not running, disabled, or without an account.
    Stopped,
    /// Another tick or an execution is in flight.
    Skipped,
    /// The agent was stopped or restarted while this tick ran.
    Discarded,
    BelowThreshold { balance: f64 },
    Blocked { reason: BlockReason },
    Dust { amount: f64 },
    Proposed { amount: f64, validator: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecuteOutcome {
    NothingPending,
    Executed {
        transaction_hash: String,
        amount: f64,
        validator: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    pub running: bool,
    #[serde(flatten)]
    pub snapshot: AgentSnapshot,
}

// Releases an AtomicBool latch on drop.
struct Latch<'a>(&'a AtomicBool);

impl Drop for Latch<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn acquire(flag: &AtomicBool) -> Option<Latch<'_>> {
    flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .ok()
        .map(|_| Latch(flag))
}

pub struct AutoStakeAgent {
    store: Arc<SettingsStore>,
    chain: Arc<dyn ChainClient>,
    builder: Arc<dyn TransactionBuilder>,
    signer: Arc<dyn WalletSigner>,
    notifier: Arc<dyn NotificationSink>,
    options: AgentOptions,
    running: AtomicBool,
    generation: AtomicU64,
    tick_in_flight: AtomicBool,
    executing: AtomicBool,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl AutoStakeAgent {
    pub fn new(
        store: Arc<SettingsStore>,
        chain: Arc<dyn ChainClient>,
        builder: Arc<dyn TransactionBuilder>,
        signer: Arc<dyn WalletSigner>,
        notifier: Arc<dyn NotificationSink>,
        options: AgentOptions,
    ) -> Self {
        Self {
            store,
            chain,
            builder,
            signer,
            notifier,
            options,
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            tick_in_flight: AtomicBool::new(false),
            executing: AtomicBool::new(false),
            shutdown: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn view(&self) -> AgentView {
        AgentView {
            running: self.is_running(),
            snapshot: self.store.snapshot().await,
        }
    }

    /// Starts monitoring `account`: one immediate tick, then one tick per
    /// `interval_minutes` until stopped.
    pub async fn start(self: &Arc<Self>, account: String) -> StartOutcome {
        let (generation, shutdown_rx) = {
            let mut shutdown = self.shutdown.lock().await;
            if self.is_running() {
                tracing::warn!("Auto-stake agent already running");
                return StartOutcome::AlreadyRunning;
            }

            self.store.set_account(Some(account.clone())).await;
            if !self.store.settings().await.enabled {
                tracing::info!("Auto-stake agent disabled, not starting");
                return StartOutcome::Disabled;
            }

            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.running.store(true, Ordering::SeqCst);
            self.store.set_status(AgentStatus::Monitoring).await;

            let (tx, rx) = watch::channel(false);
            *shutdown = Some(tx);
            (generation, rx)
        };

        tracing::info!("Auto-stake agent started for {}", account);
        let first_tick = self.check_and_propose().await;

        let agent = Arc::clone(self);
        tokio::spawn(async move {
            agent.run_loop(generation, shutdown_rx).await;
        });

        StartOutcome::Started { first_tick }
    }

    /// Cancels the schedule and resets runtime state to Idle. An in-flight tick
    /// finishes but its result is dropped.
    pub async fn stop(&self) {
        let mut shutdown = self.shutdown.lock().await;
        if let Some(tx) = shutdown.take() {
            let _ = tx.send(true);
        }
        let was_running = self.running.swap(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store.reset_runtime().await;
        if was_running {
            tracing::info!("Auto-stake agent stopped");
        }
    }

    /// Stop and forget the monitored account.
    pub async fn disconnect(&self) {
        self.stop().await;
        self.store.set_account(None).await;
        tracing::info!("Wallet disconnected; auto-stake account cleared");
    }

    /// Applies a settings patch and starts or stops the agent when `enabled` flips.
    /// `validate` runs against the merged settings before anything is committed.
    pub async fn update_settings<F>(
        self: &Arc<Self>,
        patch: &SettingsPatch,
        validate: F,
    ) -> Result<AutoStakeSettings>
    where
        F: FnOnce(&AutoStakeSettings) -> Result<()>,
    {
        let updated = self.store.try_update_settings(patch, validate).await?;
        match patch.enabled {
            Some(true) if !self.is_running() => {
                if let Some(account) = self.store.runtime().await.account {
                    self.start(account).await;
                }
            }
            Some(false) if self.is_running() => self.stop().await,
            _ => {}
        }
        Ok(updated)
    }

    async fn run_loop(self: Arc<Self>, generation: u64, mut shutdown: watch::Receiver<bool>) {
        loop {
            let delay = tick_delay(&self.store.settings().await);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
            if self.generation.load(Ordering::SeqCst) != generation {
                break;
            }

            let outcome = self.check_and_propose().await;
            tracing::debug!("Auto-stake tick: {:?}", outcome);
            if outcome == TickOutcome::Stopped {
                break;
            }
        }
        tracing::debug!("Auto-stake loop {} exited", generation);
    }

    /// One tick: fetch balance, apply the stake rules, propose a candidate.
    pub async fn check_and_propose(&self) -> TickOutcome {
        let Some(_latch) = acquire(&self.tick_in_flight) else {
            tracing::debug!("Auto-stake tick skipped: previous tick still in flight");
            return TickOutcome::Skipped;
        };
        if !self.is_running() {
            return TickOutcome::Stopped;
        }
        let generation = self.generation.load(Ordering::SeqCst);

        let AgentSnapshot { settings, runtime } = self.store.snapshot().await;
        let was_blocked = runtime.status == AgentStatus::Blocked;
        let Some(account) = runtime.account else {
            self.stop().await;
            return TickOutcome::Stopped;
        };
        if !settings.enabled {
            self.stop().await;
            return TickOutcome::Stopped;
        }
        if self.executing.load(Ordering::SeqCst)
            || !self
                .store
                .set_status_unless(AgentStatus::Executing, AgentStatus::Monitoring)
                .await
        {
            return TickOutcome::Skipped;
        }

        match self.evaluate(generation, &account, &settings, was_blocked).await {
            Ok(outcome) => outcome,
            Err(e) => {
                if !self.can_commit(generation) {
                    return TickOutcome::Discarded;
                }
                if e.is_transient() {
                    tracing::warn!("Auto-stake check failed, retrying next tick: {}", e);
                } else {
                    tracing::error!("Error in auto-stake check: {}", e);
                }
                let error = e.to_string();
                self.store.set_error(error.clone()).await;
                TickOutcome::Failed { error }
            }
        }
    }

    async fn evaluate(
        &self,
        generation: u64,
        account: &str,
        settings: &AutoStakeSettings,
        was_blocked: bool,
    ) -> Result<TickOutcome> {
        let balance_base = self
            .with_timeout("balance", self.chain.get_balance(account))
            .await?;
        if !self.can_commit(generation) {
            return Ok(TickOutcome::Discarded);
        }
        self.store.set_last_checked_balance(balance_base).await;

        let per_coin = self.options.base_units_per_coin;
        let balance = to_display_units(balance_base, per_coin);
        let staked_today = self.store.runtime().await.staked_today(Utc::now());

        // Total delegated stake only matters once the cheaper checks pass.
        let decision = match decide(settings, balance, staked_today, 0.0) {
            d @ (StakeDecision::BelowThreshold | StakeDecision::Blocked(_)) => d,
            _ => {
                let staked_base = self
                    .with_timeout("staked total", self.chain.get_total_staked(account))
                    .await?;
                decide(
                    settings,
                    balance,
                    staked_today,
                    to_display_units(staked_base, per_coin),
                )
            }
        };

        if !self.can_commit(generation) {
            return Ok(TickOutcome::Discarded);
        }

        match decision {
            StakeDecision::BelowThreshold => {
                tracing::debug!(
                    "Balance {:.2} {} below threshold {} {}",
                    balance,
                    COIN_SYMBOL,
                    settings.threshold,
                    COIN_SYMBOL
                );
                self.store.clear_pending_stake().await;
                Ok(TickOutcome::BelowThreshold { balance })
            }
            StakeDecision::Blocked(reason) => {
                self.store.set_blocked(reason).await;
                if !was_blocked {
                    tracing::warn!("Auto-stake blocked: {}", reason);
                    self.notifier.notify(Notification::new(
                        NotificationKind::Warning,
                        "Auto-Stake Paused",
                        reason.to_string(),
                    ));
                }
                Ok(TickOutcome::Blocked { reason })
            }
            StakeDecision::Dust { amount } => {
                tracing::debug!("Stakeable amount {:.4} {} below minimum", amount, COIN_SYMBOL);
                Ok(TickOutcome::Dust { amount })
            }
            StakeDecision::Stake { amount } => {
                let validator = self
                    .with_timeout(
                        "validators",
                        resolve_validator(
                            settings.validator_strategy,
                            &settings.preferred_validators,
                            self.chain.as_ref(),
                        ),
                    )
                    .await?;
                if !self.can_commit(generation) {
                    return Ok(TickOutcome::Discarded);
                }

                self.store.set_pending_stake(amount, validator.clone()).await;
                tracing::info!(
                    "Auto-stake ready: {:.2} {} to {}",
                    amount,
                    COIN_SYMBOL,
                    validator
                );
                self.notifier.notify(Notification::new(
                    NotificationKind::Info,
                    "Auto-Stake Ready",
                    format!(
                        "Ready to stake {:.2} {}. Click to execute.",
                        amount, COIN_SYMBOL
                    ),
                ));
                Ok(TickOutcome::Proposed { amount, validator })
            }
        }
    }

    /// Drops the pending candidate without executing it.
    pub async fn clear_pending_stake(&self) {
        self.store.clear_pending_stake().await;
        if !self.is_running() {
            self.store.set_status(AgentStatus::Idle).await;
        }
    }

    /// Builds, signs and submits the pending stake, then records the outcome.
    /// A failed candidate is dropped, not retried.
    pub async fn execute_pending_stake(&self) -> Result<ExecuteOutcome> {
        let Some(_latch) = acquire(&self.executing) else {
            return Err(AppError::ExecutionInProgress);
        };

        let runtime = self.store.runtime().await;
        let (Some(pending), Some(account)) = (runtime.pending, runtime.account) else {
            return Ok(ExecuteOutcome::NothingPending);
        };

        self.store.set_status(AgentStatus::Executing).await;
        tracing::info!(
            "Executing auto-stake of {:.2} {} to {}",
            pending.amount,
            COIN_SYMBOL,
            pending.validator
        );

        let result = self.submit(&account, pending.amount, &pending.validator).await;
        let now = Utc::now();

        let outcome = match result {
            Ok(receipt) => {
                self.store
                    .record_stake(
                        pending.amount,
                        pending.validator.clone(),
                        receipt.transaction_hash.clone(),
                        now,
                    )
                    .await;
                tracing::info!(
                    "Auto-stake executed: {:.2} {} digest={}",
                    pending.amount,
                    COIN_SYMBOL,
                    receipt.transaction_hash
                );
                self.notifier.notify(Notification::new(
                    NotificationKind::Success,
                    "Auto-Stake Executed",
                    format!(
                        "Staked {:.2} {}. Digest: {}...",
                        pending.amount,
                        COIN_SYMBOL,
                        short_digest(&receipt.transaction_hash)
                    ),
                ));
                ExecuteOutcome::Executed {
                    transaction_hash: receipt.transaction_hash,
                    amount: pending.amount,
                    validator: pending.validator,
                }
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!("Error executing pending stake: {}", error);
                self.store
                    .record_failure(pending.amount, pending.validator, error.clone(), now)
                    .await;
                self.notifier.notify(Notification::new(
                    NotificationKind::Error,
                    "Auto-Stake Failed",
                    error.clone(),
                ));
                ExecuteOutcome::Failed { error }
            }
        };

        // Stopped mid-flight: the outcome is booked but the agent stays idle.
        if !self.is_running() {
            self.store.set_status(AgentStatus::Idle).await;
        }
        Ok(outcome)
    }

    async fn submit(&self, account: &str, amount: f64, validator: &str) -> Result<SubmitReceipt> {
        let amount_base = to_base_units(amount, self.options.base_units_per_coin)?;
        let tx = self
            .builder
            .build_stake_transaction(account, amount_base, validator)?;
        timeout(self.options.signing_timeout, self.signer.sign_and_submit(&tx))
            .await
            .map_err(|_| AppError::Timeout("wallet signature".to_string()))?
    }

    async fn with_timeout<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        timeout(self.options.network_timeout, fut)
            .await
            .map_err(|_| AppError::Timeout(format!("{} request", what)))?
    }

    fn can_commit(&self, generation: u64) -> bool {
        self.is_running()
            && self.generation.load(Ordering::SeqCst) == generation
            && !self.executing.load(Ordering::SeqCst)
    }
}

fn tick_delay(settings: &AutoStakeSettings) -> Duration {
    let minutes = settings
        .interval_minutes
        .clamp(MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES);
    Duration::from_secs(u64::from(minutes) * 60)
}

fn short_digest(digest: &str) -> String {
    digest.chars().take(16).collect()
}
