/// Application constants

// API version
pub const API_VERSION: &str = "v1";

// Default auto-stake settings (display units)
pub const DEFAULT_THRESHOLD: f64 = 10.0;
pub const DEFAULT_INTERVAL_MINUTES: u32 = 5;
pub const DEFAULT_MAX_STAKE_PER_DAY: f64 = 1_000.0;
pub const DEFAULT_MAX_TOTAL_STAKED: f64 = 10_000.0;

// Settings bounds enforced by the API layer
pub const MIN_THRESHOLD: f64 = 1.0;
pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 60;

// Smallest stake worth proposing (one display unit, avoids dust stakes)
pub const MIN_STAKE_AMOUNT: f64 = 1.0;

// Action log retention
pub const MAX_ACTIONS_IN_MEMORY: usize = 50;
pub const MAX_ACTIONS_PERSISTED: usize = 20;

// Persistence key for the settings document
pub const STORAGE_KEY: &str = "auto-stake-storage";

// Chain defaults
pub const DEFAULT_COIN_DECIMALS: u32 = 9;
pub const DEFAULT_COIN_TYPE: &str = "0x2::sui::SUI";
pub const DEFAULT_STAKE_GAS_BUDGET: u64 = 50_000_000;

// Network timeouts
pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_SIGNING_TIMEOUT_SECS: u64 = 300;

// Notification fan-out
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 100;

// WebSocket configuration
pub const WS_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const WS_CLIENT_TIMEOUT_SECS: u64 = 60;

// Display symbol used in notifications
pub const COIN_SYMBOL: &str = "SUI";
