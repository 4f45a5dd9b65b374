pub mod sui_rpc;
pub mod wallet_bridge;

pub use sui_rpc::SuiRpcClient;
pub use wallet_bridge::WalletBridgeSigner;
