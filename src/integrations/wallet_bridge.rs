use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::{StakeTransaction, SubmitReceipt},
    services::collaborators::WalletSigner,
};

/// Hands unsigned transactions to the wallet bridge, which asks the user to
/// approve, signs and broadcasts.
#[derive(Clone, Debug)]
pub struct WalletBridgeSigner {
    base_url: String,
    client: Client,
}

impl WalletBridgeSigner {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.wallet_bridge_url.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/sign-and-execute", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl WalletSigner for WalletBridgeSigner {
    async fn sign_and_submit(&self, tx: &StakeTransaction) -> Result<SubmitReceipt> {
        tracing::debug!(
            "Requesting wallet signature for {} base units to {}",
            tx.amount_base_units,
            tx.validator
        );

        let response = self
            .client
            .post(self.endpoint())
            .json(tx)
            .send()
            .await
            .map_err(|e| AppError::Submission(format!("Wallet bridge unreachable: {}", e)))?;

        let status = response.status();
        let body: BridgeResponse = response.json().await.unwrap_or_default();
        receipt_from_response(status, body)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeResponse {
    digest: Option<String>,
    transaction_hash: Option<String>,
    /// Execution effects status, "success" or "failure".
    status: Option<String>,
    error: Option<String>,
}

fn receipt_from_response(status: StatusCode, body: BridgeResponse) -> Result<SubmitReceipt> {
    let message = body
        .error
        .clone()
        .unwrap_or_else(|| format!("wallet bridge returned HTTP {}", status));

    if status.is_client_error() {
        return Err(AppError::Signing(message));
    }
    if !status.is_success() {
        return Err(AppError::Submission(message));
    }
    if body.status.as_deref() == Some("failure") {
        return Err(AppError::Submission(message));
    }

    body.digest
        .or(body.transaction_hash)
        .filter(|hash| !hash.trim().is_empty())
        .map(|transaction_hash| SubmitReceipt { transaction_hash })
        .ok_or_else(|| AppError::Submission("Wallet bridge returned no transaction digest".to_string()))
}
