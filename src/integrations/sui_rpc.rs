use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    config::Config,
    error::{AppError, Result},
    models::ValidatorInfo,
    services::collaborators::ChainClient,
};

fn rpc_request(method: &str, params: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    })
}

/// Sui full-node JSON-RPC client
#[derive(Clone, Debug)]
pub struct SuiRpcClient {
    rpc_url: String,
    coin_type: String,
    client: Client,
}

impl SuiRpcClient {
    pub fn new(rpc_url: String, coin_type: String, timeout: std::time::Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            rpc_url,
            coin_type,
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.sui_rpc_url.clone(),
            config.coin_type.clone(),
            config.network_timeout(),
        )
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
        let request = rpc_request(method, params);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(format!("{} request", method))
                } else {
                    AppError::ChainRpc(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(AppError::ChainRpc(format!(
                "{} returned HTTP {}",
                method,
                response.status()
            )));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::ChainRpc(e.to_string()))?;
        body.into_result(method)
    }
}

#[async_trait]
impl ChainClient for SuiRpcClient {
    async fn get_balance(&self, address: &str) -> Result<u128> {
        let balance: Balance = self
            .call(
                "suix_getBalance",
                serde_json::json!([address, self.coin_type]),
            )
            .await?;
        parse_amount(&balance.total_balance)
    }

    async fn get_active_validators(&self) -> Result<Vec<ValidatorInfo>> {
        let apys: ValidatorsApy = self.call("suix_getValidatorsApy", serde_json::json!([])).await?;
        Ok(apys.into_validators())
    }

    async fn get_total_staked(&self, address: &str) -> Result<u128> {
        let stakes: Vec<DelegatedStake> = self
            .call("suix_getStakes", serde_json::json!([address]))
            .await?;
        total_principal(&stakes)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl<T> RpcResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if let Some(err) = self.error {
            return Err(AppError::ChainRpc(format!(
                "{} failed ({}): {}",
                method, err.code, err.message
            )));
        }
        self.result
            .ok_or_else(|| AppError::ChainRpc(format!("{} returned no result", method)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Balance {
    total_balance: String,
}

#[derive(Debug, Deserialize)]
struct ValidatorsApy {
    apys: Vec<ValidatorApy>,
}

#[derive(Debug, Deserialize)]
struct ValidatorApy {
    address: String,
    /// Fraction, e.g. 0.048 for 4.8%.
    apy: f64,
}

impl ValidatorsApy {
    fn into_validators(self) -> Vec<ValidatorInfo> {
        self.apys
            .into_iter()
            .map(|v| ValidatorInfo {
                address: v.address,
                apy_percent: v.apy * 100.0,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct DelegatedStake {
    #[serde(default)]
    stakes: Vec<StakeObject>,
}

#[derive(Debug, Deserialize)]
struct StakeObject {
    principal: String,
}

// Sui encodes u64/u128 amounts as decimal strings.
fn parse_amount(raw: &str) -> Result<u128> {
    raw.trim()
        .parse::<u128>()
        .map_err(|_| AppError::ChainRpc(format!("Invalid amount in RPC response: {}", raw)))
}

fn total_principal(stakes: &[DelegatedStake]) -> Result<u128> {
    let mut total: u128 = 0;
    for stake in stakes.iter().flat_map(|d| d.stakes.iter()) {
        total = total.saturating_add(parse_amount(&stake.principal)?);
    }
    Ok(total)
}
