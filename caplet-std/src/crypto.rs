use async_trait::async_trait;
use caplet_core::CryptoConfig;
use caplet_plugin::{CapabilitySpec, ExecutionResult, Plugin, PluginHelper};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

const PRICE_PATH: &str = "/simple/price";
const VS_CURRENCY: &str = "usd";

#[derive(Debug, Error)]
enum PriceError {
    #[error("Asset parameter is required.")]
    MissingAsset,

    #[error("HTTP Error {0}: Unable to fetch data.")]
    Http(u16),

    #[error("Network request failed: {0}")]
    Network(reqwest::Error),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for PriceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() || e.is_builder() {
            PriceError::Unexpected(e.to_string())
        } else {
            PriceError::Network(e)
        }
    }
}

/// Plugin for looking up the current USD price of a cryptocurrency.
pub struct CryptoRatePlugin {
    base_url: String,
}

impl CryptoRatePlugin {
    pub fn new() -> Self {
        Self::from_config(&CryptoConfig::default())
    }

    pub fn from_config(config: &CryptoConfig) -> Self {
        Self::with_base_url(&config.base_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the USD price for `asset`. `Value::Null` means the API does not
    /// know the asset. A body that is not keyed by asset id, or an entry that
    /// is not a quote object, is an error.
    ///
    /// The HTTP client lives only for this call.
    async fn fetch_price(&self, asset: &str) -> Result<Value, PriceError> {
        let id = asset.to_lowercase();
        let url = format!("{}{}", self.base_url, PRICE_PATH);

        let client = reqwest::Client::builder().build()?;
        debug!(url = %url, ids = %id, "Requesting price");

        let response = client
            .get(&url)
            .query(&[("ids", id.as_str()), ("vs_currencies", VS_CURRENCY)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PriceError::Http(status.as_u16()));
        }

        let body: Value = response.json().await?;
        let quotes = body
            .as_object()
            .ok_or_else(|| PriceError::Unexpected(format!("expected a JSON object, got {}", body)))?;

        let price = match quotes.get(&id) {
            None => Value::Null,
            Some(Value::Object(quote)) => quote.get(VS_CURRENCY).cloned().unwrap_or(Value::Null),
            Some(other) => {
                return Err(PriceError::Unexpected(format!(
                    "expected a quote object for '{}', got {}",
                    id, other
                )))
            }
        };

        Ok(price)
    }
}

impl Default for CryptoRatePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for CryptoRatePlugin {
    fn source_name(&self) -> &str {
        "CoinGecko"
    }

    fn specs(&self) -> Vec<CapabilitySpec> {
        vec![CapabilitySpec::new(
            "get_crypto_rate",
            "Get the current rate of various cryptocurrencies",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "asset": {
                        "type": "string",
                        "description": "Asset of the cryptocurrency (e.g., bitcoin, ethereum)"
                    }
                },
                "required": ["asset"]
            }),
        )]
    }

    async fn execute(
        &self,
        _function_name: &str,
        _helper: &PluginHelper,
        arguments: Map<String, Value>,
    ) -> ExecutionResult {
        let asset = match arguments.get("asset").and_then(Value::as_str) {
            Some(asset) if !asset.is_empty() => asset,
            _ => return ExecutionResult::error(PriceError::MissingAsset.to_string()),
        };

        match self.fetch_price(asset).await {
            Ok(price_usd) => ExecutionResult::success(serde_json::json!({
                "asset": asset,
                "price_usd": price_usd,
            })),
            Err(e) => {
                warn!(asset = %asset, error = %e, "Price lookup failed");
                ExecutionResult::error(e.to_string())
            }
        }
    }
}
