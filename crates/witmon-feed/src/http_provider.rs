//! Generic JSON-over-HTTP quote provider.
//!
//! Most public market-data endpoints reduce to "GET a URL, pull a
//! price (and maybe a volume) out of the JSON". This provider covers
//! those from configuration alone; anything richer implements
//! `FeedProvider` directly. Configuration errors (bad market spec,
//! empty URL) fail at construction, never inside the polling loop.

use crate::error::{FeedError, FeedResult};
use crate::provider::{BoxFuture, FeedProvider};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use witmon_core::{AssetPair, FeedPrice};

/// Declarative description of a JSON HTTP quote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonHttpProviderConfig {
    /// Provider name (registry key).
    pub name: String,
    /// URL template; `{asset}` and `{base}` are substituted per call,
    /// with `{asset}` already translated through `rename`.
    pub url_template: String,
    /// Dotted path to the price field in the response JSON.
    pub price_field: String,
    /// Dotted path to the volume field, if the endpoint reports one.
    #[serde(default)]
    pub volume_field: Option<String>,
    /// Markets served, canonical `"ASSET/BASE"` strings.
    pub markets: Vec<String>,
    /// Canonical asset -> provider ticker (e.g. GOLD -> XAU).
    #[serde(default)]
    pub rename: HashMap<String, String>,
}

/// `FeedProvider` over a declaratively configured JSON HTTP endpoint.
pub struct JsonHttpProvider {
    config: JsonHttpProviderConfig,
    markets: Vec<AssetPair>,
    client: Client,
}

impl JsonHttpProvider {
    /// Build and validate. Malformed market specs or an empty URL are
    /// configuration errors and fail here.
    pub fn new(config: JsonHttpProviderConfig, timeout: Duration) -> FeedResult<Self> {
        if config.name.is_empty() {
            return Err(FeedError::Provider("provider name is empty".into()));
        }
        if config.url_template.is_empty() {
            return Err(FeedError::Provider(format!(
                "provider {:?} has an empty url_template",
                config.name
            )));
        }
        let markets = config
            .markets
            .iter()
            .map(|m| AssetPair::parse(m))
            .collect::<Result<Vec<_>, _>>()?;
        if markets.is_empty() {
            return Err(FeedError::Provider(format!(
                "provider {:?} declares no markets",
                config.name
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            markets,
            client,
        })
    }

    fn extract(value: &Value, path: &str) -> Option<Decimal> {
        let mut cursor = value;
        for segment in path.split('.') {
            cursor = cursor.get(segment)?;
        }
        match cursor {
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            Value::String(s) => Decimal::from_str(s).ok(),
            _ => None,
        }
    }
}

impl FeedProvider for JsonHttpProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn available_markets(&self) -> &[AssetPair] {
        &self.markets
    }

    fn remap_asset(&self, asset: &str) -> String {
        self.config
            .rename
            .get(asset)
            .cloned()
            .unwrap_or_else(|| asset.to_string())
    }

    fn fetch<'a>(&'a self, asset: &'a str, base: &'a str) -> BoxFuture<'a, FeedResult<FeedPrice>> {
        Box::pin(async move {
            let url = self
                .config
                .url_template
                .replace("{asset}", asset)
                .replace("{base}", base);

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FeedError::Http(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FeedError::Http(format!("{url}: HTTP {status}")));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| FeedError::Http(format!("{url}: {e}")))?;

            let price = Self::extract(&body, &self.config.price_field).ok_or_else(|| {
                FeedError::NoData(format!(
                    "{}: field {:?} missing or not numeric",
                    self.config.name, self.config.price_field
                ))
            })?;

            let mut quote = FeedPrice::new(AssetPair::new(asset, base), price, &self.config.name);
            if let Some(field) = &self.config.volume_field {
                if let Some(volume) = Self::extract(&body, field) {
                    quote = quote.with_volume(volume);
                }
            }
            Ok(quote)
        })
    }
}
