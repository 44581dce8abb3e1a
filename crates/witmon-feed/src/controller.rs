//! Feed cycle orchestration.
//!
//! One `FeedController` per publishing node: polls all providers,
//! aggregates per asset, feeds the bounded history, and publishes the
//! medians when the schedule says so. Consistency-tolerance breaches
//! are logged and aggregation proceeds; nothing inside a feed cycle is
//! a hard abort.

use crate::error::{FeedError, FeedResult};
use crate::history::PriceHistory;
use crate::poller::FeedPoller;
use crate::publisher::{FeedPublisher, PublishOutcome};
use crate::schedule::{PublishSchedule, ScheduleConfig};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use witmon_core::AssetPair;
use witmon_rpc::NodeClient;

/// Configuration of one feed controller.
#[derive(Debug, Clone)]
pub struct FeedControllerConfig {
    /// Base symbol all feeds are quoted against (e.g. "BTS").
    pub base: String,
    /// Assets to track and publish.
    pub assets: Vec<String>,
    /// Default consistency tolerance (relative standard deviation).
    pub tolerance: Option<f64>,
    /// Per-asset tolerance overrides.
    pub asset_tolerance: HashMap<String, f64>,
    /// Interval between feed checks.
    pub check_interval: Duration,
    /// Wall-clock span the median window should cover.
    pub median_time_span: Duration,
}

/// Drives poll -> aggregate -> history -> schedule -> publish.
pub struct FeedController {
    config: FeedControllerConfig,
    pairs: Vec<AssetPair>,
    poller: FeedPoller,
    history: PriceHistory,
    schedule: Mutex<PublishSchedule>,
    publisher: FeedPublisher,
}

impl FeedController {
    /// Build and validate. Unknown assets (served by no provider) and
    /// empty configurations are setup errors, surfaced here rather
    /// than from inside the polling loop.
    pub fn new(
        config: FeedControllerConfig,
        poller: FeedPoller,
        schedule: ScheduleConfig,
        witness: impl Into<String>,
    ) -> FeedResult<Self> {
        if config.assets.is_empty() {
            return Err(FeedError::Provider("no assets configured".into()));
        }
        if config.base.is_empty() {
            return Err(FeedError::Provider("no base symbol configured".into()));
        }

        let pairs: Vec<AssetPair> = config
            .assets
            .iter()
            .map(|a| AssetPair::new(a.clone(), config.base.clone()))
            .collect();

        for pair in &pairs {
            let served = poller
                .registry()
                .providers()
                .iter()
                .any(|p| p.available_markets().contains(pair));
            if !served {
                return Err(FeedError::MarketNotAvailable {
                    provider: "<any>".into(),
                    pair: pair.to_string(),
                });
            }
        }

        let capacity = (config.median_time_span.as_secs()
            / config.check_interval.as_secs().max(1)) as usize;
        let history = PriceHistory::new(capacity.max(1));

        Ok(Self {
            config,
            pairs,
            poller,
            history,
            schedule: Mutex::new(PublishSchedule::new(schedule)),
            publisher: FeedPublisher::new(witness),
        })
    }

    /// Run one complete feed cycle. Returns the publication outcome,
    /// `None` when this check was not due to publish.
    pub async fn run_cycle(&self, client: &dyn NodeClient) -> Option<PublishOutcome> {
        let set = self.poller.poll_all(&self.pairs).await;

        for asset in &self.config.assets {
            let subset = set.filter(asset.as_str(), self.config.base.as_str());
            if subset.is_empty() {
                warn!(asset, "No provider returned data this cycle");
                continue;
            }

            let tolerance = self
                .config
                .asset_tolerance
                .get(asset)
                .copied()
                .or(self.config.tolerance);

            match subset.weighted_mean(tolerance) {
                Ok(agg) => {
                    if !agg.consistent {
                        warn!(
                            asset,
                            dispersion = agg.dispersion,
                            samples = agg.samples,
                            "Feed providers disagree beyond tolerance"
                        );
                    }
                    debug!(asset, price = %agg.price, samples = agg.samples, "Feed check");
                    self.history.append(asset, agg.price);
                }
                Err(e) => warn!(asset, error = %e, "Feed aggregation failed"),
            }
        }

        let medians: Vec<(String, rust_decimal::Decimal)> = self
            .config
            .assets
            .iter()
            .filter_map(|a| self.history.median(a).map(|m| (a.clone(), m)))
            .collect();

        let due = self.schedule.lock().should_publish(Utc::now(), &medians);
        if !due {
            return None;
        }

        let feeds: Vec<(String, String)> = medians
            .iter()
            .map(|(asset, median)| (asset.clone(), median.to_string()))
            .collect();

        let outcome = self.publisher.publish(client, &feeds).await;
        if outcome.any_published() {
            self.schedule.lock().mark_published(Utc::now(), &medians);
        }
        Some(outcome)
    }

    /// Provider health table, for display surfaces.
    pub fn provider_health(&self) -> Vec<crate::registry::ProviderHealthSnapshot> {
        self.poller.registry().health_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{BoxFuture as ProviderFuture, FeedProvider};
    use crate::registry::ProviderRegistry;
    use crate::poller::PollerConfig;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use witmon_core::FeedPrice;
    use witmon_rpc::{BoxFuture as RpcFuture, RpcResult};

    struct FixedProvider {
        name: String,
        markets: Vec<AssetPair>,
        price: Decimal,
    }

    impl FeedProvider for FixedProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn available_markets(&self) -> &[AssetPair] {
            &self.markets
        }

        fn fetch<'a>(
            &'a self,
            asset: &'a str,
            base: &'a str,
        ) -> ProviderFuture<'a, FeedResult<FeedPrice>> {
            Box::pin(async move {
                Ok(FeedPrice::new(
                    AssetPair::new(asset, base),
                    self.price,
                    self.name.clone(),
                ))
            })
        }
    }

    struct RecordingClient {
        calls: parking_lot::Mutex<Vec<Value>>,
    }

    impl NodeClient for RecordingClient {
        fn call<'a>(
            &'a self,
            _method: &'a str,
            params: Vec<Value>,
        ) -> RpcFuture<'a, RpcResult<Value>> {
            Box::pin(async move {
                self.calls.lock().push(Value::Array(params));
                Ok(json!({"broadcast": true}))
            })
        }
    }

    fn controller(prices: &[(&str, Decimal)]) -> FeedController {
        let providers: Vec<Arc<dyn FeedProvider>> = prices
            .iter()
            .map(|(name, price)| {
                Arc::new(FixedProvider {
                    name: name.to_string(),
                    markets: vec![AssetPair::new("USD", "BTS")],
                    price: *price,
                }) as Arc<dyn FeedProvider>
            })
            .collect();
        let registry = Arc::new(ProviderRegistry::new(providers));
        let poller = FeedPoller::new(
            registry,
            PollerConfig {
                call_timeout_secs: 1,
                backoff_base_ms: 1,
                ..PollerConfig::default()
            },
        );
        FeedController::new(
            FeedControllerConfig {
                base: "BTS".into(),
                assets: vec!["USD".into()],
                tolerance: Some(0.5),
                asset_tolerance: HashMap::new(),
                check_interval: Duration::from_secs(600),
                median_time_span: Duration::from_secs(1800),
            },
            poller,
            ScheduleConfig::every_checks(Duration::from_secs(600), 1000),
            "wackou",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn first_cycle_publishes_the_aggregate() {
        let controller = controller(&[("a", dec!(0.04)), ("b", dec!(0.06))]);
        let client = RecordingClient {
            calls: parking_lot::Mutex::new(Vec::new()),
        };

        let outcome = controller.run_cycle(&client).await.expect("bootstrap publish");
        assert_eq!(outcome.published, vec!["USD"]);
        // Single sample in history: median is the mean of this cycle.
        let calls = client.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][1][0][1], json!("0.05"));
    }

    #[tokio::test]
    async fn second_cycle_is_not_due() {
        let controller = controller(&[("a", dec!(0.05))]);
        let client = RecordingClient {
            calls: parking_lot::Mutex::new(Vec::new()),
        };

        assert!(controller.run_cycle(&client).await.is_some());
        assert!(controller.run_cycle(&client).await.is_none());
        // Histories still grew on the non-publishing cycle.
        assert_eq!(controller.history.len("USD"), 2);
    }

    #[tokio::test]
    async fn inconsistent_providers_still_aggregate() {
        // Dispersion of {0.01, 0.10} is far beyond the 0.5 tolerance;
        // the cycle logs it and publishes anyway (scheduler policy).
        let controller = controller(&[("a", dec!(0.01)), ("b", dec!(0.10))]);
        let client = RecordingClient {
            calls: parking_lot::Mutex::new(Vec::new()),
        };

        let outcome = controller.run_cycle(&client).await.unwrap();
        assert_eq!(outcome.published, vec!["USD"]);
    }

    #[test]
    fn unknown_asset_fails_at_setup() {
        let registry = Arc::new(ProviderRegistry::new(vec![Arc::new(FixedProvider {
            name: "a".into(),
            markets: vec![AssetPair::new("USD", "BTS")],
            price: dec!(0.05),
        }) as Arc<dyn FeedProvider>]));
        let poller = FeedPoller::new(registry, PollerConfig::default());

        let result = FeedController::new(
            FeedControllerConfig {
                base: "BTS".into(),
                assets: vec!["USD".into(), "PLUTONIUM".into()],
                tolerance: None,
                asset_tolerance: HashMap::new(),
                check_interval: Duration::from_secs(600),
                median_time_span: Duration::from_secs(1800),
            },
            poller,
            ScheduleConfig::every_checks(Duration::from_secs(600), 10),
            "wackou",
        );
        assert!(matches!(
            result,
            Err(FeedError::MarketNotAvailable { .. })
        ));
    }
}
