//! Concurrent fan-out polling of feed providers.
//!
//! One task per (provider, pair) on a semaphore-bounded pool. Around
//! every provider call the poller applies the same named pipeline:
//! validate-market, then retry-with-backoff under a per-attempt
//! timeout, then record-health. Failures are isolated per task; the
//! cycle always joins all tasks before aggregation runs.
//! (Response caching lives on the node-RPC side: within one cycle each
//! (provider, pair) is fetched at most once, so there is nothing to
//! memoize here.)

use crate::error::{FeedError, FeedResult};
use crate::provider::FeedProvider;
use crate::registry::ProviderRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use witmon_core::{AssetPair, FeedPrice, FeedSet};

fn default_concurrency() -> usize {
    6
}
fn default_call_timeout_secs() -> u64 {
    30
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_max_stale_cycles() -> u32 {
    5
}

/// Polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Maximum provider calls in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-attempt deadline for one provider call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Attempts per (provider, pair) before giving up for the cycle.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Cycles a failing provider may serve its last known-good value.
    #[serde(default = "default_max_stale_cycles")]
    pub max_stale_cycles: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            call_timeout_secs: default_call_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            max_stale_cycles: default_max_stale_cycles(),
        }
    }
}

/// Fans one polling cycle out across all registered providers.
pub struct FeedPoller {
    registry: Arc<ProviderRegistry>,
    config: PollerConfig,
    limiter: Arc<Semaphore>,
}

impl FeedPoller {
    pub fn new(registry: Arc<ProviderRegistry>, config: PollerConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self {
            registry,
            config,
            limiter,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Poll every registered provider for each requested pair it
    /// serves. A failed (provider, pair) contributes nothing to the
    /// returned set; everything else still lands.
    pub async fn poll_all(&self, pairs: &[AssetPair]) -> FeedSet {
        let mut tasks: JoinSet<Option<FeedPrice>> = JoinSet::new();

        for provider in self.registry.providers() {
            for pair in pairs {
                if !provider.available_markets().contains(pair) {
                    continue;
                }
                let provider = Arc::clone(provider);
                let registry = Arc::clone(&self.registry);
                let limiter = Arc::clone(&self.limiter);
                let config = self.config.clone();
                let pair = pair.clone();

                tasks.spawn(async move {
                    // Pool admission; a closed semaphore only happens
                    // at shutdown, in which case skipping is correct.
                    let _permit = limiter.acquire().await.ok()?;
                    poll_one(&*provider, &registry, &config, &pair).await
                });
            }
        }

        // Barrier: aggregation must only see a fully joined cycle.
        let mut set = FeedSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(price)) => set.push(price),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Feed polling task panicked"),
            }
        }
        set
    }
}

/// One (provider, pair) poll: validate -> retry/backoff -> record-health.
async fn poll_one(
    provider: &dyn FeedProvider,
    registry: &ProviderRegistry,
    config: &PollerConfig,
    pair: &AssetPair,
) -> Option<FeedPrice> {
    match fetch_with_retry(provider, config, pair).await {
        Ok(price) => {
            registry.record_success(provider.name(), &price);
            Some(price)
        }
        Err(e) => {
            registry.record_failure(provider.name());
            match registry.reuse_last_good(provider.name(), pair, config.max_stale_cycles) {
                Some(stale) => {
                    debug!(
                        provider = provider.name(),
                        %pair,
                        error = %e,
                        "Provider failed, reusing last known-good value"
                    );
                    Some(stale)
                }
                None => {
                    warn!(
                        provider = provider.name(),
                        %pair,
                        error = %e,
                        "Provider failed, no data this cycle"
                    );
                    None
                }
            }
        }
    }
}

/// Validate-market stage plus bounded retry with exponential backoff,
/// each attempt under its own deadline.
async fn fetch_with_retry(
    provider: &dyn FeedProvider,
    config: &PollerConfig,
    pair: &AssetPair,
) -> FeedResult<FeedPrice> {
    if !provider.available_markets().contains(pair) {
        return Err(FeedError::MarketNotAvailable {
            provider: provider.name().to_string(),
            pair: pair.to_string(),
        });
    }

    let provider_asset = provider.remap_asset(&pair.asset);
    let timeout = Duration::from_secs(config.call_timeout_secs);
    let attempts = config.retry_attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(backoff_delay(config.backoff_base_ms, attempt)).await;
        }

        match tokio::time::timeout(timeout, provider.fetch(&provider_asset, &pair.base)).await {
            Ok(Ok(mut price)) => {
                // Normalize back onto the canonical pair and stamp the
                // provider so implementations can't misreport either.
                price.pair = pair.clone();
                price.provider = provider.name().to_string();
                return Ok(price);
            }
            Ok(Err(e)) => last_error = Some(e),
            Err(_) => {
                last_error = Some(FeedError::Timeout {
                    provider: provider.name().to_string(),
                    seconds: config.call_timeout_secs,
                })
            }
        }
    }

    Err(last_error.unwrap_or_else(|| FeedError::NoData(pair.to_string())))
}

/// Exponential backoff before retry `attempt` (1-based). The exponent
/// is capped so a large retry budget cannot overflow the shift.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exp = (attempt - 1).min(16);
    Duration::from_millis(base_ms.saturating_mul(1u64 << exp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::BoxFuture;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider that fails the first `fail_first` calls, then succeeds.
    struct FlakyProvider {
        name: String,
        markets: Vec<AssetPair>,
        fail_first: u32,
        calls: AtomicU32,
        price: Decimal,
    }

    impl FlakyProvider {
        fn new(name: &str, fail_first: u32, price: Decimal) -> Self {
            Self {
                name: name.to_string(),
                markets: vec![AssetPair::new("USD", "BTS")],
                fail_first,
                calls: AtomicU32::new(0),
                price,
            }
        }
    }

    impl FeedProvider for FlakyProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn available_markets(&self) -> &[AssetPair] {
            &self.markets
        }

        fn fetch<'a>(
            &'a self,
            _asset: &'a str,
            base: &'a str,
        ) -> BoxFuture<'a, FeedResult<FeedPrice>> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n < self.fail_first {
                    Err(FeedError::Provider("transient".into()))
                } else {
                    Ok(FeedPrice::new(
                        AssetPair::new("USD", base),
                        self.price,
                        self.name.clone(),
                    ))
                }
            })
        }
    }

    fn fast_config() -> PollerConfig {
        PollerConfig {
            concurrency: 6,
            call_timeout_secs: 1,
            retry_attempts: 2,
            backoff_base_ms: 1,
            max_stale_cycles: 2,
        }
    }

    fn usd_bts() -> Vec<AssetPair> {
        vec![AssetPair::new("USD", "BTS")]
    }

    #[tokio::test]
    async fn failed_provider_does_not_abort_the_batch() {
        let registry = Arc::new(ProviderRegistry::new(vec![
            Arc::new(FlakyProvider::new("good", 0, dec!(0.05))),
            Arc::new(FlakyProvider::new("bad", u32::MAX, dec!(0.05))),
        ]));
        let poller = FeedPoller::new(registry, fast_config());

        let set = poller.poll_all(&usd_bts()).await;
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().provider, "good");
    }

    #[tokio::test]
    async fn retry_recovers_a_transient_failure() {
        // Fails once, second attempt within the same cycle succeeds.
        let registry = Arc::new(ProviderRegistry::new(vec![Arc::new(FlakyProvider::new(
            "flaky",
            1,
            dec!(0.05),
        ))]));
        let poller = FeedPoller::new(Arc::clone(&registry), fast_config());

        let set = poller.poll_all(&usd_bts()).await;
        assert_eq!(set.len(), 1);
        assert!(!set.iter().next().unwrap().stale);
        assert!(registry.is_online("flaky"));
    }

    #[tokio::test]
    async fn exhausted_provider_serves_stale_then_nothing() {
        // Succeeds the first cycle, then fails forever.
        let registry = Arc::new(ProviderRegistry::new(vec![Arc::new(FlakyProvider::new(
            "fading",
            0,
            dec!(0.05),
        ))]));
        let poller = FeedPoller::new(Arc::clone(&registry), fast_config());

        let live = poller.poll_all(&usd_bts()).await;
        assert_eq!(live.len(), 1);
        assert!(!live.iter().next().unwrap().stale);

        // Make all further fetches fail.
        let registry2 = Arc::new(ProviderRegistry::new(vec![Arc::new(FlakyProvider::new(
            "fading",
            u32::MAX,
            dec!(0.05),
        ))]));
        // Seed last-known-good into the fresh registry.
        registry2.record_success(
            "fading",
            &FeedPrice::new(AssetPair::new("USD", "BTS"), dec!(0.05), "fading"),
        );
        let poller = FeedPoller::new(Arc::clone(&registry2), fast_config());

        // max_stale_cycles = 2: two stale cycles, then nothing.
        for _ in 0..2 {
            let set = poller.poll_all(&usd_bts()).await;
            assert_eq!(set.len(), 1);
            assert!(set.iter().next().unwrap().stale);
        }
        let set = poller.poll_all(&usd_bts()).await;
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn repeated_failures_degrade_provider_health() {
        let registry = Arc::new(ProviderRegistry::new(vec![Arc::new(FlakyProvider::new(
            "down",
            u32::MAX,
            dec!(0.05),
        ))]));
        let poller = FeedPoller::new(Arc::clone(&registry), fast_config());

        for _ in 0..3 {
            poller.poll_all(&usd_bts()).await;
        }
        assert!(!registry.is_online("down"));
        let snapshot = registry.health_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot[0].online);
        assert!(snapshot[0].consecutive_failures >= 3);
    }

    #[test]
    fn backoff_growth_is_capped() {
        assert_eq!(backoff_delay(500, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(500, 3), Duration::from_millis(2000));
        // Huge retry budgets stop doubling instead of overflowing.
        assert_eq!(backoff_delay(500, 100), Duration::from_millis(500 << 16));
        assert_eq!(backoff_delay(u64::MAX, 100), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn unserved_pairs_are_skipped_silently() {
        let registry = Arc::new(ProviderRegistry::new(vec![Arc::new(FlakyProvider::new(
            "usd-only",
            0,
            dec!(0.05),
        ))]));
        let poller = FeedPoller::new(registry, fast_config());

        let set = poller
            .poll_all(&[AssetPair::new("GOLD", "BTS"), AssetPair::new("USD", "BTS")])
            .await;
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().pair, AssetPair::new("USD", "BTS"));
    }
}
