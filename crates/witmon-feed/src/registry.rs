//! Static provider registry and health table.
//!
//! Providers are assembled once at startup from configuration; the
//! registry owns the per-provider health state. Health is
//! display/logging information, never fatal: an offline provider
//! simply stops contributing quotes.

use crate::error::{FeedError, FeedResult};
use crate::provider::FeedProvider;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};
use witmon_core::{AssetPair, FeedPrice};

/// Consecutive failures after which a provider is recorded offline.
const OFFLINE_THRESHOLD: u32 = 3;

/// Per-provider health state.
#[derive(Debug, Clone, Default)]
struct ProviderHealth {
    consecutive_failures: u32,
    offline: bool,
    /// Last successfully fetched quote per pair, reused for a bounded
    /// number of cycles while the provider is failing.
    last_good: Vec<(AssetPair, FeedPrice, u32)>,
}

/// Point-in-time view of one provider's health, for dashboards/logs.
#[derive(Debug, Clone)]
pub struct ProviderHealthSnapshot {
    pub provider: String,
    pub online: bool,
    pub consecutive_failures: u32,
}

/// Registry of configured feed providers.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn FeedProvider>>,
    health: DashMap<String, ProviderHealth>,
}

impl ProviderRegistry {
    /// Assemble the registry from explicit provider instances.
    pub fn new(providers: Vec<Arc<dyn FeedProvider>>) -> Self {
        let health = DashMap::new();
        for p in &providers {
            health.insert(p.name().to_string(), ProviderHealth::default());
        }
        Self { providers, health }
    }

    pub fn providers(&self) -> &[Arc<dyn FeedProvider>] {
        &self.providers
    }

    /// Look up a provider by name.
    pub fn provider(&self, name: &str) -> FeedResult<Arc<dyn FeedProvider>> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| FeedError::Provider(format!("unknown provider {name:?}")))
    }

    /// Record a successful fetch: resets the failure streak and stores
    /// the quote as the pair's last known-good value.
    pub fn record_success(&self, provider: &str, price: &FeedPrice) {
        let mut entry = self.health.entry(provider.to_string()).or_default();
        if entry.offline {
            info!(provider, "Feed provider is back online");
        }
        entry.consecutive_failures = 0;
        entry.offline = false;
        match entry
            .last_good
            .iter_mut()
            .find(|(pair, _, _)| *pair == price.pair)
        {
            Some(slot) => *slot = (price.pair.clone(), price.clone(), 0),
            None => entry.last_good.push((price.pair.clone(), price.clone(), 0)),
        }
    }

    /// Record a failed fetch. Flips the provider to offline after
    /// `OFFLINE_THRESHOLD` consecutive failures.
    pub fn record_failure(&self, provider: &str) {
        let mut entry = self.health.entry(provider.to_string()).or_default();
        entry.consecutive_failures += 1;
        if !entry.offline && entry.consecutive_failures >= OFFLINE_THRESHOLD {
            entry.offline = true;
            warn!(
                provider,
                failures = entry.consecutive_failures,
                "Feed provider marked offline"
            );
        }
    }

    /// Reuse the provider's last known-good quote for `pair`, tagged
    /// stale, for at most `max_stale_cycles` cycles. Returns `None`
    /// once the budget is exhausted (graceful degradation ends, the
    /// provider contributes nothing).
    pub fn reuse_last_good(
        &self,
        provider: &str,
        pair: &AssetPair,
        max_stale_cycles: u32,
    ) -> Option<FeedPrice> {
        let mut entry = self.health.get_mut(provider)?;
        let (_, price, used) = entry
            .last_good
            .iter_mut()
            .find(|(p, _, _)| p == pair)?;
        if *used >= max_stale_cycles {
            return None;
        }
        *used += 1;
        Some(price.clone().as_stale())
    }

    /// True when the provider has not crossed the failure threshold.
    pub fn is_online(&self, provider: &str) -> bool {
        self.health.get(provider).map_or(true, |h| !h.offline)
    }

    /// Health table snapshot for display.
    pub fn health_snapshot(&self) -> Vec<ProviderHealthSnapshot> {
        self.health
            .iter()
            .map(|entry| ProviderHealthSnapshot {
                provider: entry.key().clone(),
                online: !entry.offline,
                consecutive_failures: entry.consecutive_failures,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::BoxFuture;
    use rust_decimal_macros::dec;

    struct NullProvider {
        markets: Vec<AssetPair>,
    }

    impl FeedProvider for NullProvider {
        fn name(&self) -> &str {
            "null"
        }

        fn available_markets(&self) -> &[AssetPair] {
            &self.markets
        }

        fn fetch<'a>(
            &'a self,
            _asset: &'a str,
            _base: &'a str,
        ) -> BoxFuture<'a, FeedResult<FeedPrice>> {
            Box::pin(async { Err(FeedError::Provider("null".into())) })
        }
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(vec![Arc::new(NullProvider {
            markets: vec![AssetPair::new("USD", "BTS")],
        })])
    }

    fn usd_quote() -> FeedPrice {
        FeedPrice::new(AssetPair::new("USD", "BTS"), dec!(0.05), "null")
    }

    #[test]
    fn unknown_provider_is_an_error() {
        assert!(registry().provider("nope").is_err());
        assert!(registry().provider("null").is_ok());
    }

    #[test]
    fn three_consecutive_failures_degrade_health() {
        let reg = registry();
        reg.record_failure("null");
        reg.record_failure("null");
        assert!(reg.is_online("null"));
        reg.record_failure("null");
        assert!(!reg.is_online("null"));

        // A success restores the provider.
        reg.record_success("null", &usd_quote());
        assert!(reg.is_online("null"));
    }

    #[test]
    fn stale_reuse_is_bounded() {
        let reg = registry();
        let pair = AssetPair::new("USD", "BTS");
        reg.record_success("null", &usd_quote());

        let first = reg.reuse_last_good("null", &pair, 2).unwrap();
        assert!(first.stale);
        assert_eq!(first.price, dec!(0.05));
        assert!(reg.reuse_last_good("null", &pair, 2).is_some());
        // Budget of 2 exhausted.
        assert!(reg.reuse_last_good("null", &pair, 2).is_none());

        // A fresh success resets the budget.
        reg.record_success("null", &usd_quote());
        assert!(reg.reuse_last_good("null", &pair, 2).is_some());
    }

    #[test]
    fn reuse_without_history_yields_nothing() {
        let reg = registry();
        assert!(reg
            .reuse_last_good("null", &AssetPair::new("USD", "BTS"), 5)
            .is_none());
    }
}
