//! FeedProvider capability trait.
//!
//! A provider is any external quote source that can serve a declared
//! set of markets. Providers are registered explicitly at startup;
//! there is no runtime discovery.

use crate::error::FeedResult;
use std::pin::Pin;
use witmon_core::{AssetPair, FeedPrice};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// External quote source for a declared set of markets.
///
/// `fetch` receives the *provider-local* asset ticker (after
/// `remap_asset`) and the canonical base; the poller normalizes the
/// returned quote back onto the canonical pair, so implementations
/// don't need to translate back.
pub trait FeedProvider: Send + Sync {
    /// Provider name used in registry, health table, and quotes.
    fn name(&self) -> &str;

    /// Markets this provider can serve, in canonical symbols.
    fn available_markets(&self) -> &[AssetPair];

    /// Translate a canonical asset symbol to this provider's ticker
    /// (e.g. GOLD -> XAU). Identity by default.
    fn remap_asset(&self, asset: &str) -> String {
        asset.to_string()
    }

    /// Fetch one quote. Fails on provider/transport errors; the poller
    /// adds timeout, retry, and health recording around this.
    fn fetch<'a>(&'a self, asset: &'a str, base: &'a str) -> BoxFuture<'a, FeedResult<FeedPrice>>;
}
