//! Asset pair identification.
//!
//! A feed is always quoted for an `asset/base` pair, e.g. `USD/BTS`:
//! the price of one unit of `asset` denominated in `base`. Pairs are
//! compared case-sensitively on canonical upper-case symbols.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical asset/base pair for a price feed.
///
/// This is the primary key for feed aggregation: a `FeedSet` may only
/// be aggregated when every member quotes the same pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetPair {
    /// Quoted asset symbol (e.g. "USD", "GOLD").
    pub asset: String,
    /// Base symbol the price is denominated in (e.g. "BTS").
    pub base: String,
}

impl AssetPair {
    pub fn new(asset: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            asset: asset.into().to_uppercase(),
            base: base.into().to_uppercase(),
        }
    }

    /// Parse from the canonical `"ASSET/BASE"` form.
    pub fn parse(s: &str) -> Result<Self> {
        let (asset, base) = s
            .split_once('/')
            .ok_or_else(|| CoreError::InvalidPair(format!("expected ASSET/BASE, got {s:?}")))?;
        if asset.is_empty() || base.is_empty() {
            return Err(CoreError::InvalidPair(format!(
                "empty symbol in pair {s:?}"
            )));
        }
        Ok(Self::new(asset, base))
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asset, self.base)
    }
}
