//! Feed price value objects and aggregation.
//!
//! `FeedPrice` is one provider's quote for an asset pair. `FeedSet` is
//! the ordered collection of quotes gathered in a polling cycle, with
//! filtering and volume-weighted aggregation. Aggregation never mutates
//! the set; `filter` returns a new set.

use crate::error::{CoreError, Result};
use crate::pair::AssetPair;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single provider's quote for an asset pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPrice {
    /// Pair the quote is for.
    pub pair: AssetPair,
    /// Quoted price (units of `base` per unit of `asset`).
    pub price: Decimal,
    /// 24h traded volume, denominated in units of `asset`.
    /// Used as the aggregation weight when every member carries one.
    pub volume: Option<Decimal>,
    /// Provider-reported quote time, if any.
    pub timestamp: Option<DateTime<Utc>>,
    /// Name of the provider that produced this quote.
    pub provider: String,
    /// True when this is a reused last-known-good value rather than a
    /// live tick. Stale quotes still count toward the mean but are
    /// excluded from the consistency dispersion check.
    #[serde(default)]
    pub stale: bool,
}

impl FeedPrice {
    pub fn new(pair: AssetPair, price: Decimal, provider: impl Into<String>) -> Self {
        Self {
            pair,
            price,
            volume: None,
            timestamp: None,
            provider: provider.into(),
            stale: false,
        }
    }

    /// Attach a volume weight.
    #[must_use]
    pub fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Attach a provider-reported timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Mark as a reused last-known-good value.
    #[must_use]
    pub fn as_stale(mut self) -> Self {
        self.stale = true;
        self
    }
}

/// Symbol filter accepting a single symbol or a set of symbols.
#[derive(Debug, Clone)]
pub enum SymbolFilter {
    /// Match anything.
    Any,
    /// Match a single symbol.
    One(String),
    /// Match any symbol in the set.
    Many(Vec<String>),
}

impl SymbolFilter {
    fn matches(&self, symbol: &str) -> bool {
        match self {
            Self::Any => true,
            Self::One(s) => s == symbol,
            Self::Many(set) => set.iter().any(|s| s == symbol),
        }
    }
}

impl From<&str> for SymbolFilter {
    fn from(s: &str) -> Self {
        Self::One(s.to_uppercase())
    }
}

impl From<String> for SymbolFilter {
    fn from(s: String) -> Self {
        Self::One(s.to_uppercase())
    }
}

impl<const N: usize> From<[&str; N]> for SymbolFilter {
    fn from(symbols: [&str; N]) -> Self {
        Self::Many(symbols.iter().map(|s| s.to_uppercase()).collect())
    }
}

impl From<&[String]> for SymbolFilter {
    fn from(symbols: &[String]) -> Self {
        Self::Many(symbols.iter().map(|s| s.to_uppercase()).collect())
    }
}

/// Result of aggregating a `FeedSet`.
///
/// Carries the consistency verdict alongside the value: a tolerance
/// breach is a warning-level signal, and whether to still publish is
/// the scheduler's policy decision, not this type's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPrice {
    /// Pair the aggregate is for.
    pub pair: AssetPair,
    /// Aggregated price (volume-weighted mean, or simple mean when any
    /// member lacks volume).
    pub price: Decimal,
    /// Number of quotes that contributed.
    pub samples: usize,
    /// Population relative standard deviation of live (non-stale)
    /// member prices. Zero when fewer than two live quotes exist.
    pub dispersion: f64,
    /// False when `dispersion` exceeded the requested tolerance.
    pub consistent: bool,
}

/// Ordered collection of feed quotes, not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSet(Vec<FeedPrice>);

impl FeedSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, price: FeedPrice) {
        self.0.push(price);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeedPrice> {
        self.0.iter()
    }

    /// Return the subset whose asset and base match the given filters,
    /// preserving order. The original set is untouched.
    #[must_use]
    pub fn filter(
        &self,
        asset: impl Into<SymbolFilter>,
        base: impl Into<SymbolFilter>,
    ) -> FeedSet {
        let asset = asset.into();
        let base = base.into();
        FeedSet(
            self.0
                .iter()
                .filter(|p| asset.matches(&p.pair.asset) && base.matches(&p.pair.base))
                .cloned()
                .collect(),
        )
    }

    /// Aggregate the set into a single price.
    ///
    /// Volume-weighted mean when every member carries a volume; when
    /// any member lacks one, falls back to the simple arithmetic mean
    /// over *all* members (policy: volume-less members are not
    /// silently dropped). With `tolerance` set, the population
    /// relative standard deviation of live member prices is compared
    /// against it and reported through `AggregatedPrice::consistent`;
    /// a breach is never a hard failure.
    ///
    /// # Errors
    /// - the set is empty
    /// - members span more than one (asset, base) pair
    pub fn weighted_mean(&self, tolerance: Option<f64>) -> Result<AggregatedPrice> {
        let first = self.0.first().ok_or_else(|| {
            CoreError::EmptyFeedSet("cannot aggregate an empty feed set".to_string())
        })?;
        let pair = first.pair.clone();
        for p in &self.0[1..] {
            if p.pair != pair {
                return Err(CoreError::MixedPairs {
                    expected: pair.to_string(),
                    found: p.pair.to_string(),
                });
            }
        }

        let price = if self.0.iter().all(|p| p.volume.is_some()) {
            let total_volume: Decimal = self.0.iter().filter_map(|p| p.volume).sum();
            if total_volume.is_zero() {
                self.simple_mean()
            } else {
                let weighted: Decimal = self
                    .0
                    .iter()
                    .map(|p| p.price * p.volume.unwrap_or_default())
                    .sum();
                weighted / total_volume
            }
        } else {
            self.simple_mean()
        };

        let dispersion = self.live_dispersion();
        let consistent = tolerance.map_or(true, |t| dispersion <= t);

        Ok(AggregatedPrice {
            pair,
            price,
            samples: self.0.len(),
            dispersion,
            consistent,
        })
    }

    fn simple_mean(&self) -> Decimal {
        let sum: Decimal = self.0.iter().map(|p| p.price).sum();
        sum / Decimal::from(self.0.len())
    }

    /// Population relative standard deviation of non-stale prices.
    ///
    /// Stale reused quotes are excluded so a frozen value cannot
    /// manufacture an inconsistency alarm against live ticks.
    fn live_dispersion(&self) -> f64 {
        let live: Vec<f64> = self
            .0
            .iter()
            .filter(|p| !p.stale)
            .filter_map(|p| p.price.to_f64())
            .collect();
        if live.len() < 2 {
            return 0.0;
        }
        let n = live.len() as f64;
        let mean = live.iter().sum::<f64>() / n;
        if mean == 0.0 {
            return 0.0;
        }
        let variance = live.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt() / mean.abs()
    }
}

impl FromIterator<FeedPrice> for FeedSet {
    fn from_iter<I: IntoIterator<Item = FeedPrice>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FeedSet {
    type Item = FeedPrice;
    type IntoIter = std::vec::IntoIter<FeedPrice>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeedSet {
    type Item = &'a FeedPrice;
    type IntoIter = std::slice::Iter<'a, FeedPrice>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
