//! Bounded per-asset price history.
//!
//! Publication uses the median of this window, not the latest tick, so
//! a single noisy cycle from a volatile source cannot land on-chain.
//! Capacity is fixed at construction (median_time_span / check_interval
//! in the controller); appending at capacity drops the oldest value.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};

/// Bounded sliding window of aggregated prices, one series per asset.
pub struct PriceHistory {
    capacity: usize,
    series: Mutex<HashMap<String, VecDeque<Decimal>>>,
}

impl PriceHistory {
    /// Create with a fixed per-asset capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: Mutex::new(HashMap::new()),
        }
    }

    /// Append a value at the tail, dropping the oldest at capacity.
    pub fn append(&self, asset: &str, price: Decimal) {
        let mut series = self.series.lock();
        let window = series.entry(asset.to_string()).or_default();
        window.push_back(price);
        while window.len() > self.capacity {
            window.pop_front();
        }
    }

    /// Median of the asset's window. Even-length windows take the mean
    /// of the two middle values. `None` when no value was ever seen.
    pub fn median(&self, asset: &str) -> Option<Decimal> {
        let series = self.series.lock();
        let window = series.get(asset)?;
        if window.is_empty() {
            return None;
        }
        let mut sorted: Vec<Decimal> = window.iter().copied().collect();
        sorted.sort();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 1 {
            Some(sorted[mid])
        } else {
            Some((sorted[mid - 1] + sorted[mid]) / Decimal::TWO)
        }
    }

    /// Number of samples currently held for the asset.
    pub fn len(&self, asset: &str) -> usize {
        self.series.lock().get(asset).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, asset: &str) -> bool {
        self.len(asset) == 0
    }
}
