//! Core domain types for the witmon monitoring daemon.
//!
//! This crate provides the fundamental value types used throughout the
//! system:
//! - `AssetPair`: canonical asset/base pair for a price feed
//! - `FeedPrice`: a single provider's quote for a pair
//! - `FeedSet`: an ordered collection of quotes with filtering and
//!   weighted-mean aggregation
//! - `AggregatedPrice`: the result of aggregation, carrying the
//!   consistency verdict alongside the value

pub mod error;
pub mod pair;
pub mod price;

pub use error::{CoreError, Result};
pub use pair::AssetPair;
pub use price::{AggregatedPrice, FeedPrice, FeedSet, SymbolFilter};
