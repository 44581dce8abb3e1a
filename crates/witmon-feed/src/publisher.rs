//! On-chain feed publication.
//!
//! Publication is delegated to the node's RPC. One batched transaction
//! covering all assets is attempted first; if the batch fails, each
//! asset is published individually so a single bad asset cannot block
//! the rest. The published and failed sets are logged distinctly.

use serde_json::{json, Value};
use tracing::{error, info, warn};
use witmon_rpc::NodeClient;

/// Result of one publication round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Assets whose feed landed on-chain.
    pub published: Vec<String>,
    /// Assets whose feed could not be published this round.
    pub failed: Vec<String>,
}

impl PublishOutcome {
    /// True when at least one asset was published.
    #[must_use]
    pub fn any_published(&self) -> bool {
        !self.published.is_empty()
    }
}

/// Publishes median feed prices through a node's RPC.
pub struct FeedPublisher {
    /// Witness account publishing the feeds.
    witness: String,
}

impl FeedPublisher {
    pub fn new(witness: impl Into<String>) -> Self {
        Self {
            witness: witness.into(),
        }
    }

    /// Publish `feeds` (asset, median price as string) through
    /// `client`. Never returns an error: per-asset failure is recorded
    /// in the outcome and logged, nothing propagates to the caller's
    /// tick.
    pub async fn publish(&self, client: &dyn NodeClient, feeds: &[(String, String)]) -> PublishOutcome {
        if feeds.is_empty() {
            return PublishOutcome::default();
        }

        let batch: Vec<Value> = feeds
            .iter()
            .map(|(asset, price)| json!([asset, price]))
            .collect();

        match client
            .call(
                "publish_feeds",
                vec![json!(self.witness), Value::Array(batch)],
            )
            .await
        {
            Ok(_) => {
                let published: Vec<String> = feeds.iter().map(|(a, _)| a.clone()).collect();
                info!(
                    witness = %self.witness,
                    assets = ?published,
                    "Published feeds in one batch"
                );
                PublishOutcome {
                    published,
                    failed: Vec::new(),
                }
            }
            Err(e) => {
                warn!(
                    witness = %self.witness,
                    error = %e,
                    "Batched feed publication failed, retrying per asset"
                );
                self.publish_individually(client, feeds).await
            }
        }
    }

    async fn publish_individually(
        &self,
        client: &dyn NodeClient,
        feeds: &[(String, String)],
    ) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();
        for (asset, price) in feeds {
            let result = client
                .call(
                    "publish_feeds",
                    vec![json!(self.witness), json!([[asset, price]])],
                )
                .await;
            match result {
                Ok(_) => outcome.published.push(asset.clone()),
                Err(e) => {
                    warn!(asset, error = %e, "Feed publication failed for asset");
                    outcome.failed.push(asset.clone());
                }
            }
        }

        if outcome.failed.is_empty() {
            info!(published = ?outcome.published, "Published all feeds individually");
        } else {
            error!(
                published = ?outcome.published,
                failed = ?outcome.failed,
                "Feed publication partially failed"
            );
        }
        outcome
    }
}
