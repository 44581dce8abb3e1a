//! Application assembly.
//!
//! Everything configurable is built and validated here, before any
//! loop starts: provider registry, feed controller, RPC clients, one
//! monitoring loop per node group. Assembly failures abort startup;
//! runtime failures are the loops' problem and never propagate back.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::info;
use witmon_feed::{
    FeedController, FeedControllerConfig, FeedPoller, FeedProvider, JsonHttpProvider,
    ProviderRegistry, ScheduleConfig,
};
use witmon_monitor::{MonitoredNode, MonitoringLoop};
use witmon_notify::{LogNotifier, NotificationHub, Notifier};
use witmon_rpc::{HttpNodeClient, NodeClient};

/// The assembled daemon.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run until a shutdown signal arrives.
    pub async fn run(self) -> AppResult<()> {
        let hub = self.build_hub();
        let feeds = self.build_feed_controller()?;
        let check_interval = Duration::from_secs(self.config.check_interval_secs);

        let mut loops: JoinSet<()> = JoinSet::new();
        for (group, nodes) in self.config.node_groups() {
            let mut monitored = Vec::with_capacity(nodes.len());
            let mut has_publisher = false;

            for node in nodes {
                let client: Arc<dyn NodeClient> = Arc::new(HttpNodeClient::new(&node.rpc_url)?);
                has_publisher |= node.publish_feeds;
                monitored.push(MonitoredNode::new(
                    node,
                    client,
                    self.config.tracker.clone(),
                ));
            }

            // The feed duty follows the group that contains the
            // publishing node.
            let group_feeds = if has_publisher { feeds.clone() } else { None };

            info!(
                group = %group,
                nodes = monitored.len(),
                feeds = group_feeds.is_some(),
                "Starting monitoring loop"
            );
            loops.spawn(MonitoringLoop::new(monitored, hub.clone(), group_feeds, check_interval).run());
        }

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received, stopping monitoring loops");
        loops.shutdown().await;
        Ok(())
    }

    fn build_hub(&self) -> Arc<NotificationHub> {
        // The log channel is always present so transitions land in the
        // journal even with no external channel configured.
        let channels: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];
        Arc::new(NotificationHub::new(
            channels,
            self.config.notification.recipients.clone(),
        ))
    }

    fn build_feed_controller(&self) -> AppResult<Option<Arc<FeedController>>> {
        let Some(feeds) = &self.config.feeds else {
            return Ok(None);
        };

        let timeout = Duration::from_secs(feeds.poller.call_timeout_secs);
        let mut providers: Vec<Arc<dyn FeedProvider>> = Vec::with_capacity(feeds.providers.len());
        for provider_config in &feeds.providers {
            let provider = JsonHttpProvider::new(provider_config.clone(), timeout)?;
            providers.push(Arc::new(provider));
        }
        let registry = Arc::new(ProviderRegistry::new(providers));
        let poller = FeedPoller::new(registry, feeds.poller.clone());

        let check_interval = Duration::from_secs(self.config.check_interval_secs);
        let schedule = ScheduleConfig {
            check_interval,
            publish_every_n_checks: feeds.publish_every_n_checks,
            publish_interval: feeds.publish_interval_secs.map(Duration::from_secs),
            publish_time_slot: feeds.time_slot()?,
            publish_deviation: feeds.publish_deviation,
        };

        // validate() guarantees a publishing node with a witness name.
        let witness = self
            .config
            .nodes
            .iter()
            .find(|n| n.publish_feeds)
            .and_then(|n| n.witness_name.clone())
            .ok_or_else(|| AppError::Config("no feed-publishing witness configured".into()))?;

        let controller = FeedController::new(
            FeedControllerConfig {
                base: feeds.base.clone(),
                assets: feeds.assets.clone(),
                tolerance: feeds.tolerance,
                asset_tolerance: feeds.asset_tolerance.clone(),
                check_interval,
                median_time_span: Duration::from_secs(feeds.median_time_span_secs),
            },
            poller,
            schedule,
            witness,
        )?;

        Ok(Some(Arc::new(controller)))
    }
}
