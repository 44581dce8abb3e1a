//! Publication scheduling.
//!
//! Decides *when* medians get committed on-chain. Publication happens
//! on the very first check after process start (bootstrap visibility),
//! then whenever a configured check-count period, wall-clock interval,
//! daily time-of-day slot, or relative price deviation since the last
//! publication comes due. The slot is also checked one hour either
//! side so a coarse check interval or a DST shift cannot skip the
//! day's publication entirely. Until a publication has actually
//! landed, every check publishes again: a failed bootstrap must not
//! leave the chain without a feed for a whole interval.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

/// When to publish, all conditions OR-ed together.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Interval between feed checks; also the width of the slot match
    /// window.
    pub check_interval: Duration,
    /// Publish every N feed checks.
    pub publish_every_n_checks: Option<u64>,
    /// Publish when this much wall-clock time elapsed since the last
    /// publication.
    pub publish_interval: Option<Duration>,
    /// Publish once per day at this time (UTC).
    pub publish_time_slot: Option<NaiveTime>,
    /// Publish when any asset's value moved by more than this relative
    /// fraction since the last publication.
    pub publish_deviation: Option<f64>,
}

impl ScheduleConfig {
    pub fn every_checks(check_interval: Duration, n: u64) -> Self {
        Self {
            check_interval,
            publish_every_n_checks: Some(n),
            publish_interval: None,
            publish_time_slot: None,
            publish_deviation: None,
        }
    }
}

/// Mutable scheduling state for one feed controller.
#[derive(Debug)]
pub struct PublishSchedule {
    config: ScheduleConfig,
    nfeed_checked: u64,
    bootstrapped: bool,
    last_published: Option<DateTime<Utc>>,
    /// Values as of the last successful publication, for the
    /// deviation trigger.
    last_prices: HashMap<String, Decimal>,
}

impl PublishSchedule {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            config,
            nfeed_checked: 0,
            bootstrapped: false,
            last_published: None,
            last_prices: HashMap::new(),
        }
    }

    /// Count of feed checks seen so far.
    pub fn nfeed_checked(&self) -> u64 {
        self.nfeed_checked
    }

    /// Record a successful publication of `prices`.
    pub fn mark_published(&mut self, now: DateTime<Utc>, prices: &[(String, Decimal)]) {
        self.last_published = Some(now);
        for (asset, price) in prices {
            self.last_prices.insert(asset.clone(), *price);
        }
    }

    /// Decide whether this check should publish. Counts the check.
    /// `current` carries this check's per-asset values for the
    /// deviation trigger.
    pub fn should_publish(&mut self, now: DateTime<Utc>, current: &[(String, Decimal)]) -> bool {
        self.nfeed_checked += 1;

        // Bootstrap: always publish on the first check ever so a fresh
        // process becomes visible on-chain immediately.
        if !self.bootstrapped {
            self.bootstrapped = true;
            return true;
        }

        if let Some(n) = self.config.publish_every_n_checks {
            if n > 0 && self.nfeed_checked % n == 0 {
                return true;
            }
        }

        if self.deviated(current) {
            return true;
        }

        // Nothing ever landed on-chain: keep retrying every check
        // rather than waiting out the configured interval.
        let Some(last) = self.last_published else {
            return true;
        };

        if let Some(interval) = self.config.publish_interval {
            let elapsed = now.signed_duration_since(last);
            if elapsed >= ChronoDuration::from_std(interval).unwrap_or(ChronoDuration::MAX) {
                return true;
            }
        }

        if let Some(slot) = self.config.publish_time_slot {
            if self.in_slot_window(now, slot) {
                return true;
            }
        }

        false
    }

    /// True when any asset moved past the configured relative
    /// deviation since the last publication.
    fn deviated(&self, current: &[(String, Decimal)]) -> bool {
        let Some(threshold) = self.config.publish_deviation else {
            return false;
        };
        current.iter().any(|(asset, price)| {
            self.last_prices.get(asset).is_some_and(|last| {
                if last.is_zero() {
                    return false;
                }
                ((*price - *last).abs() / *last)
                    .to_f64()
                    .is_some_and(|ratio| ratio > threshold)
            })
        })
    }

    /// True when `now` falls within one check-interval after the slot,
    /// or after the slot shifted by plus or minus one hour.
    fn in_slot_window(&self, now: DateTime<Utc>, slot: NaiveTime) -> bool {
        let window = ChronoDuration::from_std(self.config.check_interval)
            .unwrap_or_else(|_| ChronoDuration::seconds(1));
        let base = now.date_naive().and_time(slot).and_utc();
        [-1i64, 0, 1].into_iter().any(|h| {
            let target = base + ChronoDuration::hours(h);
            let offset = now.signed_duration_since(target);
            offset >= ChronoDuration::zero() && offset < window
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
    }

    fn usd(price: Decimal) -> Vec<(String, Decimal)> {
        vec![("USD".to_string(), price)]
    }

    #[test]
    fn first_check_always_publishes() {
        let mut schedule = PublishSchedule::new(ScheduleConfig {
            check_interval: Duration::from_secs(600),
            publish_every_n_checks: None,
            publish_interval: Some(Duration::from_secs(86_400)),
            publish_time_slot: None,
            publish_deviation: None,
        });

        assert!(schedule.should_publish(at(12, 0, 0), &[]));
        schedule.mark_published(at(12, 0, 0), &[]);
        // Immediately after, nothing is due.
        assert!(!schedule.should_publish(at(12, 10, 0), &[]));
        assert!(!schedule.should_publish(at(12, 20, 0), &[]));
    }

    #[test]
    fn failed_bootstrap_retries_every_check() {
        let mut schedule = PublishSchedule::new(ScheduleConfig {
            check_interval: Duration::from_secs(600),
            publish_every_n_checks: None,
            publish_interval: Some(Duration::from_secs(86_400)),
            publish_time_slot: None,
            publish_deviation: None,
        });

        // Bootstrap consumed, but the publication never landed (no
        // mark_published): every following check stays due.
        assert!(schedule.should_publish(at(12, 0, 0), &[]));
        assert!(schedule.should_publish(at(12, 10, 0), &[]));
        assert!(schedule.should_publish(at(12, 20, 0), &[]));

        // Once one lands, the interval gate takes over.
        schedule.mark_published(at(12, 20, 0), &[]);
        assert!(!schedule.should_publish(at(12, 30, 0), &[]));
    }

    #[test]
    fn check_count_period_comes_due() {
        let mut schedule = PublishSchedule::new(ScheduleConfig::every_checks(
            Duration::from_secs(600),
            5,
        ));

        assert!(schedule.should_publish(at(0, 0, 0), &[])); // bootstrap, check 1
        schedule.mark_published(at(0, 0, 0), &[]);
        for i in 2..5 {
            assert!(!schedule.should_publish(at(0, 10 * i, 0), &[]));
        }
        // Check number 5 hits the period.
        assert!(schedule.should_publish(at(0, 50, 0), &[]));
        assert!(!schedule.should_publish(at(1, 0, 0), &[]));
    }

    #[test]
    fn wall_clock_interval_comes_due() {
        let mut schedule = PublishSchedule::new(ScheduleConfig {
            check_interval: Duration::from_secs(600),
            publish_every_n_checks: None,
            publish_interval: Some(Duration::from_secs(3600)),
            publish_time_slot: None,
            publish_deviation: None,
        });

        assert!(schedule.should_publish(at(12, 0, 0), &[]));
        schedule.mark_published(at(12, 0, 0), &[]);
        assert!(!schedule.should_publish(at(12, 30, 0), &[]));
        // One hour since the last publication.
        assert!(schedule.should_publish(at(13, 0, 0), &[]));
        schedule.mark_published(at(13, 0, 0), &[]);
        assert!(!schedule.should_publish(at(13, 30, 0), &[]));
        assert!(schedule.should_publish(at(14, 0, 0), &[]));
    }

    #[test]
    fn daily_slot_matches_within_one_check_interval() {
        let mut schedule = PublishSchedule::new(ScheduleConfig {
            check_interval: Duration::from_secs(600),
            publish_every_n_checks: None,
            publish_interval: None,
            publish_time_slot: Some(NaiveTime::from_hms_opt(1, 0, 0).unwrap()),
            publish_deviation: None,
        });

        // Consume the bootstrap publication well before any window.
        let start = at(0, 0, 0) - ChronoDuration::hours(2);
        assert!(schedule.should_publish(start, &[]));
        schedule.mark_published(start, &[]);

        // Slot minus one hour: window is 00:00..00:10.
        assert!(schedule.should_publish(at(0, 5, 0), &[]));
        assert!(!schedule.should_publish(at(0, 30, 0), &[]));
        // Exact slot: window 01:00..01:10.
        assert!(schedule.should_publish(at(1, 5, 0), &[]));
        assert!(!schedule.should_publish(at(1, 20, 0), &[]));
        // Slot plus one hour: window 02:00..02:10.
        assert!(schedule.should_publish(at(2, 9, 59), &[]));
        assert!(!schedule.should_publish(at(3, 0, 0), &[]));
    }

    #[test]
    fn price_deviation_comes_due() {
        let mut schedule = PublishSchedule::new(ScheduleConfig {
            check_interval: Duration::from_secs(600),
            publish_every_n_checks: None,
            publish_interval: None,
            publish_time_slot: None,
            publish_deviation: Some(0.1),
        });

        assert!(schedule.should_publish(at(12, 0, 0), &usd(dec!(0.05))));
        schedule.mark_published(at(12, 0, 0), &usd(dec!(0.05)));

        // 4% move: under the 10% threshold.
        assert!(!schedule.should_publish(at(12, 10, 0), &usd(dec!(0.052))));
        // 20% move: past the threshold.
        assert!(schedule.should_publish(at(12, 20, 0), &usd(dec!(0.06))));
        schedule.mark_published(at(12, 20, 0), &usd(dec!(0.06)));

        // The baseline moved with the publication.
        assert!(!schedule.should_publish(at(12, 30, 0), &usd(dec!(0.062))));
        // Downward moves count too.
        assert!(schedule.should_publish(at(12, 40, 0), &usd(dec!(0.04))));
    }

    #[test]
    fn deviation_ignores_assets_never_published() {
        let mut schedule = PublishSchedule::new(ScheduleConfig {
            check_interval: Duration::from_secs(600),
            publish_every_n_checks: None,
            publish_interval: None,
            publish_time_slot: None,
            publish_deviation: Some(0.1),
        });

        assert!(schedule.should_publish(at(12, 0, 0), &usd(dec!(0.05))));
        schedule.mark_published(at(12, 0, 0), &usd(dec!(0.05)));

        // GOLD has no published baseline, so it cannot trigger.
        let gold = vec![("GOLD".to_string(), dec!(2000))];
        assert!(!schedule.should_publish(at(12, 10, 0), &gold));
    }
}
