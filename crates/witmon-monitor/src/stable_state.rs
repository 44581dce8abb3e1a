//! Sliding-window state debouncer.
//!
//! Converts a stream of discrete observations into a "stable state"
//! once `n` consecutive identical observations occur, and reports each
//! transition edge exactly once. A single transient outlier inside a
//! stable run never surfaces; only `n` consecutive new values can
//! establish a new stable state.

use std::collections::VecDeque;

/// Debouncer over discrete observations.
///
/// Holds the last `n + 1` pushed observations and the last stable
/// state that was ever established. The stable state only moves when
/// the most recent `n` samples agree on a value; while the window is
/// mixed, the previously established state is retained. `just_changed`
/// compares against the *recorded* stable state, not the raw window,
/// so a long run of mixed windows cannot re-fire the same transition.
#[derive(Debug, Clone)]
pub struct StableStateMonitor<T> {
    window: usize,
    samples: VecDeque<T>,
    recorded: Option<T>,
    changed: bool,
}

impl<T: Clone + PartialEq> StableStateMonitor<T> {
    /// Create with the given debounce window (minimum 1).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window + 1),
            recorded: None,
            changed: false,
        }
    }

    /// Record one observation, evicting the oldest beyond `n + 1`.
    pub fn push(&mut self, observation: T) {
        self.samples.push_back(observation);
        while self.samples.len() > self.window + 1 {
            self.samples.pop_front();
        }

        let current = self.window_consensus();
        self.changed = match (&current, &self.recorded) {
            (Some(now), Some(before)) => now != before,
            // A mixed window and the very first established state are
            // never transitions.
            _ => false,
        };
        if current.is_some() {
            self.recorded = current;
        }
    }

    /// The debounced, authoritative value. `None` until `n` identical
    /// observations have ever been seen; afterwards, the last
    /// established value (a transient outlier does not unset it).
    pub fn stable_state(&self) -> Option<&T> {
        self.recorded.as_ref()
    }

    /// True exactly once per transition between two established stable
    /// states, on the push that completed the new run.
    pub fn just_changed(&self) -> bool {
        self.changed
    }

    /// The repeated value of the last `n` samples, if they agree.
    fn window_consensus(&self) -> Option<T> {
        if self.samples.len() < self.window {
            return None;
        }
        let mut recent = self.samples.iter().rev().take(self.window);
        let last = recent.next()?;
        if recent.all(|s| s == last) {
            Some(last.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Conn {
        Online,
        Offline,
    }

    #[test]
    fn fewer_than_n_samples_is_undefined() {
        let mut monitor = StableStateMonitor::new(3);
        monitor.push(Conn::Online);
        assert_eq!(monitor.stable_state(), None);
        assert!(!monitor.just_changed());
        monitor.push(Conn::Online);
        assert_eq!(monitor.stable_state(), None);
        assert!(!monitor.just_changed());
    }

    #[test]
    fn n_identical_samples_establish_the_state_without_a_transition() {
        let mut monitor = StableStateMonitor::new(3);
        for _ in 0..3 {
            monitor.push(Conn::Online);
        }
        assert_eq!(monitor.stable_state(), Some(&Conn::Online));
        // First established state is not a change.
        assert!(!monitor.just_changed());
    }

    #[test]
    fn transient_outlier_never_reports_a_transition() {
        // online x3, offline, online x3: the lone offline never reaches
        // 3 consecutive occurrences, so the stable state stays online
        // and no transition is ever reported.
        let sequence = [
            Conn::Online,
            Conn::Online,
            Conn::Online,
            Conn::Offline,
            Conn::Online,
            Conn::Online,
            Conn::Online,
        ];
        let expected_stable = [
            None,
            None,
            Some(Conn::Online),
            Some(Conn::Online),
            Some(Conn::Online),
            Some(Conn::Online),
            Some(Conn::Online),
        ];

        let mut monitor = StableStateMonitor::new(3);
        for (obs, expected) in sequence.into_iter().zip(expected_stable) {
            monitor.push(obs);
            assert_eq!(monitor.stable_state().copied(), expected);
            assert!(!monitor.just_changed());
        }
    }

    #[test]
    fn full_run_of_new_value_is_a_single_transition() {
        let mut monitor = StableStateMonitor::new(3);
        for _ in 0..3 {
            monitor.push(Conn::Online);
        }
        monitor.push(Conn::Offline);
        assert!(!monitor.just_changed());
        monitor.push(Conn::Offline);
        assert!(!monitor.just_changed());

        // 6th push completes 3 consecutive offline.
        monitor.push(Conn::Offline);
        assert_eq!(monitor.stable_state(), Some(&Conn::Offline));
        assert!(monitor.just_changed());

        // 7th push of the same value is not a change.
        monitor.push(Conn::Offline);
        assert!(!monitor.just_changed());
    }

    #[test]
    fn mixed_window_gap_does_not_refire_the_same_transition() {
        let mut monitor = StableStateMonitor::new(2);
        monitor.push(Conn::Online);
        monitor.push(Conn::Online);
        assert_eq!(monitor.stable_state(), Some(&Conn::Online));

        // Alternate so the window never agrees.
        monitor.push(Conn::Offline);
        assert!(!monitor.just_changed());
        monitor.push(Conn::Online);
        assert!(!monitor.just_changed());

        // Re-establishing the same old value is not a transition.
        monitor.push(Conn::Online);
        assert_eq!(monitor.stable_state(), Some(&Conn::Online));
        assert!(!monitor.just_changed());
    }

    #[test]
    fn window_of_one_tracks_every_flip() {
        let mut monitor = StableStateMonitor::new(1);
        monitor.push(Conn::Online);
        assert!(!monitor.just_changed());
        monitor.push(Conn::Offline);
        assert!(monitor.just_changed());
        monitor.push(Conn::Offline);
        assert!(!monitor.just_changed());
        monitor.push(Conn::Online);
        assert!(monitor.just_changed());
    }
}
