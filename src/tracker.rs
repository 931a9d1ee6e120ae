//! Consecutive-failure tracking with one alert per outage.

use std::collections::{HashMap, HashSet};

use crate::models::{AlertEvent, AlertKind};

pub const ALERT_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureState {
    pub consecutive_failures: u32,
    pub alert_sent: bool,
}

#[derive(Debug)]
pub struct FailureTracker {
    threshold: u32,
    states: HashMap<u16, FailureState>,
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self::new(ALERT_THRESHOLD)
    }
}

impl FailureTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            states: HashMap::new(),
        }
    }

    /// Feeds one probe outcome for `port` and returns the alert it triggers, if any.
    ///
    /// A DOWN event fires once when the strike count first reaches the threshold.
    /// A RECOVERED event fires on the first success after a DOWN event. Any success
    /// resets the strike count, so strikes never carry over across a recovery.
    pub fn evaluate(&mut self, port: u16, is_up: bool) -> Option<AlertEvent> {
        let state = self.states.entry(port).or_default();

        if is_up {
            let announced = state.alert_sent;
            *state = FailureState::default();
            return announced.then_some(AlertEvent {
                port,
                kind: AlertKind::Recovered,
                strikes: 0,
            });
        }

        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        if state.consecutive_failures >= self.threshold && !state.alert_sent {
            state.alert_sent = true;
            return Some(AlertEvent {
                port,
                kind: AlertKind::Down,
                strikes: state.consecutive_failures,
            });
        }
        None
    }

    pub fn state(&self, port: u16) -> Option<FailureState> {
        self.states.get(&port).copied()
    }

    /// Drops state for ports that are no longer in the watchlist at all.
    /// Disabled-but-listed ports keep their state.
    pub fn retain_ports(&mut self, listed: &HashSet<u16>) {
        self.states.retain(|port, _| listed.contains(port));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(tracker: &mut FailureTracker, port: u16, outcomes: &[bool]) -> Vec<Option<AlertKind>> {
        outcomes
            .iter()
            .map(|up| tracker.evaluate(port, *up).map(|e| e.kind))
            .collect()
    }

    #[test]
    fn healthy_target_never_alerts() {
        let mut tracker = FailureTracker::default();
        assert_eq!(run(&mut tracker, 8096, &[true, true, true]), vec![None, None, None]);
        assert_eq!(tracker.state(8096), Some(FailureState::default()));
    }

    #[test]
    fn single_down_alert_for_long_outage() {
        let mut tracker = FailureTracker::default();
        let events = run(&mut tracker, 7878, &[false, false, false, false]);
        assert_eq!(events, vec![None, None, Some(AlertKind::Down), None]);
        let state = tracker.state(7878).unwrap();
        assert_eq!(state.consecutive_failures, 4);
        assert!(state.alert_sent);
    }

    #[test]
    fn down_event_carries_strike_count() {
        let mut tracker = FailureTracker::default();
        tracker.evaluate(7878, false);
        tracker.evaluate(7878, false);
        let event = tracker.evaluate(7878, false).unwrap();
        assert_eq!(event.strikes, 3);
        assert_eq!(event.port, 7878);
    }

    #[test]
    fn recovery_after_announced_outage() {
        let mut tracker = FailureTracker::default();
        let events = run(&mut tracker, 7878, &[false, false, false, true]);
        assert_eq!(events, vec![None, None, Some(AlertKind::Down), Some(AlertKind::Recovered)]);
        assert_eq!(tracker.state(7878).unwrap().consecutive_failures, 0);
        assert!(!tracker.state(7878).unwrap().alert_sent);
    }

    #[test]
    fn no_recovery_for_unannounced_blip() {
        let mut tracker = FailureTracker::default();
        let events = run(&mut tracker, 22, &[false, false, true]);
        assert_eq!(events, vec![None, None, None]);
    }

    #[test]
    fn flapping_requires_fresh_consecutive_strikes() {
        let mut tracker = FailureTracker::default();
        let events = run(&mut tracker, 9000, &[false, false, true, false, false, false]);
        assert_eq!(events, vec![None, None, None, None, None, Some(AlertKind::Down)]);
    }

    #[test]
    fn repeated_outages_alert_once_each() {
        let mut tracker = FailureTracker::default();
        let pattern = [false, false, false, false, true, false, false, false, true];
        let events = run(&mut tracker, 53, &pattern);
        let downs = events.iter().filter(|e| **e == Some(AlertKind::Down)).count();
        let recoveries = events.iter().filter(|e| **e == Some(AlertKind::Recovered)).count();
        assert_eq!(downs, 2);
        assert_eq!(recoveries, 2);
    }

    #[test]
    fn ports_are_independent() {
        let mut tracker = FailureTracker::default();
        tracker.evaluate(80, false);
        tracker.evaluate(443, true);
        tracker.evaluate(80, false);
        tracker.evaluate(443, false);
        assert_eq!(tracker.evaluate(80, false).map(|e| e.kind), Some(AlertKind::Down));
        assert_eq!(tracker.state(443).unwrap().consecutive_failures, 1);
    }

    #[test]
    fn retain_prunes_unlisted_ports() {
        let mut tracker = FailureTracker::default();
        tracker.evaluate(80, false);
        tracker.evaluate(443, false);
        let listed: HashSet<u16> = [80].into_iter().collect();
        tracker.retain_ports(&listed);
        assert!(tracker.state(80).is_some());
        assert!(tracker.state(443).is_none());
    }
}
