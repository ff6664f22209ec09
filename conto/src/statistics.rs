//! Running aggregates over finished contacts.
//!
//! Both accumulators are folded exactly once per contact, when it reaches a terminal state. All
//! durations are in seconds.

use std::fmt;

use serde::Serialize;

use crate::{ContactRecord, ContactStatus};

/// Contact-center-wide statistics.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ContactStatistics {
    /// Number of finished contacts.
    pub count: usize,
    /// Number of completed contacts.
    pub handled: usize,
    /// Number of abandoned contacts.
    pub abandoned: usize,
    /// Total duration of all contacts.
    pub duration: f64,
    /// Number of holds.
    pub hold_count: usize,
    /// Total time spent on hold.
    pub hold_duration: f64,
    /// Total time spent waiting for an agent.
    pub wait_time: f64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(total: f64, count: usize) -> f64 {
    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}

impl ContactStatistics {
    /// Folds a finished contact into the statistics.
    pub fn add(&mut self, record: &ContactRecord) {
        self.count += 1;
        match record.status {
            ContactStatus::Abandoned => self.abandoned += 1,
            ContactStatus::Completed => self.handled += 1,
            _ => {}
        }
        self.duration += record.duration;
        self.hold_count += record.hold_count;
        self.hold_duration += record.hold_duration;
        self.wait_time += record.wait_time;
    }

    /// Fraction of finished contacts that were abandoned.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn abandonment_rate(&self) -> f64 {
        ratio(self.abandoned as f64, self.count)
    }

    /// Average handle time.
    #[must_use]
    pub fn aht(&self) -> f64 {
        ratio(self.duration, self.handled)
    }

    /// Average time on hold.
    #[must_use]
    pub fn avg_hold_time(&self) -> f64 {
        ratio(self.hold_duration, self.hold_count)
    }

    /// Average speed of answer.
    #[must_use]
    pub fn asa(&self) -> f64 {
        ratio(self.wait_time, self.handled)
    }
}

impl fmt::Display for ContactStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContactStatistics(count={}, handled={}, abandonment_rate={:.2}%, aht={:.2}, \
             hold_count={}, avg_hold_time={:.2}, asa={:.2})",
            self.count,
            self.handled,
            self.abandonment_rate() * 100.0,
            self.aht(),
            self.hold_count,
            self.avg_hold_time(),
            self.asa()
        )
    }
}

/// Statistics of a single agent.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AgentStatistics {
    /// Number of contacts handled.
    pub handled: usize,
    /// Total duration of handled contacts.
    pub total_duration: f64,
    /// Number of holds.
    pub hold_count: usize,
    /// Total time spent on hold.
    pub hold_duration: f64,
}

impl AgentStatistics {
    /// Folds a contact handled by this agent into the statistics.
    pub fn add(&mut self, record: &ContactRecord) {
        self.handled += 1;
        self.total_duration += record.duration;
        self.hold_count += record.hold_count;
        self.hold_duration += record.hold_duration;
    }

    /// Average handle time.
    #[must_use]
    pub fn avg_handle_time(&self) -> f64 {
        ratio(self.total_duration, self.handled)
    }

    /// Average time on hold.
    #[must_use]
    pub fn avg_hold_time(&self) -> f64 {
        ratio(self.hold_duration, self.hold_count)
    }
}

impl fmt::Display for AgentStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AgentStatistics(handled={}, avg_handle_time={:.2}, hold_count={}, \
             avg_hold_time={:.2})",
            self.handled,
            self.avg_handle_time(),
            self.hold_count,
            self.avg_hold_time()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{AgentId, ContactId, ContactType, Skill};
    use float_cmp::approx_eq;

    fn record(status: ContactStatus, duration: f64, holds: usize, wait_time: f64) -> ContactRecord {
        ContactRecord {
            id: ContactId::from(1),
            contact_type: ContactType::Call,
            skill: Some(Skill::Sales),
            status,
            arrival_time: 0.0,
            answer_time: None,
            handled_by: Some(AgentId::from(0)),
            duration,
            hold_count: holds,
            hold_duration: 30.0 * holds as f64,
            wait_time,
        }
    }

    #[test]
    fn test_empty_statistics() {
        let stats = ContactStatistics::default();
        assert!(approx_eq!(f64, stats.abandonment_rate(), 0.0));
        assert!(approx_eq!(f64, stats.aht(), 0.0));
        assert!(approx_eq!(f64, stats.asa(), 0.0));
        assert_eq!(
            stats.to_string(),
            "ContactStatistics(count=0, handled=0, abandonment_rate=0.00%, aht=0.00, \
             hold_count=0, avg_hold_time=0.00, asa=0.00)"
        );
    }

    #[test]
    fn test_contact_statistics() {
        let mut stats = ContactStatistics::default();
        stats.add(&record(ContactStatus::Completed, 300.0, 1, 10.0));
        stats.add(&record(ContactStatus::Completed, 100.0, 2, 30.0));
        stats.add(&record(ContactStatus::Abandoned, 0.0, 0, 0.0));
        stats.add(&record(ContactStatus::Abandoned, 0.0, 0, 0.0));
        assert_eq!(stats.count, 4);
        assert_eq!(stats.handled, 2);
        assert_eq!(stats.abandoned, 2);
        assert!(approx_eq!(f64, stats.abandonment_rate(), 0.5));
        assert!(approx_eq!(f64, stats.aht(), 200.0));
        assert!(approx_eq!(f64, stats.avg_hold_time(), 30.0));
        assert!(approx_eq!(f64, stats.asa(), 20.0));
        assert_eq!(
            stats.to_string(),
            "ContactStatistics(count=4, handled=2, abandonment_rate=50.00%, aht=200.00, \
             hold_count=3, avg_hold_time=30.00, asa=20.00)"
        );
    }

    #[test]
    fn test_agent_statistics() {
        let mut stats = AgentStatistics::default();
        stats.add(&record(ContactStatus::Completed, 90.0, 0, 0.0));
        stats.add(&record(ContactStatus::Completed, 110.0, 1, 0.0));
        assert!(approx_eq!(f64, stats.total_duration, 200.0));
        assert!(approx_eq!(f64, stats.avg_handle_time(), 100.0));
        assert!(approx_eq!(f64, stats.avg_hold_time(), 30.0));
        assert_eq!(
            stats.to_string(),
            "AgentStatistics(handled=2, avg_handle_time=100.00, hold_count=1, \
             avg_hold_time=30.00)"
        );
    }
}
