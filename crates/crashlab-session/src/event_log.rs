//! Bounded log of crash notifications.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of crash records retained.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 64;

/// Where a crash notification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrashSource {
    /// The `execute_crash` reply reported a crash
    CommandReply,
    /// An id-less `crash_detected` event
    SimulatorEvent,
    /// A sensor report whose damage delta crossed the threshold
    SensorReport,
}

/// A single crash notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashRecord {
    /// Session the crash belongs to
    pub session_id: String,
    /// When the notification was recorded
    pub recorded_at: DateTime<Utc>,
    /// Simulation clock reported with the event, in seconds
    pub sim_timestamp: Option<f64>,
    /// Reported impact force
    pub impact_force: Option<f64>,
    /// Damage jump reported by a sensor
    pub damage_delta: Option<f64>,
    /// Notification origin
    pub source: CrashSource,
}

impl CrashRecord {
    fn new(session_id: impl Into<String>, source: CrashSource) -> Self {
        Self {
            session_id: session_id.into(),
            recorded_at: Utc::now(),
            sim_timestamp: None,
            impact_force: None,
            damage_delta: None,
            source,
        }
    }

    /// Record for a crash reported in the `execute_crash` reply.
    pub fn from_reply(session_id: impl Into<String>, impact_force: Option<f64>) -> Self {
        Self {
            impact_force,
            ..Self::new(session_id, CrashSource::CommandReply)
        }
    }

    /// Record for an asynchronous crash event.
    pub fn from_event(
        session_id: impl Into<String>,
        sim_timestamp: Option<f64>,
        impact_force: Option<f64>,
    ) -> Self {
        Self {
            sim_timestamp,
            impact_force,
            ..Self::new(session_id, CrashSource::SimulatorEvent)
        }
    }

    /// Record for a sensor report above the crash threshold.
    pub fn from_sensor(session_id: impl Into<String>, damage_delta: f64) -> Self {
        Self {
            damage_delta: Some(damage_delta),
            ..Self::new(session_id, CrashSource::SensorReport)
        }
    }
}

/// Fixed-capacity ring buffer of crash records, oldest first.
#[derive(Debug, Clone)]
pub struct CrashEventLog {
    capacity: usize,
    entries: VecDeque<CrashRecord>,
    evicted: u64,
}

impl CrashEventLog {
    /// Create a log holding at most `capacity` records. A capacity of zero is
    /// raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            evicted: 0,
        }
    }

    /// Append a record, returning the evicted oldest record when full.
    pub fn push(&mut self, record: CrashRecord) -> Option<CrashRecord> {
        let evicted = if self.entries.len() >= self.capacity {
            self.evicted = self.evicted.saturating_add(1);
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(record);
        evicted
    }

    /// Maximum records retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no records are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total records dropped to make room.
    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    /// Most recent record.
    pub fn latest(&self) -> Option<&CrashRecord> {
        self.entries.back()
    }

    /// Records oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &CrashRecord> + '_ {
        self.entries.iter()
    }

    /// Records for one session, oldest first.
    pub fn for_session<'a>(
        &'a self,
        session_id: &'a str,
    ) -> impl Iterator<Item = &'a CrashRecord> + 'a {
        self.entries.iter().filter(move |r| r.session_id == session_id)
    }

    /// Owned copy of the records, oldest first.
    pub fn snapshot(&self) -> Vec<CrashRecord> {
        self.entries.iter().cloned().collect()
    }

    /// Drop all records.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for CrashEventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}
