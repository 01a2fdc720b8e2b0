//! TelemetrySource trait: the abstraction over simulators and games.
//!
//! A source captures snapshots on its own background cadence and exposes
//! the latest one through a non-blocking accessor. Warning support is
//! optional and advertised through [`Capabilities`] rather than probed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use crate::error::TelemetryError;
use crate::snapshot::Snapshot;

/// Urgency of an active warning. Higher is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Priority {
    /// Map a numeric level onto a priority, clamping into 1..=3.
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=1 => Priority::Low,
            2 => Priority::Medium,
            _ => Priority::High,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Warnings active at one instant, keyed by warning name.
///
/// Iteration is in lexicographic key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningSet(BTreeMap<String, Priority>);

impl WarningSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, priority: Priority) {
        self.0.insert(key.into(), priority);
    }

    pub fn priority(&self, key: &str) -> Option<Priority> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Priority)> {
        self.0.iter().map(|(k, p)| (k.as_str(), *p))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, Priority)> for WarningSet {
    fn from_iter<T: IntoIterator<Item = (K, Priority)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, p)| (k.into(), p)).collect())
    }
}

/// A numeric field tracked for trend statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendField {
    /// Snapshot key to compare
    pub key: String,

    /// Name used in the sentence ("Altitude")
    pub label: String,

    /// Unit used in the sentence ("feet")
    pub unit: String,

    /// Minimum absolute change per update worth mentioning
    pub threshold: f64,
}

impl TrendField {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        unit: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            unit: unit.into(),
            threshold,
        }
    }
}

/// Optional features a source supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Whether `active_warnings` reports anything meaningful
    pub warnings: bool,
}

/// The core TelemetrySource trait.
///
/// `start` may do slow setup (connecting to a simulator) and is the only
/// place where a source reports a fatal error. Everything the assistant
/// loop calls afterwards must return without blocking on I/O.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Source name (e.g., "dummy", "flight").
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Begin periodic background capture.
    async fn start(&self, interval: Duration) -> std::result::Result<(), TelemetryError>;

    /// The most recently captured snapshot (empty before the first capture).
    fn fetch_snapshot(&self) -> Snapshot;

    /// Warnings active right now.
    fn active_warnings(&self) -> WarningSet {
        WarningSet::new()
    }

    /// Human-readable message for a warning key.
    fn warning_message(&self, _key: &str) -> Option<String> {
        None
    }

    /// Priority from the source's own warning table. When `None`, the level
    /// reported in [`active_warnings`](Self::active_warnings) stands.
    fn warning_priority(&self, _key: &str) -> Option<Priority> {
        None
    }

    /// Fields worth describing as trends, with per-field noise thresholds.
    fn trend_fields(&self) -> Vec<TrendField> {
        Vec::new()
    }

    /// Source-specific instructions appended to the assistant's system prompt.
    fn assistant_context(&self) -> Option<String> {
        None
    }

    /// Stop background capture. Safe to call more than once.
    fn stop(&self);
}
