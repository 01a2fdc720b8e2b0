//! Warning selection with per-key cooldowns.
//!
//! Each check picks at most one warning to announce. A warning is eligible
//! when it just became active or when its cooldown has run out. High
//! priority warnings use a shorter cooldown so they repeat sooner.

use flightdeck_core::telemetry::{Priority, WarningSet};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);
pub const DEFAULT_HIGH_PRIORITY_COOLDOWN: Duration = Duration::from_secs(15);

/// A warning chosen for announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub key: String,
    pub message: String,
    pub priority: Priority,
}

#[derive(Debug, Clone)]
pub struct WarningTracker {
    /// Keys seen on the previous check
    active: BTreeSet<String>,

    /// When each key was last announced
    cooldowns: HashMap<String, Instant>,

    cooldown: Duration,
    high_priority_cooldown: Duration,
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, DEFAULT_HIGH_PRIORITY_COOLDOWN)
    }
}

impl WarningTracker {
    pub fn new(cooldown: Duration, high_priority_cooldown: Duration) -> Self {
        Self {
            active: BTreeSet::new(),
            cooldowns: HashMap::new(),
            cooldown,
            high_priority_cooldown,
        }
    }

    fn window(&self, priority: Priority) -> Duration {
        match priority {
            Priority::High => self.high_priority_cooldown,
            _ => self.cooldown,
        }
    }

    /// Decide what, if anything, to announce for the warnings active at `now`.
    ///
    /// The most urgent eligible warning wins; equal priorities go to the
    /// smallest key. `lookup` supplies the spoken message and falls back to
    /// `"Active warning: {key}"`.
    pub fn evaluate<F>(&mut self, current: &WarningSet, now: Instant, lookup: F) -> Option<Announcement>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if current.is_empty() {
            self.active.clear();
            return None;
        }

        let mut selected: Option<(&str, Priority)> = None;
        for (key, priority) in current.iter() {
            let is_new = !self.active.contains(key);
            let cooldown_expired = self
                .cooldowns
                .get(key)
                .is_none_or(|last| now.saturating_duration_since(*last) >= self.window(priority));

            if !(is_new || cooldown_expired) {
                continue;
            }
            if selected.is_none_or(|(_, best)| priority > best) {
                selected = Some((key, priority));
            }
        }

        self.active.extend(current.keys().map(str::to_string));

        let (key, priority) = selected?;
        self.cooldowns.insert(key.to_string(), now);
        let message = lookup(key).unwrap_or_else(|| format!("Active warning: {key}"));
        Some(Announcement {
            key: key.to_string(),
            message,
            priority,
        })
    }

    /// Keys active as of the last check.
    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }

    pub fn last_announced(&self, key: &str) -> Option<Instant> {
        self.cooldowns.get(key).copied()
    }
}
