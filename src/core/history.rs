//! State transition history tracking.
//!
//! The history records every state a machine has left, in transition order.
//! It is append-only: entries are never reordered, deduplicated or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single committed transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Key of the state that was left
    pub from: String,
    /// Key of the state that was entered
    pub to: String,
    /// Key of the transition that was executed
    pub transition: String,
    /// When the transition committed
    pub timestamp: DateTime<Utc>,
}

/// Ordered, append-only history of committed transitions.
///
/// # Example
///
/// ```rust
/// use overstated::core::{HistoryEntry, StateHistory};
/// use chrono::Utc;
///
/// let mut history = StateHistory::new();
/// history.record(HistoryEntry {
///     from: "draft".to_string(),
///     to: "review".to_string(),
///     transition: "submit".to_string(),
///     timestamp: Utc::now(),
/// });
/// history.record(HistoryEntry {
///     from: "review".to_string(),
///     to: "published".to_string(),
///     transition: "approve".to_string(),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.departed(), vec!["draft", "review"]);
/// assert_eq!(history.path(), vec!["draft", "review", "published"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateHistory {
    entries: Vec<HistoryEntry>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a committed transition.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Keys of previously-active states, in the order they were left.
    pub fn departed(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.from.as_str()).collect()
    }

    /// States traversed since the machine was last (re)initialised away
    /// from where it stood.
    ///
    /// Returns the first departed state of the latest run followed by the
    /// destination of each of its entries. Empty when nothing has been
    /// recorded. See [`runs`](Self::runs) for earlier runs.
    pub fn path(&self) -> Vec<&str> {
        self.runs().pop().unwrap_or_default()
    }

    /// The history split into contiguous runs.
    ///
    /// A run ends where an entry departs from a state other than the
    /// destination of the entry before it, which happens when a machine is
    /// re-initialised elsewhere while keeping its history.
    pub fn runs(&self) -> Vec<Vec<&str>> {
        let mut runs: Vec<Vec<&str>> = Vec::new();
        let mut previous: Option<&str> = None;
        for entry in &self.entries {
            if previous != Some(entry.from.as_str()) {
                runs.push(vec![entry.from.as_str()]);
            }
            if let Some(run) = runs.last_mut() {
                run.push(entry.to.as_str());
            }
            previous = Some(entry.to.as_str());
        }
        runs
    }

    /// Calculate total duration from first to last transition.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
