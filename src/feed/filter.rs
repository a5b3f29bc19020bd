// src/feed/filter.rs
//
// Query-side predicates over canonical events: coarse time ranges, operation
// kind, and exact container match. All predicates are independently optional;
// the default filter passes everything.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::event::{ChangeEvent, Operation};

/// Coarse period selector accepted on the query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    #[default]
    Week,
    Month,
    Year,
}

impl TimeRange {
    pub fn window_ending_now(self) -> TimeWindow {
        self.window_ending(Utc::now())
    }

    /// Window covering one period back from `end`, inclusive on both ends.
    pub fn window_ending(self, end: DateTime<Utc>) -> TimeWindow {
        let start = match self {
            TimeRange::Day => end - Duration::days(1),
            TimeRange::Week => end - Duration::days(7),
            TimeRange::Month => end
                .checked_sub_months(Months::new(1))
                .unwrap_or(end - Duration::days(30)),
            TimeRange::Year => end
                .checked_sub_months(Months::new(12))
                .unwrap_or(end - Duration::days(365)),
        };
        TimeWindow { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Operation predicate from the query string. `all` disables the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationFilter {
    Create,
    Update,
    Delete,
    Read,
    #[default]
    All,
}

impl OperationFilter {
    pub fn matches(self, op: &Operation) -> bool {
        match self {
            OperationFilter::All => true,
            OperationFilter::Create => matches!(op, Operation::Created),
            OperationFilter::Delete => matches!(op, Operation::Deleted),
            OperationFilter::Read => matches!(op, Operation::Read),
            // No canonical kind for updates; match passthrough types that
            // mention one (e.g. BlobPropertiesUpdated).
            OperationFilter::Update => {
                matches!(op, Operation::Other(raw) if raw.to_ascii_lowercase().contains("update"))
            }
        }
    }
}

/// Composed predicate applied to the normalized event stream.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub container: Option<String>,
    pub operation: OperationFilter,
    pub window: Option<TimeWindow>,
}

impl EventFilter {
    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.container = Some(name.into());
        self
    }

    pub fn operation(mut self, op: OperationFilter) -> Self {
        self.operation = op;
        self
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn matches(&self, ev: &ChangeEvent) -> bool {
        if let Some(container) = &self.container {
            if ev.container != *container {
                return false;
            }
        }
        if !self.operation.matches(&ev.operation) {
            return false;
        }
        if let Some(window) = &self.window {
            if !window.contains(ev.timestamp) {
                return false;
            }
        }
        true
    }
}
