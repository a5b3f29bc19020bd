// src/aggregate/histogram.rs
//
// Day-bucketed usage counters. Buckets key on the calendar day of the
// event's recorded instant (UTC), and all mappings emit in ascending date
// order for deterministic output.

use chrono::NaiveDate;
use serde::Serialize;

use crate::feed::event::{file_extension, ChangeEvent, Operation};

/// Insertion-ordered day -> i64 mapping with a single merge operation.
/// The fold is associative: `add` is the only mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaySeries {
    entries: Vec<(NaiveDate, i64)>,
}

impl DaySeries {
    pub fn add(&mut self, day: NaiveDate, delta: i64) {
        if let Some(entry) = self.entries.iter_mut().find(|(d, _)| *d == day) {
            entry.1 += delta;
        } else {
            self.entries.push((day, delta));
        }
    }

    pub fn get(&self, day: NaiveDate) -> i64 {
        self.entries
            .iter()
            .find(|(d, _)| *d == day)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sorted(self) -> impl Iterator<Item = (NaiveDate, i64)> {
        let mut entries = self.entries;
        entries.sort_by_key(|(d, _)| *d);
        entries.into_iter()
    }

    pub fn into_counts(self) -> Vec<DayCount> {
        self.sorted()
            .map(|(date, count)| DayCount {
                date: date.format("%Y-%m-%d").to_string(),
                count,
            })
            .collect()
    }

    pub fn into_sizes(self) -> Vec<DaySize> {
        self.sorted()
            .map(|(date, size)| DaySize {
                date: date.format("%Y-%m-%d").to_string(),
                size,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySize {
    pub date: String,
    pub size: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u64,
}

/// Insertion-ordered file-type counter (day-independent).
#[derive(Debug, Clone, Default)]
pub struct TypeCounts {
    entries: Vec<(String, u64)>,
}

impl TypeCounts {
    pub fn bump(&mut self, kind: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == kind) {
            entry.1 += 1;
        } else {
            self.entries.push((kind.to_string(), 1));
        }
    }

    pub fn into_counts(self) -> Vec<TypeCount> {
        self.entries
            .into_iter()
            .map(|(kind, count)| TypeCount { kind, count })
            .collect()
    }
}

/// The histogram fold: four parallel day series plus a file-type counter
/// fed by uploads.
///
/// Per event: Created bumps uploads and adds its size; Read bumps downloads;
/// Deleted bumps deletions and subtracts its size; passthrough kinds touch
/// nothing here.
#[derive(Debug, Default)]
pub struct DailyUsage {
    pub uploads: DaySeries,
    pub downloads: DaySeries,
    pub deletions: DaySeries,
    pub size: DaySeries,
    pub file_types: TypeCounts,
}

impl DailyUsage {
    pub fn record(&mut self, ev: &ChangeEvent) {
        let day = ev.timestamp.date_naive();
        let size = ev.size_bytes.unwrap_or(0) as i64;
        match &ev.operation {
            Operation::Created => {
                self.uploads.add(day, 1);
                self.size.add(day, size);
                let kind = file_extension(&ev.blob_path).unwrap_or_else(|| "unknown".to_string());
                self.file_types.bump(&kind);
            }
            Operation::Read => self.downloads.add(day, 1),
            Operation::Deleted => {
                self.deletions.add(day, 1);
                self.size.add(day, -size);
            }
            Operation::Other(_) => {}
        }
    }

    pub fn collect<'a>(events: impl IntoIterator<Item = &'a ChangeEvent>) -> Self {
        let mut usage = Self::default();
        for ev in events {
            usage.record(ev);
        }
        usage
    }
}
