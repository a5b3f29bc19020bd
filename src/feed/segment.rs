// src/feed/segment.rs
//
// Segment discovery and per-segment decode. Segment names embed the shard
// and timestamp, so lexicographic order is chronological order.

use anyhow::{Context, Result};

use crate::feed::event::RawEvent;

/// Reserved container the provider appends the change feed to.
pub const CHANGE_FEED_CONTAINER: &str = "$blobchangefeed";
/// Segments live under this fixed prefix.
pub const LOG_PREFIX: &str = "log/";
/// Only names with this suffix are event segments.
pub const SEGMENT_SUFFIX: &str = ".avro";

/// Filter a listing down to event segments, ascending by name.
pub fn locate_segments(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut segments: Vec<String> = names
        .into_iter()
        .filter(|n| n.ends_with(SEGMENT_SUFFIX))
        .collect();
    segments.sort();
    segments
}

/// Decode one segment's bytes into its event records. All-or-nothing: a
/// malformed or non-array payload fails the whole segment and the caller
/// skips it.
pub fn decode_segment(bytes: &[u8]) -> Result<Vec<RawEvent>> {
    serde_json::from_slice::<Vec<RawEvent>>(bytes)
        .context("segment payload is not a JSON event array")
}
