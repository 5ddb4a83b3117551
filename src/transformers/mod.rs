//! Stream transformers
//!
//! Transformers consume a stream and build new ones: filtering (one-to-one),
//! merging (many-to-one) and splitting into time buckets (one-to-many). They keep
//! sample order and never alter the timestamp or value of a retained sample.

mod splitter;

pub use splitter::{split_hourly, split_hourly_in, Buckets, Splitter};

use crate::types::{Sample, Stream};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keep the samples for which `predicate` returns true
pub fn filter<P>(stream: Stream, mut predicate: P) -> Stream
where
    P: FnMut(&Sample) -> bool,
{
    let (meta, samples) = stream.into_parts();
    let kept = samples.into_iter().filter(|s| predicate(s)).collect();
    Stream::from_ordered(meta, kept)
}

/// Like [`filter`], for predicates that can fail. The first error is returned
/// unchanged and no stream is produced.
pub fn try_filter<P, E>(stream: Stream, mut predicate: P) -> Result<Stream, E>
where
    P: FnMut(&Sample) -> Result<bool, E>,
{
    let (meta, samples) = stream.into_parts();
    let kept = samples
        .into_iter()
        .filter_map(|s| match predicate(&s) {
            Ok(true) => Some(Ok(s)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        })
        .collect::<Result<Vec<_>, E>>()?;
    Ok(Stream::from_ordered(meta, kept))
}

/// Lower bound of the default heart-rate range filter
pub const DEFAULT_HR_MIN: u16 = 0;

/// Upper bound of the default heart-rate range filter
pub const DEFAULT_HR_MAX: u16 = 220;

/// Built-in sample filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFilter {
    /// Keep heart rates within `min..=max`
    HeartRateRange { min: u16, max: u16 },
    /// Drop repeated (timestamp, heart rate) pairs, keeping the first
    Deduplicate,
}

impl Default for SampleFilter {
    fn default() -> Self {
        SampleFilter::HeartRateRange {
            min: DEFAULT_HR_MIN,
            max: DEFAULT_HR_MAX,
        }
    }
}

impl SampleFilter {
    pub fn heart_rate_range(min: u16, max: u16) -> Self {
        SampleFilter::HeartRateRange { min, max }
    }

    pub fn apply(&self, stream: Stream) -> Stream {
        match *self {
            SampleFilter::HeartRateRange { min, max } => {
                filter(stream, |s| (min..=max).contains(&s.heart_rate))
            }
            SampleFilter::Deduplicate => {
                // Equal timestamps are adjacent in a stream, so only the current
                // timestamp's values need remembering.
                let mut current: Option<DateTime<Utc>> = None;
                let mut seen: HashSet<u16> = HashSet::new();
                filter(stream, move |s| {
                    if current != Some(s.timestamp) {
                        current = Some(s.timestamp);
                        seen.clear();
                    }
                    seen.insert(s.heart_rate)
                })
            }
        }
    }
}

/// Apply filters in order
pub fn apply_filters(stream: Stream, filters: &[SampleFilter]) -> Stream {
    filters.iter().fold(stream, |stream, f| f.apply(stream))
}

/// Merge streams into one, re-sorted by timestamp.
///
/// The first stream's format is kept. The device label is the first one found in
/// stream order, and calories are summed over the streams that carry them. Returns
/// `None` when given no streams.
pub fn merge<I>(streams: I) -> Option<Stream>
where
    I: IntoIterator<Item = Stream>,
{
    let mut streams = streams.into_iter();
    let (mut meta, mut samples) = streams.next()?.into_parts();

    for stream in streams {
        let (other, more) = stream.into_parts();
        if meta.device.is_none() {
            meta.device = other.device;
        }
        meta.calories = match (meta.calories, other.calories) {
            (Some(a), Some(b)) => Some(a.saturating_add(b)),
            (a, b) => a.or(b),
        };
        samples.extend(more);
    }

    Some(Stream::new(meta, samples))
}
