//! Core types for the hrtrack pipeline
//!
//! This module defines the records that flow between stages: individual heart-rate
//! samples, the ordered streams that carry them, and the session metadata attached
//! to each stream.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input encoding a stream was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Binary FIT activity file
    Fit,
    /// Single PNN-SGT heart-rate log
    DetailLog,
    /// ZIP archive of PNN-SGT heart-rate logs
    DetailArchive,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Fit => "fit",
            SourceFormat::DetailLog => "detail_log",
            SourceFormat::DetailArchive => "detail_archive",
        }
    }
}

/// One timestamped heart-rate reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Instant of the reading (UTC)
    pub timestamp: DateTime<Utc>,
    /// Beats per minute, always > 0
    pub heart_rate: u16,
    /// Where the reading came from, e.g. the archive entry name
    pub source: Option<Arc<str>>,
}

impl Sample {
    /// Create a sample; returns `None` for a zero heart rate.
    pub fn new(timestamp: DateTime<Utc>, heart_rate: u16) -> Option<Self> {
        (heart_rate > 0).then_some(Self {
            timestamp,
            heart_rate,
            source: None,
        })
    }

    pub fn with_source(mut self, source: Arc<str>) -> Self {
        self.source = Some(source);
        self
    }

    /// The (timestamp, heart rate) pair, ignoring the source tag
    pub fn reading(&self) -> (DateTime<Utc>, u16) {
        (self.timestamp, self.heart_rate)
    }
}

/// Metadata attached to a stream as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Format the samples were decoded from
    pub format: SourceFormat,
    /// Device or source label, if the input names one
    pub device: Option<String>,
    /// Calorie estimate carried by the input (kcal)
    pub calories: Option<u32>,
}

impl SessionMeta {
    pub fn new(format: SourceFormat) -> Self {
        Self {
            format,
            device: None,
            calories: None,
        }
    }
}

/// An ordered sequence of samples for one session or sub-session.
///
/// Timestamps are non-decreasing. A stream is never mutated once built; transformers
/// consume it and build a new one. Start and end are derived from the samples, so
/// they are always current after filtering or splitting.
#[derive(Debug, Clone)]
pub struct Stream {
    meta: SessionMeta,
    samples: Vec<Sample>,
}

impl Stream {
    /// Build a stream, sorting samples by timestamp. The sort is stable, so samples
    /// sharing a timestamp keep their input order.
    pub fn new(meta: SessionMeta, mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self { meta, samples }
    }

    /// Build a stream from samples already in timestamp order.
    pub(crate) fn from_ordered(meta: SessionMeta, samples: Vec<Sample>) -> Self {
        debug_assert!(samples
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
        Self { meta, samples }
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the first sample
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.timestamp)
    }

    /// Timestamp of the last sample
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Time from first to last sample; zero for an empty or single-sample stream
    pub fn duration(&self) -> Duration {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => end - start,
            _ => Duration::zero(),
        }
    }

    /// (timestamp, heart rate) pairs in order
    pub fn readings(&self) -> Vec<(DateTime<Utc>, u16)> {
        self.samples.iter().map(Sample::reading).collect()
    }

    pub fn into_parts(self) -> (SessionMeta, Vec<Sample>) {
        (self.meta, self.samples)
    }

    /// Summarize the session; `None` for an empty stream
    pub fn summary(&self) -> Option<SessionSummary> {
        let start = self.start()?;
        let end = self.end()?;
        let count = self.samples.len();
        let total: u64 = self.samples.iter().map(|s| u64::from(s.heart_rate)).sum();

        Some(SessionSummary {
            format: self.meta.format,
            device: self.meta.device.clone(),
            calories: self.meta.calories,
            start,
            end,
            duration_sec: (end - start).num_seconds(),
            sample_count: count,
            min_hr_bpm: self.samples.iter().map(|s| s.heart_rate).min().unwrap_or(0),
            max_hr_bpm: self.samples.iter().map(|s| s.heart_rate).max().unwrap_or(0),
            average_hr_bpm: total as f64 / count as f64,
        })
    }
}

impl IntoIterator for Stream {
    type Item = Sample;
    type IntoIter = std::vec::IntoIter<Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

impl<'a> IntoIterator for &'a Stream {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Serializable description of a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub format: SourceFormat,
    pub device: Option<String>,
    pub calories: Option<u32>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_sec: i64,
    pub sample_count: usize,
    pub min_hr_bpm: u16,
    pub max_hr_bpm: u16,
    pub average_hr_bpm: f64,
}
