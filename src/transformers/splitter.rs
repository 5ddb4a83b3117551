//! Wall-clock bucket splitter
//!
//! Fans one stream out into consecutive sub-streams, one per wall-clock bucket
//! (an hour by default). Buckets are aligned to multiples of the span in the
//! configured UTC offset, so with a one hour span every bucket starts at `hh:00:00`
//! local time. A sample exactly on a boundary belongs to the bucket that begins
//! there. Concatenating the buckets in order gives back the input stream.

use crate::error::PipelineError;
use crate::types::{Sample, SessionMeta, Stream};
use chrono::{DateTime, Duration, FixedOffset, Offset, TimeZone, Utc};
use std::iter::Peekable;

/// Bucket span and alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Splitter {
    span_ms: i64,
    offset_ms: i64,
    utc_offset: FixedOffset,
}

impl Default for Splitter {
    fn default() -> Self {
        Self::hourly()
    }
}

impl Splitter {
    /// One hour buckets aligned in UTC
    pub fn hourly() -> Self {
        Self::hourly_in(Utc.fix())
    }

    /// One hour buckets aligned in `utc_offset`
    pub fn hourly_in(utc_offset: FixedOffset) -> Self {
        Self {
            span_ms: 3_600_000,
            offset_ms: i64::from(utc_offset.local_minus_utc()) * 1000,
            utc_offset,
        }
    }

    /// Buckets of an arbitrary positive span
    pub fn new(span: Duration, utc_offset: FixedOffset) -> Result<Self, PipelineError> {
        let span_ms = span.num_milliseconds();
        if span_ms <= 0 {
            return Err(PipelineError::Config(format!(
                "split span must be positive, got {span_ms} ms"
            )));
        }
        Ok(Self {
            span_ms,
            ..Self::hourly_in(utc_offset)
        })
    }

    pub fn span(&self) -> Duration {
        Duration::milliseconds(self.span_ms)
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Index of the bucket containing `timestamp`
    pub fn bucket_of(&self, timestamp: DateTime<Utc>) -> i64 {
        (timestamp.timestamp_millis() + self.offset_ms).div_euclid(self.span_ms)
    }

    /// Local start instant of bucket `index`
    pub fn bucket_start(&self, index: i64) -> Option<DateTime<FixedOffset>> {
        let utc_ms = index.checked_mul(self.span_ms)? - self.offset_ms;
        Utc.timestamp_millis_opt(utc_ms)
            .single()
            .map(|t| t.with_timezone(&self.utc_offset))
    }

    /// Lazily split `stream` into buckets
    pub fn split(&self, stream: Stream) -> Buckets {
        let (mut meta, samples) = stream.into_parts();
        // Session calories cannot be attributed to a single bucket.
        meta.calories = None;
        Buckets {
            splitter: *self,
            meta,
            samples: samples.into_iter().peekable(),
        }
    }
}

/// Iterator over the bucket streams of one split
pub struct Buckets {
    splitter: Splitter,
    meta: SessionMeta,
    samples: Peekable<std::vec::IntoIter<Sample>>,
}

impl Iterator for Buckets {
    type Item = Stream;

    fn next(&mut self) -> Option<Stream> {
        let first = self.samples.next()?;
        let splitter = self.splitter;
        let bucket = splitter.bucket_of(first.timestamp);

        let mut chunk = vec![first];
        while let Some(sample) = self
            .samples
            .next_if(|s| splitter.bucket_of(s.timestamp) == bucket)
        {
            chunk.push(sample);
        }

        Some(Stream::from_ordered(self.meta.clone(), chunk))
    }
}

/// Split into UTC-aligned hour buckets, in order
pub fn split_hourly(stream: Stream) -> Vec<Stream> {
    Splitter::hourly().split(stream).collect()
}

/// Split into hour buckets aligned in a local UTC offset
pub fn split_hourly_in(stream: Stream, utc_offset: FixedOffset) -> Vec<Stream> {
    Splitter::hourly_in(utc_offset).split(stream).collect()
}
