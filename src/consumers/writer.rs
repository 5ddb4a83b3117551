//! Heart-rate log writer
//!
//! Serializes a stream into the PNN-SGT log format: one `<epoch-ms>;;Heart rate;<bpm>`
//! line per sample, under a conventional file name carrying the start time, elapsed
//! time and calories. Decoding the output yields the same (timestamp, bpm) sequence.

use crate::detail_file::{DetailFileName, HEART_RATE_KIND};
use crate::error::PipelineError;
use crate::types::Stream;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::Path;

/// An encoded heart-rate log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailFile {
    pub name: String,
    /// Time of the last reading; used as the archive entry modification time
    pub modified: DateTime<Utc>,
    pub bytes: Vec<u8>,
}

impl DetailFile {
    /// Write into `dir` under the conventional name
    pub fn write_to(&self, dir: &Path) -> Result<std::path::PathBuf, PipelineError> {
        let path = dir.join(&self.name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// PNN-SGT log encoder
#[derive(Debug, Default, Clone, Copy)]
pub struct DetailLogWriter;

impl DetailLogWriter {
    pub fn write(&self, stream: &Stream) -> Result<DetailFile, PipelineError> {
        let (Some(start), Some(end)) = (stream.start(), stream.end()) else {
            return Err(PipelineError::EmptyStream);
        };

        let mut body = String::with_capacity(stream.len() * 32);
        for sample in stream {
            // Writing into a String cannot fail.
            let _ = writeln!(
                body,
                "{};;{};{}",
                sample.timestamp.timestamp_millis(),
                HEART_RATE_KIND,
                sample.heart_rate
            );
        }

        let name = DetailFileName {
            start_ms: start.timestamp_millis(),
            elapsed_ms: (end - start).num_milliseconds(),
            calories: stream.meta().calories,
        };

        Ok(DetailFile {
            name: name.render(),
            modified: end,
            bytes: body.into_bytes(),
        })
    }
}

/// Encode a stream as a heart-rate log body
pub fn encode(stream: &Stream) -> Result<Vec<u8>, PipelineError> {
    Ok(DetailLogWriter.write(stream)?.bytes)
}
