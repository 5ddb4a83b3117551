//! Format producers
//!
//! A producer decodes one raw input file into an ordered [`Stream`]. Three encodings
//! are supported: binary FIT activity files, single PNN-SGT heart-rate logs, and ZIP
//! archives of those logs. The encoding is chosen once, at the boundary, from a
//! [`FormatHint`] and the file's magic bytes.

mod archive;
mod detail_log;
pub(crate) mod fit;

pub use archive::{is_archive, DetailArchiveProducer};
pub use detail_log::{is_detail_log, DetailLogProducer};
pub use fit::{is_fit, FieldRead, FitMessage, FitProducer, FitReader};

use crate::error::PipelineError;
use crate::types::{Sample, SessionMeta, SourceFormat, Stream};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Trait for input format producers
pub trait FormatProducer {
    /// Decode `raw` into a stream. `file_name` carries metadata for formats that
    /// encode it in the name.
    fn produce(&self, raw: &[u8], file_name: Option<&str>) -> Result<Stream, PipelineError>;
}

/// Caller's expectation about the input encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatHint {
    /// Detect from the magic bytes
    #[default]
    Auto,
    Fit,
    DetailLog,
    DetailArchive,
}

impl SourceFormat {
    /// Detect the encoding of `raw` from its leading bytes
    pub fn detect(raw: &[u8]) -> Result<SourceFormat, PipelineError> {
        [
            SourceFormat::Fit,
            SourceFormat::DetailArchive,
            SourceFormat::DetailLog,
        ]
        .into_iter()
        .find(|format| format.matches(raw))
        .ok_or_else(|| PipelineError::format("unrecognized input format"))
    }

    /// Resolve a hint against the input. An explicit hint must agree with the magic.
    pub fn resolve(raw: &[u8], hint: FormatHint) -> Result<SourceFormat, PipelineError> {
        let format = match hint {
            FormatHint::Auto => return SourceFormat::detect(raw),
            FormatHint::Fit => SourceFormat::Fit,
            FormatHint::DetailLog => SourceFormat::DetailLog,
            FormatHint::DetailArchive => SourceFormat::DetailArchive,
        };
        if format.matches(raw) {
            Ok(format)
        } else {
            Err(PipelineError::format(format!(
                "input is not a {} file",
                format.as_str()
            )))
        }
    }

    fn matches(&self, raw: &[u8]) -> bool {
        match self {
            SourceFormat::Fit => is_fit(raw),
            SourceFormat::DetailArchive => is_archive(raw),
            SourceFormat::DetailLog => is_detail_log(raw),
        }
    }

    /// Producer for this encoding
    pub fn producer(&self) -> &'static dyn FormatProducer {
        match self {
            SourceFormat::Fit => &FitProducer,
            SourceFormat::DetailLog => &DetailLogProducer,
            SourceFormat::DetailArchive => &DetailArchiveProducer,
        }
    }
}

/// Decode raw bytes into a stream.
///
/// Fails with `Format` when the encoding is not recognized or its structure is
/// broken, `FieldMissing` when a record lacks a timestamp or heart rate, and
/// `EmptyStream` when the input holds no heart-rate samples. No partial stream is
/// ever returned.
pub fn decode(raw: &[u8], hint: FormatHint) -> Result<Stream, PipelineError> {
    decode_named(raw, None, hint)
}

/// Decode raw bytes whose original file name is known
pub fn decode_named(
    raw: &[u8],
    file_name: Option<&str>,
    hint: FormatHint,
) -> Result<Stream, PipelineError> {
    let format = SourceFormat::resolve(raw, hint)?;
    debug!(format = format.as_str(), bytes = raw.len(), "decoding input");
    format.producer().produce(raw, file_name)
}

/// Read and decode a file from disk
pub fn decode_file(path: &Path, hint: FormatHint) -> Result<Stream, PipelineError> {
    let raw = std::fs::read(path)?;
    let file_name = path.file_name().and_then(|n| n.to_str());
    decode_named(&raw, file_name, hint)
}

/// Sort collected samples into a stream, rejecting inputs with no samples
fn finish(meta: SessionMeta, samples: Vec<Sample>) -> Result<Stream, PipelineError> {
    if samples.is_empty() {
        return Err(PipelineError::EmptyStream);
    }
    Ok(Stream::new(meta, samples))
}

#[cfg(test)]
mod tests {
    use super::fit::tests::FitBuilder;
    use super::*;

    const LOG: &[u8] = b"1700000000000;;Heart rate;72\n1700000060000;;Heart rate;74\n";

    #[test]
    fn test_detect_formats() {
        let fit = FitBuilder::new().define_record(0).record(0, 1, 80).build();

        assert_eq!(SourceFormat::detect(&fit).unwrap(), SourceFormat::Fit);
        assert_eq!(SourceFormat::detect(LOG).unwrap(), SourceFormat::DetailLog);
        assert_eq!(
            SourceFormat::detect(b"PK\x03\x04rest").unwrap(),
            SourceFormat::DetailArchive
        );
        assert!(matches!(
            SourceFormat::detect(b"GIF89a"),
            Err(PipelineError::Format(_))
        ));
    }

    #[test]
    fn test_explicit_hint_must_match_magic() {
        let result = decode(LOG, FormatHint::Fit);
        assert!(matches!(result, Err(PipelineError::Format(_))));

        let stream = decode(LOG, FormatHint::DetailLog).unwrap();
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn test_decode_dispatches_on_magic() {
        let fit = FitBuilder::new()
            .define_record(0)
            .record(0, 100, 80)
            .record(0, 101, 81)
            .build();

        let stream = decode(&fit, FormatHint::Auto).unwrap();
        assert_eq!(stream.meta().format, SourceFormat::Fit);
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn test_header_without_magic_is_format_error() {
        let mut fit = FitBuilder::new().define_record(0).record(0, 1, 80).build();
        fit[8..12].copy_from_slice(b"\0\0\0\0");

        assert!(matches!(
            decode(&fit, FormatHint::Auto),
            Err(PipelineError::Format(_))
        ));
        assert!(matches!(
            decode(&fit, FormatHint::Fit),
            Err(PipelineError::Format(_))
        ));
    }

    #[test]
    fn test_decode_named_reads_calories() {
        let name = "#date=1700000000000#time=60000#calories=18#type=HeartRate#spmax=0#version=4.txt";
        let stream = decode_named(LOG, Some(name), FormatHint::Auto).unwrap();
        assert_eq!(stream.meta().calories, Some(18));
    }
}
