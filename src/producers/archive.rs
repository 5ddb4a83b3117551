//! ZIP archive of heart-rate logs producer
//!
//! Entries whose base name follows the heart-rate log naming convention are parsed in
//! start-time order and concatenated into one stream. Anything else in the archive
//! (directories, readme files, OS metadata) is ignored.

use crate::detail_file::DetailFileName;
use crate::error::PipelineError;
use crate::types::{SessionMeta, SourceFormat, Stream};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::debug;
use zip::ZipArchive;

use super::detail_log::parse_lines;
use super::{finish, FormatProducer};

const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

pub fn is_archive(raw: &[u8]) -> bool {
    raw.starts_with(ZIP_MAGIC)
}

/// Heart-rate log archive producer
pub struct DetailArchiveProducer;

impl FormatProducer for DetailArchiveProducer {
    fn produce(&self, raw: &[u8], _file_name: Option<&str>) -> Result<Stream, PipelineError> {
        let mut archive = ZipArchive::new(Cursor::new(raw))
            .map_err(|e| PipelineError::format(format!("unreadable archive: {e}")))?;

        let mut logs: Vec<(DetailFileName, String, usize)> = Vec::new();
        let mut ignored = 0usize;

        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|e| PipelineError::format(format!("unreadable archive entry: {e}")))?;
            let name = entry.name().to_string();

            match DetailFileName::parse(&name) {
                Some(parsed) if !entry.is_dir() => logs.push((parsed, name, index)),
                _ => ignored += 1,
            }
        }

        if logs.is_empty() {
            return Err(PipelineError::format(
                "archive contains no heart-rate logs",
            ));
        }
        debug!(logs = logs.len(), ignored, "enumerated heart-rate archive");

        logs.sort_by(|a, b| a.0.start_ms.cmp(&b.0.start_ms).then_with(|| a.1.cmp(&b.1)));

        let mut meta = SessionMeta::new(SourceFormat::DetailArchive);
        let mut samples = Vec::new();

        for (parsed, name, index) in logs {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| PipelineError::format(format!("unreadable entry {name}: {e}")))?;
            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| PipelineError::format(format!("corrupt entry {name}: {e}")))?;

            let source: Arc<str> = Arc::from(name.as_str());
            samples.extend(parse_lines(&bytes, Some(source), &name)?);

            if let Some(kcal) = parsed.calories {
                meta.calories = Some(meta.calories.unwrap_or(0).saturating_add(kcal));
            }
        }

        finish(meta, samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, SimpleFileOptions::default())
                    .unwrap();
            } else {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(body.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    const LATE: &str =
        "#date=1700003600000#time=60000#calories=40#type=HeartRate#spmax=0#version=4.txt";
    const EARLY: &str =
        "#date=1700000000000#time=60000#calories=25#type=HeartRate#spmax=0#version=4.txt";

    #[test]
    fn test_entries_concatenated_in_start_order() {
        let archive = zip_of(&[
            (LATE, "1700003600000;;Heart rate;120\n1700003660000;;Heart rate;125\n"),
            (EARLY, "1700000000000;;Heart rate;90\n1700000060000;;Heart rate;95\n"),
        ]);

        let stream = DetailArchiveProducer.produce(&archive, None).unwrap();

        let readings: Vec<(i64, u16)> = stream
            .iter()
            .map(|s| (s.timestamp.timestamp_millis(), s.heart_rate))
            .collect();
        assert_eq!(
            readings,
            vec![
                (1_700_000_000_000, 90),
                (1_700_000_060_000, 95),
                (1_700_003_600_000, 120),
                (1_700_003_660_000, 125)
            ]
        );
        assert_eq!(stream.meta().format, SourceFormat::DetailArchive);
        assert_eq!(stream.meta().calories, Some(65));
        assert_eq!(stream.samples()[0].source.as_deref(), Some(EARLY));
    }

    #[test]
    fn test_unrelated_entries_are_ignored() {
        let archive = zip_of(&[
            ("logs/", ""),
            ("README.txt", "not a log"),
            ("__MACOSX/._x", "\u{0}\u{1}"),
            (EARLY, "1700000000000;;Heart rate;90\n"),
        ]);

        let stream = DetailArchiveProducer.produce(&archive, None).unwrap();
        assert_eq!(stream.len(), 1);
    }

    #[test]
    fn test_archive_without_logs_is_format_error() {
        let archive = zip_of(&[("README.txt", "nothing here")]);

        let result = DetailArchiveProducer.produce(&archive, None);
        assert!(matches!(result, Err(PipelineError::Format(_))));
    }

    #[test]
    fn test_corrupt_archive_is_format_error() {
        let mut archive = b"PK\x03\x04".to_vec();
        archive.extend_from_slice(&[0u8; 40]);

        let result = DetailArchiveProducer.produce(&archive, None);
        assert!(matches!(result, Err(PipelineError::Format(_))));
    }

    #[test]
    fn test_malformed_entry_is_field_missing() {
        let archive = zip_of(&[(EARLY, "1700000000000;;Heart rate;fast\n")]);

        let result = DetailArchiveProducer.produce(&archive, None);
        assert!(matches!(result, Err(PipelineError::FieldMissing { .. })));
    }
}
