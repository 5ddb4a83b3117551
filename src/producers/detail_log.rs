//! PNN-SGT heart-rate log producer

use crate::detail_file::{calories_in_name, HEART_RATE_KIND};
use crate::error::PipelineError;
use crate::types::{Sample, SessionMeta, SourceFormat, Stream};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{finish, FormatProducer};

/// Check that the first line starts with an epoch-millisecond time field
pub fn is_detail_log(raw: &[u8]) -> bool {
    let first_line = raw.split(|&b| b == b'\n').next().unwrap_or_default();
    let Ok(line) = std::str::from_utf8(first_line) else {
        return false;
    };
    line.split_once(';')
        .and_then(|(time, _)| parse_millis(time))
        .is_some()
}

/// Single heart-rate log producer
pub struct DetailLogProducer;

impl FormatProducer for DetailLogProducer {
    fn produce(&self, raw: &[u8], file_name: Option<&str>) -> Result<Stream, PipelineError> {
        if !is_detail_log(raw) {
            return Err(PipelineError::format(
                "first line is not an epoch-millisecond log entry",
            ));
        }

        let mut meta = SessionMeta::new(SourceFormat::DetailLog);
        meta.calories = file_name.and_then(calories_in_name);

        let samples = parse_lines(raw, None, file_name.unwrap_or("heart-rate log"))?;
        finish(meta, samples)
    }
}

/// Parse the heart-rate lines of one log. Lines for other metrics are skipped.
pub(crate) fn parse_lines(
    raw: &[u8],
    source: Option<Arc<str>>,
    context: &str,
) -> Result<Vec<Sample>, PipelineError> {
    let mut samples = Vec::new();
    let mut skipped_lines = 0usize;
    let mut dropouts = 0usize;

    for (index, line) in raw.split(|&b| b == b'\n').enumerate() {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // `<ms>;;<metric>;<value>`; anything else is not a reading
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() != 4 || fields[2].trim() != HEART_RATE_KIND {
            skipped_lines += 1;
            continue;
        }

        let location = || format!("{context} line {}", index + 1);
        let timestamp = parse_millis(fields[0])
            .ok_or_else(|| PipelineError::field_missing("timestamp", location()))?;
        let heart_rate = fields[3]
            .trim()
            .parse::<u16>()
            .map_err(|_| PipelineError::field_missing("heart_rate", location()))?;

        match Sample::new(timestamp, heart_rate) {
            Some(sample) => samples.push(match &source {
                Some(source) => sample.with_source(Arc::clone(source)),
                None => sample,
            }),
            None => dropouts += 1,
        }
    }

    if dropouts > 0 {
        warn!(dropouts, context, "skipped zero heart-rate readings");
    }
    debug!(
        samples = samples.len(),
        skipped_lines,
        context,
        "parsed heart-rate log"
    );

    Ok(samples)
}

fn parse_millis(value: &str) -> Option<DateTime<Utc>> {
    let millis = value.trim().parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}
