//! Pipeline orchestration
//!
//! Wires producers, transformers and consumers together for the common jobs:
//! scoring a recording in heart points, and re-packaging recordings as hour-aligned
//! heart-rate logs.

use crate::consumers::{
    package_archive, DetailFile, DetailLogWriter, HeartPoints, HeartPointsConfig,
    HeartPointsResult, PackagedArchive,
};
use crate::error::PipelineError;
use crate::producers::{decode_named, FormatHint};
use crate::transformers::{apply_filters, SampleFilter, Splitter};
use crate::types::Stream;
use std::path::Path;
use tracing::{debug, warn};

/// One raw input and, when known, its original file name
#[derive(Debug, Clone, Copy)]
pub struct NamedInput<'a> {
    pub name: Option<&'a str>,
    pub bytes: &'a [u8],
}

impl<'a> NamedInput<'a> {
    pub fn new(name: Option<&'a str>, bytes: &'a [u8]) -> Self {
        Self { name, bytes }
    }
}

/// Compute heart points for one raw recording.
///
/// # Example
/// ```ignore
/// let result = heart_points_from_bytes(&fit_bytes, &HeartPointsConfig::with_age(35))?;
/// println!("{} points", result.rounded_points());
/// ```
pub fn heart_points_from_bytes(
    raw: &[u8],
    config: &HeartPointsConfig,
) -> Result<HeartPointsResult, PipelineError> {
    let reducer = HeartPoints::new(config)?;
    Pipeline::new().heart_points(NamedInput::new(None, raw), &reducer)
}

/// Split recordings into UTC hour-aligned logs and package them as one archive
pub fn hourly_archive<'a, I>(inputs: I) -> Result<PackagedArchive, PipelineError>
where
    I: IntoIterator<Item = NamedInput<'a>>,
{
    Pipeline::new().hourly_archive(inputs)
}

/// Reusable decode → filter → consume configuration
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    hint: FormatHint,
    filters: Vec<SampleFilter>,
    splitter: Splitter,
}

impl Pipeline {
    /// Auto-detected format, no filters, UTC hour buckets
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hint(mut self, hint: FormatHint) -> Self {
        self.hint = hint;
        self
    }

    /// Append a filter; filters run in the order added
    pub fn with_filter(mut self, filter: SampleFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_splitter(mut self, splitter: Splitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn filters(&self) -> &[SampleFilter] {
        &self.filters
    }

    pub fn splitter(&self) -> &Splitter {
        &self.splitter
    }

    /// Decode one input and run the filters over it
    pub fn decode(&self, input: NamedInput<'_>) -> Result<Stream, PipelineError> {
        let stream = decode_named(input.bytes, input.name, self.hint)?;
        let before = stream.len();
        let stream = apply_filters(stream, &self.filters);
        if stream.len() != before {
            debug!(
                dropped = before - stream.len(),
                kept = stream.len(),
                "filters dropped samples"
            );
        }
        Ok(stream)
    }

    /// Read a file from disk and decode it
    pub fn decode_file(&self, path: &Path) -> Result<Stream, PipelineError> {
        let bytes = std::fs::read(path)?;
        let name = path.file_name().and_then(|n| n.to_str());
        self.decode(NamedInput::new(name, &bytes))
    }

    pub fn heart_points(
        &self,
        input: NamedInput<'_>,
        reducer: &HeartPoints,
    ) -> Result<HeartPointsResult, PipelineError> {
        reducer.reduce(&self.decode(input)?)
    }

    /// Score every input, paired with its position in `inputs`.
    ///
    /// Inputs that cannot be decoded or scored are skipped with a warning, the same
    /// way [`Pipeline::hourly_archive`] skips them. If none can be scored, the result is
    /// `EmptyStream`.
    pub fn heart_points_each<'a, I>(
        &self,
        inputs: I,
        reducer: &HeartPoints,
    ) -> Result<Vec<(usize, HeartPointsResult)>, PipelineError>
    where
        I: IntoIterator<Item = NamedInput<'a>>,
    {
        let mut results = Vec::new();
        for (index, input) in inputs.into_iter().enumerate() {
            match self.heart_points(input, reducer) {
                Ok(result) => results.push((index, result)),
                Err(e) => warn!(
                    input = input.name.unwrap_or("<unnamed>"),
                    error = %e,
                    "skipping unscorable input"
                ),
            }
        }

        if results.is_empty() {
            return Err(PipelineError::EmptyStream);
        }
        Ok(results)
    }

    /// Decode one input and split it into buckets
    pub fn split(&self, input: NamedInput<'_>) -> Result<Vec<Stream>, PipelineError> {
        Ok(self.splitter.split(self.decode(input)?).collect())
    }

    /// Decode one input and encode each bucket as a heart-rate log
    pub fn split_files(&self, input: NamedInput<'_>) -> Result<Vec<DetailFile>, PipelineError> {
        self.splitter
            .split(self.decode(input)?)
            .map(|bucket| DetailLogWriter.write(&bucket))
            .collect()
    }

    /// Split every decodable input and package all buckets into one archive.
    ///
    /// Inputs that fail to decode are skipped with a warning. If nothing at all
    /// survives, the result is `EmptyStream`.
    pub fn hourly_archive<'a, I>(&self, inputs: I) -> Result<PackagedArchive, PipelineError>
    where
        I: IntoIterator<Item = NamedInput<'a>>,
    {
        let mut files = Vec::new();
        for input in inputs {
            match self.split_files(input) {
                Ok(split) => files.extend(split),
                Err(e) => warn!(
                    input = input.name.unwrap_or("<unnamed>"),
                    error = %e,
                    "skipping undecodable input"
                ),
            }
        }

        if files.is_empty() {
            return Err(PipelineError::EmptyStream);
        }
        package_archive(&files)
    }
}
