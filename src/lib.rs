//! hrtrack - heart-rate file pipeline
//!
//! hrtrack decodes heart-rate recordings from wearable exports into ordered streams
//! of samples and runs them through a small set of stages:
//! producers (FIT files, PNN-SGT heart-rate logs, ZIP archives of logs) →
//! transformers (filter, merge, split into wall-clock hours) →
//! consumers (heart points, heart-rate log writer, archive packaging).
//!
//! ## Modules
//!
//! - **producers**: Detect the input encoding and decode it into a [`Stream`]
//! - **transformers**: Filter, merge and split streams
//! - **consumers**: Score heart points, encode logs, package archives
//! - **pipeline**: Convenience wiring of the three stages

pub mod consumers;
pub mod detail_file;
pub mod error;
pub mod pipeline;
pub mod producers;
pub mod transformers;
pub mod types;

pub use consumers::{
    encode, heart_points, package_archive, DetailFile, HeartPoints, HeartPointsConfig,
    HeartPointsResult, PackagedArchive,
};
pub use error::PipelineError;
pub use pipeline::{heart_points_from_bytes, hourly_archive, NamedInput, Pipeline};
pub use producers::{decode, decode_file, decode_named, FormatHint};
pub use transformers::{filter, merge, split_hourly, try_filter, SampleFilter, Splitter};
pub use types::{Sample, SessionMeta, SessionSummary, SourceFormat, Stream};

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
