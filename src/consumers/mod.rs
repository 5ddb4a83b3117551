//! Stream consumers
//!
//! Consumers are the terminal stages of a pipeline: the heart points reducer, the
//! heart-rate log writer and the archive packager.

mod archive;
mod heart_points;
mod writer;

pub use archive::{package_archive, PackagedArchive};
pub use heart_points::{
    heart_points, HeartPoints, HeartPointsConfig, HeartPointsResult, ZoneSpec, ZoneTally,
    ZoneThreshold,
};
pub use writer::{encode, DetailFile, DetailLogWriter};
