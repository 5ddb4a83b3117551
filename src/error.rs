//! Error types for the hrtrack pipeline

use thiserror::Error;

/// Errors that can occur while decoding, transforming or reducing a stream
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Header, magic or archive layout does not match the expected format.
    #[error("Format error: {0}")]
    Format(String),

    /// A structurally valid record lacks a required field.
    #[error("Missing required field '{field}' in {context}")]
    FieldMissing { field: &'static str, context: String },

    #[error("Stream contains no samples")]
    EmptyStream,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl PipelineError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        PipelineError::Format(msg.into())
    }

    pub(crate) fn field_missing(field: &'static str, context: impl Into<String>) -> Self {
        PipelineError::FieldMissing {
            field,
            context: context.into(),
        }
    }
}
