//! Error types for the generation pipeline.
//!
//! Per-job failures are recorded on the job rather than propagated, so most
//! of these end up as a short message in `GenerationJob::error`.

use thiserror::Error;

/// Failure of a single image-generation call
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no image data in response")]
    MissingImage,

    #[error("invalid image payload: {0}")]
    InvalidPayload(String),

    #[error("generator not configured: {0}")]
    NotConfigured(String),
}

/// Failure while compositing a logo onto a generated image
///
/// Logo decode problems never show up here; the compositor falls back to
/// the unmodified base image instead.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("failed to decode base image: {0}")]
    BaseDecode(#[source] image::ImageError),

    #[error("failed to encode composited image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("compositing task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Malformed `data:` URI
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("not a base64 data URI")]
    InvalidFormat,

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

/// Reasons a batch cannot be started
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("no prompts to generate")]
    NoPrompts,

    #[error("a batch is already running")]
    AlreadyRunning,
}
