//! Error types shared by the engine layers.

use thiserror::Error;

/// Errors raised inside the annotation engine.
///
/// None of these ever escape the engine boundary as a failure of the host:
/// the engine logs them and degrades to "skip this frame" or "skip this stroke".
#[derive(Debug, Error)]
pub enum InkError {
    /// The drawable surface has zero dimensions or is detached.
    #[error("Invalid surface state: {width}x{height}")]
    InvalidSurfaceState { width: u32, height: u32 },
    /// An import payload (or one stroke inside it) is missing required fields.
    #[error("Malformed import data: {0}")]
    MalformedImportData(String),
    /// The classifier could not determine which device produced a contact.
    #[error("Unsupported input device")]
    UnsupportedInputDevice,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type InkResult<T> = Result<T, InkError>;
