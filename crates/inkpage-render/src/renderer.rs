//! Renderer errors.

use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    /// The surface has zero size or exceeds what the rasterizer can address.
    #[error("Invalid surface: {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Png(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;
