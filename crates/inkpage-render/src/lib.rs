//! InkPage Render Library
//!
//! CPU rendering of stroke outlines for InkPage on the `vello_cpu`
//! sparse-strip renderer. The committed strokes are cached in a base pixmap
//! that each frame and each commit paints from.

mod pipeline;
mod renderer;
mod snapshot;

pub use pipeline::{RenderPipeline, surface_size};
pub use renderer::{RenderResult, RendererError};
pub use snapshot::{encode_png, rgba8};
pub use vello_cpu::Pixmap;
