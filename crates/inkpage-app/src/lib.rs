//! InkPage Application
//!
//! The engine shell that ties input classification, stroke capture, history
//! and rendering together for one page, plus the browser binding.

mod engine;
mod surface;

pub use engine::{Engine, EngineObserver, NoopObserver};
pub use surface::SurfaceMapping;

#[cfg(target_arch = "wasm32")]
mod raf;
#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::WasmEngine;
