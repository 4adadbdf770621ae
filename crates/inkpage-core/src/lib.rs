//! InkPage Core Library
//!
//! Platform-agnostic data structures and logic for the InkPage annotation engine.

pub mod capture;
pub mod clock;
pub mod config;
pub mod eraser;
pub mod error;
pub mod format;
pub mod geometry;
pub mod history;
pub mod input;
pub mod stroke;

pub use capture::{CaptureState, StrokeCapture, ToolKind};
pub use config::{ClassifierConfig, EngineConfig};
pub use eraser::{EraseOutcome, EraseSession, erase};
pub use error::{InkError, InkResult};
pub use format::{ImportReport, SerializedStroke, export_strokes, import_strokes};
pub use geometry::{outline_path, stroke_outline, stroke_path};
pub use history::{History, HistoryEntry, Replacement};
pub use input::{
    CaptureCommand, Contact, ContactEvent, ContactId, DeviceKind, GestureClass, GestureMode,
    GestureState, InputClassifier,
};
pub use stroke::{InkPoint, Stroke, StrokeId, StyleOptions};
