//! Engine configuration.

use crate::error::InkResult;
use crate::stroke::StyleOptions;
use serde::{Deserialize, Serialize};

/// Default maximum number of undoable history entries.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Default minimum spacing between stored points, in device pixels.
pub const DEFAULT_MIN_DISTANCE: f64 = 1.0;

/// Thresholds for telling a stylus from a finger when the platform does not
/// tag the contact.
///
/// These are best-effort values: no platform reports contact geometry
/// precisely enough to make the heuristic exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// A stylus-like contact reports pressure strictly above this.
    pub pressure_threshold: f64,
    /// A stylus-like contact has at least one radius strictly below this.
    pub radius_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            pressure_threshold: 0.05,
            radius_threshold: 10.0,
        }
    }
}

/// Settings for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Points closer than this to the previous stored point are dropped.
    pub min_distance: f64,
    /// Maximum number of history entries kept for undo.
    pub history_capacity: usize,
    pub classifier: ClassifierConfig,
    /// Style used until the host calls `set_style`.
    pub default_style: StyleOptions,
    /// Radius of the eraser tool in device pixels.
    pub eraser_radius: f64,
    /// Optional color painted under the strokes (transparent if unset).
    pub background: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_distance: DEFAULT_MIN_DISTANCE,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            classifier: ClassifierConfig::default(),
            default_style: StyleOptions::default(),
            eraser_radius: 10.0,
            background: None,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> InkResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Clamp values that would break the engine's invariants.
    pub fn sanitized(mut self) -> Self {
        if !self.min_distance.is_finite() || self.min_distance < 0.0 {
            self.min_distance = DEFAULT_MIN_DISTANCE;
        }
        self.history_capacity = self.history_capacity.max(1);
        if !self.eraser_radius.is_finite() || self.eraser_radius <= 0.0 {
            self.eraser_radius = Self::default().eraser_radius;
        }
        self.default_style = self.default_style.sanitized();
        self
    }
}
