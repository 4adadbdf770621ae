//! Stroke capture state machine.

use crate::config::DEFAULT_MIN_DISTANCE;
use crate::stroke::{InkPoint, Stroke, StyleOptions};
use serde::{Deserialize, Serialize};

/// Which tool a drawing gesture drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Pen,
    Eraser,
}

impl ToolKind {
    /// Parse a tool name as sent by a host.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pen" | "draw" => Some(ToolKind::Pen),
            "eraser" | "erase" => Some(ToolKind::Eraser),
            _ => None,
        }
    }
}

/// State of the capture machine.
#[derive(Debug, Clone, Default)]
pub enum CaptureState {
    /// No stroke in progress.
    #[default]
    Idle,
    /// A stroke is being captured.
    Capturing(Stroke),
}

/// Owns the in-progress stroke between `begin` and `end`/`cancel`.
#[derive(Debug, Clone)]
pub struct StrokeCapture {
    state: CaptureState,
    /// Minimum spacing between stored points.
    min_distance: f64,
}

impl Default for StrokeCapture {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DISTANCE)
    }
}

impl StrokeCapture {
    /// Create a capture machine with the given point spacing.
    pub fn new(min_distance: f64) -> Self {
        Self {
            state: CaptureState::Idle,
            min_distance: min_distance.max(0.0),
        }
    }

    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    /// Whether a stroke is in progress.
    pub fn is_capturing(&self) -> bool {
        matches!(self.state, CaptureState::Capturing(_))
    }

    /// The stroke being captured, if any.
    pub fn current(&self) -> Option<&Stroke> {
        match &self.state {
            CaptureState::Capturing(stroke) => Some(stroke),
            CaptureState::Idle => None,
        }
    }

    /// Start a new stroke. Any stroke already in progress is discarded.
    pub fn begin(&mut self, first: InkPoint, style: StyleOptions) {
        if self.is_capturing() {
            log::warn!("Begin while capturing; discarding the previous stroke");
        }
        self.state = CaptureState::Capturing(Stroke::new(first, style));
    }

    /// Append samples in order, skipping those closer than `min_distance` to
    /// the last stored point. Returns how many were stored.
    pub fn continue_with(&mut self, samples: &[InkPoint]) -> usize {
        let CaptureState::Capturing(stroke) = &mut self.state else {
            return 0;
        };

        let mut stored = 0;
        for sample in samples {
            let far_enough = stroke
                .last_point()
                .is_none_or(|last| last.distance(sample) >= self.min_distance);
            if far_enough {
                stroke.add_point(*sample);
                stored += 1;
            }
        }
        stored
    }

    /// Finish the stroke and hand it over for committing.
    ///
    /// A stroke with a single point is returned as is and renders as a dot.
    pub fn end(&mut self) -> Option<Stroke> {
        match std::mem::take(&mut self.state) {
            CaptureState::Capturing(stroke) => {
                log::debug!("Stroke {} finished with {} points", stroke.id, stroke.len());
                Some(stroke)
            }
            CaptureState::Idle => None,
        }
    }

    /// Discard the stroke in progress. Returns `true` if there was one.
    pub fn cancel(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            CaptureState::Capturing(stroke) => {
                log::debug!("Stroke {} cancelled", stroke.id);
                true
            }
            CaptureState::Idle => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> InkPoint {
        InkPoint::new(x, y, Some(0.5), 0)
    }

    #[test]
    fn test_three_point_stroke() {
        let mut capture = StrokeCapture::default();
        capture.begin(pt(0.0, 0.0), StyleOptions::default());
        capture.continue_with(&[pt(0.0, 5.0)]);
        capture.continue_with(&[pt(0.0, 10.0)]);

        let stroke = capture.end().unwrap();
        assert_eq!(stroke.len(), 3);
        assert_eq!(stroke.points[2].y, 10.0);
        assert!(!capture.is_capturing());
    }

    #[test]
    fn test_min_distance_filter() {
        let mut capture = StrokeCapture::new(2.0);
        capture.begin(pt(0.0, 0.0), StyleOptions::default());

        // 0.5 and 1.5 are too close to the origin, 2.0 is not.
        let stored = capture.continue_with(&[pt(0.5, 0.0), pt(1.5, 0.0), pt(2.0, 0.0)]);
        assert_eq!(stored, 1);
        assert_eq!(capture.current().unwrap().len(), 2);
    }

    #[test]
    fn test_coalesced_samples_keep_order() {
        let mut capture = StrokeCapture::default();
        capture.begin(pt(0.0, 0.0), StyleOptions::default());
        capture.continue_with(&[pt(3.0, 0.0), pt(6.0, 0.0), pt(9.0, 0.0)]);

        let xs: Vec<f64> = capture.end().unwrap().points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 3.0, 6.0, 9.0]);
    }

    #[test]
    fn test_single_point_ends_as_dot() {
        let mut capture = StrokeCapture::default();
        capture.begin(pt(4.0, 4.0), StyleOptions::default());
        capture.continue_with(&[pt(4.2, 4.0)]);
        assert!(capture.end().unwrap().is_dot());
    }

    #[test]
    fn test_cancel_discards() {
        let mut capture = StrokeCapture::default();
        capture.begin(pt(0.0, 0.0), StyleOptions::default());
        assert!(capture.cancel());
        assert!(capture.end().is_none());
        assert!(!capture.cancel());
    }

    #[test]
    fn test_style_is_frozen_at_begin() {
        let mut capture = StrokeCapture::default();
        let mut style = StyleOptions::default();
        capture.begin(pt(0.0, 0.0), style.clone());
        style.color = "#ff0000".to_string();
        assert_eq!(capture.current().unwrap().style.color, "#000000");
    }

    #[test]
    fn test_continue_while_idle_is_ignored() {
        let mut capture = StrokeCapture::default();
        assert_eq!(capture.continue_with(&[pt(1.0, 1.0)]), 0);
    }

    #[test]
    fn test_tool_names() {
        assert_eq!(ToolKind::from_name("Eraser"), Some(ToolKind::Eraser));
        assert_eq!(ToolKind::from_name("pen"), Some(ToolKind::Pen));
        assert_eq!(ToolKind::from_name("lasso"), None);
    }
}
