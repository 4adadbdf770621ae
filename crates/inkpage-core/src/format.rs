//! Serialized stroke format shared with hosts.
//!
//! Strokes are exchanged as JSON:
//!
//! ```json
//! {"id": "...", "points": [[x, y, pressure], ...], "style": {...}, "timestamp": 1700000000000}
//! ```
//!
//! Import is lenient. It also accepts points written as `{"x": .., "y": ..,
//! "pressure": ..}`, a bare array of strokes, or an object with a `strokes`
//! array. Strokes and points that cannot be read are skipped.

use crate::error::{InkError, InkResult};
use crate::stroke::{InkPoint, Stroke, StyleOptions, new_stroke_id};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire form of one stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedStroke {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `[x, y, pressure]` triples in input order.
    pub points: Vec<[f64; 3]>,
    pub style: StyleOptions,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl From<&Stroke> for SerializedStroke {
    fn from(stroke: &Stroke) -> Self {
        Self {
            id: Some(stroke.id.clone()),
            points: stroke.points.iter().map(|p| [p.x, p.y, p.pressure]).collect(),
            style: stroke.style.clone(),
            timestamp: stroke.created_at_ms,
        }
    }
}

impl SerializedStroke {
    /// Convert back into a stroke. Fails if there are no points.
    pub fn into_stroke(self) -> InkResult<Stroke> {
        if self.points.is_empty() {
            return Err(InkError::MalformedImportData("stroke has no points".to_string()));
        }
        let timestamp = self.timestamp;
        let points = self
            .points
            .into_iter()
            .map(|[x, y, pressure]| InkPoint::new(x, y, Some(pressure), timestamp))
            .collect();
        Ok(Stroke::from_points(
            self.id.filter(|id| !id.is_empty()).unwrap_or_else(new_stroke_id),
            points,
            self.style.sanitized(),
            timestamp,
        ))
    }
}

/// Summary of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Serialize strokes to a JSON array.
pub fn export_strokes(strokes: &[Stroke]) -> InkResult<String> {
    let serialized: Vec<SerializedStroke> = strokes.iter().map(SerializedStroke::from).collect();
    Ok(serde_json::to_string(&serialized)?)
}

/// Parse strokes from JSON, skipping anything malformed.
///
/// Only a payload that is not JSON at all, or has no stroke list, is an error.
pub fn import_strokes(json: &str) -> InkResult<(Vec<Stroke>, ImportReport)> {
    let data: Value = serde_json::from_str(json)?;

    let items = match &data {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("strokes")
            .and_then(|s| s.as_array())
            .ok_or_else(|| InkError::MalformedImportData("missing 'strokes' array".to_string()))?,
        _ => {
            return Err(InkError::MalformedImportData(
                "expected an array of strokes".to_string(),
            ));
        }
    };

    let mut strokes = Vec::with_capacity(items.len());
    let mut report = ImportReport::default();
    for (index, item) in items.iter().enumerate() {
        match parse_stroke(item) {
            Ok(stroke) => {
                strokes.push(stroke);
                report.imported += 1;
            }
            Err(e) => {
                log::warn!("Skipping stroke {index}: {e}");
                report.skipped += 1;
            }
        }
    }

    log::info!(
        "Imported {} strokes ({} skipped)",
        report.imported,
        report.skipped
    );
    Ok((strokes, report))
}

fn parse_stroke(item: &Value) -> InkResult<Stroke> {
    // Current wire form first; older shapes go through the lenient reader.
    if let Ok(serialized) = SerializedStroke::deserialize(item) {
        return serialized.into_stroke();
    }

    let malformed = |msg: &str| InkError::MalformedImportData(msg.to_string());

    let raw_points = item
        .get("points")
        .and_then(|p| p.as_array())
        .ok_or_else(|| malformed("missing 'points' array"))?;

    let timestamp = item
        .get("timestamp")
        .or_else(|| item.get("createdAt"))
        .and_then(|t| t.as_f64())
        .map_or(0, |t| t as i64);

    let points: Vec<InkPoint> = raw_points
        .iter()
        .filter_map(|p| parse_point(p, timestamp))
        .collect();
    if points.len() < raw_points.len() {
        log::warn!(
            "Dropped {} unreadable points",
            raw_points.len() - points.len()
        );
    }
    if points.is_empty() {
        return Err(malformed("no readable points"));
    }

    let style = match item.get("style") {
        Some(value) => serde_json::from_value::<StyleOptions>(value.clone())
            .unwrap_or_else(|e| {
                log::warn!("Unreadable style, using defaults: {e}");
                StyleOptions::default()
            }),
        None => StyleOptions::default(),
    };

    let id = item
        .get("id")
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map_or_else(new_stroke_id, str::to_string);

    Ok(Stroke::from_points(id, points, style.sanitized(), timestamp))
}

/// Read a point written as `[x, y, pressure?]` or `{"x", "y", "pressure"?}`.
fn parse_point(value: &Value, timestamp: i64) -> Option<InkPoint> {
    let (x, y, pressure) = match value {
        Value::Array(parts) => (
            parts.first()?.as_f64()?,
            parts.get(1)?.as_f64()?,
            parts.get(2).and_then(|p| p.as_f64()),
        ),
        Value::Object(map) => (
            map.get("x")?.as_f64()?,
            map.get("y")?.as_f64()?,
            map.get("pressure").and_then(|p| p.as_f64()),
        ),
        _ => return None,
    };
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some(InkPoint::new(x, y, pressure, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Stroke> {
        let style = StyleOptions {
            color: "#ff8800".to_string(),
            size_px: 6.5,
            thinning: -0.3,
            ..StyleOptions::default()
        };
        let points = vec![
            InkPoint::new(1.25, 2.5, Some(0.3), 10),
            InkPoint::new(7.125, 3.75, Some(0.9), 10),
        ];
        vec![Stroke::from_points("s1".to_string(), points, style, 10)]
    }

    #[test]
    fn test_export_import_preserves_strokes() {
        let strokes = sample();
        let json = export_strokes(&strokes).unwrap();
        let (imported, report) = import_strokes(&json).unwrap();

        assert_eq!(report, ImportReport { imported: 1, skipped: 0 });
        assert_eq!(imported, strokes);
    }

    #[test]
    fn test_export_shape() {
        let json = export_strokes(&sample()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["points"][0], serde_json::json!([1.25, 2.5, 0.3]));
        assert_eq!(value[0]["timestamp"], 10);
        assert_eq!(value[0]["style"]["sizePx"], 6.5);
    }

    #[test]
    fn test_legacy_point_objects() {
        let json = r##"{"strokes": [{
            "points": [{"x": 1.25, "y": 2.5, "pressure": 0.3}, {"x": 7.125, "y": 3.75, "pressure": 0.9}],
            "style": {"color": "#ff8800", "size": 6.5, "thinning": -0.3},
            "timestamp": 10,
            "id": "s1"
        }]}"##;
        let (imported, _) = import_strokes(json).unwrap();
        assert_eq!(imported, sample());
    }

    #[test]
    fn test_missing_pressure_uses_default() {
        let (imported, _) = import_strokes(r#"[{"points": [[1, 2]], "timestamp": 0}]"#).unwrap();
        assert_eq!(imported[0].points[0].pressure, crate::stroke::DEFAULT_PRESSURE);
        assert!(!imported[0].id.is_empty());
    }

    #[test]
    fn test_malformed_strokes_are_skipped() {
        let json = r#"[
            {"points": [[0, 0, 0.5], [1, 1, 0.5]], "timestamp": 1},
            {"points": "nope"},
            {"points": []},
            42,
            {"points": [["a", 1], [5, 5, 0.5]], "timestamp": 2}
        ]"#;
        let (imported, report) = import_strokes(json).unwrap();
        assert_eq!(report, ImportReport { imported: 2, skipped: 3 });
        assert_eq!(imported[1].len(), 1);
    }

    #[test]
    fn test_invalid_payload_is_error() {
        assert!(matches!(import_strokes("{oops"), Err(InkError::Json(_))));
        assert!(matches!(
            import_strokes(r#"{"pages": []}"#),
            Err(InkError::MalformedImportData(_))
        ));
    }

    #[test]
    fn test_serialized_stroke_without_points_is_rejected() {
        let serialized = SerializedStroke {
            id: None,
            points: Vec::new(),
            style: StyleOptions::default(),
            timestamp: 0,
        };
        assert!(serialized.into_stroke().is_err());
    }

    #[test]
    fn test_empty_id_gets_a_fresh_one() {
        let (imported, report) =
            import_strokes(r#"[{"id": "", "points": [[1, 2, 0.5]], "style": {}, "timestamp": 3}]"#)
                .unwrap();
        assert_eq!(report.imported, 1);
        assert!(!imported[0].id.is_empty());
        assert_eq!(imported[0].created_at_ms, 3);
    }
}
