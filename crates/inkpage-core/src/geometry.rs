//! Pressure-aware stroke outlines.
//!
//! Turns an ordered list of sampled points into a closed polygon that is
//! filled with the non-zero rule. The outline is a pure function of the
//! points and style, so replaying imported strokes reproduces them exactly.

use crate::stroke::{InkPoint, StyleOptions};
use kurbo::{BezPath, Point, Vec2};
use std::f64::consts::{PI, TAU};

/// Number of segments used for each rounded end cap.
pub const CAP_SEGMENTS: usize = 8;

/// Number of vertices in the polygon of a dot stroke.
pub const DOT_SEGMENTS: usize = 16;

/// Strongest centerline lag, reached at `streamline == 1.0`.
const MAX_STREAMLINE_LAG: f64 = 0.85;

/// Narrowest and widest width factors produced by thinning.
const MIN_WIDTH_FACTOR: f64 = 0.05;
const MAX_WIDTH_FACTOR: f64 = 2.0;

/// Points closer than this are treated as coincident.
const COINCIDENT_EPSILON: f64 = 1e-9;

/// Build the closed outline polygon for a stroke.
///
/// Always returns at least three vertices: empty or single-point input yields a
/// disk of radius `size_px / 2` so taps stay visible.
pub fn stroke_outline(points: &[InkPoint], style: &StyleOptions) -> Vec<Point> {
    let base_radius = style.size_px.max(StyleOptions::MIN_SIZE_PX) / 2.0;

    let raw = dedup_coincident(points);
    match raw.as_slice() {
        [] => return circle(Point::ZERO, base_radius),
        [only] => return circle(only.position(), base_radius),
        _ => {}
    }

    let mut centers = streamline(&raw, style.streamline);
    let mut radii: Vec<f64> = raw
        .iter()
        .map(|p| base_radius * width_factor(p.pressure, style.thinning))
        .collect();
    smooth(&mut centers, &mut radii, style.smoothing);

    let Some(directions) = directions(&centers) else {
        // Every sample collapsed onto one spot after smoothing.
        let radius = radii.iter().copied().fold(base_radius, f64::max);
        return circle(centers[0], radius);
    };

    let n = centers.len();
    let mut outline = Vec::with_capacity(2 * n + 2 * CAP_SEGMENTS);

    // Left rail, front to back.
    for i in 0..n {
        outline.push(centers[i] + normal(directions[i]) * radii[i]);
    }

    // End cap sweeps from the left rail around the tip to the right rail.
    let end_angle = normal(directions[n - 1]).atan2();
    push_arc(&mut outline, centers[n - 1], radii[n - 1], end_angle);

    // Right rail, back to front.
    for i in (0..n).rev() {
        outline.push(centers[i] - normal(directions[i]) * radii[i]);
    }

    // Start cap sweeps from the right rail around the tail to the left rail.
    let start_angle = normal(directions[0]).atan2() + PI;
    push_arc(&mut outline, centers[0], radii[0], start_angle);

    outline
}

/// Convert an outline polygon into a closed path.
pub fn outline_path(outline: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some((first, rest)) = outline.split_first() else {
        return path;
    };

    path.move_to(*first);
    for point in rest {
        path.line_to(*point);
    }
    path.close_path();
    path
}

/// Outline a stroke and return it as a closed path.
pub fn stroke_path(points: &[InkPoint], style: &StyleOptions) -> BezPath {
    outline_path(&stroke_outline(points, style))
}

/// Width multiplier for a pressure value.
///
/// Zero thinning keeps the nominal width, positive thinning narrows light
/// pressure and negative thinning widens it.
fn width_factor(pressure: f64, thinning: f64) -> f64 {
    let thinning = thinning.clamp(-1.0, 1.0);
    (1.0 - thinning * (1.0 - pressure.clamp(0.0, 1.0))).clamp(MIN_WIDTH_FACTOR, MAX_WIDTH_FACTOR)
}

fn dedup_coincident(points: &[InkPoint]) -> Vec<InkPoint> {
    let mut out: Vec<InkPoint> = Vec::with_capacity(points.len());
    for point in points {
        match out.last_mut() {
            Some(last) if last.distance(point) < COINCIDENT_EPSILON => *last = *point,
            _ => out.push(*point),
        }
    }
    out
}

/// Blend each raw sample toward the previous smoothed sample.
fn streamline(points: &[InkPoint], streamline: f64) -> Vec<Point> {
    let t = 1.0 - MAX_STREAMLINE_LAG * streamline.clamp(0.0, 1.0);
    let mut centers = Vec::with_capacity(points.len());
    let mut current = points[0].position();
    centers.push(current);

    for point in &points[1..] {
        current = current.lerp(point.position(), t);
        centers.push(current);
    }

    // The outline should end under the pen, not behind it.
    if let (Some(last_center), Some(last_raw)) = (centers.last_mut(), points.last()) {
        *last_center = last_raw.position();
    }
    centers
}

/// One neighbour-averaging pass over interior centers and radii.
fn smooth(centers: &mut [Point], radii: &mut [f64], smoothing: f64) {
    let weight = smoothing.clamp(0.0, 1.0) / 2.0;
    if weight <= 0.0 || centers.len() < 3 {
        return;
    }

    let source_centers = centers.to_vec();
    let source_radii = radii.to_vec();
    for i in 1..centers.len() - 1 {
        let neighbour = source_centers[i - 1].midpoint(source_centers[i + 1]);
        centers[i] = source_centers[i].lerp(neighbour, weight);

        let neighbour_radius = (source_radii[i - 1] + source_radii[i + 1]) / 2.0;
        radii[i] = source_radii[i] * (1.0 - weight) + neighbour_radius * weight;
    }
}

/// Unit tangent at each center, or `None` if the polyline has no extent.
fn directions(centers: &[Point]) -> Option<Vec<Vec2>> {
    let n = centers.len();
    let raw: Vec<Option<Vec2>> = (0..n)
        .map(|i| {
            let ahead = centers[(i + 1).min(n - 1)];
            let behind = centers[i.saturating_sub(1)];
            let d = ahead - behind;
            (d.hypot() > COINCIDENT_EPSILON).then(|| d.normalize())
        })
        .collect();

    let mut carried = raw.iter().flatten().copied().next()?;
    Some(
        raw.into_iter()
            .map(|d| {
                if let Some(d) = d {
                    carried = d;
                }
                carried
            })
            .collect(),
    )
}

/// Left-hand normal of a unit direction.
fn normal(direction: Vec2) -> Vec2 {
    Vec2::new(-direction.y, direction.x)
}

/// Push the interior vertices of a half circle, sweeping clockwise from `from_angle`.
fn push_arc(outline: &mut Vec<Point>, center: Point, radius: f64, from_angle: f64) {
    for k in 1..CAP_SEGMENTS {
        let angle = from_angle - PI * k as f64 / CAP_SEGMENTS as f64;
        outline.push(center + Vec2::from_angle(angle) * radius);
    }
}

fn circle(center: Point, radius: f64) -> Vec<Point> {
    (0..DOT_SEGMENTS)
        .map(|k| center + Vec2::from_angle(TAU * k as f64 / DOT_SEGMENTS as f64) * radius)
        .collect()
}
