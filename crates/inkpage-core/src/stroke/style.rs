//! Per-stroke style options.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Style properties frozen into a stroke when it starts.
///
/// Changing the engine's style never affects a stroke that is already being
/// captured; the capture state machine takes a copy at `begin_draw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleOptions {
    /// CSS-like color string (`#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()`).
    #[serde(default = "default_color")]
    pub color: String,
    /// Nominal stroke diameter in device pixels.
    #[serde(default = "default_size", alias = "size")]
    pub size_px: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Neighbour blending of the centerline and widths (0 = none).
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
    /// How much pressure changes the width (-1..=1, 0 = constant width).
    #[serde(default = "default_thinning")]
    pub thinning: f64,
    /// Lag of the centerline behind the raw samples (0 = none).
    #[serde(default = "default_streamline")]
    pub streamline: f64,
}

fn default_color() -> String {
    "#000000".to_string()
}

fn default_size() -> f64 {
    4.0
}

fn default_opacity() -> f64 {
    1.0
}

fn default_smoothing() -> f64 {
    0.5
}

fn default_thinning() -> f64 {
    0.5
}

fn default_streamline() -> f64 {
    0.5
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            color: default_color(),
            size_px: default_size(),
            opacity: default_opacity(),
            smoothing: default_smoothing(),
            thinning: default_thinning(),
            streamline: default_streamline(),
        }
    }
}

impl StyleOptions {
    /// Smallest accepted stroke diameter.
    pub const MIN_SIZE_PX: f64 = 0.1;

    /// Return a copy with every numeric field clamped into its valid range.
    ///
    /// Non-finite values fall back to the defaults.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let pick = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };
        Self {
            color: self.color.clone(),
            size_px: pick(self.size_px, defaults.size_px).max(Self::MIN_SIZE_PX),
            opacity: pick(self.opacity, defaults.opacity).clamp(0.0, 1.0),
            smoothing: pick(self.smoothing, defaults.smoothing).clamp(0.0, 1.0),
            thinning: pick(self.thinning, defaults.thinning).clamp(-1.0, 1.0),
            streamline: pick(self.streamline, defaults.streamline).clamp(0.0, 1.0),
        }
    }

    /// Get the stroke color as a peniko Color.
    pub fn color(&self) -> Color {
        parse_color(&self.color)
    }

    /// Get the stroke color with opacity applied.
    pub fn color_with_opacity(&self) -> Color {
        let rgba = self.color().to_rgba8();
        let alpha = (rgba.a as f64 * self.opacity.clamp(0.0, 1.0)).round() as u8;
        Color::from_rgba8(rgba.r, rgba.g, rgba.b, alpha)
    }
}

/// Parse a CSS-like color string. Unknown formats fall back to black.
pub fn parse_color(color: &str) -> Color {
    let color = color.trim();

    if color.eq_ignore_ascii_case("transparent") {
        return Color::from_rgba8(0, 0, 0, 0);
    }

    // Handle hex colors (#rgb, #rrggbb, #rrggbbaa)
    if let Some(hex) = color.strip_prefix('#') {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        let parsed = match hex.len() {
            3 if hex.is_ascii() => {
                // #rgb -> #rrggbb
                let r = channel(&hex[0..1]);
                let g = channel(&hex[1..2]);
                let b = channel(&hex[2..3]);
                r.zip(g).zip(b).map(|((r, g), b)| (r * 17, g * 17, b * 17, 255))
            }
            6 | 8 if hex.is_ascii() => {
                let r = channel(&hex[0..2]);
                let g = channel(&hex[2..4]);
                let b = channel(&hex[4..6]);
                let a = if hex.len() == 8 { channel(&hex[6..8]) } else { Some(255) };
                r.zip(g).zip(b).zip(a).map(|(((r, g), b), a)| (r, g, b, a))
            }
            _ => None,
        };
        if let Some((r, g, b, a)) = parsed {
            return Color::from_rgba8(r, g, b, a);
        }
    }

    // Handle rgb(r, g, b) and rgba(r, g, b, a) with alpha in 0..=1
    let lower = color.to_ascii_lowercase();
    let body = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'));
    if let Some(body) = body {
        let parts: Vec<f64> = body
            .split(',')
            .filter_map(|part| part.trim().parse::<f64>().ok())
            .collect();
        if parts.len() == 3 || parts.len() == 4 {
            let to_u8 = |v: f64| v.round().clamp(0.0, 255.0) as u8;
            let alpha = parts.get(3).map_or(255, |a| to_u8(a.clamp(0.0, 1.0) * 255.0));
            return Color::from_rgba8(to_u8(parts[0]), to_u8(parts[1]), to_u8(parts[2]), alpha);
        }
    }

    match lower.as_str() {
        "white" => Color::from_rgba8(255, 255, 255, 255),
        "red" => Color::from_rgba8(255, 0, 0, 255),
        "green" => Color::from_rgba8(0, 128, 0, 255),
        "blue" => Color::from_rgba8(0, 0, 255, 255),
        "yellow" => Color::from_rgba8(255, 255, 0, 255),
        _ => Color::from_rgba8(0, 0, 0, 255),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        let c = parse_color("#f00").to_rgba8();
        assert_eq!((c.r, c.g, c.b, c.a), (255, 0, 0, 255));

        let c = parse_color("#336699").to_rgba8();
        assert_eq!((c.r, c.g, c.b, c.a), (0x33, 0x66, 0x99, 255));

        let c = parse_color("#11223344").to_rgba8();
        assert_eq!((c.r, c.g, c.b, c.a), (0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn test_parse_rgba_function() {
        let c = parse_color("rgba(10, 20, 30, 0.5)").to_rgba8();
        assert_eq!((c.r, c.g, c.b), (10, 20, 30));
        assert_eq!(c.a, 128);

        let c = parse_color("rgb(255,255,255)").to_rgba8();
        assert_eq!((c.r, c.g, c.b, c.a), (255, 255, 255, 255));
    }

    #[test]
    fn test_unknown_color_is_black() {
        let c = parse_color("not-a-color").to_rgba8();
        assert_eq!((c.r, c.g, c.b, c.a), (0, 0, 0, 255));
    }

    #[test]
    fn test_sanitized_clamps_ranges() {
        let style = StyleOptions {
            size_px: -3.0,
            opacity: 2.0,
            thinning: -4.0,
            streamline: f64::NAN,
            ..StyleOptions::default()
        }
        .sanitized();

        assert_eq!(style.size_px, StyleOptions::MIN_SIZE_PX);
        assert_eq!(style.opacity, 1.0);
        assert_eq!(style.thinning, -1.0);
        assert_eq!(style.streamline, StyleOptions::default().streamline);
    }

    #[test]
    fn test_opacity_applies_to_alpha() {
        let style = StyleOptions {
            color: "#ff0000".to_string(),
            opacity: 0.5,
            ..StyleOptions::default()
        };
        assert_eq!(style.color_with_opacity().to_rgba8().a, 128);
    }
}
