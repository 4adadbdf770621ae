//! Mapping between client (CSS) coordinates and surface backing pixels.

use kurbo::{Affine, Point, Size, Vec2};

/// Where the drawing surface sits on screen and how big its backing store is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMapping {
    /// Top-left of the surface in client coordinates.
    pub origin: Point,
    /// Displayed size in CSS pixels.
    pub css_size: Size,
    /// Backing store size in device pixels.
    pub pixel_size: Size,
}

impl Default for SurfaceMapping {
    fn default() -> Self {
        Self {
            origin: Point::ZERO,
            css_size: Size::new(1.0, 1.0),
            pixel_size: Size::new(1.0, 1.0),
        }
    }
}

impl SurfaceMapping {
    /// Create a mapping.
    pub fn new(origin: Point, css_size: Size, pixel_size: Size) -> Self {
        Self {
            origin,
            css_size,
            pixel_size,
        }
    }

    /// Identity mapping for a surface whose CSS and pixel sizes agree.
    pub fn identity(width: f64, height: f64) -> Self {
        let size = Size::new(width, height);
        Self::new(Point::ZERO, size, size)
    }

    /// Pixels per CSS pixel on each axis. Degenerate sizes map 1:1.
    pub fn scale(&self) -> Vec2 {
        let axis = |pixels: f64, css: f64| {
            if css > 0.0 && pixels > 0.0 {
                pixels / css
            } else {
                1.0
            }
        };
        Vec2::new(
            axis(self.pixel_size.width, self.css_size.width),
            axis(self.pixel_size.height, self.css_size.height),
        )
    }

    /// Transform from client coordinates to surface pixels.
    pub fn transform(&self) -> Affine {
        let scale = self.scale();
        Affine::scale_non_uniform(scale.x, scale.y) * Affine::translate(-self.origin.to_vec2())
    }

    /// Convert a client point to surface pixels.
    pub fn client_to_surface(&self, client: Point) -> Point {
        self.transform() * client
    }

    /// Convert a surface pixel position back to client coordinates.
    pub fn surface_to_client(&self, surface: Point) -> Point {
        self.transform().inverse() * surface
    }

    /// Scale a contact radius given in CSS pixels.
    pub fn scale_radius(&self, radius_x: f64, radius_y: f64) -> (f64, f64) {
        let scale = self.scale();
        (radius_x * scale.x, radius_y * scale.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mapping() {
        let mapping = SurfaceMapping::identity(100.0, 50.0);
        assert_eq!(mapping.client_to_surface(Point::new(10.0, 20.0)), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_offset_and_device_pixel_ratio() {
        let mapping = SurfaceMapping::new(
            Point::new(100.0, 40.0),
            Size::new(200.0, 100.0),
            Size::new(400.0, 200.0),
        );
        let p = mapping.client_to_surface(Point::new(150.0, 90.0));
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 100.0).abs() < 1e-9);

        let back = mapping.surface_to_client(p);
        assert!((back.x - 150.0).abs() < 1e-9);
        assert!((back.y - 90.0).abs() < 1e-9);
        assert_eq!(mapping.scale_radius(3.0, 4.0), (6.0, 8.0));
    }

    #[test]
    fn test_degenerate_css_size_maps_one_to_one() {
        let mapping = SurfaceMapping::new(Point::ZERO, Size::ZERO, Size::new(10.0, 10.0));
        assert_eq!(mapping.scale(), Vec2::new(1.0, 1.0));
    }
}
