//! Incremental, double-buffered stroke rendering.
//!
//! The pipeline keeps two pixmaps:
//!
//! - `base`: every committed stroke, drawn in order. This is the cache the
//!   frame starts from and can always be rebuilt from the visible strokes.
//! - `main`: what the host shows, rebuilt from `base` plus the live stroke on
//!   every dirty frame.
//!
//! Both are produced the same way: the previous base is painted as an image,
//! then one stroke outline is filled on top of it. Rebuilding the base from
//! scratch therefore gives exactly the pixels incremental commits gave.

use std::sync::Arc;

use crate::renderer::{RenderResult, RendererError};
use crate::snapshot;
use inkpage_core::geometry::stroke_outline;
use inkpage_core::stroke::Stroke;
use peniko::{Color, Fill, ImageQuality, ImageSampler};
use vello_cpu::kurbo::{BezPath, Point as CpuPoint, Rect};
use vello_cpu::{Image, ImageSource, Pixmap, RenderContext};

/// Validate a surface size for the rasterizer.
pub fn surface_size(width: u32, height: u32) -> RenderResult<(u16, u16)> {
    let invalid = || RendererError::InvalidSurface { width, height };
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    let w = u16::try_from(width).map_err(|_| invalid())?;
    let h = u16::try_from(height).map_err(|_| invalid())?;
    Ok((w, h))
}

/// CPU render pipeline for one page surface.
pub struct RenderPipeline {
    width: u16,
    height: u16,
    ctx: RenderContext,
    /// Shared with the render context as an image paint.
    base: Arc<Pixmap>,
    main: Pixmap,
    /// Painted under the strokes.
    background: Option<Color>,
    dirty: bool,
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl RenderPipeline {
    /// Create a pipeline for a surface of the given pixel size.
    pub fn new(width: u32, height: u32, background: Option<Color>) -> RenderResult<Self> {
        let (w, h) = surface_size(width, height)?;
        let mut pipeline = Self {
            width: w,
            height: h,
            ctx: RenderContext::new(w, h),
            base: Arc::new(Pixmap::new(w, h)),
            main: Pixmap::new(w, h),
            background,
            dirty: true,
        };
        pipeline.clear_base();
        log::debug!("Render pipeline created at {w}x{h}");
        Ok(pipeline)
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    /// Reallocate every surface at a new size. The base layer must be
    /// rebuilt afterwards.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let (w, h) = surface_size(width, height)?;
        self.width = w;
        self.height = h;
        self.ctx = RenderContext::new(w, h);
        self.main = Pixmap::new(w, h);
        self.clear_base();
        Ok(())
    }

    /// Whether the next `render_frame` will do any work.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Request a redraw on the next frame.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Re-rasterize the base layer from scratch.
    pub fn rebuild_base(&mut self, strokes: &[Stroke]) {
        self.clear_base();
        for stroke in strokes {
            self.draw_into_base(stroke);
        }
        self.dirty = true;
        log::debug!("Base layer rebuilt from {} strokes", strokes.len());
    }

    /// Add a freshly committed stroke on top of the base layer.
    pub fn commit_stroke(&mut self, stroke: &Stroke) {
        self.draw_into_base(stroke);
        self.dirty = true;
    }

    /// Compose the frame: base layer plus the stroke being drawn, if any.
    ///
    /// Returns `false` without touching anything when nothing changed.
    pub fn render_frame(&mut self, live: Option<&Stroke>) -> bool {
        if !self.dirty {
            return false;
        }

        match live {
            Some(stroke) => paint_over(&mut self.ctx, &self.base, stroke, &mut self.main),
            None => self.main.clone_from(&self.base),
        }

        self.dirty = false;
        true
    }

    /// The composed frame.
    pub fn frame(&self) -> &Pixmap {
        &self.main
    }

    /// The committed strokes without the live stroke.
    pub fn base_layer(&self) -> &Pixmap {
        &self.base
    }

    /// Unpremultiplied RGBA bytes of the composed frame.
    pub fn snapshot_rgba8(&self) -> Vec<u8> {
        snapshot::rgba8(&self.main)
    }

    /// PNG export of the committed strokes.
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        snapshot::encode_png(&self.base)
    }

    fn clear_base(&mut self) {
        let mut base = Pixmap::new(self.width, self.height);
        if let Some(color) = self.background {
            self.ctx.reset();
            self.ctx.set_paint(color);
            self.ctx.fill_rect(&full_rect(&base));
            self.ctx.flush();
            self.ctx.render_to_pixmap(&mut base);
        }
        self.base = Arc::new(base);
    }

    fn draw_into_base(&mut self, stroke: &Stroke) {
        if stroke.is_empty() {
            log::warn!("Skipping stroke {} without points", stroke.id);
            return;
        }
        let mut next = Pixmap::new(self.width, self.height);
        paint_over(&mut self.ctx, &self.base, stroke, &mut next);
        self.base = Arc::new(next);
    }
}

/// Render `under` with one stroke outline filled on top of it into `target`.
///
/// `render_to_pixmap` writes every pixel of `target`, so its previous
/// contents do not matter.
fn paint_over(
    ctx: &mut RenderContext,
    under: &Arc<Pixmap>,
    stroke: &Stroke,
    target: &mut Pixmap,
) {
    ctx.reset();

    // Nearest sampling at identity copies the pixels unchanged.
    ctx.set_paint(Image {
        image: ImageSource::Pixmap(Arc::clone(under)),
        sampler: ImageSampler {
            quality: ImageQuality::Low,
            ..ImageSampler::default()
        },
    });
    ctx.fill_rect(&full_rect(under));

    let outline = stroke_outline(&stroke.points, &stroke.style);
    ctx.set_fill_rule(Fill::NonZero);
    ctx.set_paint(stroke.style.color_with_opacity());
    ctx.fill_path(&cpu_path(outline.iter().map(|p| (p.x, p.y))));

    ctx.flush();
    ctx.render_to_pixmap(target);
}

fn full_rect(pixmap: &Pixmap) -> Rect {
    Rect::new(0.0, 0.0, f64::from(pixmap.width()), f64::from(pixmap.height()))
}

/// Build a closed polygon path in the rasterizer's geometry types.
fn cpu_path(points: impl IntoIterator<Item = (f64, f64)>) -> BezPath {
    let mut path = BezPath::new();
    let mut points = points.into_iter();
    let Some((x, y)) = points.next() else {
        return path;
    };
    path.move_to(CpuPoint::new(x, y));
    for (x, y) in points {
        path.line_to(CpuPoint::new(x, y));
    }
    path.close_path();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpage_core::stroke::{InkPoint, StyleOptions};

    fn red_line() -> Stroke {
        let style = StyleOptions {
            color: "#ff0000".to_string(),
            size_px: 6.0,
            ..StyleOptions::default()
        };
        let points = (0..10)
            .map(|i| InkPoint::new(5.0 + i as f64 * 5.0, 20.0, Some(0.5), 0))
            .collect();
        Stroke::from_points("line".to_string(), points, style, 0)
    }

    fn rgba(pixmap: &Pixmap, x: u16, y: u16) -> [u8; 4] {
        let p = pixmap.sample(x, y);
        [p.r, p.g, p.b, p.a]
    }

    fn dot_at(x: f64, y: f64) -> Stroke {
        let style = StyleOptions {
            size_px: 8.0,
            ..StyleOptions::default()
        };
        Stroke::from_points("dot".to_string(), vec![InkPoint::new(x, y, None, 0)], style, 0)
    }

    #[test]
    fn test_zero_size_is_invalid() {
        assert!(matches!(
            RenderPipeline::new(0, 10, None),
            Err(RendererError::InvalidSurface { width: 0, height: 10 })
        ));
        assert!(surface_size(70_000, 10).is_err());
    }

    #[test]
    fn test_render_only_when_dirty() {
        let mut pipeline = RenderPipeline::new(16, 16, None).unwrap();
        assert!(pipeline.render_frame(None));
        assert!(!pipeline.render_frame(None));
        pipeline.mark_dirty();
        assert!(pipeline.render_frame(None));
    }

    #[test]
    fn test_commit_paints_base_layer() {
        let mut pipeline = RenderPipeline::new(64, 40, None).unwrap();
        pipeline.commit_stroke(&red_line());
        pipeline.render_frame(None);

        assert_eq!(rgba(pipeline.frame(), 25, 20), [255, 0, 0, 255]);
        assert_eq!(rgba(pipeline.frame(), 25, 35), [0, 0, 0, 0]);
    }

    #[test]
    fn test_live_stroke_does_not_touch_base() {
        let mut pipeline = RenderPipeline::new(64, 40, None).unwrap();
        pipeline.render_frame(Some(&red_line()));

        assert_eq!(rgba(pipeline.frame(), 25, 20), [255, 0, 0, 255]);
        assert_eq!(rgba(pipeline.base_layer(), 25, 20), [0, 0, 0, 0]);
    }

    #[test]
    fn test_dot_stroke_renders() {
        let mut pipeline = RenderPipeline::new(20, 20, None).unwrap();
        pipeline.commit_stroke(&dot_at(10.0, 10.0));
        pipeline.render_frame(None);
        assert_eq!(pipeline.frame().sample(10, 10).a, 255);
    }

    #[test]
    fn test_rebuild_matches_incremental_commits() {
        let strokes = vec![red_line(), dot_at(30.0, 20.0)];

        let mut incremental = RenderPipeline::new(64, 40, None).unwrap();
        for stroke in &strokes {
            incremental.commit_stroke(stroke);
        }

        let mut rebuilt = RenderPipeline::new(64, 40, None).unwrap();
        rebuilt.rebuild_base(&strokes);

        assert_eq!(incremental.base_layer().data(), rebuilt.base_layer().data());
    }

    #[test]
    fn test_background_fills_base() {
        let mut pipeline =
            RenderPipeline::new(4, 4, Some(Color::from_rgba8(255, 255, 255, 255))).unwrap();
        pipeline.rebuild_base(&[]);
        pipeline.render_frame(None);
        assert_eq!(rgba(pipeline.frame(), 0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_resize_reallocates() {
        let mut pipeline = RenderPipeline::new(10, 10, None).unwrap();
        pipeline.resize(20, 5).unwrap();
        assert_eq!((pipeline.width(), pipeline.height()), (20, 5));
        assert!(pipeline.resize(0, 5).is_err());
        assert_eq!(pipeline.snapshot_rgba8().len(), 20 * 5 * 4);
    }
}
