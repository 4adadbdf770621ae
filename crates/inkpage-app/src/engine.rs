//! The annotation engine for one page.
//!
//! An [`Engine`] owns everything a page needs: the input classifier, the
//! capture state machine, the history and the render pipeline. Hosts feed it
//! contact events and commands, and hear back through an [`EngineObserver`].

use inkpage_core::capture::{StrokeCapture, ToolKind};
use inkpage_core::clock::now_ms;
use inkpage_core::config::EngineConfig;
use inkpage_core::eraser::{self, EraseSession};
use inkpage_core::format::{self, ImportReport, SerializedStroke};
use inkpage_core::history::History;
use inkpage_core::input::{CaptureCommand, ContactEvent, GestureState, InputClassifier};
use inkpage_core::stroke::{InkPoint, Stroke, StyleOptions, parse_color};
use inkpage_core::InkError;
use inkpage_render::{Pixmap, RenderPipeline};
use kurbo::{Affine, Point};

/// Outbound notifications to the host.
///
/// Every method has an empty default so hosts implement only what they use.
pub trait EngineObserver {
    /// A stroke was drawn and committed.
    fn on_stroke_completed(&mut self, _stroke: &SerializedStroke) {}
    /// Commit, undo, redo, clear, erase or import changed the history.
    fn on_history_changed(&mut self) {}
    /// A finger gesture started; the host may resume its own scrolling.
    fn on_pinch_or_navigate_detected(&mut self) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}

/// Annotation engine for a single page surface.
pub struct Engine {
    config: EngineConfig,
    style: StyleOptions,
    tool: ToolKind,
    enabled: bool,
    width: u32,
    height: u32,
    /// Last valid surface size; stroke coordinates are relative to it.
    points_size: (u32, u32),
    classifier: InputClassifier,
    capture: StrokeCapture,
    /// Eraser gesture in progress.
    erase_session: Option<EraseSession>,
    history: History,
    /// `None` while the surface has no valid size.
    pipeline: Option<RenderPipeline>,
    observer: Box<dyn EngineObserver>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("tool", &self.tool)
            .field("enabled", &self.enabled)
            .field("strokes", &self.history.visible().len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine for a surface of `width` x `height` device pixels.
    pub fn new(width: u32, height: u32, config: EngineConfig) -> Self {
        let config = config.sanitized();
        let mut engine = Self {
            style: config.default_style.clone(),
            tool: ToolKind::default(),
            enabled: true,
            width,
            height,
            points_size: (width, height),
            classifier: InputClassifier::new(config.classifier.clone()),
            capture: StrokeCapture::new(config.min_distance),
            erase_session: None,
            history: History::new(config.history_capacity),
            pipeline: None,
            observer: Box::new(NoopObserver),
            config,
        };
        engine.pipeline = engine.create_pipeline(width, height);
        engine
    }

    /// Replace the notification sink.
    pub fn set_observer(&mut self, observer: Box<dyn EngineObserver>) {
        self.observer = observer;
    }

    pub fn with_observer(mut self, observer: Box<dyn EngineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Surface size in device pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn style(&self) -> &StyleOptions {
        &self.style
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn gesture_state(&self) -> GestureState {
        self.classifier.state()
    }

    /// Strokes currently visible, bottom to top.
    pub fn visible_strokes(&self) -> &[Stroke] {
        self.history.visible()
    }

    /// The stroke being drawn, if any.
    pub fn live_stroke(&self) -> Option<&Stroke> {
        self.capture.current()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Commands ---

    /// Style applied to strokes started from now on.
    pub fn set_style(&mut self, style: StyleOptions) {
        self.style = style.sanitized();
    }

    /// Switch between drawing and erasing. Any gesture in progress is cancelled.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool != self.tool {
            self.abort_gesture();
            self.tool = tool;
            log::debug!("Tool changed to {tool:?}");
        }
    }

    /// Start accepting input again.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Cancel any stroke in progress and ignore input until `enable`.
    pub fn disable(&mut self) {
        self.abort_gesture();
        self.enabled = false;
    }

    /// Undo the last history entry. Returns `true` if anything changed.
    pub fn undo(&mut self) -> bool {
        self.discard_erase_session();
        if !self.history.undo() {
            return false;
        }
        self.history_changed();
        true
    }

    /// Redo the next history entry. Returns `true` if anything changed.
    pub fn redo(&mut self) -> bool {
        self.discard_erase_session();
        if !self.history.redo() {
            return false;
        }
        self.history_changed();
        true
    }

    /// Remove every stroke.
    pub fn clear(&mut self) {
        self.discard_erase_session();
        self.history.clear();
        self.history_changed();
    }

    /// Erase around a surface point as one undoable step.
    ///
    /// Returns `true` if any stroke was touched.
    pub fn erase(&mut self, point: Point, radius: f64) -> bool {
        self.discard_erase_session();
        let outcome = eraser::erase(self.history.visible(), point, radius);
        if !self.history.replace(outcome.replacements) {
            return false;
        }
        self.history_changed();
        true
    }

    /// Change the surface size, scaling every stroke to keep its relative position.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.abort_gesture();

        let (old_width, old_height) = self.points_size;
        if width > 0 && height > 0 {
            if old_width > 0 && old_height > 0 && (old_width, old_height) != (width, height) {
                let scale = Affine::scale_non_uniform(
                    f64::from(width) / f64::from(old_width),
                    f64::from(height) / f64::from(old_height),
                );
                self.history.for_each_stroke_mut(|stroke| stroke.transform(scale));
            }
            self.points_size = (width, height);
        }

        self.width = width;
        self.height = height;
        self.pipeline = match self.pipeline.take() {
            Some(mut pipeline) => match pipeline.resize(width, height) {
                Ok(()) => Some(pipeline),
                Err(e) => {
                    log::warn!("{}: {e}", InkError::InvalidSurfaceState { width, height });
                    None
                }
            },
            None => self.create_pipeline(width, height),
        };
        self.rebuild_base_layer();
    }

    /// Replace all strokes with the ones in a serialized payload.
    ///
    /// Malformed strokes are skipped. A payload that cannot be read at all
    /// leaves the page untouched.
    pub fn import_strokes(&mut self, json: &str) -> ImportReport {
        let (strokes, report) = match format::import_strokes(json) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Import failed: {e}");
                return ImportReport::default();
            }
        };

        self.abort_gesture();
        self.history.load(strokes);
        self.history_changed();
        report
    }

    /// Serialize the visible strokes.
    pub fn export_strokes(&self) -> String {
        match format::export_strokes(self.history.visible()) {
            Ok(json) => {
                log::info!("Exported {} strokes", self.history.visible().len());
                json
            }
            Err(e) => {
                log::warn!("Export failed: {e}");
                "[]".to_string()
            }
        }
    }

    // --- Input ---

    /// Feed one contact event. Ignored while disabled.
    pub fn handle_event(&mut self, event: ContactEvent) {
        if !self.enabled {
            return;
        }
        for command in self.classifier.handle_event(event) {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: CaptureCommand) {
        match (command, self.tool) {
            (CaptureCommand::BeginNavigate, _) => {
                self.observer.on_pinch_or_navigate_detected();
            }

            (CaptureCommand::BeginDraw(point), ToolKind::Pen) => {
                self.capture.begin(stamp(point), self.style.clone());
                self.mark_dirty();
            }
            (CaptureCommand::ContinueDraw(samples), ToolKind::Pen) => {
                let samples: Vec<InkPoint> = samples.into_iter().map(stamp).collect();
                if self.capture.continue_with(&samples) > 0 {
                    self.mark_dirty();
                }
            }
            (CaptureCommand::EndDraw, ToolKind::Pen) => {
                if let Some(stroke) = self.capture.end() {
                    self.commit_stroke(stroke);
                }
            }
            (CaptureCommand::CancelDraw, ToolKind::Pen) => {
                if self.capture.cancel() {
                    self.mark_dirty();
                }
            }

            (CaptureCommand::BeginDraw(point), ToolKind::Eraser) => {
                let mut session =
                    EraseSession::new(self.history.visible(), self.config.eraser_radius);
                let changed = session.erase_to(point.position());
                self.erase_session = Some(session);
                if changed {
                    self.redraw_erase_session();
                }
            }
            (CaptureCommand::ContinueDraw(samples), ToolKind::Eraser) => {
                let Some(session) = self.erase_session.as_mut() else {
                    return;
                };
                let mut changed = false;
                for sample in &samples {
                    changed |= session.erase_to(sample.position());
                }
                if changed {
                    self.redraw_erase_session();
                }
            }
            (CaptureCommand::EndDraw, ToolKind::Eraser) => {
                if let Some(session) = self.erase_session.take() {
                    if self.history.replace(session.finish()) {
                        self.history_changed();
                    }
                }
            }
            (CaptureCommand::CancelDraw, ToolKind::Eraser) => {
                self.discard_erase_session();
            }
        }
    }

    fn commit_stroke(&mut self, stroke: Stroke) {
        let serialized = SerializedStroke::from(&stroke);
        let evicted = self.history.commit(stroke.clone());

        if evicted {
            self.rebuild_base_layer();
        } else if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.commit_stroke(&stroke);
        }
        log::debug!("Committed stroke {} ({} points)", stroke.id, stroke.len());

        self.observer.on_stroke_completed(&serialized);
        self.observer.on_history_changed();
    }

    /// Cancel any stroke or eraser gesture and forget active contacts.
    fn abort_gesture(&mut self) {
        self.classifier.reset();
        if self.capture.cancel() {
            self.mark_dirty();
        }
        self.discard_erase_session();
    }

    /// Drop an unfinished eraser gesture, restoring the committed strokes.
    fn discard_erase_session(&mut self) {
        if self.erase_session.take().is_some() {
            self.rebuild_base_layer();
        }
    }

    fn history_changed(&mut self) {
        self.rebuild_base_layer();
        self.observer.on_history_changed();
    }

    fn rebuild_base_layer(&mut self) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.rebuild_base(self.history.visible());
        }
    }

    fn redraw_erase_session(&mut self) {
        if let (Some(pipeline), Some(session)) =
            (self.pipeline.as_mut(), self.erase_session.as_ref())
        {
            pipeline.rebuild_base(session.strokes());
        }
    }

    fn mark_dirty(&mut self) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.mark_dirty();
        }
    }

    fn create_pipeline(&self, width: u32, height: u32) -> Option<RenderPipeline> {
        let background = self.config.background.as_deref().map(parse_color);
        match RenderPipeline::new(width, height, background) {
            Ok(mut pipeline) => {
                pipeline.rebuild_base(self.history.visible());
                Some(pipeline)
            }
            Err(e) => {
                log::warn!("{}: {e}", InkError::InvalidSurfaceState { width, height });
                None
            }
        }
    }

    // --- Rendering ---

    /// Whether the next `render_frame` would draw anything.
    pub fn needs_frame(&self) -> bool {
        self.pipeline.as_ref().is_some_and(RenderPipeline::is_dirty)
    }

    /// Compose a frame if anything changed. Returns `true` if it drew.
    pub fn render_frame(&mut self) -> bool {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return false;
        };
        pipeline.render_frame(self.capture.current())
    }

    /// The last composed frame, if the surface is valid.
    pub fn frame(&self) -> Option<&Pixmap> {
        self.pipeline.as_ref().map(RenderPipeline::frame)
    }

    /// Unpremultiplied RGBA bytes of the last composed frame.
    pub fn frame_rgba8(&self) -> Option<Vec<u8>> {
        self.pipeline.as_ref().map(RenderPipeline::snapshot_rgba8)
    }

    /// PNG image of the committed strokes.
    pub fn snapshot_png(&self) -> Option<Vec<u8>> {
        let pipeline = self.pipeline.as_ref()?;
        match pipeline.encode_png() {
            Ok(png) => Some(png),
            Err(e) => {
                log::warn!("Snapshot failed: {e}");
                None
            }
        }
    }
}

/// Give a sample a wall-clock time if the host did not.
fn stamp(mut point: InkPoint) -> InkPoint {
    if point.timestamp_ms == 0 {
        point.timestamp_ms = now_ms();
    }
    point
}
