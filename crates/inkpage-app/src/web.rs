//! WebAssembly binding for browser hosts.
//!
//! One [`WasmEngine`] is created per page canvas. The host forwards pointer
//! events in client coordinates, the engine renders into the canvas on each
//! animation frame while something changed, and notifications come back
//! through JS callbacks.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use inkpage_core::capture::ToolKind;
use inkpage_core::config::EngineConfig;
use inkpage_core::format::SerializedStroke;
use inkpage_core::input::{Contact, ContactEvent, DeviceKind};
use inkpage_core::stroke::{InkPoint, StyleOptions};
use kurbo::{Point, Size};
use wasm_bindgen::Clamped;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::engine::{Engine, EngineObserver};
use crate::raf::RafLoop;
use crate::surface::SurfaceMapping;

#[wasm_bindgen(start)]
pub fn start() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging to browser console
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"InkPage: logger already initialized".into());
    }
    log::info!("InkPage WASM ready");
}

/// A notification waiting to be delivered to JS.
enum Pending {
    StrokeCompleted(String),
    HistoryChanged,
    Navigate,
}

/// Queues notifications so JS callbacks run after the engine is released.
#[derive(Clone, Default)]
struct QueueObserver(Rc<RefCell<VecDeque<Pending>>>);

impl EngineObserver for QueueObserver {
    fn on_stroke_completed(&mut self, stroke: &SerializedStroke) {
        match serde_json::to_string(stroke) {
            Ok(json) => self.0.borrow_mut().push_back(Pending::StrokeCompleted(json)),
            Err(e) => log::warn!("Could not serialize completed stroke: {e}"),
        }
    }

    fn on_history_changed(&mut self) {
        self.0.borrow_mut().push_back(Pending::HistoryChanged);
    }

    fn on_pinch_or_navigate_detected(&mut self) {
        self.0.borrow_mut().push_back(Pending::Navigate);
    }
}

#[derive(Default)]
struct Callbacks {
    stroke_completed: Option<js_sys::Function>,
    history_changed: Option<js_sys::Function>,
    navigate: Option<js_sys::Function>,
}

/// Annotation engine bound to one canvas element.
#[wasm_bindgen]
pub struct WasmEngine {
    engine: Rc<RefCell<Engine>>,
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    mapping: Cell<SurfaceMapping>,
    queue: QueueObserver,
    callbacks: RefCell<Callbacks>,
    raf: RefCell<Option<RafLoop>>,
}

#[wasm_bindgen]
impl WasmEngine {
    /// Bind to a canvas. `config_json` is an optional `EngineConfig` in JSON.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, config_json: Option<String>) -> Result<WasmEngine, JsValue> {
        let config = match config_json.as_deref() {
            Some(json) => EngineConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => EngineConfig::default(),
        };

        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;

        let (width, height) = (canvas.width(), canvas.height());
        let queue = QueueObserver::default();
        let engine = Engine::new(width, height, config).with_observer(Box::new(queue.clone()));
        log::info!("InkPage engine bound to {width}x{height} canvas");

        Ok(Self {
            engine: Rc::new(RefCell::new(engine)),
            canvas,
            context,
            mapping: Cell::new(SurfaceMapping::identity(f64::from(width), f64::from(height))),
            queue,
            callbacks: RefCell::new(Callbacks::default()),
            raf: RefCell::new(None),
        })
    }

    /// Register JS callbacks. The stroke callback receives the stroke as JSON.
    #[wasm_bindgen(js_name = setCallbacks)]
    pub fn set_callbacks(
        &self,
        on_stroke_completed: Option<js_sys::Function>,
        on_history_changed: Option<js_sys::Function>,
        on_pinch_or_navigate_detected: Option<js_sys::Function>,
    ) {
        *self.callbacks.borrow_mut() = Callbacks {
            stroke_completed: on_stroke_completed,
            history_changed: on_history_changed,
            navigate: on_pinch_or_navigate_detected,
        };
    }

    /// Where the canvas sits on screen, from `getBoundingClientRect()`.
    #[wasm_bindgen(js_name = setLayout)]
    pub fn set_layout(&self, left: f64, top: f64, css_width: f64, css_height: f64) {
        self.mapping.set(SurfaceMapping::new(
            Point::new(left, top),
            Size::new(css_width, css_height),
            Size::new(f64::from(self.canvas.width()), f64::from(self.canvas.height())),
        ));
    }

    // --- Pointer input ---

    /// Forward a `pointerdown`. Coordinates are client (CSS) pixels and
    /// `timestamp` is wall-clock milliseconds (`Date.now()`); pass 0 to let
    /// the engine stamp the sample.
    #[wasm_bindgen(js_name = pointerDown)]
    #[allow(clippy::too_many_arguments)]
    pub fn pointer_down(
        &self,
        pointer_id: i32,
        pointer_type: &str,
        client_x: f64,
        client_y: f64,
        pressure: f64,
        width: f64,
        height: f64,
        buttons: u16,
        timestamp: f64,
    ) {
        let contact = self.contact(
            pointer_id, pointer_type, client_x, client_y, pressure, width, height, buttons, timestamp,
        );
        self.dispatch(ContactEvent::Down(contact));
    }

    /// `coalesced` holds `[client_x, client_y, pressure]` triples, oldest first.
    #[wasm_bindgen(js_name = pointerMove)]
    #[allow(clippy::too_many_arguments)]
    pub fn pointer_move(
        &self,
        pointer_id: i32,
        pointer_type: &str,
        client_x: f64,
        client_y: f64,
        pressure: f64,
        width: f64,
        height: f64,
        buttons: u16,
        timestamp: f64,
        coalesced: Vec<f64>,
    ) {
        let contact = self.contact(
            pointer_id, pointer_type, client_x, client_y, pressure, width, height, buttons, timestamp,
        );
        let mapping = self.mapping.get();
        let coalesced = coalesced
            .chunks_exact(3)
            .map(|c| {
                let p = mapping.client_to_surface(Point::new(c[0], c[1]));
                InkPoint::new(p.x, p.y, Some(c[2]), timestamp as i64)
            })
            .collect();
        self.dispatch(ContactEvent::Move { contact, coalesced });
    }

    #[wasm_bindgen(js_name = pointerUp)]
    #[allow(clippy::too_many_arguments)]
    pub fn pointer_up(
        &self,
        pointer_id: i32,
        pointer_type: &str,
        client_x: f64,
        client_y: f64,
        pressure: f64,
        width: f64,
        height: f64,
        buttons: u16,
        timestamp: f64,
    ) {
        let contact = self.contact(
            pointer_id, pointer_type, client_x, client_y, pressure, width, height, buttons, timestamp,
        );
        self.dispatch(ContactEvent::Up(contact));
    }

    /// `pointercancel` or lost pointer capture.
    #[wasm_bindgen(js_name = pointerCancel)]
    pub fn pointer_cancel(&self, pointer_id: i32) {
        self.dispatch(ContactEvent::Cancel(i64::from(pointer_id)));
    }

    // --- Commands ---

    /// Set the style from a JSON `StyleOptions` object.
    #[wasm_bindgen(js_name = setStyle)]
    pub fn set_style(&self, style_json: &str) {
        match serde_json::from_str::<StyleOptions>(style_json) {
            Ok(style) => self.engine.borrow_mut().set_style(style),
            Err(e) => log::warn!("Ignoring invalid style: {e}"),
        }
    }

    /// `"pen"` or `"eraser"`.
    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&self, tool: &str) {
        match ToolKind::from_name(tool) {
            Some(tool) => self.engine.borrow_mut().set_tool(tool),
            None => log::warn!("Unknown tool: {tool}"),
        }
    }

    pub fn undo(&self) -> bool {
        let changed = self.engine.borrow_mut().undo();
        self.flush_notifications();
        changed
    }

    pub fn redo(&self) -> bool {
        let changed = self.engine.borrow_mut().redo();
        self.flush_notifications();
        changed
    }

    pub fn clear(&self) {
        self.engine.borrow_mut().clear();
        self.flush_notifications();
    }

    /// Erase around a client point; `radius` is in CSS pixels.
    pub fn erase(&self, client_x: f64, client_y: f64, radius: f64) -> bool {
        let mapping = self.mapping.get();
        let point = mapping.client_to_surface(Point::new(client_x, client_y));
        let scale = mapping.scale();
        let changed = self.engine.borrow_mut().erase(point, radius * scale.x.max(scale.y));
        self.flush_notifications();
        changed
    }

    pub fn enable(&self) {
        self.engine.borrow_mut().enable();
    }

    pub fn disable(&self) {
        self.engine.borrow_mut().disable();
    }

    /// Resize the canvas backing store and rescale the strokes.
    pub fn resize(&self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        let mut mapping = self.mapping.get();
        mapping.pixel_size = Size::new(f64::from(width), f64::from(height));
        self.mapping.set(mapping);
        self.engine.borrow_mut().resize(width, height);
    }

    /// Replace all strokes. Returns the number imported.
    #[wasm_bindgen(js_name = importStrokes)]
    pub fn import_strokes(&self, json: &str) -> u32 {
        let report = self.engine.borrow_mut().import_strokes(json);
        self.flush_notifications();
        u32::try_from(report.imported).unwrap_or(u32::MAX)
    }

    #[wasm_bindgen(js_name = exportStrokes)]
    pub fn export_strokes(&self) -> String {
        self.engine.borrow().export_strokes()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.engine.borrow().can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.engine.borrow().can_redo()
    }

    /// PNG image of the committed strokes.
    #[wasm_bindgen(js_name = snapshotPng)]
    pub fn snapshot_png(&self) -> Option<Vec<u8>> {
        self.engine.borrow().snapshot_png()
    }

    // --- Rendering ---

    /// Render into the canvas on every animation frame that has changes.
    #[wasm_bindgen(js_name = startRendering)]
    pub fn start_rendering(&self) {
        if self.raf.borrow().as_ref().is_some_and(RafLoop::is_running) {
            return;
        }
        let engine = Rc::clone(&self.engine);
        let context = self.context.clone();
        let raf = RafLoop::new(move |_timestamp| {
            if let Ok(mut engine) = engine.try_borrow_mut() {
                present(&mut engine, &context);
            }
        });
        raf.start();
        *self.raf.borrow_mut() = Some(raf);
    }

    /// Stop the render loop. Also happens when the engine is freed.
    #[wasm_bindgen(js_name = stopRendering)]
    pub fn stop_rendering(&self) {
        if let Some(raf) = self.raf.borrow_mut().take() {
            raf.stop();
        }
    }

    /// Render once, outside the animation loop.
    #[wasm_bindgen(js_name = renderNow)]
    pub fn render_now(&self) {
        present(&mut self.engine.borrow_mut(), &self.context);
    }
}

impl WasmEngine {
    #[allow(clippy::too_many_arguments)]
    fn contact(
        &self,
        pointer_id: i32,
        pointer_type: &str,
        client_x: f64,
        client_y: f64,
        pressure: f64,
        width: f64,
        height: f64,
        buttons: u16,
        timestamp: f64,
    ) -> Contact {
        let mapping = self.mapping.get();
        let position = mapping.client_to_surface(Point::new(client_x, client_y));
        let device = DeviceKind::from_pointer_type(pointer_type);
        // PointerEvent width/height are contact diameters in CSS pixels.
        let radius = (width > 0.0 && height > 0.0)
            .then(|| mapping.scale_radius(width / 2.0, height / 2.0));

        Contact {
            id: i64::from(pointer_id),
            position,
            pressure: Some(pressure),
            radius,
            device,
            button_down: buttons & 1 != 0,
            timestamp_ms: timestamp as i64,
        }
    }

    fn dispatch(&self, event: ContactEvent) {
        self.engine.borrow_mut().handle_event(event);
        self.flush_notifications();
    }

    /// Deliver queued notifications now that the engine is not borrowed.
    fn flush_notifications(&self) {
        loop {
            let Some(pending) = self.queue.0.borrow_mut().pop_front() else {
                break;
            };
            // Clone out so a callback may replace the callbacks.
            let (callback, arg) = {
                let callbacks = self.callbacks.borrow();
                match pending {
                    Pending::StrokeCompleted(json) => {
                        (callbacks.stroke_completed.clone(), JsValue::from_str(&json))
                    }
                    Pending::HistoryChanged => (callbacks.history_changed.clone(), JsValue::UNDEFINED),
                    Pending::Navigate => (callbacks.navigate.clone(), JsValue::UNDEFINED),
                }
            };
            if let Some(callback) = callback {
                if let Err(e) = callback.call1(&JsValue::NULL, &arg) {
                    log::warn!("Host callback threw: {e:?}");
                }
            }
        }
    }
}

/// Compose a frame and copy it into the canvas if anything changed.
fn present(engine: &mut Engine, context: &CanvasRenderingContext2d) {
    if !engine.render_frame() {
        return;
    }
    let (width, height) = engine.size();
    let Some(bytes) = engine.frame_rgba8() else {
        return;
    };
    let image = match ImageData::new_with_u8_clamped_array_and_sh(Clamped(&bytes), width, height) {
        Ok(image) => image,
        Err(e) => {
            log::warn!("Could not build ImageData: {e:?}");
            return;
        }
    };
    if let Err(e) = context.put_image_data(&image, 0.0, 0.0) {
        log::warn!("putImageData failed: {e:?}");
    }
}
