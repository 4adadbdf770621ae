//! Contact tracking and gesture classification.
//!
//! The classifier sees every pointer/touch contact on the surface and decides,
//! each time the set of contacts changes, whether the gesture is a drawing
//! gesture or a navigation gesture. It emits [`CaptureCommand`]s for the
//! stroke capture state machine.

use crate::config::ClassifierConfig;
use crate::error::{InkError, InkResult};
use crate::stroke::InkPoint;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Identifier of one pointer or touch contact, as reported by the host.
pub type ContactId = i64;

/// Explicit device tag reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Pen,
    Mouse,
    Touch,
}

impl DeviceKind {
    /// Parse a DOM `pointerType` string.
    pub fn from_pointer_type(pointer_type: &str) -> Option<Self> {
        match pointer_type {
            "pen" => Some(DeviceKind::Pen),
            "mouse" => Some(DeviceKind::Mouse),
            "touch" => Some(DeviceKind::Touch),
            _ => None,
        }
    }
}

/// One active contact with its device-reported metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    /// Position in surface pixel coordinates.
    pub position: Point,
    /// Reported pressure, if the device has one.
    pub pressure: Option<f64>,
    /// Reported contact radii (x, y), if any.
    pub radius: Option<(f64, f64)>,
    /// Explicit device tag; always wins over the heuristic.
    pub device: Option<DeviceKind>,
    /// For mice: whether the primary button is held.
    pub button_down: bool,
    pub timestamp_ms: i64,
}

impl Contact {
    /// A contact with no device metadata at all.
    pub fn new(id: ContactId, position: Point) -> Self {
        Self {
            id,
            position,
            pressure: None,
            radius: None,
            device: None,
            button_down: false,
            timestamp_ms: 0,
        }
    }

    /// A tagged pen contact.
    pub fn pen(id: ContactId, position: Point, pressure: f64) -> Self {
        Self {
            pressure: Some(pressure),
            device: Some(DeviceKind::Pen),
            ..Self::new(id, position)
        }
    }

    /// A tagged mouse contact with the primary button held.
    pub fn mouse(id: ContactId, position: Point) -> Self {
        Self {
            device: Some(DeviceKind::Mouse),
            button_down: true,
            ..Self::new(id, position)
        }
    }

    /// A tagged finger contact.
    pub fn touch(id: ContactId, position: Point) -> Self {
        Self {
            device: Some(DeviceKind::Touch),
            ..Self::new(id, position)
        }
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }

    pub fn with_radius(mut self, radius_x: f64, radius_y: f64) -> Self {
        self.radius = Some((radius_x, radius_y));
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// The sample this contact contributes to a stroke.
    pub fn to_point(&self) -> InkPoint {
        InkPoint::new(self.position.x, self.position.y, self.pressure, self.timestamp_ms)
    }
}

/// Raw contact events delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactEvent {
    Down(Contact),
    /// A move, with any platform-coalesced samples that preceded it, oldest first.
    Move {
        contact: Contact,
        coalesced: Vec<InkPoint>,
    },
    Up(Contact),
    /// The platform took the contact away (pointercancel, lost capture).
    Cancel(ContactId),
}

/// Classification of the current contact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureClass {
    /// Exactly one pen contact, or one mouse contact with a button held.
    StylusOrMouseDraw,
    /// One or more contacts that are all fingers.
    FingerNavigate,
    /// Mixed stylus and other contacts, or an undetermined device.
    Suppress,
}

/// What the current interaction is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureMode {
    #[default]
    Idle,
    Drawing,
    Navigating,
    Suppressed,
}

/// Transient state of one interaction; reset when every contact lifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GestureState {
    /// Contact that owns the stroke being drawn.
    pub active_input_id: Option<ContactId>,
    pub mode: GestureMode,
}

/// Commands sent to the stroke capture state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureCommand {
    BeginDraw(InkPoint),
    /// Samples to append, in arrival order.
    ContinueDraw(Vec<InkPoint>),
    EndDraw,
    BeginNavigate,
    CancelDraw,
}

/// Tracks active contacts and classifies gestures.
#[derive(Debug, Clone, Default)]
pub struct InputClassifier {
    config: ClassifierConfig,
    /// Active contacts in the order they went down.
    contacts: Vec<Contact>,
    state: GestureState,
}

impl InputClassifier {
    /// Create a classifier with the given thresholds.
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            contacts: Vec::new(),
            state: GestureState::default(),
        }
    }

    /// Current gesture state.
    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Number of contacts currently down.
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Forget every contact. Returns `true` if a stroke was being drawn.
    pub fn reset(&mut self) -> bool {
        let was_drawing = self.state.mode == GestureMode::Drawing;
        self.contacts.clear();
        self.state = GestureState::default();
        was_drawing
    }

    /// Determine the device behind a contact.
    pub fn device_kind(&self, contact: &Contact) -> InkResult<DeviceKind> {
        if let Some(device) = contact.device {
            return Ok(device);
        }
        if contact.pressure.is_none() && contact.radius.is_none() {
            return Err(InkError::UnsupportedInputDevice);
        }

        let pressed = contact
            .pressure
            .is_some_and(|p| p > self.config.pressure_threshold);
        let narrow = contact
            .radius
            .is_some_and(|(rx, ry)| rx.min(ry) < self.config.radius_threshold);

        Ok(if pressed && narrow {
            DeviceKind::Pen
        } else {
            DeviceKind::Touch
        })
    }

    /// Classify a set of simultaneous contacts.
    pub fn classify(&self, contacts: &[Contact]) -> GestureClass {
        let mut kinds = Vec::with_capacity(contacts.len());
        for contact in contacts {
            match self.device_kind(contact) {
                Ok(kind) => kinds.push((kind, contact.button_down)),
                Err(e) => {
                    log::debug!("Contact {}: {e}", contact.id);
                    return GestureClass::Suppress;
                }
            }
        }

        match kinds.as_slice() {
            [] => GestureClass::Suppress,
            [(DeviceKind::Pen, _)] | [(DeviceKind::Mouse, true)] => GestureClass::StylusOrMouseDraw,
            [(DeviceKind::Mouse, false)] => GestureClass::Suppress,
            all if all.iter().all(|(kind, _)| *kind == DeviceKind::Touch) => {
                GestureClass::FingerNavigate
            }
            _ => GestureClass::Suppress,
        }
    }

    /// Process one contact event and return the resulting capture commands.
    pub fn handle_event(&mut self, event: ContactEvent) -> Vec<CaptureCommand> {
        match event {
            ContactEvent::Down(contact) => self.contact_down(contact),
            ContactEvent::Move { contact, coalesced } => self.contact_move(contact, coalesced),
            ContactEvent::Up(contact) => {
                let id = contact.id;
                self.contact_lifted(id, Some(contact))
            }
            ContactEvent::Cancel(id) => self.contact_lifted(id, None),
        }
    }

    fn position_of(&self, id: ContactId) -> Option<usize> {
        self.contacts.iter().position(|c| c.id == id)
    }

    fn contact_down(&mut self, contact: Contact) -> Vec<CaptureCommand> {
        if let Some(index) = self.position_of(contact.id) {
            // Repeated down for a known contact does not change the set.
            self.contacts[index] = contact;
            return Vec::new();
        }

        self.contacts.push(contact);
        let mut commands = Vec::new();

        if self.contacts.len() == 1 && self.state.mode == GestureMode::Idle {
            let first = &self.contacts[0];
            match self.classify(&self.contacts) {
                GestureClass::StylusOrMouseDraw => {
                    self.state = GestureState {
                        active_input_id: Some(first.id),
                        mode: GestureMode::Drawing,
                    };
                    commands.push(CaptureCommand::BeginDraw(first.to_point()));
                }
                GestureClass::FingerNavigate => {
                    self.state.mode = GestureMode::Navigating;
                    commands.push(CaptureCommand::BeginNavigate);
                }
                GestureClass::Suppress => {
                    self.state.mode = GestureMode::Suppressed;
                }
            }
            log::debug!("Gesture started: {:?}", self.state.mode);
            return commands;
        }

        // A contact joined an ongoing interaction: never keep drawing through it.
        if self.state.mode == GestureMode::Drawing {
            commands.push(CaptureCommand::CancelDraw);
            self.state.active_input_id = None;
        }
        self.reclassify_without_drawing(&mut commands);
        commands
    }

    fn contact_move(&mut self, contact: Contact, coalesced: Vec<InkPoint>) -> Vec<CaptureCommand> {
        let Some(index) = self.position_of(contact.id) else {
            // Hover or a contact we never saw go down.
            return Vec::new();
        };

        let drawing = self.state.mode == GestureMode::Drawing
            && self.state.active_input_id == Some(contact.id);
        let point = contact.to_point();
        self.contacts[index] = contact;

        if !drawing {
            return Vec::new();
        }
        let mut samples = coalesced;
        if samples.last() != Some(&point) {
            samples.push(point);
        }
        vec![CaptureCommand::ContinueDraw(samples)]
    }

    fn contact_lifted(&mut self, id: ContactId, last: Option<Contact>) -> Vec<CaptureCommand> {
        let Some(index) = self.position_of(id) else {
            return Vec::new();
        };
        self.contacts.remove(index);

        let mut commands = Vec::new();
        if self.state.mode == GestureMode::Drawing && self.state.active_input_id == Some(id) {
            match last {
                Some(contact) => {
                    commands.push(CaptureCommand::ContinueDraw(vec![contact.to_point()]));
                    commands.push(CaptureCommand::EndDraw);
                }
                None => commands.push(CaptureCommand::CancelDraw),
            }
            self.state.active_input_id = None;
        }

        if self.contacts.is_empty() {
            self.state = GestureState::default();
            return commands;
        }

        self.reclassify_without_drawing(&mut commands);
        commands
    }

    /// Re-run classification after the contact count changed mid-interaction.
    ///
    /// Drawing never resumes until every contact has lifted.
    fn reclassify_without_drawing(&mut self, commands: &mut Vec<CaptureCommand>) {
        match self.classify(&self.contacts) {
            GestureClass::FingerNavigate => {
                if self.state.mode != GestureMode::Navigating {
                    commands.push(CaptureCommand::BeginNavigate);
                }
                self.state.mode = GestureMode::Navigating;
            }
            GestureClass::StylusOrMouseDraw | GestureClass::Suppress => {
                self.state.mode = GestureMode::Suppressed;
            }
        }
        log::debug!(
            "Contact set changed ({} active): {:?}",
            self.contacts.len(),
            self.state.mode
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> InputClassifier {
        InputClassifier::new(ClassifierConfig::default())
    }

    fn at(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_single_pen_draws() {
        let c = classifier();
        assert_eq!(
            c.classify(&[Contact::pen(1, at(0.0, 0.0), 0.5)]),
            GestureClass::StylusOrMouseDraw
        );
    }

    #[test]
    fn test_mouse_needs_button() {
        let c = classifier();
        let mut mouse = Contact::mouse(1, at(0.0, 0.0));
        assert_eq!(c.classify(&[mouse.clone()]), GestureClass::StylusOrMouseDraw);
        mouse.button_down = false;
        assert_eq!(c.classify(&[mouse]), GestureClass::Suppress);
    }

    #[test]
    fn test_fingers_navigate() {
        let c = classifier();
        let fingers = [Contact::touch(1, at(0.0, 0.0)), Contact::touch(2, at(5.0, 5.0))];
        assert_eq!(c.classify(&fingers[..1]), GestureClass::FingerNavigate);
        assert_eq!(c.classify(&fingers), GestureClass::FingerNavigate);
    }

    #[test]
    fn test_stylus_plus_finger_is_ambiguous() {
        let c = classifier();
        let contacts = [Contact::pen(1, at(0.0, 0.0), 0.5), Contact::touch(2, at(5.0, 5.0))];
        assert_eq!(c.classify(&contacts), GestureClass::Suppress);
    }

    #[test]
    fn test_heuristic_detects_stylus() {
        let c = classifier();
        let stylus = Contact::new(1, at(0.0, 0.0)).with_pressure(0.4).with_radius(1.0, 1.0);
        assert_eq!(c.device_kind(&stylus).unwrap(), DeviceKind::Pen);

        let finger = Contact::new(2, at(0.0, 0.0)).with_pressure(0.4).with_radius(20.0, 22.0);
        assert_eq!(c.device_kind(&finger).unwrap(), DeviceKind::Touch);

        let light = Contact::new(3, at(0.0, 0.0)).with_pressure(0.01).with_radius(1.0, 1.0);
        assert_eq!(c.device_kind(&light).unwrap(), DeviceKind::Touch);
    }

    #[test]
    fn test_explicit_tag_wins() {
        let c = classifier();
        let tagged = Contact::touch(1, at(0.0, 0.0)).with_pressure(0.9).with_radius(1.0, 1.0);
        assert_eq!(c.device_kind(&tagged).unwrap(), DeviceKind::Touch);
    }

    #[test]
    fn test_undetermined_device_never_draws() {
        let mut c = classifier();
        let untagged = Contact::new(1, at(0.0, 0.0));
        assert!(matches!(c.device_kind(&untagged), Err(InkError::UnsupportedInputDevice)));

        let commands = c.handle_event(ContactEvent::Down(untagged));
        assert!(commands.is_empty());
        assert_eq!(c.state().mode, GestureMode::Suppressed);
    }

    #[test]
    fn test_draw_lifecycle() {
        let mut c = classifier();
        let commands = c.handle_event(ContactEvent::Down(Contact::pen(7, at(0.0, 0.0), 0.5)));
        assert!(matches!(commands.as_slice(), [CaptureCommand::BeginDraw(_)]));
        assert_eq!(c.state().active_input_id, Some(7));

        let commands = c.handle_event(ContactEvent::Move {
            contact: Contact::pen(7, at(0.0, 10.0), 0.5),
            coalesced: vec![InkPoint::new(0.0, 5.0, Some(0.5), 0)],
        });
        match commands.as_slice() {
            [CaptureCommand::ContinueDraw(samples)] => {
                assert_eq!(samples.len(), 2);
                assert_eq!(samples[0].y, 5.0);
                assert_eq!(samples[1].y, 10.0);
            }
            other => panic!("unexpected commands: {other:?}"),
        }

        let commands = c.handle_event(ContactEvent::Up(Contact::pen(7, at(0.0, 10.0), 0.5)));
        assert_eq!(commands.last(), Some(&CaptureCommand::EndDraw));
        assert_eq!(c.state(), GestureState::default());
    }

    #[test]
    fn test_second_contact_cancels_draw() {
        let mut c = classifier();
        c.handle_event(ContactEvent::Down(Contact::pen(1, at(0.0, 0.0), 0.5)));
        let commands = c.handle_event(ContactEvent::Down(Contact::touch(2, at(50.0, 50.0))));

        assert_eq!(commands, vec![CaptureCommand::CancelDraw]);
        assert_eq!(c.state().mode, GestureMode::Suppressed);

        // Moving the pen afterwards must not restart drawing.
        let commands = c.handle_event(ContactEvent::Move {
            contact: Contact::pen(1, at(5.0, 5.0), 0.5),
            coalesced: Vec::new(),
        });
        assert!(commands.is_empty());
    }

    #[test]
    fn test_second_finger_keeps_navigating() {
        let mut c = classifier();
        let commands = c.handle_event(ContactEvent::Down(Contact::touch(1, at(0.0, 0.0))));
        assert_eq!(commands, vec![CaptureCommand::BeginNavigate]);

        let commands = c.handle_event(ContactEvent::Down(Contact::touch(2, at(10.0, 0.0))));
        assert!(commands.is_empty());
        assert_eq!(c.state().mode, GestureMode::Navigating);
    }

    #[test]
    fn test_pen_lift_leaves_fingers_navigating() {
        let mut c = classifier();
        c.handle_event(ContactEvent::Down(Contact::pen(1, at(0.0, 0.0), 0.5)));
        c.handle_event(ContactEvent::Down(Contact::touch(2, at(5.0, 5.0))));
        let commands = c.handle_event(ContactEvent::Up(Contact::pen(1, at(0.0, 0.0), 0.5)));

        assert_eq!(commands, vec![CaptureCommand::BeginNavigate]);
        assert_eq!(c.state().mode, GestureMode::Navigating);
    }

    #[test]
    fn test_pointer_cancel_discards_stroke() {
        let mut c = classifier();
        c.handle_event(ContactEvent::Down(Contact::mouse(1, at(0.0, 0.0))));
        let commands = c.handle_event(ContactEvent::Cancel(1));
        assert_eq!(commands, vec![CaptureCommand::CancelDraw]);
        assert_eq!(c.state().mode, GestureMode::Idle);
    }

    #[test]
    fn test_reset_reports_drawing() {
        let mut c = classifier();
        c.handle_event(ContactEvent::Down(Contact::pen(1, at(0.0, 0.0), 0.5)));
        assert!(c.reset());
        assert_eq!(c.contact_count(), 0);
        assert!(!c.reset());
    }
}
