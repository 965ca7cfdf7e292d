use crate::color::Argb;
use crate::gradient::{unit_for_offset, ColorGradient};

/// Layout of the wheel inside its view, in view pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelGeometry {
    pub center_x: f32,
    pub center_y: f32,
    /// Width of the gradient ring.
    pub stroke_width: f32,
    /// Radius of the swatch showing the last chosen color.
    pub swatch_radius: f32,
}

impl Default for WheelGeometry {
    fn default() -> Self {
        Self {
            center_x: 100.0,
            center_y: 100.0,
            stroke_width: 32.0,
            swatch_radius: 32.0,
        }
    }
}

impl WheelGeometry {
    /// Width and height of the view hosting the wheel.
    pub fn view_size(&self) -> (f32, f32) {
        (self.center_x * 2.0, self.center_y * 2.0)
    }

    /// Radius of the ring's center line.
    pub fn ring_radius(&self) -> f32 {
        self.center_x - self.stroke_width * 0.5
    }

    pub fn to_center_relative(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.center_x, y - self.center_y)
    }

    /// Where the indicator dot sits on the ring for `angle` (radians).
    pub fn indicator_position(&self, angle: f32) -> (f32, f32) {
        let radius = self.ring_radius();
        (
            self.center_x + radius * angle.cos(),
            self.center_y + radius * angle.sin(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
}

/// A pointer event in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub x: f32,
    pub y: f32,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, x: f32, y: f32) -> Self {
        Self { phase, x, y }
    }
}

/// How the hosting dialog was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Confirmed,
    Cancelled,
}

/// Turns touches around a hue wheel into colors.
///
/// Every pick is reported to `on_change` and remembered as the swatch color.
pub struct ColorWheelPicker<F>
where
    F: FnMut(Argb),
{
    gradient: ColorGradient,
    geometry: WheelGeometry,
    on_change: F,
    color: Argb,
    indicator_angle: Option<f32>,
    redraw_requested: bool,
}

impl<F> ColorWheelPicker<F>
where
    F: FnMut(Argb),
{
    pub fn new(initial: Argb, on_change: F) -> Self {
        Self {
            gradient: ColorGradient::hue_wheel(),
            geometry: WheelGeometry::default(),
            on_change,
            color: initial,
            indicator_angle: None,
            redraw_requested: true,
        }
    }

    pub fn with_geometry(mut self, geometry: WheelGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn geometry(&self) -> &WheelGeometry {
        &self.geometry
    }

    pub fn gradient(&self) -> &ColorGradient {
        &self.gradient
    }

    /// Last chosen color, drawn in the center swatch.
    pub fn color(&self) -> Argb {
        self.color
    }

    pub fn indicator_angle(&self) -> Option<f32> {
        self.indicator_angle
    }

    /// Picks the color under a point given relative to the wheel center.
    pub fn pick_at(&mut self, dx: f32, dy: f32) -> Argb {
        let unit = unit_for_offset(dx, dy);
        let color = self.gradient.interpolate(unit);
        tracing::trace!(dx, dy, unit, %color, "picked wheel color");

        self.color = color;
        self.indicator_angle = Some(dy.atan2(dx));
        self.redraw_requested = true;
        (self.on_change)(color);
        color
    }

    /// Handles a pointer event in view coordinates. Only drags pick a color;
    /// every event is reported as consumed.
    pub fn handle_touch(&mut self, event: TouchEvent) -> bool {
        if event.phase == TouchPhase::Move {
            let (dx, dy) = self.geometry.to_center_relative(event.x, event.y);
            self.pick_at(dx, dy);
        }
        true
    }

    /// Returns whether a redraw was requested since the last call.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// Consumes the picker when its dialog closes; only a confirmed dialog
    /// yields a color to persist.
    pub fn finish(self, outcome: DialogOutcome) -> Option<Argb> {
        match outcome {
            DialogOutcome::Confirmed => Some(self.color),
            DialogOutcome::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::gradient::HUE_WHEEL;

    #[test]
    fn pick_reports_color_to_callback() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut picker = ColorWheelPicker::new(Argb::new(0xFFFF_FFFF), move |color| {
            sink.borrow_mut().push(color)
        });

        let color = picker.pick_at(-10.0, 0.0);
        assert_eq!(color, HUE_WHEEL[4]);
        assert_eq!(picker.color(), HUE_WHEEL[4]);
        assert_eq!(seen.borrow().as_slice(), &[HUE_WHEEL[4]]);
        let angle = picker.indicator_angle().expect("indicator set");
        assert!((angle - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn redraw_requests_are_taken_once() {
        let mut picker = ColorWheelPicker::new(Argb::default(), |_| {});
        assert!(picker.take_redraw_request());
        assert!(!picker.take_redraw_request());
        picker.pick_at(0.0, 5.0);
        assert!(picker.take_redraw_request());
        assert!(!picker.take_redraw_request());
    }

    #[test]
    fn only_move_events_pick() {
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let mut picker =
            ColorWheelPicker::new(Argb::new(0xFF12_3456), move |_| *counter.borrow_mut() += 1);

        assert!(picker.handle_touch(TouchEvent::new(TouchPhase::Down, 0.0, 100.0)));
        assert!(picker.handle_touch(TouchEvent::new(TouchPhase::Up, 0.0, 100.0)));
        assert_eq!(*count.borrow(), 0);
        assert_eq!(picker.color(), Argb::new(0xFF12_3456));

        // Directly below the center in view coordinates: a quarter turn.
        picker.handle_touch(TouchEvent::new(TouchPhase::Move, 100.0, 180.0));
        assert_eq!(*count.borrow(), 1);
        assert_eq!(picker.color(), HUE_WHEEL[2]);
    }

    #[test]
    fn cancelled_dialog_discards_choice() {
        let mut picker = ColorWheelPicker::new(Argb::default(), |_| {});
        picker.pick_at(1.0, 0.0);
        assert_eq!(picker.finish(DialogOutcome::Cancelled), None);

        let mut picker = ColorWheelPicker::new(Argb::default(), |_| {});
        picker.pick_at(-1.0, 0.0);
        assert_eq!(picker.finish(DialogOutcome::Confirmed), Some(HUE_WHEEL[4]));
    }

    #[test]
    fn geometry_matches_dialog_layout() {
        let geometry = WheelGeometry::default();
        assert_eq!(geometry.view_size(), (200.0, 200.0));
        assert_eq!(geometry.ring_radius(), 84.0);
        let (x, y) = geometry.indicator_position(0.0);
        assert!((x - 184.0).abs() < 1e-4);
        assert!((y - 100.0).abs() < 1e-4);
    }
}
