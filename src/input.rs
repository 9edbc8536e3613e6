//! Mouse clicks and touch starts reduced to a single kind of press.

use egui::{Pos2, Rect, Response};

use crate::session::{BoundingBox, PixelPoint};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressSource {
    Mouse,
    Touch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Press {
    pub position: Pos2,
    pub source: PressSource,
}

impl Press {
    pub fn pixel(&self) -> PixelPoint {
        PixelPoint {
            x: self.position.x,
            y: self.position.y,
        }
    }
}

pub fn bounding_box(rect: Rect) -> BoundingBox {
    BoundingBox {
        left: rect.min.x,
        top: rect.min.y,
        width: rect.width(),
        height: rect.height(),
    }
}

/// Per-frame view of the pointer, shared by every widget that accepts presses.
///
/// Touches register as soon as the finger lands. egui also reports a click when that finger
/// lifts; that click is swallowed so one tap never counts twice.
#[derive(Debug, Default)]
pub struct PressFilter {
    touch_started: Option<Pos2>,
    swallow_click: bool,
    release_pending: bool,
}

impl PressFilter {
    pub fn begin_frame(&mut self, ctx: &egui::Context) {
        let (touching, pressed, released, pos) = ctx.input(|i| {
            (
                i.any_touches(),
                i.pointer.any_pressed(),
                i.pointer.any_released(),
                i.pointer.interact_pos(),
            )
        });

        // the click belonging to a touch arrives on the release frame, keep swallowing through it
        if self.release_pending {
            self.swallow_click = false;
            self.release_pending = false;
        }

        self.touch_started = if touching && pressed { pos } else { None };
        if self.touch_started.is_some() {
            self.swallow_click = true;
        }
        if released && self.swallow_click {
            self.release_pending = true;
        }
    }

    fn resolve(&self, start: Option<Pos2>, clicked: Option<Pos2>, rect: Rect) -> Option<Press> {
        if let Some(position) = start.filter(|p| rect.contains(*p)) {
            return Some(Press {
                position,
                source: PressSource::Touch,
            });
        }
        if self.swallow_click {
            return None;
        }
        clicked.map(|position| Press {
            position,
            source: PressSource::Mouse,
        })
    }

    /// The press that landed on `response` this frame, if any.
    pub fn press(&self, response: &Response) -> Option<Press> {
        let clicked = if response.clicked() {
            response.interact_pointer_pos()
        } else {
            None
        };
        self.resolve(self.touch_started, clicked, response.interact_rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn rect() -> Rect {
        Rect::from_min_max(pos2(10.0, 20.0), pos2(110.0, 70.0))
    }

    #[test]
    fn test_bounding_box() {
        let bbox = bounding_box(rect());
        assert_eq!(
            bbox,
            BoundingBox {
                left: 10.0,
                top: 20.0,
                width: 100.0,
                height: 50.0
            }
        );
    }

    #[test]
    fn test_mouse_click() {
        let filter = PressFilter::default();
        let press = filter.resolve(None, Some(pos2(30.0, 40.0)), rect()).unwrap();
        assert_eq!(press.source, PressSource::Mouse);
        assert_eq!(press.pixel(), PixelPoint { x: 30.0, y: 40.0 });
    }

    #[test]
    fn test_touch_start_inside_only() {
        let filter = PressFilter::default();
        let press = filter.resolve(Some(pos2(50.0, 50.0)), None, rect()).unwrap();
        assert_eq!(press.source, PressSource::Touch);
        assert!(filter.resolve(Some(pos2(500.0, 50.0)), None, rect()).is_none());
    }

    #[test]
    fn test_click_after_touch_is_swallowed() {
        let filter = PressFilter {
            touch_started: None,
            swallow_click: true,
            release_pending: false,
        };
        assert!(filter.resolve(None, Some(pos2(50.0, 50.0)), rect()).is_none());
    }

    #[test]
    fn test_nothing_pressed() {
        let filter = PressFilter::default();
        assert!(filter.resolve(None, None, rect()).is_none());
    }
}
