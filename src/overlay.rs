//! On-screen marker overlay drawn above the displayed photo.

use egui::{Color32, Painter, Pos2, Rect, Response, Stroke, Ui, Vec2};

use crate::input::{self, PressFilter};
use crate::session::{Marker, MarkerColor, Session};

pub const MARKER_DIAMETER: f32 = 20.0;
pub const MARKER_BORDER: f32 = 3.0;
pub const HOVER_SCALE: f32 = 1.5;

pub fn to_color32(color: MarkerColor) -> Color32 {
    let [r, g, b, a] = color.to_rgba_u8();
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Size of the photo drawn at the full available width, keeping its aspect ratio.
pub fn displayed_size((width, height): (u32, u32), available_width: f32) -> Vec2 {
    if width == 0 {
        return Vec2::ZERO;
    }
    let scale = available_width / width as f32;
    egui::vec2(available_width, height as f32 * scale)
}

/// Screen position of `marker` over an image displayed in `rect` (`left: x%`, `top: y%`).
pub fn marker_center(rect: Rect, marker: &Marker) -> Pos2 {
    rect.min + egui::vec2(marker.x / 100.0 * rect.width(), marker.y / 100.0 * rect.height())
}

fn marker_diameter(hovered: bool) -> f32 {
    if hovered {
        MARKER_DIAMETER * HOVER_SCALE
    } else {
        MARKER_DIAMETER
    }
}

/// Clickable area of a marker; it grows together with the hovered marker.
pub fn marker_hit_rect(center: Pos2, hovered: bool) -> Rect {
    Rect::from_center_size(center, Vec2::splat(marker_diameter(hovered)))
}

pub fn paint_marker(painter: &Painter, center: Pos2, color: MarkerColor, hovered: bool) {
    let radius = marker_diameter(hovered) / 2.0;
    // border sits inside the diameter, like a CSS border
    painter.circle(
        center,
        radius - MARKER_BORDER / 2.0,
        to_color32(color),
        Stroke::new(MARKER_BORDER, Color32::WHITE),
    );
}

/// What a press on the photo did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MarkerAction {
    Added(Marker),
    Removed(Marker),
}

/// Draw the markers over the photo shown in `rect` and apply this frame's press.
///
/// Markers are registered after `photo` so they sit on top of it. A press on a marker removes
/// it and never reaches the photo; any other press on the photo adds a marker there.
pub fn marker_layer(
    ui: &mut Ui,
    rect: Rect,
    photo: &Response,
    session: &mut Session,
    presses: &PressFilter,
) -> Option<MarkerAction> {
    let mut pressed = None;
    for marker in session.markers() {
        let center = marker_center(rect, marker);
        let id = ui.id().with(("impact", marker.id));
        let was_hovered = ui.ctx().read_response(id).is_some_and(|r| r.hovered());
        let response = ui
            .interact(marker_hit_rect(center, was_hovered), id, egui::Sense::click())
            .on_hover_cursor(egui::CursorIcon::PointingHand);
        paint_marker(ui.painter(), center, marker.color, response.hovered());
        if presses.press(&response).is_some() {
            // topmost wins when markers overlap
            pressed = Some(marker.id);
        }
    }

    if let Some(id) = pressed {
        return session.remove_marker(id).map(MarkerAction::Removed);
    }
    let press = presses.press(photo)?;
    session
        .add_marker_at(press.pixel(), input::bounding_box(rect))
        .map(MarkerAction::Added)
}
