use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2, vec2};

use crate::pack::{OCCUPANCY_FRACTION, Point};

pub(super) const MIN_ZOOM: f32 = 0.05;
pub(super) const MAX_ZOOM: f32 = 20.0;

const BACKDROP: Color32 = Color32::from_rgb(19, 23, 29);
const PLOT_DISK: Color32 = Color32::from_rgb(25, 31, 40);

/// How a bubble stands out from the rest of the chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Emphasis {
    Plain,
    Hovered,
    Selected,
    Matched,
    Faded,
}

pub(super) fn bubble_fill(base: Color32, emphasis: Emphasis) -> Color32 {
    match emphasis {
        Emphasis::Plain => base,
        Emphasis::Hovered => Color32::from_rgb(255, 164, 101),
        Emphasis::Selected => base.lerp_to_gamma(Color32::from_rgb(245, 206, 93), 0.75),
        Emphasis::Matched => base.lerp_to_gamma(Color32::from_rgb(103, 196, 255), 0.68),
        Emphasis::Faded => base.gamma_multiply(0.38),
    }
}

pub(super) fn outline_width(emphasis: Emphasis) -> f32 {
    match emphasis {
        Emphasis::Selected => 2.2,
        Emphasis::Hovered => 1.6,
        _ => 1.0,
    }
}

/// Fills the canvas and outlines the enclosing plot disk around `center`,
/// plus the smaller ring whose area equals the combined bubble area.
pub(super) fn draw_plot_backdrop(painter: &Painter, rect: Rect, center: Pos2, plot_radius: f32) {
    painter.rect_filled(rect, 0.0, BACKDROP);
    painter.circle_filled(center, plot_radius, PLOT_DISK);
    painter.circle_stroke(
        center,
        plot_radius,
        Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 140)),
    );
    painter.circle_stroke(
        center,
        plot_radius * OCCUPANCY_FRACTION.sqrt() as f32,
        Stroke::new(1.0, Color32::from_rgba_unmultiplied(90, 110, 130, 90)),
    );
}

/// Chart space is y-up and centred on `origin`; screen space is y-down.
pub(super) fn world_to_screen(
    rect: Rect,
    pan: Vec2,
    zoom: f32,
    origin: Point,
    world: Point,
) -> Pos2 {
    let offset = vec2((world.x - origin.x) as f32, -(world.y - origin.y) as f32);
    rect.center() + pan + offset * zoom
}

/// Zoom that fits a square of `extent` chart units inside `rect` with a small margin.
pub(super) fn fit_zoom(rect: Rect, extent: f64) -> f32 {
    let extent = extent.max(1.0) as f32;
    (rect.width().min(rect.height()) * 0.92 / extent).clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Blue for light absence, orange for heavy, by position between `min` and `max`.
pub(super) fn weight_color(weight: f64, min: f64, max: f64) -> Color32 {
    let t = if max - min > f64::EPSILON {
        ((weight - min) / (max - min)).clamp(0.0, 1.0) as f32
    } else {
        0.5
    };
    let r = (55.0 + (190.0 * t)) as u8;
    let g = (150.0 - (70.0 * t)) as u8;
    let b = (215.0 - (155.0 * t)) as u8;
    Color32::from_rgb(r, g, b)
}
