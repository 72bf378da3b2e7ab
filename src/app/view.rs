use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, vec2};
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::util::{format_weight, initials};

use super::ViewModel;
use super::controls::label_matches;
use super::render_utils::{
    Emphasis, MAX_ZOOM, MIN_ZOOM, bubble_fill, draw_plot_backdrop, fit_zoom, outline_width,
    weight_color, world_to_screen,
};

impl ViewModel {
    /// Scroll and pinch zoom, keeping the chart point under the pointer fixed.
    fn handle_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let (scroll, pinch, pointer) = ui.input(|input| {
            (
                input.raw_scroll_delta.y,
                input.zoom_delta(),
                input.pointer.hover_pos(),
            )
        });
        let factor = if (pinch - 1.0).abs() > f32::EPSILON {
            pinch
        } else {
            (scroll * 0.0018).exp()
        };
        if (factor - 1.0).abs() <= f32::EPSILON {
            return;
        }

        let zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let anchor = pointer.unwrap_or_else(|| rect.center()) - rect.center();
        self.pan = anchor - (anchor - self.pan) * (zoom / self.zoom);
        self.zoom = zoom;
    }

    fn handle_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Primary)
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
        if response.double_clicked() {
            self.fit_pending = true;
        }
    }

    fn fit_to_view(&mut self, rect: Rect) {
        let table = self.layout.to_table();
        let extent = table
            .bounds()
            .map(|(min, max)| {
                let centroid = self.layout.centroid();
                let half_x = (max.0 - centroid.x).max(centroid.x - min.0);
                let half_y = (max.1 - centroid.y).max(centroid.y - min.1);
                half_x.max(half_y) * 2.0
            })
            .unwrap_or(self.layout.plot_diameter());
        self.zoom = fit_zoom(rect, extent);
        self.pan = egui::Vec2::ZERO;
        self.fit_pending = false;
    }

    pub(super) fn draw_bubbles(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        if self.fit_pending {
            self.fit_to_view(rect);
        }

        self.handle_zoom(ui, rect, &response);
        self.handle_pan(&response);

        let origin = self.layout.centroid();
        draw_plot_backdrop(
            &painter,
            rect,
            world_to_screen(rect, self.pan, self.zoom, origin, origin),
            self.layout.plot_radius() as f32 * self.zoom,
        );
        let bubbles = self.layout.bubbles();
        let (min_weight, max_weight) = bubbles.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), bubble| (min.min(bubble.weight), max.max(bubble.weight)),
        );

        let screen = bubbles
            .iter()
            .map(|bubble| {
                (
                    world_to_screen(rect, self.pan, self.zoom, origin, bubble.position),
                    bubble.radius as f32 * self.zoom,
                )
            })
            .collect::<Vec<_>>();

        let pointer = ui.input(|input| input.pointer.hover_pos());
        let hovered = pointer.and_then(|pointer| {
            screen
                .iter()
                .enumerate()
                .filter(|(_, (center, radius))| center.distance(pointer) <= *radius)
                .min_by(|a, b| a.1.0.distance(pointer).total_cmp(&b.1.0.distance(pointer)))
                .map(|(index, _)| index)
        });

        let matcher = SkimMatcherV2::default();
        let query = self.search.trim();
        let searching = !query.is_empty();

        for (index, bubble) in bubbles.iter().enumerate() {
            let (center, radius) = screen[index];
            if !rect.expand(radius).contains(center) {
                continue;
            }

            let is_selected = self.selected == Some(bubble.id);
            let is_hovered = hovered == Some(index);
            let is_match = searching && label_matches(&matcher, &bubble.label, query);

            let emphasis = if is_hovered {
                Emphasis::Hovered
            } else if is_selected {
                Emphasis::Selected
            } else if is_match {
                Emphasis::Matched
            } else if searching {
                Emphasis::Faded
            } else {
                Emphasis::Plain
            };

            let base = weight_color(bubble.weight, min_weight, max_weight);
            painter.circle_filled(center, radius, bubble_fill(base, emphasis));
            painter.circle_stroke(
                center,
                radius,
                Stroke::new(
                    outline_width(emphasis),
                    Color32::from_rgba_unmultiplied(15, 15, 15, 190),
                ),
            );

            if self.show_labels && radius > 9.0 {
                painter.text(
                    center,
                    Align2::CENTER_CENTER,
                    initials(&bubble.label),
                    FontId::proportional((radius * 0.7).min(28.0)),
                    Color32::from_gray(238),
                );
            }
        }

        if self.show_centroid {
            let center = world_to_screen(rect, self.pan, self.zoom, origin, origin);
            let stroke = Stroke::new(1.5, Color32::from_rgb(240, 240, 240));
            painter.line_segment([center - vec2(6.0, 0.0), center + vec2(6.0, 0.0)], stroke);
            painter.line_segment([center - vec2(0.0, 6.0), center + vec2(0.0, 6.0)], stroke);
        }

        if let Some(index) = hovered {
            let bubble = &bubbles[index];
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!("{}  |  {}", bubble.label, format_weight(bubble.weight)),
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            let clicked = hovered.map(|index| bubbles[index].id);
            self.selected = if clicked == self.selected { None } else { clicked };
        }
    }
}
