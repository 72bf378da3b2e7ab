use eframe::egui::{self, Align, Layout, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::pack::BubbleId;
use crate::util::format_weight;

use super::{PackRequest, ViewModel};

const MEMBER_LIST_ROWS: usize = 40;

pub(super) fn label_matches(matcher: &SkimMatcherV2, label: &str, query: &str) -> bool {
    matcher.fuzzy_match(label, query).is_some()
        || matcher
            .fuzzy_match(&label.to_lowercase(), &query.to_lowercase())
            .is_some()
}

impl ViewModel {
    pub(super) fn draw_controls(
        &mut self,
        ui: &mut Ui,
        is_repacking: bool,
    ) -> Option<PackRequest> {
        let mut request = None;

        ui.heading("Bubble layout");
        ui.add_space(4.0);
        ui.label(format!("{} members", self.layout.len()));
        ui.label(format!("Passes run: {}", self.passes_run));
        ui.label(format!("Step distance: {:.3}", self.layout.step_distance()));
        ui.label(format!("Moves in last pass: {}", self.last_pass_moves));
        let overlaps = self.layout.overlapping_pairs();
        if overlaps > 0 {
            ui.colored_label(
                egui::Color32::from_rgb(240, 120, 90),
                format!("Overlapping pairs: {overlaps}"),
            );
        } else {
            ui.label("No overlapping pairs");
        }

        ui.separator();
        ui.add(
            egui::Slider::new(&mut self.config.spacing, 0.0..=20.0)
                .text("Spacing")
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text("Minimum gap kept between bubble outlines.");
        ui.add(
            egui::Slider::new(&mut self.config.plot_diameter, 100.0..=2000.0)
                .step_by(10.0)
                .text("Plot diameter")
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text("Figure size the bubble areas are scaled against.");
        ui.add(
            egui::Slider::new(&mut self.config.iterations, 0..=500)
                .text("Iterations")
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text("Relaxation passes toward the centroid.");

        ui.horizontal(|ui| {
            let repack_label = if is_repacking { "Packing..." } else { "Repack" };
            if ui
                .add_enabled(!is_repacking, egui::Button::new(repack_label))
                .clicked()
            {
                request = Some(PackRequest::Repack(self.config));
            }
            if ui.button("Animate").clicked() {
                request = Some(PackRequest::Animate(self.config));
            }
            if ui.button("Fit view").clicked() {
                self.fit_pending = true;
            }
        });

        if self.live_passes_left > 0 {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(format!("{} passes left", self.live_passes_left));
                if ui.button("Stop").clicked() {
                    self.live_passes_left = 0;
                }
            });
        }

        ui.checkbox(&mut self.show_labels, "Show initials");
        ui.checkbox(&mut self.show_centroid, "Show centroid");

        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Search");
            ui.text_edit_singleline(&mut self.search);
        });

        let matcher = SkimMatcherV2::default();
        let query = self.search.trim();
        let mut members = self
            .layout
            .bubbles()
            .iter()
            .filter(|bubble| query.is_empty() || label_matches(&matcher, &bubble.label, query))
            .map(|bubble| (bubble.id, bubble.label.as_str(), bubble.weight))
            .collect::<Vec<_>>();
        members.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

        let mut clicked: Option<BubbleId> = None;
        egui::ScrollArea::vertical()
            .max_height(ui.available_height() - 90.0)
            .show(ui, |ui| {
                for &(id, label, weight) in members.iter().take(MEMBER_LIST_ROWS) {
                    ui.horizontal(|ui| {
                        let is_selected = self.selected == Some(id);
                        if ui.selectable_label(is_selected, label).clicked() {
                            clicked = Some(id);
                        }
                        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                            ui.label(format_weight(weight));
                        });
                    });
                }
                if members.len() > MEMBER_LIST_ROWS {
                    ui.small(format!("{} more", members.len() - MEMBER_LIST_ROWS));
                }
            });

        if let Some(id) = clicked {
            self.selected = if self.selected == Some(id) { None } else { Some(id) };
        }

        if let Some(bubble) = self.selected.and_then(|id| self.layout.bubble(id)) {
            ui.separator();
            ui.strong(bubble.label.as_str());
            ui.label(format!("Weight: {}", format_weight(bubble.weight)));
            ui.label(format!("Radius: {:.2}", bubble.radius));
            ui.label(format!(
                "Position: ({:.1}, {:.1})",
                bubble.position.x, bubble.position.y
            ));
        }

        request
    }
}
