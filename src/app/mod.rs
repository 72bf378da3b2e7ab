use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Vec2};
use tracing::{info, warn};

use crate::pack::{BubbleId, BubbleInput, BubbleLayout, PackConfig};

mod controls;
mod render_utils;
mod view;

/// Interactive viewer for a packed bubble chart.
pub struct BubbleViewerApp {
    inputs: Vec<BubbleInput>,
    state: AppState,
    repack_rx: Option<Receiver<Result<BubbleLayout, String>>>,
}

enum AppState {
    Packing {
        rx: Receiver<Result<BubbleLayout, String>>,
        config: PackConfig,
    },
    Ready(Box<ViewModel>),
    Error { message: String, config: PackConfig },
}

struct ViewModel {
    layout: BubbleLayout,
    config: PackConfig,
    /// Passes run since the layout was built.
    passes_run: usize,
    /// Pass budget left for the animated relaxation.
    live_passes_left: usize,
    last_pass_moves: usize,
    search: String,
    selected: Option<BubbleId>,
    pan: Vec2,
    zoom: f32,
    fit_pending: bool,
    show_centroid: bool,
    show_labels: bool,
}

impl BubbleViewerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        inputs: Vec<BubbleInput>,
        layout: BubbleLayout,
        config: PackConfig,
    ) -> Self {
        Self {
            inputs,
            state: AppState::Ready(Box::new(ViewModel::new(layout, config, config.iterations))),
            repack_rx: None,
        }
    }

    fn spawn_pack(
        inputs: Vec<BubbleInput>,
        config: PackConfig,
    ) -> Receiver<Result<BubbleLayout, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = BubbleLayout::new(inputs, &config)
                .map(|mut layout| {
                    layout.collapse(config.iterations);
                    layout
                })
                .map_err(|error| error.to_string());
            let _ = tx.send(result);
        });

        rx
    }

    fn start_pack(inputs: &[BubbleInput], config: PackConfig) -> AppState {
        AppState::Packing {
            rx: Self::spawn_pack(inputs.to_vec(), config),
            config,
        }
    }
}

/// What the controls asked for during this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
enum PackRequest {
    /// Build and fully relax a new layout in the background.
    Repack(PackConfig),
    /// Rebuild on the grid and relax one pass per frame.
    Animate(PackConfig),
}

impl eframe::App for BubbleViewerApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Packing { rx, config } => {
                if let Ok(result) = rx.try_recv() {
                    let config = *config;
                    transition = Some(match result {
                        Ok(layout) => AppState::Ready(Box::new(ViewModel::new(
                            layout,
                            config,
                            config.iterations,
                        ))),
                        Err(message) => AppState::Error { message, config },
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Packing bubbles...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error { message, config } => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to pack bubbles");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry with defaults").clicked() {
                        let defaults = PackConfig {
                            iterations: config.iterations,
                            ..PackConfig::default()
                        };
                        transition = Some(Self::start_pack(&self.inputs, defaults));
                    }
                });
            }
            AppState::Ready(model) => {
                let is_repacking = self.repack_rx.is_some();
                let request = model.show(ctx, is_repacking);

                match request {
                    Some(PackRequest::Repack(config)) if self.repack_rx.is_none() => {
                        info!(?config, "repacking in background");
                        self.repack_rx = Some(Self::spawn_pack(self.inputs.clone(), config));
                    }
                    Some(PackRequest::Animate(config)) => {
                        match BubbleLayout::new(self.inputs.clone(), &config) {
                            Ok(layout) => {
                                **model = ViewModel::new(layout, config, 0);
                                model.live_passes_left = config.iterations;
                            }
                            Err(error) => {
                                warn!(%error, "cannot animate with these settings");
                                transition = Some(AppState::Error {
                                    message: error.to_string(),
                                    config,
                                });
                            }
                        }
                    }
                    _ => {}
                }

                if let Some(rx) = self.repack_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(layout)) => {
                            let config = layout_config(&layout, model.config.iterations);
                            **model = ViewModel::new(layout, config, config.iterations);
                        }
                        Ok(Err(message)) => {
                            transition = Some(AppState::Error {
                                message,
                                config: model.config,
                            });
                        }
                        Err(TryRecvError::Empty) => {
                            self.repack_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(AppState::Error {
                                message: "Background pack worker disconnected".to_owned(),
                                config: model.config,
                            });
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.repack_rx = None;
            self.state = next_state;
        }
    }
}

fn layout_config(layout: &BubbleLayout, iterations: usize) -> PackConfig {
    PackConfig {
        spacing: layout.spacing(),
        plot_diameter: layout.plot_diameter(),
        iterations,
    }
}

impl ViewModel {
    fn new(layout: BubbleLayout, config: PackConfig, passes_run: usize) -> Self {
        Self {
            layout,
            config,
            passes_run,
            live_passes_left: 0,
            last_pass_moves: 0,
            search: String::new(),
            selected: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            fit_pending: true,
            show_centroid: false,
            show_labels: true,
        }
    }

    fn show(&mut self, ctx: &Context, is_repacking: bool) -> Option<PackRequest> {
        if self.live_passes_left > 0 {
            self.last_pass_moves = self.layout.collapse_pass();
            self.passes_run += 1;
            self.live_passes_left -= 1;
            ctx.request_repaint();
        }

        let request = egui::SidePanel::right("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui, is_repacking))
            .inner;

        egui::CentralPanel::default().show(ctx, |ui| self.draw_bubbles(ui));

        request
    }
}
