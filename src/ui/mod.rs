use std::time::Duration;

use eframe::egui;

use crate::pattern::{Pattern, STEP_COUNT};
use crate::sequencer::MidiSequencer;
use crate::transport::{PlaybackState, Transport};

pub const WINDOW_TITLE: &str = "Cyber BeatBox";

pub struct BeatBoxApp {
    transport: Transport<MidiSequencer>,
    pattern: Pattern,
    error_message: Option<String>,
}

impl BeatBoxApp {
    pub fn new(transport: Transport<MidiSequencer>, error_message: Option<String>) -> Self {
        Self {
            transport,
            pattern: Pattern::new(),
            error_message,
        }
    }

    fn transport_controls(&mut self, ui: &mut egui::Ui) {
        ui.vertical(|ui| {
            if ui.button("Start").clicked() {
                self.transport.start(&self.pattern);
            }
            if ui.button("Stop").clicked() {
                self.transport.stop();
            }
            if ui.button("Tempo Up").clicked() {
                self.transport.tempo_up();
            }
            if ui.button("Tempo Down").clicked() {
                self.transport.tempo_down();
            }

            ui.separator();

            if ui.button("Clear").clicked() {
                self.pattern.clear();
            }
        });
    }

    fn pattern_grid(&mut self, ui: &mut egui::Ui) {
        let playhead = match self.transport.state() {
            PlaybackState::Playing => self.transport.position(),
            PlaybackState::Stopped => None,
        };

        egui::Grid::new("pattern_grid")
            .spacing([2.0, 1.0])
            .show(ui, |ui| {
                ui.label("");
                for step in 0..STEP_COUNT {
                    let text = egui::RichText::new(format!("{}", step + 1)).small();
                    let text = if playhead == Some(step as u64) {
                        text.strong().color(egui::Color32::from_rgb(60, 180, 100))
                    } else {
                        text
                    };
                    ui.label(text);
                }
                ui.end_row();

                let names: Vec<String> = self
                    .transport
                    .kit()
                    .iter()
                    .map(|i| i.name.clone())
                    .collect();

                for (row, name) in names.iter().enumerate() {
                    ui.label(name);
                    for step in 0..STEP_COUNT {
                        let mut active = self.pattern.is_active(row, step);
                        if ui.checkbox(&mut active, "").changed() {
                            self.pattern.set(row, step, active);
                        }
                    }
                    ui.end_row();
                }
            });
    }

    fn status_line(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if !self.transport.is_available() {
                ui.colored_label(egui::Color32::RED, "MIDI output unavailable");
                return;
            }

            let state = match self.transport.state() {
                PlaybackState::Playing => "Playing",
                PlaybackState::Stopped => "Stopped",
            };
            ui.label(state);
            ui.separator();

            if let (Some(bpm), Some(factor)) =
                (self.transport.tempo_in_bpm(), self.transport.tempo_factor())
            {
                ui.label(format!("Tempo: {:.1} BPM (x{:.4})", bpm * factor, factor));
            }
            ui.separator();
            ui.label(format!("Steps on: {}", self.pattern.active_count()));
        });
    }
}

impl eframe::App for BeatBoxApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(ref error) = self.error_message {
            egui::TopBottomPanel::top("error").show(ctx, |ui| {
                ui.colored_label(egui::Color32::RED, error);
            });
        }

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.status_line(ui);
        });

        egui::SidePanel::right("transport")
            .resizable(false)
            .show(ctx, |ui| {
                self.transport_controls(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.pattern_grid(ui);
        });

        if self.transport.state() == PlaybackState::Playing {
            ctx.request_repaint_after(Duration::from_millis(30));
        }
    }
}
