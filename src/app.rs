// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait, wiring the track store to the UI components and
//! turning UI actions back into store mutations.

use crate::io::stack::{self, LoadedMedia};
use crate::models::store::{StoreEvent, TrackStore};
use crate::ui::{canvas, timeline, track_panel};
use crate::util::intensity;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};

/// Accumulated right-drag motion that has not yet moved the display range.
///
/// Per-frame drag deltas are fractions of a pixel-per-step, so they are
/// summed until they amount to a whole step, then the remainder resets.
/// The horizontal axis drives vmin, the vertical axis vmax.
#[derive(Default)]
struct RangeDrag {
    acc_x: f32,
    acc_y: f32,
}

/// Main application state.
pub struct MantisApp {
    /// The annotation session
    store: TrackStore,

    /// Store notifications, drained every update
    events: Receiver<StoreEvent>,

    /// Texture of the current frame with the display range applied
    frame_texture: Option<egui::TextureHandle>,

    /// Set when the frame texture no longer matches the store
    texture_dirty: bool,

    /// Receiver for background media loading
    media_loader: Option<Receiver<Result<LoadedMedia, String>>>,

    /// Loading state message
    loading_message: Option<String>,

    /// In-progress display range gesture
    range_drag: Option<RangeDrag>,
}

impl Default for MantisApp {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MantisApp {
    /// Create a new MANTIS application instance, optionally loading a
    /// recording right away.
    pub fn new(initial_video: Option<PathBuf>) -> Self {
        let mut store = TrackStore::new();
        let events = store.subscribe();
        let mut app = Self {
            store,
            events,
            frame_texture: None,
            texture_dirty: false,
            media_loader: None,
            loading_message: None,
            range_drag: None,
        };
        // The window is not open yet, so the startup load is synchronous.
        if let Some(path) = initial_video {
            if let Err(e) = app.store.load_video(&path) {
                log::error!("Failed to open {}: {}", path.display(), e);
            }
        }
        app
    }

    /// Decode a recording on a background thread; the result is installed
    /// from `update` once it arrives.
    fn start_load(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.media_loader = Some(receiver);
        self.loading_message = Some(format!("Loading {}...", path.display()));

        std::thread::spawn(move || {
            let result =
                stack::load_media(&path).map_err(|e| format!("Failed to load video: {}", e));
            let _ = sender.send(result);
        });
    }

    fn open_file_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("TIFF stacks", &["tif", "tiff"])
            .pick_file()
        {
            // Reloading the currently open recording is a no-op.
            if self.store.video_path() == Some(path.as_path()) {
                return;
            }
            self.start_load(path);
        }
    }

    fn step_frame(&mut self, forward: bool) {
        if !self.store.is_loaded() {
            return;
        }
        let frame = self.store.current_frame();
        let next = if forward {
            if frame + 1 >= self.store.num_frames() {
                return;
            }
            frame + 1
        } else {
            if frame == 0 {
                return;
            }
            frame - 1
        };
        if let Err(e) = self.store.set_current_frame(next) {
            log::error!("Failed to save tracks: {}", e);
        }
    }

    fn apply_range_drag(&mut self, delta: egui::Vec2, region: egui::Vec2) {
        let drag = self.range_drag.get_or_insert_with(RangeDrag::default);
        drag.acc_x += delta.x;
        drag.acc_y += delta.y;

        // A collapsed region saturates the division, so cap steps at one
        // full sweep of the range.
        let step_x = (255.0 * drag.acc_x / region.x).round().clamp(-255.0, 255.0);
        if step_x.abs() >= 1.0 {
            self.store.set_vmin(self.store.vmin() + step_x as i32);
            drag.acc_x = 0.0;
        }
        let step_y = (255.0 * drag.acc_y / region.y).round().clamp(-255.0, 255.0);
        if step_y.abs() >= 1.0 {
            // Screen y grows downward, so dragging up raises vmax.
            self.store.set_vmax(self.store.vmax() - step_y as i32);
            drag.acc_y = 0.0;
        }
    }

    /// Rebuild the frame texture from the store if it went stale.
    fn refresh_texture(&mut self, ctx: &egui::Context) {
        if !self.texture_dirty {
            return;
        }
        self.texture_dirty = false;

        let Some(video) = self.store.video() else {
            self.frame_texture = None;
            return;
        };
        let Some(pixels) = self.store.frame_pixels() else {
            self.frame_texture = None;
            return;
        };

        let windowed = intensity::apply_window(pixels, self.store.vmin(), self.store.vmax());
        let size = [video.width as usize, video.height as usize];
        let image = egui::ColorImage::from_gray(size, &windowed);
        self.frame_texture = Some(ctx.load_texture(
            "current_frame",
            image,
            egui::TextureOptions::LINEAR,
        ));
    }
}

impl eframe::App for MantisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for completed media loading
        if let Some(ref receiver) = self.media_loader {
            if let Ok(result) = receiver.try_recv() {
                self.media_loader = None;
                self.loading_message = None;

                match result {
                    Ok(media) => {
                        let path = media.video_path.clone();
                        match self.store.install_media(media) {
                            Ok(()) => {
                                self.texture_dirty = true;
                                log::info!("Loaded video: {}", path.display());
                            }
                            Err(e) => log::error!("Failed to open {}: {}", path.display(), e),
                        }
                    }
                    Err(e) => {
                        log::error!("{}", e);
                    }
                }
            }
        }

        // Request repaint if still loading (to update spinner)
        if self.loading_message.is_some() {
            ctx.request_repaint();
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Video...").clicked() {
                        self.open_file_dialog();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Help", |ui| {
                    if ui.button("About").clicked() {
                        ui.close_menu();
                    }
                });
            });
        });

        // Handle keyboard shortcuts
        // Only process if no text field is focused
        if !ctx.wants_keyboard_input() {
            if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::O)) {
                self.open_file_dialog();
            }
            if ctx.input(|i| {
                i.key_pressed(egui::Key::ArrowRight) || i.key_pressed(egui::Key::D)
            }) {
                self.step_frame(true);
            }
            if ctx.input(|i| i.key_pressed(egui::Key::ArrowLeft) || i.key_pressed(egui::Key::A)) {
                self.step_frame(false);
            }
            if ctx.input(|i| i.key_pressed(egui::Key::Plus)) && self.store.is_loaded() {
                if let Err(e) = self.store.add_track() {
                    log::error!("Failed to add track: {}", e);
                }
            }
        }

        // Track panel (right side)
        let panel_action = egui::SidePanel::right("tracks")
            .default_width(250.0)
            .show(ctx, |ui| track_panel::show(ui, &self.store))
            .inner;

        match panel_action {
            track_panel::PanelAction::SelectTrack(track) => {
                if let Err(e) = self.store.set_current_track(track) {
                    log::error!("Failed to select track: {}", e);
                }
            }
            track_panel::PanelAction::AddTrack => {
                if let Err(e) = self.store.add_track() {
                    log::error!("Failed to add track: {}", e);
                }
            }
            track_panel::PanelAction::DeleteTrack => {
                if let Err(e) = self.store.delete_track() {
                    log::error!("Failed to delete track: {}", e);
                }
            }
            track_panel::PanelAction::DeleteMark => match self.store.remove_point() {
                Ok(point) => {
                    log::info!("Removed mark at ({:.1}, {:.1})", point.x, point.y);
                }
                Err(e) => log::warn!("{}", e),
            },
            track_panel::PanelAction::None => {}
        }

        // Timeline (bottom)
        let timeline_action = egui::TopBottomPanel::bottom("timeline")
            .show(ctx, |ui| timeline::show(ui, &self.store))
            .inner;

        match timeline_action {
            timeline::TimelineAction::SetFrame(frame) => {
                if let Err(e) = self.store.set_current_frame(frame) {
                    log::error!("Failed to save tracks: {}", e);
                }
            }
            timeline::TimelineAction::NextFrame => self.step_frame(true),
            timeline::TimelineAction::PrevFrame => self.step_frame(false),
            timeline::TimelineAction::OpenFile => self.open_file_dialog(),
            timeline::TimelineAction::None => {}
        }

        // React to store changes before drawing the frame
        for event in self.events.try_iter() {
            match event {
                StoreEvent::FrameChanged(_)
                | StoreEvent::NumFramesChanged(_)
                | StoreEvent::VminChanged(_)
                | StoreEvent::VmaxChanged(_) => self.texture_dirty = true,
                StoreEvent::TrackChanged(_) | StoreEvent::PointsChanged => {}
            }
        }
        self.refresh_texture(ctx);

        // Main canvas (center)
        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                // Show loading overlay if loading
                if let Some(ref message) = self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.spinner();
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new(message)
                                    .size(16.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                        });
                    });
                    canvas::CanvasAction::None
                } else {
                    canvas::show(ui, &self.store, &self.frame_texture)
                }
            })
            .inner;

        // Handle canvas actions
        match canvas_action {
            canvas::CanvasAction::SetPoint(point) => {
                if let Err(e) = self.store.set_point(point.x, point.y) {
                    log::error!("Failed to place mark: {}", e);
                }
            }
            canvas::CanvasAction::RangeDrag { delta, region } => {
                self.apply_range_drag(delta, region);
            }
            canvas::CanvasAction::RangeDragEnd => {
                self.range_drag = None;
            }
            canvas::CanvasAction::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_accumulates_fractional_steps() {
        let mut app = MantisApp::new(None);
        let region = egui::vec2(1020.0, 1020.0);
        app.apply_range_drag(egui::vec2(1.0, 0.0), region);
        assert_eq!(app.store.vmin(), 0);
        app.apply_range_drag(egui::vec2(1.0, 0.0), region);
        assert_eq!(app.store.vmin(), 1);
    }

    #[test]
    fn test_collapsed_drag_region_keeps_range_valid() {
        let mut app = MantisApp::new(None);
        app.apply_range_drag(egui::vec2(40.0, -3.0), egui::vec2(0.0, 0.0));
        assert_eq!((app.store.vmin(), app.store.vmax()), (99, 255));
    }

    #[test]
    fn test_motionless_drag_on_collapsed_region_is_ignored() {
        let mut app = MantisApp::new(None);
        app.apply_range_drag(egui::vec2(0.0, 0.0), egui::vec2(0.0, 0.0));
        assert_eq!((app.store.vmin(), app.store.vmax()), (0, 100));
    }
}
