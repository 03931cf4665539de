// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for frame display and mark placement.
//!
//! This module provides the main canvas area where the current frame is
//! shown aspect-fit and marks are placed with the mouse. A left click
//! records the current track's position on this frame; dragging with the
//! right button held adjusts the display range.

use crate::models::store::TrackStore;
use crate::models::track::Point;
use crate::util::geometry;

/// Result of canvas interaction.
pub enum CanvasAction {
    None,
    /// Left click at this image pixel position.
    SetPoint(Point),
    /// Right-drag movement, in display pixels, over a region of this size.
    RangeDrag { delta: egui::Vec2, region: egui::Vec2 },
    RangeDragEnd,
}

/// Display the main canvas area and handle mouse interactions.
pub fn show(
    ui: &mut egui::Ui,
    store: &TrackStore,
    frame_texture: &Option<egui::TextureHandle>,
) -> CanvasAction {
    let mut action = CanvasAction::None;
    // Set background color
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    // Status line above the image, where the original plot title sat.
    ui.horizontal(|ui| {
        if store.is_loaded() {
            ui.label(format!("vmin: {}, vmax: {}", store.vmin(), store.vmax()));
            ui.separator();
            ui.label(format!(
                "Frame {} / {}",
                store.current_frame(),
                store.num_frames().saturating_sub(1)
            ));
            if let Some(path) = store.video_path() {
                ui.separator();
                ui.label(path.display().to_string());
            }
        } else {
            ui.label("No file loaded");
        }
    });
    ui.separator();

    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        if let (Some(texture), Some(video)) = (frame_texture, store.video()) {
            // Scale the frame to fit the available space
            let available = ui.available_size();
            let (display_width, display_height) =
                geometry::fit_size(video.width, video.height, available.x, available.y);

            // Center the image
            let x_offset = (available.x - display_width) / 2.0;
            let y_offset = (available.y - display_height) / 2.0;

            let image_rect = egui::Rect::from_min_size(
                ui.min_rect().min + egui::vec2(x_offset, y_offset),
                egui::vec2(display_width, display_height),
            );

            // Draw the frame
            ui.painter().image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );

            let response = ui.allocate_rect(image_rect, egui::Sense::click_and_drag());

            if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    if image_rect.contains(pos) {
                        let point = geometry::display_to_image(
                            pos.x - image_rect.min.x,
                            pos.y - image_rect.min.y,
                            display_width,
                            display_height,
                            video.width,
                            video.height,
                        );
                        action = CanvasAction::SetPoint(point);
                    }
                }
            }

            if response.dragged_by(egui::PointerButton::Secondary) {
                action = CanvasAction::RangeDrag {
                    delta: response.drag_delta(),
                    region: image_rect.size(),
                };
            }
            if response.drag_stopped_by(egui::PointerButton::Secondary) {
                action = CanvasAction::RangeDragEnd;
            }

            draw_marks(ui.painter(), store, &image_rect, video.width, video.height);
        } else if store.is_loaded() {
            // Video installed but the frame texture is not built yet
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new("Preparing frame...").color(egui::Color32::WHITE));
            });
        } else {
            // Show welcome message when no file is loaded
            ui.centered_and_justified(|ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(20.0);
                    ui.heading(
                        egui::RichText::new("MANTIS")
                            .size(32.0)
                            .color(egui::Color32::from_gray(200)),
                    );
                    ui.label(
                        egui::RichText::new("Manual Tracking In Stacks")
                            .size(14.0)
                            .color(egui::Color32::from_gray(150)),
                    );
                    ui.add_space(20.0);
                    ui.label(
                        egui::RichText::new("Open a recording to begin tracking")
                            .color(egui::Color32::from_gray(180)),
                    );
                    ui.add_space(10.0);
                    ui.label(
                        egui::RichText::new("File → Open Video... (Ctrl+O)")
                            .weak()
                            .color(egui::Color32::from_gray(130)),
                    );
                });
            });
        }
    });

    action
}

/// Marker colors follow the original plot: the selected track's mark is
/// warm, every other track's mark is cold.
const CURRENT_MARK: egui::Color32 = egui::Color32::from_rgb(255, 99, 71); // tomato
const OTHER_MARK: egui::Color32 = egui::Color32::from_rgb(0, 0, 128); // navy

const MARK_RADIUS: f32 = 6.0;

/// Draw hollow circles for every mark on the current frame, the current
/// track's on top.
fn draw_marks(
    painter: &egui::Painter,
    store: &TrackStore,
    image_rect: &egui::Rect,
    img_width: u32,
    img_height: u32,
) {
    let points = store.current_points();
    let current_track = store.current_track();

    let to_screen = |point: Point| {
        let (x, y) = geometry::image_to_display(
            point,
            image_rect.width(),
            image_rect.height(),
            img_width,
            img_height,
        );
        image_rect.min + egui::vec2(x, y)
    };

    for (_, &point) in points.iter().filter(|&(&track, _)| track != current_track) {
        painter.circle_stroke(to_screen(point), MARK_RADIUS, egui::Stroke::new(2.0, OTHER_MARK));
    }
    if let Some(&point) = points.get(&current_track) {
        painter.circle_stroke(
            to_screen(point),
            MARK_RADIUS,
            egui::Stroke::new(2.0, CURRENT_MARK),
        );
    }
}
