// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video timeline scrubber control.
//!
//! A single row along the bottom: previous/next buttons, the current
//! frame number, a slider over the whole stack, and the open button.

use crate::models::store::TrackStore;
use crate::models::track::FrameIndex;

/// Result of timeline interaction.
pub enum TimelineAction {
    None,
    SetFrame(FrameIndex),
    PrevFrame,
    NextFrame,
    OpenFile,
}

/// Display the timeline row.
pub fn show(ui: &mut egui::Ui, store: &TrackStore) -> TimelineAction {
    let mut action = TimelineAction::None;
    let loaded = store.is_loaded();
    let last = store.num_frames().saturating_sub(1);

    ui.horizontal(|ui| {
        if ui.add_enabled(loaded, egui::Button::new("<-")).clicked() {
            action = TimelineAction::PrevFrame;
        }
        ui.label(format!("Frame: {}", store.current_frame()));

        // Let the slider take the row, minus room for the remaining widgets.
        ui.spacing_mut().slider_width = (ui.available_width() - 120.0).max(40.0);
        let mut frame = store.current_frame();
        let slider = ui.add_enabled(
            loaded,
            egui::Slider::new(&mut frame, 0..=last).show_value(false),
        );
        if slider.changed() {
            action = TimelineAction::SetFrame(frame);
        }

        if ui.add_enabled(loaded, egui::Button::new("->")).clicked() {
            action = TimelineAction::NextFrame;
        }
        if ui.button("Open").clicked() {
            action = TimelineAction::OpenFile;
        }
    });

    action
}
