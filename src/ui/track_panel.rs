// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Side panel for track selection and mark management.
//!
//! Lists every track with the current one selected, buttons to add and
//! delete tracks, and the current track's marks frame by frame.

use crate::models::store::TrackStore;
use crate::models::track::TrackId;

/// Result of panel interaction.
pub enum PanelAction {
    None,
    SelectTrack(TrackId),
    AddTrack,
    DeleteTrack,
    DeleteMark,
}

/// Display the track panel.
pub fn show(ui: &mut egui::Ui, store: &TrackStore) -> PanelAction {
    let mut action = PanelAction::None;

    ui.add_enabled_ui(store.is_loaded(), |ui| {
        ui.heading("Tracks");
        ui.separator();

        egui::ScrollArea::vertical()
            .id_source("track_list")
            .max_height(180.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for track in store.track_ids() {
                    let selected = track == store.current_track();
                    if ui.selectable_label(selected, track.to_string()).clicked() {
                        action = PanelAction::SelectTrack(track);
                    }
                }
            });

        ui.horizontal(|ui| {
            if ui.button("+").clicked() {
                action = PanelAction::AddTrack;
            }
            if ui.button("-").clicked() {
                action = PanelAction::DeleteTrack;
            }
        });

        ui.separator();
        ui.heading("Marks");
        ui.separator();

        egui::ScrollArea::vertical()
            .id_source("mark_list")
            .max_height(ui.available_height() - 36.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                if let Some(points) = store.points_of(store.current_track()) {
                    for (frame, point) in points {
                        ui.label(format!("{}: ({:.1}, {:.1})", frame, point.x, point.y));
                    }
                }
            });

        let has_mark = store
            .current_points()
            .contains_key(&store.current_track());
        if ui
            .add_enabled(has_mark, egui::Button::new("Delete mark at current frame"))
            .clicked()
        {
            action = PanelAction::DeleteMark;
        }
    });

    action
}
