// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Session state around the track aggregate.
//!
//! `TrackStore` owns the loaded recording, the cursor (current frame and
//! current track), the display range, and the sidecar persistence policy.
//! Mutations notify subscribers through a channel per subscriber, so UI
//! code can react without the store knowing about widgets.
//!
//! Persistence is deliberately uneven, matching the sidecar's history:
//! frame navigation and track creation/deletion write the sidecar, while
//! point edits and track selection only live in memory until the next
//! write. Marks placed while stepping through a video are on disk within
//! a keypress, without a write per click.

use anyhow::Result;
use image::GrayImage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::io::sidecar;
use crate::io::stack::{self, LoadedMedia, VideoStack};
use crate::models::track::{FrameIndex, Point, TrackError, TrackId, TrackPoints, TrackSet};

/// Notification sent to subscribers after a store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    FrameChanged(FrameIndex),
    NumFramesChanged(usize),
    TrackChanged(TrackId),
    PointsChanged,
    VminChanged(i32),
    VmaxChanged(i32),
}

/// Owns everything one annotation session needs.
pub struct TrackStore {
    set: TrackSet,
    video: Option<VideoStack>,
    /// Snapshot found next to the video (kept with the session, not rendered).
    #[allow(dead_code)]
    background: Option<GrayImage>,
    video_path: Option<PathBuf>,
    sidecar_path: Option<PathBuf>,
    num_frames: usize,
    current_frame: FrameIndex,
    current_track: TrackId,
    vmin: i32,
    vmax: i32,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self {
            set: TrackSet::new(),
            video: None,
            background: None,
            video_path: None,
            sidecar_path: None,
            num_frames: 0,
            current_frame: 0,
            current_track: 0,
            vmin: 0,
            vmax: 100,
            subscribers: Vec::new(),
        }
    }

    /// Register an observer. Dropped receivers are pruned on the next emit.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// Load a recording from disk and install it. Blocks while decoding;
    /// use [`stack::load_media`] on a worker thread to keep a UI live.
    pub fn load_video(&mut self, path: &Path) -> Result<()> {
        let media = stack::load_media(path)?;
        self.install_media(media)
    }

    /// Install decoded media: restore the sidecar (or start fresh), then
    /// reset the cursor to frame 0 and select the highest track.
    ///
    /// The session is untouched if the sidecar exists but cannot be read.
    pub fn install_media(&mut self, media: LoadedMedia) -> Result<()> {
        let sidecar_path = sidecar::sidecar_path(&media.video_path);
        let set = if sidecar_path.is_file() {
            let set = sidecar::import_tracks(&sidecar_path)?;
            log::info!(
                "Restored {} tracks from {}",
                set.len(),
                sidecar_path.display()
            );
            set
        } else {
            TrackSet::new()
        };

        let num_frames = media.stack.num_frames();
        self.set = set;
        self.video = Some(media.stack);
        self.background = media.background;
        self.video_path = Some(media.video_path);
        self.sidecar_path = Some(sidecar_path);

        self.set_current_frame(0)?;
        self.num_frames = num_frames;
        self.emit(StoreEvent::NumFramesChanged(num_frames));
        if let Some(max) = self.set.max_id() {
            self.set_current_track(max)?;
        }
        Ok(())
    }

    /// Write the tracks to the sidecar. A no-op until a video is loaded,
    /// since there is no path to write to yet.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.sidecar_path else {
            return Ok(());
        };
        sidecar::export_tracks(&self.set, path)?;
        log::debug!("Saved {} tracks to {}", self.set.len(), path.display());
        Ok(())
    }

    /// Place or move the current track's mark on the current frame.
    /// Not persisted until the next sidecar write.
    pub fn set_point(&mut self, x: f64, y: f64) -> Result<(), TrackError> {
        self.set
            .set_point(self.current_track, self.current_frame, Point::new(x, y))?;
        self.emit(StoreEvent::PointsChanged);
        Ok(())
    }

    /// Delete the current track's mark on the current frame.
    pub fn remove_point(&mut self) -> Result<Point, TrackError> {
        self.set.remove_point(self.current_track, self.current_frame)
    }

    /// Create a track, select it, and persist.
    pub fn add_track(&mut self) -> Result<TrackId> {
        let id = self.set.add_track();
        self.set_current_track(id)?;
        self.save()?;
        Ok(id)
    }

    /// Delete the current track and persist. Selection moves to the highest
    /// remaining ID; deleting the last track leaves a fresh empty one.
    pub fn delete_track(&mut self) -> Result<()> {
        self.set.remove_track(self.current_track)?;
        if self.set.is_empty() {
            self.add_track()?;
        }
        if let Some(max) = self.set.max_id() {
            self.set_current_track(max)?;
        }
        self.save()
    }

    /// Move the cursor, clamping to the last frame. Always notifies and
    /// always persists, even when the clamped value is unchanged.
    pub fn set_current_frame(&mut self, frame: FrameIndex) -> Result<()> {
        let last = self.num_frames.saturating_sub(1);
        self.current_frame = frame.min(last);
        self.emit(StoreEvent::FrameChanged(self.current_frame));
        self.save()
    }

    /// Select a track. Notifies only on an actual change; never persists.
    pub fn set_current_track(&mut self, track: TrackId) -> Result<(), TrackError> {
        if !self.set.contains(track) {
            return Err(TrackError::TrackNotFound(track));
        }
        if track != self.current_track {
            self.current_track = track;
            self.emit(StoreEvent::TrackChanged(track));
        }
        Ok(())
    }

    /// Lower display bound. Unchanged input is ignored; otherwise the value
    /// is clamped to keep `vmin < vmax` and subscribers are notified, even
    /// when clamping lands back on the old value.
    pub fn set_vmin(&mut self, value: i32) {
        if value == self.vmin {
            return;
        }
        self.vmin = value.clamp(0, self.vmax - 1);
        self.emit(StoreEvent::VminChanged(self.vmin));
    }

    /// Upper display bound, mirror of [`Self::set_vmin`].
    pub fn set_vmax(&mut self, value: i32) {
        if value == self.vmax {
            return;
        }
        self.vmax = value.clamp(self.vmin + 1, 255);
        self.emit(StoreEvent::VmaxChanged(self.vmax));
    }

    /// Marks on the current frame, keyed by track.
    pub fn current_points(&self) -> BTreeMap<TrackId, Point> {
        self.set.points_at(self.current_frame)
    }

    /// Normalized pixels of the current frame, if a video is loaded.
    pub fn frame_pixels(&self) -> Option<&[u8]> {
        self.video.as_ref()?.frame(self.current_frame)
    }

    pub fn is_loaded(&self) -> bool {
        self.video.is_some()
    }

    pub fn video(&self) -> Option<&VideoStack> {
        self.video.as_ref()
    }

    pub fn video_path(&self) -> Option<&Path> {
        self.video_path.as_deref()
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn current_frame(&self) -> FrameIndex {
        self.current_frame
    }

    pub fn current_track(&self) -> TrackId {
        self.current_track
    }

    pub fn vmin(&self) -> i32 {
        self.vmin
    }

    pub fn vmax(&self) -> i32 {
        self.vmax
    }

    pub fn track_ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.set.track_ids()
    }

    pub fn points_of(&self, track: TrackId) -> Option<&TrackPoints> {
        self.set.points_of(track)
    }
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tiff::encoder::{colortype, TiffEncoder};

    fn test_media(dir: &Path, frames: usize) -> LoadedMedia {
        LoadedMedia {
            video_path: dir.join("stack.tif"),
            stack: VideoStack {
                width: 4,
                height: 3,
                frames: vec![vec![0; 12]; frames],
            },
            background: None,
        }
    }

    fn loaded_store(dir: &Path) -> TrackStore {
        let mut store = TrackStore::new();
        store.install_media(test_media(dir, 5)).unwrap();
        store
    }

    #[test]
    fn test_fresh_store_defaults() {
        let store = TrackStore::new();
        assert_eq!(store.num_frames(), 0);
        assert_eq!(store.current_frame(), 0);
        assert_eq!(store.current_track(), 0);
        assert_eq!((store.vmin(), store.vmax()), (0, 100));
        assert_eq!(store.track_ids().collect::<Vec<_>>(), vec![0]);
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_mutations_before_load_do_not_write() {
        let mut store = TrackStore::new();
        store.set_current_frame(3).unwrap();
        assert_eq!(store.current_frame(), 0);
        store.set_point(1.0, 2.0).unwrap();
        assert_eq!(store.current_points().len(), 1);
    }

    #[test]
    fn test_install_media_starts_session_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let store = loaded_store(dir.path());

        assert!(store.is_loaded());
        assert_eq!(store.num_frames(), 5);
        assert_eq!(store.current_frame(), 0);
        assert_eq!(store.current_track(), 0);
        // Loading writes the initial sidecar.
        assert!(dir.path().join("stack-manualTrack.yml").is_file());
    }

    #[test]
    fn test_install_media_restores_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = loaded_store(dir.path());
        first.set_point(3.0, 4.0).unwrap();
        let id = first.add_track().unwrap();
        first.set_current_frame(2).unwrap();
        first.set_point(5.0, 6.0).unwrap();
        first.set_current_frame(2).unwrap(); // persist the second mark

        let second = loaded_store(dir.path());
        assert_eq!(second.track_ids().collect::<Vec<_>>(), vec![0, id]);
        // Selection lands on the highest restored ID.
        assert_eq!(second.current_track(), id);
        assert_eq!(second.points_of(0).unwrap()[&0], Point::new(3.0, 4.0));
        assert_eq!(second.points_of(id).unwrap()[&2], Point::new(5.0, 6.0));
    }

    #[test]
    fn test_install_media_with_unreadable_sidecar_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stack-manualTrack.yml"), "- garbage\n").unwrap();

        let mut store = TrackStore::new();
        assert!(store.install_media(test_media(dir.path(), 5)).is_err());
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_load_video_restores_session_from_disk() {
        // Nested so the snapshot search stays inside the tempdir.
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("run01");
        std::fs::create_dir(&sub).unwrap();

        let path = sub.join("stack.tif");
        let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
        for page in [vec![0u16; 4], vec![0, 0, 0, 800], vec![0u16; 4]] {
            encoder
                .write_image::<colortype::Gray16>(2, 2, &page)
                .unwrap();
        }
        GrayImage::new(3, 3).save(sub.join("cell_Snap.png")).unwrap();
        let yaml = "- 0:\n    1: [3.5, 4.5]\n  2:\n    0: [7.0, 8.0]\n- 0: [2]\n  1: [0]\n- 3\n";
        std::fs::write(sub.join("stack-manualTrack.yml"), yaml).unwrap();

        let mut store = TrackStore::new();
        store.load_video(&path).unwrap();

        assert!(store.is_loaded());
        assert_eq!(store.num_frames(), 3);
        assert_eq!(store.current_frame(), 0);
        assert_eq!(store.current_track(), 2);
        assert_eq!(store.points_of(0).unwrap()[&1], Point::new(3.5, 4.5));
        assert_eq!(store.points_of(2).unwrap()[&0], Point::new(7.0, 8.0));
        // The restored counter keeps handing out fresh IDs.
        assert_eq!(store.add_track().unwrap(), 3);
    }

    #[test]
    fn test_set_point_updates_current_points() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = loaded_store(dir.path());
        store.set_point(10.0, 20.0).unwrap();
        assert_eq!(store.current_points()[&0], Point::new(10.0, 20.0));

        store.set_current_frame(1).unwrap();
        assert!(store.current_points().is_empty());
    }

    #[test]
    fn test_marks_from_several_tracks_share_a_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = loaded_store(dir.path());
        store.add_track().unwrap();
        assert_eq!(store.current_track(), 1);
        store.set_point(10.0, 20.0).unwrap();

        let points = store.current_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[&1], Point::new(10.0, 20.0));

        // A mark on track 0 at the same frame shows up alongside.
        store.set_current_track(0).unwrap();
        store.set_point(1.0, 2.0).unwrap();
        let points = store.current_points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[&0], Point::new(1.0, 2.0));
        assert_eq!(points[&1], Point::new(10.0, 20.0));
    }

    #[test]
    fn test_point_edits_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let sidecar = dir.path().join("stack-manualTrack.yml");
        let mut store = loaded_store(dir.path());

        std::fs::remove_file(&sidecar).unwrap();
        store.set_point(1.0, 1.0).unwrap();
        assert!(!sidecar.exists());

        // The next frame step flushes everything.
        store.set_current_frame(0).unwrap();
        assert!(sidecar.is_file());
        let restored = loaded_store(dir.path());
        assert_eq!(restored.points_of(0).unwrap()[&0], Point::new(1.0, 1.0));
    }

    #[test]
    fn test_remove_point_requires_mark() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = loaded_store(dir.path());
        assert_eq!(
            store.remove_point(),
            Err(TrackError::PointNotFound { track: 0, frame: 0 })
        );

        store.set_point(7.0, 8.0).unwrap();
        assert_eq!(store.remove_point(), Ok(Point::new(7.0, 8.0)));
        assert!(store.current_points().is_empty());
    }

    #[test]
    fn test_add_track_selects_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = loaded_store(dir.path());
        let id = store.add_track().unwrap();
        assert_eq!(id, 1);
        assert_eq!(store.current_track(), 1);

        let restored = loaded_store(dir.path());
        assert_eq!(restored.track_ids().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(restored.current_track(), 1);
    }

    #[test]
    fn test_delete_track_moves_selection_to_highest() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = loaded_store(dir.path());
        store.add_track().unwrap();
        store.add_track().unwrap();
        store.set_current_track(1).unwrap();
        store.set_point(1.0, 2.0).unwrap();

        store.delete_track().unwrap();
        assert_eq!(store.track_ids().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(store.current_track(), 2);
        assert!(store.current_points().is_empty());
    }

    #[test]
    fn test_delete_last_track_leaves_fresh_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = loaded_store(dir.path());
        store.set_point(1.0, 2.0).unwrap();

        store.delete_track().unwrap();
        assert_eq!(store.track_ids().collect::<Vec<_>>(), vec![1]);
        assert_eq!(store.current_track(), 1);
        assert!(store.current_points().is_empty());

        // The replacement is already on disk.
        let restored = loaded_store(dir.path());
        assert_eq!(restored.track_ids().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_a_track_always_exists_and_is_selected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = loaded_store(dir.path());
        store.add_track().unwrap();
        store.delete_track().unwrap();
        store.delete_track().unwrap();
        store.add_track().unwrap();
        store.add_track().unwrap();
        store.delete_track().unwrap();

        assert!(store.track_ids().next().is_some());
        let current = store.current_track();
        assert!(store.track_ids().any(|id| id == current));
    }

    #[test]
    fn test_frame_navigation_clamps_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let sidecar = dir.path().join("stack-manualTrack.yml");
        let mut store = loaded_store(dir.path());

        store.set_current_frame(99).unwrap();
        assert_eq!(store.current_frame(), 4);

        std::fs::remove_file(&sidecar).unwrap();
        store.set_current_frame(2).unwrap();
        assert!(sidecar.is_file());
    }

    #[test]
    fn test_set_current_track_validates() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = loaded_store(dir.path());
        assert_eq!(
            store.set_current_track(9),
            Err(TrackError::TrackNotFound(9))
        );
        assert_eq!(store.current_track(), 0);
    }

    #[test]
    fn test_display_range_stays_ordered() {
        let mut store = TrackStore::new();
        store.set_vmax(300);
        assert_eq!(store.vmax(), 255);
        store.set_vmin(400);
        assert_eq!(store.vmin(), 254);
        store.set_vmin(-5);
        assert_eq!(store.vmin(), 0);
        store.set_vmax(-100);
        assert_eq!(store.vmax(), 1);
        store.set_vmax(200);
        store.set_vmin(200);
        assert_eq!(store.vmin(), 199);
        assert!(store.vmin() < store.vmax());
    }

    #[test]
    fn test_events_reach_every_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = loaded_store(dir.path());
        let rx_a = store.subscribe();
        let rx_b = store.subscribe();

        store.set_current_frame(1).unwrap();
        store.set_vmin(5);
        store.set_vmin(5); // unchanged input, no event
        store.set_point(1.0, 1.0).unwrap();
        store.add_track().unwrap();
        store.set_current_frame(1).unwrap(); // same frame still notifies

        let expected = vec![
            StoreEvent::FrameChanged(1),
            StoreEvent::VminChanged(5),
            StoreEvent::PointsChanged,
            StoreEvent::TrackChanged(1),
            StoreEvent::FrameChanged(1),
        ];
        assert_eq!(rx_a.try_iter().collect::<Vec<_>>(), expected);
        assert_eq!(rx_b.try_iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_clamped_range_change_still_notifies() {
        let mut store = TrackStore::new();
        let rx = store.subscribe();
        // -5 clamps back to the current 0, but the input differed.
        store.set_vmin(-5);
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![StoreEvent::VminChanged(0)]
        );
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut store = TrackStore::new();
        let rx_a = store.subscribe();
        let rx_b = store.subscribe();
        drop(rx_a);

        store.set_vmin(10);
        store.set_vmin(20);
        assert_eq!(
            rx_b.try_iter().collect::<Vec<_>>(),
            vec![StoreEvent::VminChanged(10), StoreEvent::VminChanged(20)]
        );
    }
}
