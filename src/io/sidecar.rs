// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Track sidecar serialization and deserialization.
//!
//! Tracks are persisted next to the video in a YAML sidecar named after
//! the recording. The document layout is shared with older tooling, so
//! the shape is fixed by [`TrackSet`]'s serde impls rather than here.

use crate::models::track::TrackSet;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Derive the sidecar path for a recording: `<stem>-manualTrack.yml`
/// alongside the video file.
pub fn sidecar_path(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    video_path.with_file_name(format!("{stem}-manualTrack.yml"))
}

/// Export tracks to a YAML sidecar.
pub fn export_tracks(set: &TrackSet, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(set)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Import tracks from a YAML sidecar.
pub fn import_tracks(path: &Path) -> Result<TrackSet> {
    let yaml = std::fs::read_to_string(path)?;
    let set = serde_yaml::from_str(&yaml)?;
    Ok(set)
}
