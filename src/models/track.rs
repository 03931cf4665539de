// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Track data structures.
//!
//! This module defines the annotation aggregate: per-track point sequences
//! keyed by frame, the derived frame-to-tracks index, and the monotonic
//! track ID counter. All mutation goes through `TrackSet` methods so the
//! two maps can never drift apart.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Identifier of a track. Never reused within a session or sidecar file.
pub type TrackId = u32;

/// Zero-based index of a frame in the loaded stack.
pub type FrameIndex = usize;

/// Marks of a single track, at most one per frame.
pub type TrackPoints = BTreeMap<FrameIndex, Point>;

/// A 2D position in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// The sidecar stores points as `[x, y]` sequences, not maps.
impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.x, self.y).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (x, y) = <(f64, f64)>::deserialize(deserializer)?;
        Ok(Self { x, y })
    }
}

/// Contract violations when addressing tracks or marks that are not there.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackError {
    #[error("track {0} does not exist")]
    TrackNotFound(TrackId),

    #[error("track {track} has no mark at frame {frame}")]
    PointNotFound { track: TrackId, frame: FrameIndex },
}

/// The annotation aggregate: tracks mapping, frame-to-tracks index, and the
/// next-track-id counter.
///
/// Invariants upheld by every mutator:
/// - a (track, frame) pair appears in the index iff the track has a point
///   recorded at that frame;
/// - track IDs come from the counter and are never handed out twice.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSet {
    tracks: BTreeMap<TrackId, TrackPoints>,
    frame_map: BTreeMap<FrameIndex, BTreeSet<TrackId>>,
    next_track_id: TrackId,
}

impl TrackSet {
    /// A fresh set with a single empty track `0` and the counter past it.
    pub fn new() -> Self {
        Self {
            tracks: BTreeMap::from([(0, TrackPoints::new())]),
            frame_map: BTreeMap::new(),
            next_track_id: 1,
        }
    }

    /// Record `point` for `track` at `frame`, overwriting any previous mark.
    pub fn set_point(
        &mut self,
        track: TrackId,
        frame: FrameIndex,
        point: Point,
    ) -> Result<(), TrackError> {
        let points = self
            .tracks
            .get_mut(&track)
            .ok_or(TrackError::TrackNotFound(track))?;
        points.insert(frame, point);
        self.frame_map.entry(frame).or_default().insert(track);
        Ok(())
    }

    /// Delete the mark of `track` at `frame`. Removing an absent mark is an
    /// error, not a no-op.
    pub fn remove_point(
        &mut self,
        track: TrackId,
        frame: FrameIndex,
    ) -> Result<Point, TrackError> {
        let points = self
            .tracks
            .get_mut(&track)
            .ok_or(TrackError::TrackNotFound(track))?;
        let point = points
            .remove(&frame)
            .ok_or(TrackError::PointNotFound { track, frame })?;
        if let Some(set) = self.frame_map.get_mut(&frame) {
            set.remove(&track);
            if set.is_empty() {
                self.frame_map.remove(&frame);
            }
        }
        Ok(point)
    }

    /// Allocate the next track ID and insert an empty track for it.
    pub fn add_track(&mut self) -> TrackId {
        let id = self.next_track_id;
        self.next_track_id += 1;
        self.tracks.insert(id, TrackPoints::new());
        id
    }

    /// Remove `track` entirely, scrubbing all of its marks from the index.
    pub fn remove_track(&mut self, track: TrackId) -> Result<(), TrackError> {
        self.tracks
            .remove(&track)
            .ok_or(TrackError::TrackNotFound(track))?;
        self.frame_map.retain(|_, set| {
            set.remove(&track);
            !set.is_empty()
        });
        Ok(())
    }

    pub fn contains(&self, track: TrackId) -> bool {
        self.tracks.contains_key(&track)
    }

    /// Number of live tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Live track IDs in ascending order.
    pub fn track_ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.tracks.keys().copied()
    }

    /// Highest live track ID, if any track exists.
    pub fn max_id(&self) -> Option<TrackId> {
        self.tracks.keys().next_back().copied()
    }

    /// All marks of one track, keyed by frame.
    pub fn points_of(&self, track: TrackId) -> Option<&TrackPoints> {
        self.tracks.get(&track)
    }

    /// Marks present at `frame`, resolved through the frame-to-tracks index.
    pub fn points_at(&self, frame: FrameIndex) -> BTreeMap<TrackId, Point> {
        let Some(tracks) = self.frame_map.get(&frame) else {
            return BTreeMap::new();
        };
        tracks
            .iter()
            .filter_map(|&track| {
                let point = self.tracks.get(&track)?.get(&frame)?;
                Some((track, *point))
            })
            .collect()
    }

    /// Counter value the next `add_track` call will hand out.
    pub fn next_track_id(&self) -> TrackId {
        self.next_track_id
    }
}

impl Default for TrackSet {
    fn default() -> Self {
        Self::new()
    }
}

// The sidecar document is exactly the 3-tuple
// (tracks, frame-to-tracks index, counter); see `io::sidecar`.
impl Serialize for TrackSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.tracks, &self.frame_map, self.next_track_id).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TrackSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        type Doc = (
            BTreeMap<TrackId, TrackPoints>,
            BTreeMap<FrameIndex, BTreeSet<TrackId>>,
            TrackId,
        );
        let (tracks, mut frame_map, next_track_id) = Doc::deserialize(deserializer)?;
        if tracks.is_empty() {
            return Err(D::Error::custom("sidecar document contains no tracks"));
        }
        // A counter at or below a live ID would hand that ID out again.
        if let Some(&max) = tracks.keys().next_back() {
            if next_track_id <= max {
                return Err(D::Error::custom(format!(
                    "track counter {next_track_id} is not above the highest track id {max}"
                )));
            }
        }
        // Older writers left empty sets behind when scrubbing the index.
        frame_map.retain(|_, set| !set.is_empty());
        Ok(Self {
            tracks,
            frame_map,
            next_track_id,
        })
    }
}
