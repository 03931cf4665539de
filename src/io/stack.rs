// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video stack loading.
//!
//! Recordings are multi-page grayscale TIFF files, one page per frame.
//! Pages are decoded in order, required to share one geometry, and
//! normalized stack-wide to 8-bit for display. Alongside the video this
//! module also resolves the optional snapshot image recorded with it.

use anyhow::{bail, Result};
use image::GrayImage;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

use crate::util::intensity;

/// A decoded recording: normalized 8-bit frames sharing one geometry.
#[derive(Debug)]
pub struct VideoStack {
    pub width: u32,
    pub height: u32,
    /// One buffer per frame, row-major, `width * height` bytes each.
    pub frames: Vec<Vec<u8>>,
}

impl VideoStack {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&[u8]> {
        self.frames.get(index).map(Vec::as_slice)
    }
}

/// Everything loaded for one recording, ready to install into a session.
pub struct LoadedMedia {
    pub video_path: PathBuf,
    pub stack: VideoStack,
    pub background: Option<GrayImage>,
}

/// Load a recording and its snapshot, if one is found nearby.
///
/// This does all the slow decoding work and touches no session state, so
/// it is safe to call from a worker thread.
pub fn load_media(path: &Path) -> Result<LoadedMedia> {
    let background = match find_snapshot(path) {
        Some(snap) => {
            let img = load_background(&snap)?;
            log::info!("Loaded background snapshot: {}", snap.display());
            Some(img)
        }
        None => None,
    };
    let stack = load_video_stack(path)?;
    Ok(LoadedMedia {
        video_path: path.to_path_buf(),
        stack,
        background,
    })
}

/// Decode every page of a grayscale TIFF stack and normalize it to 8-bit.
pub fn load_video_stack(path: &Path) -> Result<VideoStack> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
    let mut decoder = Decoder::new(BufReader::new(file))?;

    let mut raw: Vec<Vec<u16>> = Vec::new();
    let mut dims: Option<(u32, u32)> = None;
    loop {
        let (width, height) = decoder.dimensions()?;
        match dims {
            None => dims = Some((width, height)),
            Some((w, h)) if (w, h) != (width, height) => {
                bail!(
                    "Page {} is {}x{}, expected {}x{}",
                    raw.len(),
                    width,
                    height,
                    w,
                    h
                );
            }
            Some(_) => {}
        }
        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            other => bail!("Unsupported color type {:?} in {}", other, path.display()),
        }
        let page = match decoder.read_image()? {
            DecodingResult::U8(data) => data.into_iter().map(u16::from).collect(),
            DecodingResult::U16(data) => data,
            _ => bail!("Unsupported sample format in {}", path.display()),
        };
        raw.push(page);

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
    }

    let Some((width, height)) = dims else {
        bail!("No pages found in {}", path.display());
    };
    let frames = intensity::normalize_stack(raw);
    log::info!(
        "Decoded {} frames ({}x{}) from {}",
        frames.len(),
        width,
        height,
        path.display()
    );
    Ok(VideoStack {
        width,
        height,
        frames,
    })
}

/// Look for a snapshot image recorded alongside the video.
///
/// The acquisition software drops stills named with `Snap` next to the
/// recording. The video's directory is searched first, then its parent;
/// within a directory the lexically first match wins.
pub fn find_snapshot(video_path: &Path) -> Option<PathBuf> {
    let dir = video_path.parent()?;
    snapshot_in(dir).or_else(|| dir.parent().and_then(snapshot_in))
}

fn snapshot_in(dir: &Path) -> Option<PathBuf> {
    let mut hits: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().contains("Snap"))
        })
        .collect();
    hits.sort();
    hits.into_iter().next()
}

/// Load a snapshot image as 8-bit grayscale.
pub fn load_background(path: &Path) -> Result<GrayImage> {
    let img = image::open(path)?;
    Ok(img.to_luma8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::{colortype, TiffEncoder};

    fn write_stack(path: &Path, width: u32, height: u32, pages: &[Vec<u16>]) {
        let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
        for page in pages {
            encoder
                .write_image::<colortype::Gray16>(width, height, page)
                .unwrap();
        }
    }

    #[test]
    fn test_load_multi_page_stack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.tif");
        write_stack(
            &path,
            2,
            2,
            &[vec![0, 0, 0, 0], vec![0, 0, 0, 1000]],
        );

        let stack = load_video_stack(&path).unwrap();
        assert_eq!(stack.width, 2);
        assert_eq!(stack.height, 2);
        assert_eq!(stack.num_frames(), 2);
        // Normalized against the stack-wide maximum of 1000.
        assert_eq!(stack.frame(0).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(stack.frame(1).unwrap(), &[0, 0, 0, 255]);
    }

    #[test]
    fn test_rejects_mixed_page_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.tif");
        let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
        encoder
            .write_image::<colortype::Gray16>(2, 2, &[0u16; 4])
            .unwrap();
        encoder
            .write_image::<colortype::Gray16>(4, 1, &[0u16; 4])
            .unwrap();

        let err = load_video_stack(&path).unwrap_err();
        assert!(err.to_string().contains("expected 2x2"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_video_stack(&dir.path().join("absent.tif")).is_err());
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.tif");
        std::fs::write(&path, b"").unwrap();
        assert!(load_video_stack(&path).is_err());
    }

    #[test]
    fn test_snapshot_prefers_video_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("run01");
        std::fs::create_dir(&sub).unwrap();
        let video = sub.join("video.tif");
        std::fs::write(&video, b"").unwrap();
        std::fs::write(dir.path().join("outer_Snap.png"), b"").unwrap();
        std::fs::write(sub.join("inner_Snap.png"), b"").unwrap();

        assert_eq!(find_snapshot(&video), Some(sub.join("inner_Snap.png")));

        std::fs::remove_file(sub.join("inner_Snap.png")).unwrap();
        assert_eq!(
            find_snapshot(&video),
            Some(dir.path().join("outer_Snap.png"))
        );
    }

    #[test]
    fn test_snapshot_picks_first_sorted_match() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.tif");
        std::fs::write(&video, b"").unwrap();
        std::fs::write(dir.path().join("b_Snap.png"), b"").unwrap();
        std::fs::write(dir.path().join("a_Snap.png"), b"").unwrap();

        assert_eq!(find_snapshot(&video), Some(dir.path().join("a_Snap.png")));
    }

    #[test]
    fn test_snapshot_absent() {
        // Nested so both searched directories stay inside the tempdir.
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("run01");
        std::fs::create_dir(&sub).unwrap();
        let video = sub.join("video.tif");
        std::fs::write(&video, b"").unwrap();
        assert_eq!(find_snapshot(&video), None);
    }

    #[test]
    fn test_load_media_with_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.tif");
        write_stack(&video, 2, 1, &[vec![0, 500]]);
        GrayImage::new(3, 3)
            .save(dir.path().join("cell_Snap.png"))
            .unwrap();

        let media = load_media(&video).unwrap();
        assert_eq!(media.video_path, video);
        assert_eq!(media.stack.num_frames(), 1);
        let background = media.background.unwrap();
        assert_eq!(background.dimensions(), (3, 3));
    }

    #[test]
    fn test_load_media_without_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("run01");
        std::fs::create_dir(&sub).unwrap();
        let video = sub.join("video.tif");
        write_stack(&video, 2, 1, &[vec![0, 500]]);

        let media = load_media(&video).unwrap();
        assert!(media.background.is_none());
    }
}
