// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Intensity mapping for grayscale stacks.
//!
//! Microscopy stacks arrive with 16-bit counts in an arbitrary range; they
//! are normalized once to 8-bit using the global minimum and maximum across
//! the whole stack, so intensities stay comparable between frames. Display
//! windowing (vmin/vmax) is applied per redraw on the normalized bytes.

/// Normalize a raw stack to `u8`: subtract the stack-wide minimum, scale by
/// `255 / (max - min)`, truncate. A flat stack maps to all zeros.
pub fn normalize_stack(frames: Vec<Vec<u16>>) -> Vec<Vec<u8>> {
    let mut lo = u16::MAX;
    let mut hi = u16::MIN;
    for frame in &frames {
        for &v in frame {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if hi <= lo {
        return frames.iter().map(|f| vec![0; f.len()]).collect();
    }

    let scale = 255.0 / f64::from(hi - lo);
    frames
        .into_iter()
        .map(|frame| {
            frame
                .into_iter()
                .map(|v| (f64::from(v - lo) * scale) as u8)
                .collect()
        })
        .collect()
}

/// Map normalized bytes through the `vmin..vmax` display window: values at
/// or below `vmin` go black, values at or above `vmax` go white.
pub fn apply_window(frame: &[u8], vmin: i32, vmax: i32) -> Vec<u8> {
    let span = f64::from((vmax - vmin).max(1));
    frame
        .iter()
        .map(|&v| {
            let t = (f64::from(v) - f64::from(vmin)) / span;
            (t.clamp(0.0, 1.0) * 255.0) as u8
        })
        .collect()
}
