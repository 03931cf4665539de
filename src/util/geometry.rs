// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! The canvas shows each frame aspect-fit inside whatever space is left
//! over, while marks are stored in image pixel coordinates. These helpers
//! map between the displayed rectangle and image pixels.

use crate::models::track::Point;

/// Aspect-fit display size for an image inside the available area.
pub fn fit_size(img_width: u32, img_height: u32, avail_width: f32, avail_height: f32) -> (f32, f32) {
    let img_aspect = img_width as f32 / img_height as f32;
    let avail_aspect = avail_width / avail_height;

    if img_aspect > avail_aspect {
        // Image is wider - fit to width
        (avail_width, avail_width / img_aspect)
    } else {
        // Image is taller - fit to height
        (avail_height * img_aspect, avail_height)
    }
}

/// Convert an offset from the displayed image's top-left corner into
/// image pixel coordinates.
pub fn display_to_image(
    rel_x: f32,
    rel_y: f32,
    display_width: f32,
    display_height: f32,
    img_width: u32,
    img_height: u32,
) -> Point {
    Point::new(
        f64::from(rel_x) * f64::from(img_width) / f64::from(display_width),
        f64::from(rel_y) * f64::from(img_height) / f64::from(display_height),
    )
}

/// Convert image pixel coordinates into an offset from the displayed
/// image's top-left corner.
pub fn image_to_display(
    point: Point,
    display_width: f32,
    display_height: f32,
    img_width: u32,
    img_height: u32,
) -> (f32, f32) {
    (
        (point.x * f64::from(display_width) / f64::from(img_width)) as f32,
        (point.y * f64::from(display_height) / f64::from(img_height)) as f32,
    )
}
