// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! MANTIS - Manual Tracking In Stacks
//!
//! A desktop application for marking particle positions frame by frame
//! in microscopy recordings. Tracks are saved to a YAML sidecar next to
//! the video as they are annotated.

mod app;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::MantisApp;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // A recording can be given on the command line
    let initial_video = std::env::args().nth(1).map(PathBuf::from);

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("MANTIS - Manual Tracking In Stacks"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "MANTIS",
        options,
        Box::new(move |_cc| Ok(Box::new(MantisApp::new(initial_video)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
