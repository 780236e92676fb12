// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annomix - image annotation for classification, region and
//! segmentation datasets.
//!
//! Shapes are captured on an interactive surface, stored per file and
//! task as JSON records, and mirrored to a secondary render surface.

mod app;
mod capture;
mod engine;
mod error;
mod io;
mod models;
mod relay;
mod render;
mod settings;
mod ui;
mod util;

use anyhow::Result;
use app::AnnoApp;
use settings::Settings;

fn main() -> Result<()> {
    env_logger::init();

    let settings = Settings::load();
    log::info!("Writing annotations under {}", settings.output_dir.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Annomix"),
        ..Default::default()
    };

    eframe::run_native(
        "Annomix",
        options,
        Box::new(|_cc| Ok(Box::new(AnnoApp::new(settings)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
