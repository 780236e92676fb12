// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application settings loaded from YAML.

use crate::models::viewport::ZoomRange;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at the settings file.
pub const CONFIG_ENV: &str = "ANNOMIX_CONFIG";

/// Settings file looked up in the working directory otherwise.
pub const DEFAULT_CONFIG_FILE: &str = "annomix.yaml";

/// Largest source image accepted as a capture target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn admits(&self, width: u32, height: u32) -> bool {
        width <= self.width && height <= self.height
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory for persisted annotation records.
    pub output_dir: PathBuf,
    pub max_resolution: Resolution,
    pub zoom: ZoomRange,
    /// Coalescing window for high-frequency relay notifications.
    pub relay_debounce_ms: u64,
    pub region_attributes: Vec<String>,
    pub classification_classes: Vec<String>,
    pub segmentation_labels: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("Annovision-Output"),
            max_resolution: Resolution::default(),
            zoom: ZoomRange::default(),
            relay_debounce_ms: 150,
            region_attributes: Vec::new(),
            classification_classes: Vec::new(),
            segmentation_labels: Vec::new(),
        }
    }
}

impl Settings {
    /// Read settings from a YAML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = serde_yaml::from_str(&yaml)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        Ok(settings)
    }

    /// Settings from `$ANNOMIX_CONFIG` or `annomix.yaml`, falling back to
    /// defaults when the file is absent or malformed.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if !path.exists() {
            log::info!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::from_path(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::error!("{:#}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn relay_window(&self) -> Duration {
        Duration::from_millis(self.relay_debounce_ms)
    }
}
