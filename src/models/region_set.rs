// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Per-file, per-task annotation records.
//!
//! A [`RegionSet`] is the persisted unit: one JSON document for each
//! (file, task) pair. Its `width`/`height` are the source dimensions at
//! the time the shapes were drawn, used to rescale them if the live image
//! later reports different dimensions.

use super::annotation::Shape;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Labeling task selected for the active file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Classification,
    Region,
    Segmentation,
}

impl Task {
    pub const ALL: [Task; 3] = [Task::Classification, Task::Region, Task::Segmentation];

    /// Directory/key name used on disk and on the relay.
    pub fn key(self) -> &'static str {
        match self {
            Task::Classification => "classification",
            Task::Region => "region",
            Task::Segmentation => "segmentation",
        }
    }

    /// Whether the task draws shapes on the canvas.
    pub fn captures_shapes(self) -> bool {
        !matches!(self, Task::Classification)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Task::Classification => "Classification",
            Task::Region => "Region based",
            Task::Segmentation => "Semantic segmentation",
        };
        f.write_str(label)
    }
}

/// Shape primitive used by the region task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionOption {
    BoundingBox,
    Polygon,
}

/// Stored annotations for one file under one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSet {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub path: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<Shape>,
    /// Class names assigned under the classification task.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned: Vec<String>,
}

impl RegionSet {
    /// Create an empty record for a file with the given source dimensions.
    pub fn new(file: &AnnoFile) -> Self {
        Self {
            file: file.name.clone(),
            path: file.path.clone(),
            width: file.width,
            height: file.height,
            regions: Vec::new(),
            assigned: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && self.assigned.is_empty()
    }

    /// Drop every shape and class assignment.
    pub fn clear(&mut self) {
        self.regions.clear();
        self.assigned.clear();
    }
}

/// An image the user opened, with the flags that gate capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnoFile {
    pub name: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    /// Missing on disk or undecodable.
    pub invalid: bool,
    /// Larger than the supported resolution bound.
    pub not_fit: bool,
}

impl AnnoFile {
    /// File identity used by the store and the relay.
    pub fn id(&self) -> &str {
        &self.path
    }

    /// Capture and renderer input are only enabled for usable files.
    pub fn accepts_input(&self) -> bool {
        !self.invalid && !self.not_fit
    }
}
