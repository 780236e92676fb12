// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Inspect mode: highlight one stored shape at a time for edit/delete.

use serde::{Deserialize, Serialize};

/// Direction for [`InspectState::cycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleDirection {
    Increase,
    Decrease,
}

/// `active_index` is 1-based over the regions; 0 means nothing selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectState {
    pub is_on: bool,
    pub active_index: usize,
    /// Attribute name being edited for the active shape, if any.
    #[serde(skip)]
    pub pending_edit: Option<String>,
}

impl InspectState {
    /// Step the active index, wrapping over `0..=region_count`.
    pub fn cycle(&mut self, direction: CycleDirection, region_count: usize) {
        let slots = region_count + 1;
        let current = self.active_index.min(region_count);
        self.active_index = match direction {
            CycleDirection::Increase => (current + 1) % slots,
            CycleDirection::Decrease => (current + slots - 1) % slots,
        };
        self.pending_edit = None;
    }

    pub fn set_on(&mut self, on: bool) {
        self.is_on = on;
        if !on {
            self.active_index = 0;
            self.pending_edit = None;
        }
    }

    /// Zero-based region index when inspect addresses a real shape.
    pub fn active_region(&self, region_count: usize) -> Option<usize> {
        (self.is_on && self.active_index >= 1 && self.active_index <= region_count)
            .then(|| self.active_index - 1)
    }

    /// Keep the index valid after regions were removed.
    pub fn clamp(&mut self, region_count: usize) {
        if self.active_index > region_count {
            self.active_index = region_count;
            self.pending_edit = None;
        }
    }
}
