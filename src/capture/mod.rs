// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Capture state machines turning pointer input into shapes.
//!
//! Bounding boxes and polygons use different interaction models
//! (click-click or drag for boxes, accumulate-until-save for polygons), so
//! each has its own machine behind the [`ShapeCapture`] trait. Inputs are
//! already mapped to model space; an out-of-bounds pointer arrives as
//! `Err(OutOfBounds)` and is never recorded.

pub mod bbox;
pub mod polygon;

use crate::models::annotation::{ModelPoint, Shape};
use crate::models::region_set::{RegionOption, Task};
use crate::util::geometry::OutOfBounds;
use serde::{Deserialize, Serialize};

pub use bbox::BoxCapture;
pub use polygon::PolygonCapture;

/// A pointer position after mapping and bounds checking.
pub type Hit = Result<ModelPoint, OutOfBounds>;

/// Coarse state shared by both machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    /// First polygon vertex placed.
    Armed,
    Dragging,
}

/// What a single input did to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Input rejected or irrelevant; nothing changed.
    Ignored,
    /// A new session started.
    Began,
    /// The in-progress shape changed; preview repaint only.
    Updated,
    /// A shape was finalized; session cleared.
    Committed(Shape),
    /// The session was discarded without producing a shape.
    Cancelled,
}

/// In-progress shape, in the model space of the active region set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Preview {
    Box {
        start: ModelPoint,
        cont: Option<ModelPoint>,
    },
    Polygon {
        vertices: Vec<ModelPoint>,
        cont: Option<ModelPoint>,
    },
}

/// One shape capture automaton.
pub trait ShapeCapture {
    fn pointer_down(&mut self, hit: Hit) -> Step;
    fn pointer_move(&mut self, hit: Hit) -> Step;
    fn pointer_up(&mut self, hit: Hit) -> Step;
    /// Pointer left the capture surface.
    fn pointer_leave(&mut self) -> Step;
    /// Explicit save command.
    fn save(&mut self) -> Step;
    /// Explicit cancel command.
    fn cancel(&mut self) -> Step;
    fn state(&self) -> CaptureState;
    fn preview(&self) -> Option<Preview>;
}

/// Which machine a task/option combination needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    BoundingBox,
    Polygon,
}

impl CaptureMode {
    /// `None` for tasks without shape capture.
    pub fn for_task(task: Task, option: RegionOption) -> Option<Self> {
        match (task, option) {
            (Task::Classification, _) => None,
            (Task::Region, RegionOption::BoundingBox) => Some(CaptureMode::BoundingBox),
            (Task::Region, RegionOption::Polygon) | (Task::Segmentation, _) => Some(CaptureMode::Polygon),
        }
    }
}

/// The active capture machine.
#[derive(Debug)]
pub enum Capture {
    Box(BoxCapture),
    Polygon(PolygonCapture),
}

impl Capture {
    pub fn new(mode: CaptureMode) -> Self {
        match mode {
            CaptureMode::BoundingBox => Capture::Box(BoxCapture::default()),
            CaptureMode::Polygon => Capture::Polygon(PolygonCapture::default()),
        }
    }

    pub fn mode(&self) -> CaptureMode {
        match self {
            Capture::Box(_) => CaptureMode::BoundingBox,
            Capture::Polygon(_) => CaptureMode::Polygon,
        }
    }

    /// Switch machines when the mode changed. Returns true if an
    /// in-progress session was discarded.
    pub fn ensure_mode(&mut self, mode: CaptureMode) -> bool {
        if self.mode() == mode {
            return false;
        }
        let discarded = self.is_active();
        *self = Capture::new(mode);
        discarded
    }

    pub fn machine(&mut self) -> &mut dyn ShapeCapture {
        match self {
            Capture::Box(m) => m as &mut dyn ShapeCapture,
            Capture::Polygon(m) => m as &mut dyn ShapeCapture,
        }
    }

    pub fn state(&self) -> CaptureState {
        match self {
            Capture::Box(m) => m.state(),
            Capture::Polygon(m) => m.state(),
        }
    }

    pub fn preview(&self) -> Option<Preview> {
        match self {
            Capture::Box(m) => m.preview(),
            Capture::Polygon(m) => m.preview(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() != CaptureState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_for_task() {
        assert_eq!(CaptureMode::for_task(Task::Classification, RegionOption::Polygon), None);
        assert_eq!(
            CaptureMode::for_task(Task::Region, RegionOption::BoundingBox),
            Some(CaptureMode::BoundingBox)
        );
        assert_eq!(
            CaptureMode::for_task(Task::Segmentation, RegionOption::BoundingBox),
            Some(CaptureMode::Polygon)
        );
    }

    #[test]
    fn test_switching_mode_discards_session() {
        let mut capture = Capture::new(CaptureMode::Polygon);
        capture.machine().pointer_down(Ok(ModelPoint::new(1.0, 1.0)));
        assert_eq!(capture.state(), CaptureState::Armed);

        assert!(!capture.ensure_mode(CaptureMode::Polygon));
        assert!(capture.ensure_mode(CaptureMode::BoundingBox));
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(capture.preview(), None);
    }
}
