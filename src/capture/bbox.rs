// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Bounding-box capture.
//!
//! A box is finished either by a second click (click-click) or by
//! releasing a drag. A release without movement keeps the box open so the
//! second click can place the opposite corner. Leaving the surface or
//! moving out of the image commits with the last in-bounds corner.

use super::{CaptureState, Hit, Preview, ShapeCapture, Step};
use crate::models::annotation::{BoundingBox, ModelPoint, Shape};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum BoxState {
    #[default]
    Idle,
    Dragging {
        start: ModelPoint,
        cont: Option<ModelPoint>,
    },
}

#[derive(Debug, Default)]
pub struct BoxCapture {
    state: BoxState,
}

impl BoxCapture {
    /// Close the box at `end`. Zero-area boxes are dropped.
    fn finish(&mut self, start: ModelPoint, end: ModelPoint) -> Step {
        self.state = BoxState::Idle;
        let bbox = BoundingBox::from_corners(start, end);
        if bbox.is_degenerate() {
            log::debug!("Dropped zero-area box at ({:.1}, {:.1})", start.x, start.y);
            Step::Cancelled
        } else {
            Step::Committed(Shape::BoundingBox(bbox))
        }
    }

    /// Implicit stop: commit with the last known live corner.
    fn stop(&mut self) -> Step {
        match self.state {
            BoxState::Idle => Step::Ignored,
            BoxState::Dragging { start, cont: Some(cont) } => self.finish(start, cont),
            BoxState::Dragging { cont: None, .. } => {
                self.state = BoxState::Idle;
                Step::Cancelled
            }
        }
    }
}

impl ShapeCapture for BoxCapture {
    fn pointer_down(&mut self, hit: Hit) -> Step {
        let Ok(point) = hit else {
            return Step::Ignored;
        };

        match self.state {
            BoxState::Idle => {
                self.state = BoxState::Dragging { start: point, cont: None };
                Step::Began
            }
            BoxState::Dragging { start, .. } => self.finish(start, point),
        }
    }

    fn pointer_move(&mut self, hit: Hit) -> Step {
        let BoxState::Dragging { start, .. } = self.state else {
            return Step::Ignored;
        };

        match hit {
            Ok(point) => {
                self.state = BoxState::Dragging { start, cont: Some(point) };
                Step::Updated
            }
            Err(_) => self.stop(),
        }
    }

    fn pointer_up(&mut self, hit: Hit) -> Step {
        let BoxState::Dragging { start, cont } = self.state else {
            return Step::Ignored;
        };

        match hit.ok().or(cont) {
            Some(end) if end != start => self.finish(start, end),
            // Click without drag: wait for the second click
            _ => Step::Ignored,
        }
    }

    fn pointer_leave(&mut self) -> Step {
        self.stop()
    }

    fn save(&mut self) -> Step {
        Step::Ignored
    }

    fn cancel(&mut self) -> Step {
        match self.state {
            BoxState::Idle => Step::Ignored,
            BoxState::Dragging { .. } => {
                self.state = BoxState::Idle;
                Step::Cancelled
            }
        }
    }

    fn state(&self) -> CaptureState {
        match self.state {
            BoxState::Idle => CaptureState::Idle,
            BoxState::Dragging { .. } => CaptureState::Dragging,
        }
    }

    fn preview(&self) -> Option<Preview> {
        match self.state {
            BoxState::Idle => None,
            BoxState::Dragging { start, cont } => Some(Preview::Box { start, cont }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::geometry::OutOfBounds;

    fn p(x: f64, y: f64) -> Hit {
        Ok(ModelPoint::new(x, y))
    }

    fn committed_box(step: Step) -> BoundingBox {
        match step {
            Step::Committed(Shape::BoundingBox(b)) => b,
            other => panic!("expected committed box, got {:?}", other),
        }
    }

    #[test]
    fn test_click_click_commits_on_second_down() {
        let mut capture = BoxCapture::default();
        assert_eq!(capture.pointer_down(p(50.0, 40.0)), Step::Began);
        // Release without moving keeps the box open
        assert_eq!(capture.pointer_up(p(50.0, 40.0)), Step::Ignored);
        assert_eq!(capture.state(), CaptureState::Dragging);
        assert_eq!(capture.pointer_move(p(30.0, 20.0)), Step::Updated);

        let bbox = committed_box(capture.pointer_down(p(10.0, 10.0)));
        assert_eq!((bbox.top_left_x, bbox.top_left_y, bbox.width, bbox.height), (10.0, 10.0, 40.0, 30.0));
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_drag_commits_on_release() {
        let mut capture = BoxCapture::default();
        capture.pointer_down(p(10.0, 10.0));
        capture.pointer_move(p(30.0, 30.0));
        capture.pointer_move(p(50.0, 40.0));

        let bbox = committed_box(capture.pointer_up(p(50.0, 40.0)));
        assert_eq!((bbox.top_left_x, bbox.top_left_y, bbox.width, bbox.height), (10.0, 10.0, 40.0, 30.0));
        assert_eq!(capture.preview(), None);
    }

    #[test]
    fn test_out_of_bounds_down_is_ignored() {
        let mut capture = BoxCapture::default();
        assert_eq!(capture.pointer_down(Err(OutOfBounds)), Step::Ignored);
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_out_of_bounds_move_forces_stop_with_last_corner() {
        let mut capture = BoxCapture::default();
        capture.pointer_down(p(10.0, 10.0));
        capture.pointer_move(p(60.0, 70.0));

        let bbox = committed_box(capture.pointer_move(Err(OutOfBounds)));
        assert_eq!((bbox.width, bbox.height), (50.0, 60.0));
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_leave_commits_or_discards() {
        let mut capture = BoxCapture::default();
        capture.pointer_down(p(10.0, 10.0));
        capture.pointer_move(p(20.0, 25.0));
        let bbox = committed_box(capture.pointer_leave());
        assert_eq!((bbox.width, bbox.height), (10.0, 15.0));

        // No live corner yet: nothing to commit
        capture.pointer_down(p(10.0, 10.0));
        assert_eq!(capture.pointer_leave(), Step::Cancelled);
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[test]
    fn test_cancel_and_save() {
        let mut capture = BoxCapture::default();
        assert_eq!(capture.cancel(), Step::Ignored);
        capture.pointer_down(p(1.0, 1.0));
        assert_eq!(capture.save(), Step::Ignored);
        assert_eq!(capture.cancel(), Step::Cancelled);
        assert_eq!(capture.preview(), None);
    }

    #[test]
    fn test_zero_area_second_click_is_dropped() {
        let mut capture = BoxCapture::default();
        capture.pointer_down(p(5.0, 5.0));
        assert_eq!(capture.pointer_down(p(5.0, 9.0)), Step::Cancelled);
    }
}
