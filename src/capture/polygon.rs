// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Polygon capture: vertices accumulate on each click until an explicit
//! save closes the loop.

use super::{CaptureState, Hit, Preview, ShapeCapture, Step};
use crate::models::annotation::{ModelPoint, Polygon, Shape};

/// Fewest vertices a saved polygon may have.
pub const MIN_POLYGON_VERTICES: usize = 3;

#[derive(Debug, Default)]
pub struct PolygonCapture {
    vertices: Vec<ModelPoint>,
    /// Live pointer position for the rubber-band edge.
    cont: Option<ModelPoint>,
}

impl PolygonCapture {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn reset(&mut self) {
        self.vertices.clear();
        self.cont = None;
    }
}

impl ShapeCapture for PolygonCapture {
    fn pointer_down(&mut self, hit: Hit) -> Step {
        let Ok(point) = hit else {
            return Step::Ignored;
        };

        self.vertices.push(point);
        self.cont = Some(point);
        if self.vertices.len() == 1 {
            Step::Began
        } else {
            Step::Updated
        }
    }

    fn pointer_move(&mut self, hit: Hit) -> Step {
        if self.vertices.is_empty() {
            return Step::Ignored;
        }

        // Out of the image the rubber band is dropped; vertices stay.
        let cont = hit.ok();
        if cont == self.cont {
            return Step::Ignored;
        }
        self.cont = cont;
        Step::Updated
    }

    fn pointer_up(&mut self, _hit: Hit) -> Step {
        Step::Ignored
    }

    fn pointer_leave(&mut self) -> Step {
        Step::Ignored
    }

    fn save(&mut self) -> Step {
        if self.vertex_count() < MIN_POLYGON_VERTICES {
            log::debug!("Polygon save ignored with {} vertices", self.vertex_count());
            return Step::Ignored;
        }

        let polygon = Polygon::from_points(&self.vertices);
        self.reset();
        Step::Committed(Shape::Polygon(polygon))
    }

    fn cancel(&mut self) -> Step {
        if self.vertices.is_empty() {
            return Step::Ignored;
        }
        self.reset();
        Step::Cancelled
    }

    fn state(&self) -> CaptureState {
        match self.vertices.len() {
            0 => CaptureState::Idle,
            1 => CaptureState::Armed,
            _ => CaptureState::Dragging,
        }
    }

    fn preview(&self) -> Option<Preview> {
        (!self.vertices.is_empty()).then(|| Preview::Polygon {
            vertices: self.vertices.clone(),
            cont: self.cont,
        })
    }
}
