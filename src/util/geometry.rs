// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Coordinate mapping between display space and model space.
//!
//! Display -> model: subtract the viewport offset, divide by zoom, undo
//! the letterbox scale, then rescale into the dimensions recorded by the
//! region set. Display points are integer pixels; model -> display
//! floors, and only the raw pointer position is ceiled when it is turned
//! into a display [`Point`].

use crate::models::annotation::{ModelPoint, Point};
use crate::models::viewport::Viewport;

/// Pointer fell outside the zoomed image rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds;

/// Absorbs float error before flooring back to pixels.
const SNAP_EPSILON: f64 = 1e-6;

/// Source dimensions a region set was annotated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub width: u32,
    pub height: u32,
}

impl Recorded {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Factor from recorded dimensions to live source dimensions.
pub fn recorded_scale(viewport: &Viewport, recorded: Recorded) -> (f64, f64) {
    (
        axis_ratio(viewport.source_width, recorded.width),
        axis_ratio(viewport.source_height, recorded.height),
    )
}

/// Factor from live source pixels to fitted display pixels (zoom 1).
fn fit_scale(viewport: &Viewport) -> (f64, f64) {
    (
        axis_ratio(viewport.avail_width, viewport.source_width),
        axis_ratio(viewport.avail_height, viewport.source_height),
    )
}

fn axis_ratio(num: u32, den: u32) -> f64 {
    if den == 0 || num == 0 {
        1.0
    } else {
        f64::from(num) / f64::from(den)
    }
}

/// Convert a raw surface position (already relative to the canvas origin)
/// into a display point.
pub fn surface_point(x: f32, y: f32) -> Point {
    Point::new(x.ceil() as i32, y.ceil() as i32)
}

/// Whether a display point lies inside the zoomed image rectangle.
pub fn in_bounds(point: Point, viewport: &Viewport) -> bool {
    let (scaled_w, scaled_h) = viewport.scaled_size();
    let dx = f64::from(point.x - viewport.offset_left);
    let dy = f64::from(point.y - viewport.offset_top);
    (0.0..=scaled_w).contains(&dx) && (0.0..=scaled_h).contains(&dy)
}

/// Map a display point into the model space of a region set.
pub fn to_model(point: Point, viewport: &Viewport, recorded: Recorded) -> Result<ModelPoint, OutOfBounds> {
    if !in_bounds(point, viewport) {
        return Err(OutOfBounds);
    }

    let zoom = viewport.zoom();
    let (fit_x, fit_y) = fit_scale(viewport);
    let (rec_x, rec_y) = recorded_scale(viewport, recorded);

    let dx = f64::from(point.x - viewport.offset_left);
    let dy = f64::from(point.y - viewport.offset_top);

    Ok(ModelPoint::new(dx / zoom / fit_x / rec_x, dy / zoom / fit_y / rec_y))
}

/// Map a model point to display space without pixel snapping.
pub fn to_display_f(point: ModelPoint, viewport: &Viewport, recorded: Recorded) -> (f64, f64) {
    let zoom = viewport.zoom();
    let (fit_x, fit_y) = fit_scale(viewport);
    let (rec_x, rec_y) = recorded_scale(viewport, recorded);

    (
        point.x * rec_x * fit_x * zoom + f64::from(viewport.offset_left),
        point.y * rec_y * fit_y * zoom + f64::from(viewport.offset_top),
    )
}

/// Exact inverse of [`to_model`] for in-bounds points.
pub fn to_display(point: ModelPoint, viewport: &Viewport, recorded: Recorded) -> Point {
    let (x, y) = to_display_f(point, viewport, recorded);
    Point::new((x + SNAP_EPSILON).floor() as i32, (y + SNAP_EPSILON).floor() as i32)
}
