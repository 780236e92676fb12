// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Zoom, pan and letterbox geometry for the active file.
//!
//! The canvas is the source image letterboxed into the available panel
//! area. At zoom 1 the image exactly covers the canvas; above 1 it is
//! drawn at `(offset_left, offset_top)` with size `avail * zoom`, and the
//! offsets are clamped so the zoomed image always covers the canvas.

use super::annotation::Point;
use serde::{Deserialize, Serialize};

/// Allowed zoom values: `min, min + step, ..., max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self { min: 1.0, max: 3.0, step: 0.2 }
    }
}

impl ZoomRange {
    /// Highest zoom level index.
    pub fn max_level(&self) -> u32 {
        if self.step <= 0.0 || self.max <= self.min {
            return 0;
        }
        ((self.max - self.min) / self.step).round() as u32
    }

    pub fn zoom_at(&self, level: u32) -> f64 {
        if level == 0 {
            self.min
        } else {
            self.min + f64::from(level.min(self.max_level())) * self.step
        }
    }
}

/// Letterbox placement of a source image inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    pub canvas_w: u32,
    pub canvas_h: u32,
    /// Canvas position inside the container.
    pub left: i32,
    pub top: i32,
}

impl Fit {
    /// Fit `source` into `container` preserving aspect ratio, centred.
    pub fn compute(container_w: u32, container_h: u32, source_w: u32, source_h: u32) -> Self {
        if container_w == 0 || container_h == 0 || source_w == 0 || source_h == 0 {
            return Self { canvas_w: 0, canvas_h: 0, left: 0, top: 0 };
        }

        let scale = (f64::from(container_w) / f64::from(source_w))
            .min(f64::from(container_h) / f64::from(source_h));
        let canvas_w = ((f64::from(source_w) * scale).floor() as u32).clamp(1, container_w);
        let canvas_h = ((f64::from(source_h) * scale).floor() as u32).clamp(1, container_h);

        Self {
            canvas_w,
            canvas_h,
            left: (f64::from(container_w - canvas_w) / 2.0).ceil() as i32,
            top: (f64::from(container_h - canvas_h) / 2.0).ceil() as i32,
        }
    }
}

/// Pointer and offset captured when a pan gesture starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanGesture {
    pub origin: Point,
    pub start_left: i32,
    pub start_top: i32,
}

/// Viewport/fit parameters for one file session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom_level: u32,
    pub zoom_range: ZoomRange,
    pub offset_left: i32,
    pub offset_top: i32,
    pub avail_width: u32,
    pub avail_height: u32,
    pub canvas_w: u32,
    pub canvas_h: u32,
    pub source_width: u32,
    pub source_height: u32,
    /// Canvas position inside its container.
    pub letterbox_left: i32,
    pub letterbox_top: i32,
}

impl Viewport {
    /// Fresh viewport at minimum zoom for a source letterboxed into a container.
    pub fn fit(
        source_width: u32,
        source_height: u32,
        container_w: u32,
        container_h: u32,
        zoom_range: ZoomRange,
    ) -> Self {
        let fit = Fit::compute(container_w, container_h, source_width, source_height);
        Self {
            zoom_level: 0,
            zoom_range,
            offset_left: 0,
            offset_top: 0,
            avail_width: fit.canvas_w,
            avail_height: fit.canvas_h,
            canvas_w: fit.canvas_w,
            canvas_h: fit.canvas_h,
            source_width,
            source_height,
            letterbox_left: fit.left,
            letterbox_top: fit.top,
        }
    }

    /// Recompute the fit for a new container size, keeping zoom and the
    /// relative pan position.
    pub fn refit(&mut self, container_w: u32, container_h: u32) {
        let fit = Fit::compute(container_w, container_h, self.source_width, self.source_height);
        let ratio_x = ratio(fit.canvas_w, self.avail_width);
        let ratio_y = ratio(fit.canvas_h, self.avail_height);

        self.avail_width = fit.canvas_w;
        self.avail_height = fit.canvas_h;
        self.canvas_w = fit.canvas_w;
        self.canvas_h = fit.canvas_h;
        self.letterbox_left = fit.left;
        self.letterbox_top = fit.top;
        self.offset_left = (f64::from(self.offset_left) * ratio_x).round() as i32;
        self.offset_top = (f64::from(self.offset_top) * ratio_y).round() as i32;
        self.clamp_offset();
    }

    pub fn zoom(&self) -> f64 {
        self.zoom_range.zoom_at(self.zoom_level)
    }

    /// Size of the zoomed image in display pixels.
    pub fn scaled_size(&self) -> (f64, f64) {
        let zoom = self.zoom();
        (f64::from(self.avail_width) * zoom, f64::from(self.avail_height) * zoom)
    }

    /// Step zoom up. Returns whether anything changed.
    pub fn zoom_in(&mut self) -> bool {
        if self.zoom_level >= self.zoom_range.max_level() {
            return false;
        }
        self.set_zoom_level(self.zoom_level + 1);
        true
    }

    /// Step zoom down. Returns whether anything changed.
    pub fn zoom_out(&mut self) -> bool {
        if self.zoom_level == 0 {
            return false;
        }
        self.set_zoom_level(self.zoom_level - 1);
        true
    }

    /// Jump to a zoom level, keeping the canvas centre fixed.
    pub fn set_zoom_level(&mut self, level: u32) {
        let level = level.min(self.zoom_range.max_level());
        let old_zoom = self.zoom();
        self.zoom_level = level;

        if level == 0 {
            self.offset_left = 0;
            self.offset_top = 0;
            return;
        }

        let factor = self.zoom() / old_zoom;
        let cx = f64::from(self.canvas_w) / 2.0;
        let cy = f64::from(self.canvas_h) / 2.0;
        self.offset_left = (cx - (cx - f64::from(self.offset_left)) * factor).round() as i32;
        self.offset_top = (cy - (cy - f64::from(self.offset_top)) * factor).round() as i32;
        self.clamp_offset();
    }

    pub fn begin_pan(&self, origin: Point) -> PanGesture {
        PanGesture {
            origin,
            start_left: self.offset_left,
            start_top: self.offset_top,
        }
    }

    /// Move the image by the pointer delta since the gesture started.
    pub fn pan_to(&mut self, gesture: &PanGesture, pointer: Point) -> bool {
        let before = (self.offset_left, self.offset_top);
        self.offset_left = gesture.start_left + (pointer.x - gesture.origin.x);
        self.offset_top = gesture.start_top + (pointer.y - gesture.origin.y);
        self.clamp_offset();
        before != (self.offset_left, self.offset_top)
    }

    /// Set offsets directly (mirrored surfaces), still clamped.
    pub fn set_offset(&mut self, left: i32, top: i32) {
        self.offset_left = left;
        self.offset_top = top;
        self.clamp_offset();
    }

    fn clamp_offset(&mut self) {
        let (scaled_w, scaled_h) = self.scaled_size();
        let min_left = (f64::from(self.avail_width) - scaled_w).floor() as i32;
        let min_top = (f64::from(self.avail_height) - scaled_h).floor() as i32;
        self.offset_left = self.offset_left.clamp(min_left.min(0), 0);
        self.offset_top = self.offset_top.clamp(min_top.min(0), 0);
    }
}

fn ratio(new: u32, old: u32) -> f64 {
    if old == 0 {
        1.0
    } else {
        f64::from(new) / f64::from(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::fit(1600, 900, 800, 600, ZoomRange::default())
    }

    #[test]
    fn test_fit_letterboxes_and_centres() {
        let fit = Fit::compute(800, 600, 1600, 900);
        assert_eq!((fit.canvas_w, fit.canvas_h), (800, 450));
        assert_eq!((fit.left, fit.top), (0, 75));

        let fit = Fit::compute(800, 600, 600, 900);
        assert_eq!((fit.canvas_w, fit.canvas_h), (400, 600));
        assert_eq!((fit.left, fit.top), (200, 0));
    }

    #[test]
    fn test_zoom_in_then_out_restores_every_level() {
        let range = ZoomRange::default();
        assert_eq!(range.max_level(), 10);

        for level in 0..range.max_level() {
            let mut vp = viewport();
            vp.set_zoom_level(level);
            let before = vp.zoom();
            assert!(vp.zoom_in());
            assert!(vp.zoom_out());
            assert_eq!(vp.zoom(), before);
        }
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = viewport();
        assert!(!vp.zoom_out());
        assert_eq!(vp.zoom(), 1.0);

        for _ in 0..20 {
            vp.zoom_in();
        }
        assert!((vp.zoom() - 3.0).abs() < 1e-9);
        assert!(!vp.zoom_in());
    }

    #[test]
    fn test_zoom_back_to_one_resets_offset() {
        let mut vp = viewport();
        vp.zoom_in();
        vp.zoom_in();
        let gesture = vp.begin_pan(Point::new(100, 100));
        vp.pan_to(&gesture, Point::new(60, 70));
        assert_ne!((vp.offset_left, vp.offset_top), (0, 0));

        vp.zoom_out();
        vp.zoom_out();
        assert_eq!(vp.zoom(), 1.0);
        assert_eq!((vp.offset_left, vp.offset_top), (0, 0));
    }

    #[test]
    fn test_pan_is_clamped_to_image() {
        let mut vp = viewport();
        vp.set_zoom_level(5); // 2.0
        let gesture = vp.begin_pan(Point::new(0, 0));

        vp.pan_to(&gesture, Point::new(500, 500));
        assert_eq!((vp.offset_left, vp.offset_top), (0, 0));

        vp.pan_to(&gesture, Point::new(-5000, -5000));
        assert_eq!((vp.offset_left, vp.offset_top), (-800, -450));

        // No panning possible at zoom 1
        let mut flat = viewport();
        let gesture = flat.begin_pan(Point::new(0, 0));
        assert!(!flat.pan_to(&gesture, Point::new(-40, -40)));
    }

    #[test]
    fn test_refit_keeps_zoom() {
        let mut vp = viewport();
        vp.zoom_in();
        vp.refit(1600, 1200);
        assert_eq!((vp.canvas_w, vp.canvas_h), (1600, 900));
        assert_eq!(vp.zoom_level, 1);
    }
}
