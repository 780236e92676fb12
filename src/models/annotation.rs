// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! Shapes are always stored in model space: pixel coordinates of the
//! original, unscaled image recorded in the owning [`RegionSet`](super::region_set::RegionSet).
//! Nothing in here knows about zoom or pan.

use serde::{Deserialize, Serialize};

/// A point in display space, relative to the rendering surface's top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A point in model space (source image pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPoint {
    pub x: f64,
    pub y: f64,
}

impl ModelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// User-editable attributes attached to every shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub name: String,
}

impl Attributes {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Axis-aligned box in model space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub top_left_x: f64,
    pub top_left_y: f64,
    pub width: f64,
    pub height: f64,
    pub attributes: Attributes,
}

impl BoundingBox {
    /// Build a box from two opposite corners, in either order.
    pub fn from_corners(a: ModelPoint, b: ModelPoint) -> Self {
        Self {
            top_left_x: a.x.min(b.x),
            top_left_y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
            attributes: Attributes::default(),
        }
    }

    /// The four corners, clockwise from top-left.
    pub fn corners(&self) -> [ModelPoint; 4] {
        let (x0, y0) = (self.top_left_x, self.top_left_y);
        let (x1, y1) = (x0 + self.width, y0 + self.height);
        [
            ModelPoint::new(x0, y0),
            ModelPoint::new(x1, y0),
            ModelPoint::new(x1, y1),
            ModelPoint::new(x0, y1),
        ]
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Closed polygon in model space. The last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<[f64; 2]>,
    pub attributes: Attributes,
}

impl Polygon {
    pub fn from_points(points: &[ModelPoint]) -> Self {
        Self {
            vertices: points.iter().map(|p| [p.x, p.y]).collect(),
            attributes: Attributes::default(),
        }
    }

    pub fn points(&self) -> impl Iterator<Item = ModelPoint> + '_ {
        self.vertices.iter().map(|v| ModelPoint::new(v[0], v[1]))
    }
}

/// A committed annotation shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum Shape {
    #[serde(rename = "region-bounding-box")]
    BoundingBox(BoundingBox),
    #[serde(rename = "region-polygon")]
    Polygon(Polygon),
}

impl Shape {
    pub fn attributes(&self) -> &Attributes {
        match self {
            Shape::BoundingBox(b) => &b.attributes,
            Shape::Polygon(p) => &p.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Shape::BoundingBox(b) => &mut b.attributes,
            Shape::Polygon(p) => &mut p.attributes,
        }
    }

    /// Points used for inspect handles: box corners or polygon vertices.
    pub fn handle_points(&self) -> Vec<ModelPoint> {
        match self {
            Shape::BoundingBox(b) => b.corners().to_vec(),
            Shape::Polygon(p) => p.points().collect(),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Shape::BoundingBox(_) => "box",
            Shape::Polygon(_) => "polygon",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_from_corners_is_order_independent() {
        let a = ModelPoint::new(10.0, 10.0);
        let b = ModelPoint::new(50.0, 40.0);

        for (start, end) in [(a, b), (b, a)] {
            let bbox = BoundingBox::from_corners(start, end);
            assert_eq!(bbox.top_left_x, 10.0);
            assert_eq!(bbox.top_left_y, 10.0);
            assert_eq!(bbox.width, 40.0);
            assert_eq!(bbox.height, 30.0);
        }

        // Mixed corners: top-right then bottom-left
        let bbox = BoundingBox::from_corners(ModelPoint::new(50.0, 10.0), ModelPoint::new(10.0, 40.0));
        assert_eq!((bbox.top_left_x, bbox.top_left_y), (10.0, 10.0));
        assert_eq!((bbox.width, bbox.height), (40.0, 30.0));
    }

    #[test]
    fn test_shape_serializes_with_region_tag() {
        let shape = Shape::BoundingBox(BoundingBox {
            top_left_x: 1.0,
            top_left_y: 2.0,
            width: 3.0,
            height: 4.0,
            attributes: Attributes::named("car"),
        });
        let json = serde_json::to_value(&shape).unwrap();
        assert_eq!(json["shape"], "region-bounding-box");
        assert_eq!(json["topLeftX"], 1.0);
        assert_eq!(json["attributes"]["name"], "car");

        let poly = Shape::Polygon(Polygon::from_points(&[
            ModelPoint::new(0.0, 0.0),
            ModelPoint::new(5.0, 0.0),
            ModelPoint::new(5.0, 5.0),
        ]));
        let json = serde_json::to_string(&poly).unwrap();
        assert!(json.contains("\"region-polygon\""));
        let back: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(back, poly);
    }
}
