// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Region rendering.
//!
//! [`render`] turns the current state into a complete display list:
//! clear, base image, committed shapes, in-progress preview, then inspect
//! handles. It is a pure full redraw; any zoom or offset change
//! invalidates every pixel position, so nothing is diffed. Both the
//! capture surface and the mirrored render surface paint the same list.

use crate::capture::Preview;
use crate::models::annotation::{ModelPoint, Shape};
use crate::models::inspect::InspectState;
use crate::models::region_set::{RegionSet, Task};
use crate::models::viewport::Viewport;
use crate::util::geometry::{to_display, Recorded};
use egui::{pos2, vec2, Color32, Pos2, Rect, Stroke, Vec2};

/// Inspect handle edge length in display pixels, independent of zoom.
pub const HANDLE_SIZE: f32 = 10.0;

/// Alpha used for committed shape fills.
const FILL_ALPHA: u8 = 64;

const REGION_COLOR: Color32 = Color32::YELLOW;
const PREVIEW_COLOR: Color32 = Color32::LIGHT_BLUE;
const HANDLE_COLOR: Color32 = Color32::WHITE;

const DEFAULT_SEGMENTATION_RGB: (u8, u8, u8) = (235, 64, 52);

const SEGMENTATION_RGB: [(u8, u8, u8); 8] = [
    (235, 64, 52),
    (242, 108, 5),
    (232, 190, 23),
    (164, 227, 16),
    (0, 176, 15),
    (47, 235, 222),
    (0, 2, 143),
    (119, 2, 222),
];

/// One painter operation, in surface-relative display pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear { size: Vec2 },
    Image { rect: Rect },
    Rect { rect: Rect, fill: Color32, stroke: Stroke },
    /// Closed outline; `triangles` indexes `points` for the fill, which
    /// may be concave.
    Polygon {
        points: Vec<Pos2>,
        triangles: Vec<u32>,
        fill: Color32,
        stroke: Stroke,
    },
    Polyline { points: Vec<Pos2>, stroke: Stroke },
    Handle { rect: Rect },
}

/// Shape colours; segmentation colours follow label order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
    pub segmentation_labels: Vec<String>,
}

impl Palette {
    pub fn new(segmentation_labels: Vec<String>) -> Self {
        Self { segmentation_labels }
    }

    fn shape_color(&self, task: Task, shape: &Shape) -> Color32 {
        if task != Task::Segmentation {
            return REGION_COLOR;
        }
        let (r, g, b) = self
            .segmentation_labels
            .iter()
            .position(|l| *l == shape.attributes().name)
            .map(|i| SEGMENTATION_RGB[i % SEGMENTATION_RGB.len()])
            .unwrap_or(DEFAULT_SEGMENTATION_RGB);
        Color32::from_rgb(r, g, b)
    }
}

/// Everything a redraw depends on.
pub struct RenderInput<'a> {
    pub task: Task,
    pub has_image: bool,
    pub regions: &'a RegionSet,
    pub preview: Option<&'a Preview>,
    pub inspect: &'a InspectState,
    pub viewport: &'a Viewport,
    pub palette: &'a Palette,
}

impl RenderInput<'_> {
    fn recorded(&self) -> Recorded {
        let vp = self.viewport;
        let width = if self.regions.width == 0 { vp.source_width } else { self.regions.width };
        let height = if self.regions.height == 0 { vp.source_height } else { self.regions.height };
        Recorded::new(width, height)
    }

    fn pos(&self, point: ModelPoint) -> Pos2 {
        let p = to_display(point, self.viewport, self.recorded());
        pos2(p.x as f32, p.y as f32)
    }
}

/// Produce the full display list for one frame.
pub fn render(input: &RenderInput<'_>) -> Vec<DrawCommand> {
    let vp = input.viewport;
    let mut commands = vec![DrawCommand::Clear {
        size: vec2(vp.canvas_w as f32, vp.canvas_h as f32),
    }];

    if input.has_image {
        let (w, h) = vp.scaled_size();
        commands.push(DrawCommand::Image {
            rect: Rect::from_min_size(
                pos2(vp.offset_left as f32, vp.offset_top as f32),
                vec2(w as f32, h as f32),
            ),
        });
    }

    for shape in &input.regions.regions {
        let color = input.palette.shape_color(input.task, shape);
        commands.push(shape_command(input, shape, color));
    }

    if let Some(preview) = input.preview {
        commands.extend(preview_commands(input, preview));
    }

    if let Some(idx) = input.inspect.active_region(input.regions.regions.len()) {
        let half = HANDLE_SIZE / 2.0;
        for point in input.regions.regions[idx].handle_points() {
            let center = input.pos(point);
            commands.push(DrawCommand::Handle {
                rect: Rect::from_min_max(center - vec2(half, half), center + vec2(half, half)),
            });
        }
    }

    commands
}

fn shape_command(input: &RenderInput<'_>, shape: &Shape, color: Color32) -> DrawCommand {
    let stroke = Stroke::new(2.0, color);
    let fill = Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), FILL_ALPHA);

    match shape {
        Shape::BoundingBox(b) => {
            let [top_left, _, bottom_right, _] = b.corners();
            DrawCommand::Rect {
                rect: Rect::from_min_max(input.pos(top_left), input.pos(bottom_right)),
                fill,
                stroke,
            }
        }
        Shape::Polygon(p) => {
            let model: Vec<ModelPoint> = p.points().collect();
            DrawCommand::Polygon {
                points: model.iter().map(|pt| input.pos(*pt)).collect(),
                triangles: fill_triangles(&model),
                fill,
                stroke,
            }
        }
    }
}

/// Ear-clipped triangle indices for a simple polygon.
fn fill_triangles(points: &[ModelPoint]) -> Vec<u32> {
    let coords: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    match earcutr::earcut(&coords, &[], 2) {
        Ok(indices) => indices.into_iter().map(|i| i as u32).collect(),
        Err(e) => {
            log::warn!("Could not triangulate polygon fill: {:?}", e);
            Vec::new()
        }
    }
}

fn preview_commands(input: &RenderInput<'_>, preview: &Preview) -> Vec<DrawCommand> {
    let stroke = Stroke::new(2.0, PREVIEW_COLOR);

    match preview {
        Preview::Box { start, cont } => {
            let start = input.pos(*start);
            let end = cont.map(|c| input.pos(c)).unwrap_or(start);
            vec![DrawCommand::Rect {
                rect: Rect::from_two_pos(start, end),
                fill: Color32::TRANSPARENT,
                stroke,
            }]
        }
        Preview::Polygon { vertices, cont } => {
            let mut points: Vec<Pos2> = vertices.iter().map(|v| input.pos(*v)).collect();
            let mut commands = Vec::new();
            if let Some(cont) = cont {
                points.push(input.pos(*cont));
            }
            for vertex in vertices {
                commands.push(DrawCommand::Handle {
                    rect: Rect::from_center_size(input.pos(*vertex), vec2(4.0, 4.0)),
                });
            }
            commands.insert(0, DrawCommand::Polyline { points, stroke });
            commands
        }
    }
}

/// Paint a display list with egui, translated to `origin`.
pub fn paint(painter: &egui::Painter, origin: Pos2, commands: &[DrawCommand], texture: Option<egui::TextureId>) {
    let offset = origin.to_vec2();
    let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));

    for command in commands {
        match command {
            DrawCommand::Clear { size } => {
                painter.rect_filled(Rect::from_min_size(origin, *size), 0.0, Color32::from_gray(40));
            }
            DrawCommand::Image { rect } => {
                if let Some(id) = texture {
                    painter.image(id, rect.translate(offset), uv, Color32::WHITE);
                }
            }
            DrawCommand::Rect { rect, fill, stroke } => {
                painter.rect(rect.translate(offset), 0.0, *fill, *stroke);
            }
            DrawCommand::Polygon {
                points,
                triangles,
                fill,
                stroke,
            } => {
                let points: Vec<Pos2> = points.iter().map(|p| *p + offset).collect();
                let mut mesh = egui::Mesh::default();
                for p in &points {
                    mesh.colored_vertex(*p, *fill);
                }
                mesh.indices = triangles.clone();
                painter.add(egui::Shape::mesh(mesh));
                painter.add(egui::Shape::closed_line(points, *stroke));
            }
            DrawCommand::Polyline { points, stroke } => {
                let points = points.iter().map(|p| *p + offset).collect();
                painter.add(egui::Shape::line(points, *stroke));
            }
            DrawCommand::Handle { rect } => {
                let rect = rect.translate(offset);
                painter.rect_filled(rect, 0.0, Color32::BLACK);
                painter.rect_stroke(rect, 0.0, Stroke::new(1.0, HANDLE_COLOR));
            }
        }
    }
}
