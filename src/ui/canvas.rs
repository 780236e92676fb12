// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Capture surface and mirrored render surface.
//!
//! The capture surface letterboxes the image inside the central panel,
//! turns raw pointer input into [`InputEvent`]s in canvas-local display
//! space and paints the engine's display list. The render surface paints
//! whatever the relay mirrored, inside its own scrollable window.

use crate::engine::{Annotator, InputEvent, Mode};
use crate::relay::RenderSurface;
use crate::render;
use crate::util::geometry::surface_point;

/// Pointer state carried between frames.
#[derive(Debug, Default)]
pub struct CanvasState {
    hovered: bool,
}

/// What the capture surface observed this frame.
pub struct CanvasResponse {
    /// Size of the area the canvas is letterboxed into.
    pub container: (u32, u32),
    pub events: Vec<InputEvent>,
}

/// Display the capture surface and collect pointer input.
pub fn show(
    ui: &mut egui::Ui,
    state: &mut CanvasState,
    annotator: &mut Annotator,
    texture: Option<egui::TextureId>,
) -> CanvasResponse {
    let available = ui.available_size();
    let container = (available.x.max(1.0) as u32, available.y.max(1.0) as u32);
    let mut events = Vec::new();

    let Some(viewport) = annotator.session().map(|s| s.viewport.clone()) else {
        show_welcome(ui);
        return CanvasResponse { container, events };
    };

    let origin = ui.min_rect().min + egui::vec2(viewport.letterbox_left as f32, viewport.letterbox_top as f32);
    let rect = egui::Rect::from_min_size(origin, egui::vec2(viewport.canvas_w as f32, viewport.canvas_h as f32));
    ui.allocate_rect(egui::Rect::from_min_size(ui.min_rect().min, available), egui::Sense::hover());
    let response = ui.interact(rect, ui.id().with("capture_surface"), egui::Sense::click_and_drag());

    let (pos, pressed, released, moved) = ui.input(|i| {
        (
            i.pointer.hover_pos(),
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.delta() != egui::Vec2::ZERO,
        )
    });
    let inside = pos.filter(|p| rect.contains(*p));

    match inside {
        Some(p) => {
            let point = surface_point(p.x - origin.x, p.y - origin.y);
            if pressed {
                events.push(InputEvent::PointerDown(point));
            }
            if moved {
                events.push(InputEvent::PointerMove(point));
            }
            if released {
                events.push(InputEvent::PointerUp(point));
            }
        }
        None if state.hovered => events.push(InputEvent::PointerLeave),
        None => {}
    }
    state.hovered = inside.is_some();

    let mode = annotator.session().map_or(Mode::Capture, |s| s.mode);
    if response.hovered() {
        ui.ctx().set_cursor_icon(match mode {
            Mode::Pan => egui::CursorIcon::Grab,
            Mode::Capture => egui::CursorIcon::Crosshair,
        });
    }

    let painter = ui.painter_at(rect);
    render::paint(&painter, origin, annotator.frame(), texture);

    CanvasResponse { container, events }
}

/// Status line under the canvas.
pub fn show_status(ui: &mut egui::Ui, annotator: &Annotator) {
    ui.horizontal(|ui| {
        let Some(session) = annotator.session() else {
            ui.label("No file loaded");
            return;
        };
        ui.label(format!("{}  {}x{}", session.file.name, session.file.width, session.file.height));
        ui.separator();
        ui.label(format!("Task: {}", annotator.task()));
        ui.separator();
        ui.label(format!("Mode: {:?}", session.mode));
        if session.capture_active() {
            ui.label(egui::RichText::new("drawing").italics());
        }
        ui.separator();
        ui.label(format!("Zoom: {:.0}%", session.viewport.zoom() * 100.0));
        if session.inspect.is_on {
            ui.separator();
            ui.label(format!("Inspect: {}", session.inspect.active_index));
        }
        if !session.file.accepts_input() {
            ui.separator();
            ui.colored_label(egui::Color32::LIGHT_RED, "Annotation disabled for this file");
        }
    });
}

/// Window hosting the mirrored render surface.
pub fn show_render_surface(
    ctx: &egui::Context,
    open: &mut bool,
    surface: &RenderSurface,
    texture: Option<egui::TextureId>,
) {
    egui::Window::new("Render surface")
        .open(open)
        .default_size([640.0, 480.0])
        .show(ctx, |ui| {
            let Some(viewport) = surface.viewport() else {
                ui.label("Nothing to render");
                return;
            };
            if surface.dropped() > 0 {
                ui.label(egui::RichText::new(format!("{} stale message(s) dropped", surface.dropped())).weak());
            }
            egui::ScrollArea::both().show(ui, |ui| {
                let size = egui::vec2(viewport.canvas_w as f32, viewport.canvas_h as f32);
                let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
                let painter = ui.painter_at(rect);
                render::paint(&painter, rect.min, surface.display(), texture);
            });
        });
}

fn show_welcome(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("Annomix")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.label(
                egui::RichText::new("Classification, region and segmentation labeling")
                    .size(14.0)
                    .color(egui::Color32::from_gray(150)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("File → Open Images... to begin annotating")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}
