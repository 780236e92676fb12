// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar with task, region option, mode and zoom controls.

use crate::engine::{Command, Mode};
use crate::models::region_set::{RegionOption, Task};

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    SetTask(Task),
    SetRegionOption(RegionOption),
    Command(Command),
}

/// What the toolbar reflects.
pub struct ToolbarState {
    pub task: Task,
    pub option: RegionOption,
    pub mode: Option<Mode>,
    pub zoom: Option<f64>,
    pub inspect_on: bool,
}

pub fn show(ui: &mut egui::Ui, state: &ToolbarState) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Task:");
        for task in Task::ALL {
            if ui.selectable_label(state.task == task, task.to_string()).clicked() && state.task != task {
                action = ToolbarAction::SetTask(task);
            }
        }

        if state.task == Task::Region {
            ui.separator();
            if ui.selectable_label(state.option == RegionOption::BoundingBox, "▭ Box").clicked() {
                action = ToolbarAction::SetRegionOption(RegionOption::BoundingBox);
            }
            if ui.selectable_label(state.option == RegionOption::Polygon, "▱ Polygon").clicked() {
                action = ToolbarAction::SetRegionOption(RegionOption::Polygon);
            }
        }

        let Some(mode) = state.mode else {
            return;
        };

        ui.separator();
        if ui.selectable_label(mode == Mode::Pan, "✋ Pan (M)").clicked() {
            action = ToolbarAction::Command(Command::ToggleMode);
        }
        if ui.selectable_label(state.inspect_on, "🔍 Inspect (I)").clicked() {
            action = ToolbarAction::Command(Command::ToggleInspect);
        }

        ui.separator();
        if ui.button("−").on_hover_text("Zoom out (-)").clicked() {
            action = ToolbarAction::Command(Command::ZoomOut);
        }
        if let Some(zoom) = state.zoom {
            ui.label(format!("{:.0}%", zoom * 100.0));
        }
        if ui.button("+").on_hover_text("Zoom in (+)").clicked() {
            action = ToolbarAction::Command(Command::ZoomIn);
        }

        ui.separator();
        let hint = match (state.task, mode, state.option) {
            (_, Mode::Pan, _) => "Drag to move the zoomed image",
            (Task::Classification, ..) => "Assign classes in the side panel",
            (Task::Region, _, RegionOption::BoundingBox) => "Click two corners or drag; Esc cancels",
            _ => "Click to add vertices, Space saves, Esc cancels",
        };
        ui.label(egui::RichText::new(hint).italics().weak());
    });

    action
}
