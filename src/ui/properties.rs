// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation properties panel.
//!
//! Lists the shapes of the active file with their names, and hosts the
//! class checkboxes of the classification task. Only the inspected shape
//! is renamable; its name is applied on Enter or focus loss.

use crate::engine::Annotator;
use crate::models::region_set::Task;
use crate::settings::Settings;

/// Result of properties panel interaction.
pub enum PropertiesAction {
    None,
    SetLabel(String),
    Select(usize),
    /// Draft name for the inspected shape.
    EditName(String),
    /// Apply the draft, with the final text if it changed this frame.
    CommitName(Option<String>),
    Remove(usize),
    Clear,
    ToggleClass(String),
}

pub fn show(ui: &mut egui::Ui, annotator: &Annotator, settings: &Settings) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading("Properties");
    ui.separator();

    let Some(session) = annotator.session() else {
        ui.label(egui::RichText::new("No file loaded").weak());
        return action;
    };
    let task = annotator.task();
    let regions = annotator.active_regions();

    if !task.captures_shapes() {
        ui.label("Classes");
        if settings.classification_classes.is_empty() {
            ui.label(egui::RichText::new("No classes configured").weak());
        }
        for class in &settings.classification_classes {
            let mut checked = regions.is_some_and(|r| r.assigned.contains(class));
            let enabled = session.file.accepts_input();
            if ui.add_enabled(enabled, egui::Checkbox::new(&mut checked, class.as_str())).changed() {
                action = PropertiesAction::ToggleClass(class.clone());
            }
        }
        return action;
    }

    let choices = match task {
        Task::Segmentation => &settings.segmentation_labels,
        _ => &settings.region_attributes,
    };
    if !choices.is_empty() {
        let selected = if annotator.label().is_empty() { "(none)" } else { annotator.label() };
        egui::ComboBox::from_label(if task == Task::Segmentation { "Label" } else { "Attribute" })
            .selected_text(selected)
            .show_ui(ui, |ui| {
                if ui.selectable_label(annotator.label().is_empty(), "(none)").clicked() {
                    action = PropertiesAction::SetLabel(String::new());
                }
                for choice in choices {
                    if ui.selectable_label(annotator.label() == choice, choice.as_str()).clicked() {
                        action = PropertiesAction::SetLabel(choice.clone());
                    }
                }
            });
        ui.separator();
    }

    let Some(regions) = regions.filter(|r| !r.regions.is_empty()) else {
        ui.label(egui::RichText::new("No annotations yet").weak());
        return action;
    };

    ui.label(format!("{} annotation(s)", regions.regions.len()));
    let active = session.inspect.active_region(regions.regions.len());

    egui::ScrollArea::vertical().max_height((ui.available_height() - 40.0).max(0.0)).show(ui, |ui| {
        for (idx, shape) in regions.regions.iter().enumerate() {
            ui.horizontal(|ui| {
                let label = format!("{} {}", shape.kind_label(), idx + 1);
                if ui.selectable_label(active == Some(idx), label).clicked() {
                    action = PropertiesAction::Select(idx);
                }
                if session.inspect.is_on && active == Some(idx) {
                    let mut name = session
                        .inspect
                        .pending_edit
                        .clone()
                        .unwrap_or_else(|| shape.attributes().name.clone());
                    let response = ui.add(egui::TextEdit::singleline(&mut name).desired_width(100.0));
                    if response.lost_focus() {
                        action = PropertiesAction::CommitName(response.changed().then_some(name));
                    } else if response.changed() {
                        action = PropertiesAction::EditName(name);
                    }
                } else {
                    let name = &shape.attributes().name;
                    ui.label(egui::RichText::new(if name.is_empty() { "unnamed" } else { name.as_str() }).weak());
                }
                if ui.small_button("🗑").on_hover_text("Remove").clicked() {
                    action = PropertiesAction::Remove(idx);
                }
            });
        }
    });

    ui.separator();
    if ui.button("Clear annotations").clicked() {
        action = PropertiesAction::Clear;
    }

    action
}
