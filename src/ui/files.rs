// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Opened file list.

use crate::models::region_set::AnnoFile;

pub enum FilesAction {
    None,
    Select(usize),
    Remove(usize),
}

pub fn show(ui: &mut egui::Ui, files: &[AnnoFile], active: Option<&str>) -> FilesAction {
    let mut action = FilesAction::None;

    ui.heading("Files");
    ui.separator();

    if files.is_empty() {
        ui.label(egui::RichText::new("No files opened").weak());
        return action;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        for (idx, file) in files.iter().enumerate() {
            ui.horizontal(|ui| {
                let selected = active == Some(file.id());
                let text = if file.accepts_input() {
                    egui::RichText::new(&file.name)
                } else {
                    egui::RichText::new(format!("⚠ {}", file.name)).color(egui::Color32::LIGHT_RED)
                };
                let response = ui.selectable_label(selected, text);
                let response = if file.invalid {
                    response.on_hover_text("File is missing or could not be decoded")
                } else if file.not_fit {
                    response.on_hover_text(format!("{}x{} exceeds the maximum resolution", file.width, file.height))
                } else {
                    response.on_hover_text(format!("{}x{}", file.width, file.height))
                };
                if response.clicked() {
                    action = FilesAction::Select(idx);
                }
                if ui.small_button("✖").on_hover_text("Remove from list").clicked() {
                    action = FilesAction::Remove(idx);
                }
            });
        }
    });

    action
}
