// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! Wires the panels to the [`Annotator`], loads images on a background
//! thread, coalesces container resizes and pumps the mirrored render
//! surface once per frame.

use crate::engine::{Annotator, Command};
use crate::io::media::{self, LoadedImage, SUPPORTED_EXTENSIONS};
use crate::io::serialization;
use crate::io::store::JsonStore;
use crate::models::inspect::CycleDirection;
use crate::models::region_set::AnnoFile;
use crate::relay::{paint_channel, RenderSurface};
use crate::render::Palette;
use crate::settings::Settings;
use crate::ui::{canvas, files, properties, toolbar};
use crate::util::debounce::Coalescer;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Files decoded by the background loader.
type LoadBatch = Vec<(AnnoFile, Option<LoadedImage>)>;

pub struct AnnoApp {
    settings: Settings,
    annotator: Annotator,
    surface: RenderSurface,
    show_surface: bool,

    files: Vec<AnnoFile>,
    textures: HashMap<String, egui::TextureHandle>,

    canvas: canvas::CanvasState,
    /// Container size last handed to the engine.
    container: (u32, u32),
    resize: Coalescer<(u32, u32)>,

    /// Receiver for background image loading
    image_loader: Option<Receiver<LoadBatch>>,
    loading_message: Option<String>,
}

impl AnnoApp {
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(JsonStore::new(&settings.output_dir));
        let palette = Palette::new(settings.segmentation_labels.clone());
        let (relay, surface) = paint_channel(settings.relay_window(), palette);
        let resize = Coalescer::new(settings.relay_window());

        Self {
            annotator: Annotator::new(settings.clone(), store, relay),
            settings,
            surface,
            show_surface: false,
            files: Vec::new(),
            textures: HashMap::new(),
            canvas: canvas::CanvasState::default(),
            container: (800, 600),
            resize,
            image_loader: None,
            loading_message: None,
        }
    }

    /// Decode files in the background; results are picked up in `update`.
    fn open_files(&mut self, paths: Vec<PathBuf>) {
        let (sender, receiver) = channel();
        self.image_loader = Some(receiver);
        self.loading_message = Some(format!("Loading {} file(s)...", paths.len()));
        let bound = self.settings.max_resolution;

        std::thread::spawn(move || {
            let batch: LoadBatch = paths.iter().map(|p| media::open_file(p, bound)).collect();
            let _ = sender.send(batch);
        });
    }

    fn receive_loaded(&mut self, ctx: &egui::Context, batch: LoadBatch) {
        let mut first = None;

        for (file, image) in batch {
            if let Some(img) = image {
                let size = [img.width as usize, img.height as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &img.pixels);
                let texture = ctx.load_texture(file.id(), color_image, egui::TextureOptions::LINEAR);
                self.textures.insert(file.id().to_string(), texture);
            }

            let idx = match self.files.iter().position(|f| f.id() == file.id()) {
                Some(idx) => {
                    self.files[idx] = file;
                    idx
                }
                None => {
                    self.files.push(file);
                    self.files.len() - 1
                }
            };
            first.get_or_insert(idx);
        }

        log::info!("{} file(s) in list", self.files.len());
        if let Some(idx) = first {
            self.select_file(idx);
        }
    }

    fn select_file(&mut self, idx: usize) {
        let Some(file) = self.files.get(idx).cloned() else {
            return;
        };
        let has_image = self.textures.contains_key(file.id());
        self.annotator.activate_file(file, has_image, self.container);
    }

    fn remove_file(&mut self, idx: usize) {
        if idx >= self.files.len() {
            return;
        }
        let file = self.files.remove(idx);
        self.textures.remove(file.id());
        self.annotator.close_file(file.id());
        log::info!("Removed {} from list", file.name);
    }

    fn export_annotations(&mut self, path: PathBuf) {
        let Some(regions) = self.annotator.active_regions() else {
            return;
        };
        match serialization::export(regions, &path) {
            Ok(()) => log::info!("Exported annotations to {}", path.display()),
            Err(e) => {
                log::error!("Failed to export annotations: {:#}", e);
                self.annotator.show_banner(format!("Export failed: {e}"));
            }
        }
    }

    fn active_texture(&self) -> Option<egui::TextureId> {
        let session = self.annotator.session()?;
        self.textures.get(session.file.id()).map(|t| t.id())
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.annotator.command(Command::Cancel);
        }

        // Skip while a text field is focused so typing a name does not
        // trigger shortcuts
        if ctx.wants_keyboard_input() {
            return;
        }

        let bindings = [
            (egui::Key::Space, Command::Save),
            (egui::Key::Plus, Command::ZoomIn),
            (egui::Key::Equals, Command::ZoomIn),
            (egui::Key::Minus, Command::ZoomOut),
            (egui::Key::M, Command::ToggleMode),
            (egui::Key::I, Command::ToggleInspect),
            (egui::Key::ArrowRight, Command::Cycle(CycleDirection::Increase)),
            (egui::Key::ArrowLeft, Command::Cycle(CycleDirection::Decrease)),
            (egui::Key::Delete, Command::RemoveActive),
        ];
        for (key, command) in bindings {
            if ctx.input(|i| i.key_pressed(key)) {
                self.annotator.command(command);
            }
        }
    }

    /// Forward container size changes to the engine at most once per
    /// coalescing window.
    fn track_container(&mut self, container: (u32, u32), now: Instant) {
        let released = if container != self.container {
            self.resize.push(container, now)
        } else {
            // Back at the applied size
            self.resize.flush();
            None
        };
        if let Some(size) = released.or_else(|| self.resize.poll(now)) {
            self.container = size;
            self.annotator.resize(size);
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open Images...").clicked() {
                    if let Some(paths) = rfd::FileDialog::new()
                        .add_filter("Images", SUPPORTED_EXTENSIONS)
                        .pick_files()
                    {
                        self.open_files(paths);
                    }
                    ui.close_menu();
                }
                ui.separator();
                let can_export = self.annotator.active_regions().is_some();
                ui.add_enabled_ui(can_export, |ui| {
                    ui.menu_button("Export Annotations", |ui| {
                        if ui.button("Export as YAML...").clicked() {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("YAML", &["yaml", "yml"])
                                .set_file_name("annotations.yaml")
                                .save_file()
                            {
                                self.export_annotations(path);
                            }
                            ui.close_menu();
                        }
                        if ui.button("Export as JSON...").clicked() {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("JSON", &["json"])
                                .set_file_name("annotations.json")
                                .save_file()
                            {
                                self.export_annotations(path);
                            }
                            ui.close_menu();
                        }
                    });
                });
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("Edit", |ui| {
                if ui.button("Clear Annotations").clicked() {
                    self.annotator.clear_annotations();
                    ui.close_menu();
                }
                if ui.button("Delete Inspected (Del)").clicked() {
                    self.annotator.command(Command::RemoveActive);
                    ui.close_menu();
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Zoom In (+)").clicked() {
                    self.annotator.command(Command::ZoomIn);
                    ui.close_menu();
                }
                if ui.button("Zoom Out (-)").clicked() {
                    self.annotator.command(Command::ZoomOut);
                    ui.close_menu();
                }
                ui.separator();
                ui.checkbox(&mut self.show_surface, "Render Surface");
            });
        });
    }
}

impl eframe::App for AnnoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        // Check for completed image loading
        if let Some(ref receiver) = self.image_loader {
            if let Ok(batch) = receiver.try_recv() {
                self.image_loader = None;
                self.loading_message = None;
                self.receive_loaded(ctx, batch);
            }
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| self.menu_bar(ctx, ui));

        let toolbar_state = toolbar::ToolbarState {
            task: self.annotator.task(),
            option: self.annotator.region_option(),
            mode: self.annotator.session().map(|s| s.mode),
            zoom: self.annotator.session().map(|s| s.viewport.zoom()),
            inspect_on: self.annotator.session().is_some_and(|s| s.inspect.is_on),
        };
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| toolbar::show(ui, &toolbar_state))
            .inner;
        match toolbar_action {
            toolbar::ToolbarAction::SetTask(task) => self.annotator.set_task(task),
            toolbar::ToolbarAction::SetRegionOption(option) => self.annotator.set_region_option(option),
            toolbar::ToolbarAction::Command(command) => self.annotator.command(command),
            toolbar::ToolbarAction::None => {}
        }

        let active_id = self.annotator.session().map(|s| s.file.id().to_string());
        let files_action = egui::SidePanel::left("files")
            .default_width(200.0)
            .show(ctx, |ui| files::show(ui, &self.files, active_id.as_deref()))
            .inner;
        match files_action {
            files::FilesAction::Select(idx) => self.select_file(idx),
            files::FilesAction::Remove(idx) => self.remove_file(idx),
            files::FilesAction::None => {}
        }

        let properties_action = egui::SidePanel::right("properties")
            .default_width(250.0)
            .show(ctx, |ui| properties::show(ui, &self.annotator, &self.settings))
            .inner;
        match properties_action {
            properties::PropertiesAction::SetLabel(label) => self.annotator.set_label(label),
            properties::PropertiesAction::Select(idx) => self.annotator.select_region(idx),
            properties::PropertiesAction::EditName(name) => self.annotator.edit_active_name(name),
            properties::PropertiesAction::CommitName(latest) => self.annotator.commit_active_name(latest),
            properties::PropertiesAction::Remove(idx) => self.annotator.remove_region(idx),
            properties::PropertiesAction::Clear => self.annotator.clear_annotations(),
            properties::PropertiesAction::ToggleClass(class) => self.annotator.toggle_class(&class),
            properties::PropertiesAction::None => {}
        }

        self.handle_keys(ctx);

        if let Some(banner) = self.annotator.banner() {
            let message = banner.message.clone();
            egui::TopBottomPanel::bottom("banner").show(ctx, |ui| {
                ui.colored_label(egui::Color32::LIGHT_RED, message);
            });
        }

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| canvas::show_status(ui, &self.annotator));

        let texture = self.active_texture();
        let response = egui::CentralPanel::default()
            .show(ctx, |ui| {
                if let Some(ref message) = self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.spinner();
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new(message)
                                    .size(16.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                        });
                    });
                    None
                } else {
                    Some(canvas::show(ui, &mut self.canvas, &mut self.annotator, texture))
                }
            })
            .inner;

        if let Some(response) = response {
            for event in response.events {
                self.annotator.handle_input(event);
            }
            self.track_container(response.container, now);
        }

        self.annotator.tick(now);
        if self.surface.pump() && self.show_surface {
            ctx.request_repaint();
        }
        let acks = self.annotator.take_acks();
        if acks > 0 {
            log::trace!("Render surface acknowledged {} update(s)", acks);
        }

        if self.show_surface {
            let texture = self.active_texture();
            canvas::show_render_surface(ctx, &mut self.show_surface, &self.surface, texture);
        }

        if self.annotator.needs_repaint() {
            ctx.request_repaint();
        } else if self.loading_message.is_some() || self.resize.has_pending() || self.annotator.is_settling() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}
