// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation engine.
//!
//! Owns the per-file session (viewport, capture machine, inspect state
//! and region sets), turns pointer and keyboard input into state changes,
//! and fans the results out to the renderer, the persistence queue and
//! the paint relay. Everything here runs on the UI thread, one event at a
//! time.

use crate::capture::{Capture, CaptureMode, Step};
use crate::io::persistence::PersistenceQueue;
use crate::io::store::AnnotationStore;
use crate::models::annotation::{Point, Shape};
use crate::models::inspect::{CycleDirection, InspectState};
use crate::models::region_set::{AnnoFile, RegionOption, RegionSet, Task};
use crate::models::viewport::{PanGesture, Viewport};
use crate::relay::{FileView, PaintRelay, RelayEvent};
use crate::render::{render, DrawCommand, Palette, RenderInput};
use crate::settings::Settings;
use crate::util::geometry::{to_model, Recorded};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a banner message stays visible.
pub const BANNER_DURATION: Duration = Duration::from_secs(4);

/// Pointer input on the capture surface, in display space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    PointerLeave,
}

/// Keyboard and toolbar commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Cancel,
    Save,
    ZoomIn,
    ZoomOut,
    ToggleMode,
    ToggleInspect,
    Cycle(CycleDirection),
    RemoveActive,
}

/// Pointer drags either annotate or move the image, never both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Capture,
    Pan,
}

/// Transient message shown over the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub message: String,
    pub shown_at: Instant,
}

/// Everything tied to the file being annotated.
pub struct FileSession {
    pub file: AnnoFile,
    pub has_image: bool,
    pub viewport: Viewport,
    pub mode: Mode,
    pub inspect: InspectState,
    capture: Option<Capture>,
    pan: Option<PanGesture>,
    region_sets: HashMap<Task, RegionSet>,
}

impl FileSession {
    pub fn regions(&self, task: Task) -> Option<&RegionSet> {
        self.region_sets.get(&task)
    }

    pub fn capture_active(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| c.is_active())
    }

    fn recorded(&self, task: Task) -> Recorded {
        match self.region_sets.get(&task) {
            Some(set) if set.width > 0 && set.height > 0 => Recorded::new(set.width, set.height),
            _ => Recorded::new(self.viewport.source_width, self.viewport.source_height),
        }
    }
}

pub struct Annotator {
    settings: Settings,
    store: Arc<dyn AnnotationStore>,
    persistence: PersistenceQueue,
    relay: PaintRelay,
    palette: Palette,
    session: Option<FileSession>,
    task: Task,
    option: RegionOption,
    /// Attribute or label name given to new shapes.
    label: String,
    display: Vec<DrawCommand>,
    dirty: bool,
    banner: Option<Banner>,
    now: Instant,
}

impl Annotator {
    pub fn new(settings: Settings, store: Arc<dyn AnnotationStore>, relay: PaintRelay) -> Self {
        let palette = Palette::new(settings.segmentation_labels.clone());
        Self {
            persistence: PersistenceQueue::new(Arc::clone(&store)),
            settings,
            store,
            relay,
            palette,
            session: None,
            task: Task::Region,
            option: RegionOption::BoundingBox,
            label: String::new(),
            display: Vec::new(),
            dirty: true,
            banner: None,
            now: Instant::now(),
        }
    }

    pub fn session(&self) -> Option<&FileSession> {
        self.session.as_ref()
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn region_option(&self) -> RegionOption {
        self.option
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Region set of the active file under the current task.
    pub fn active_regions(&self) -> Option<&RegionSet> {
        self.session.as_ref().and_then(|s| s.regions(self.task))
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    /// Advance the clock: release coalesced relay messages, collect save
    /// outcomes and expire the banner.
    pub fn tick(&mut self, now: Instant) {
        self.now = now;
        self.relay.tick(now);

        for outcome in self.persistence.poll() {
            match outcome.result {
                Ok(()) => log::info!("Saved {} annotations for {}", outcome.task.key(), outcome.file_id),
                Err(e) => {
                    log::error!("Failed to save {} annotations for {}: {}", outcome.task.key(), outcome.file_id, e);
                    self.show_banner(format!("Could not save annotations: {e}"));
                }
            }
        }

        if self
            .banner
            .as_ref()
            .is_some_and(|b| now.saturating_duration_since(b.shown_at) >= BANNER_DURATION)
        {
            self.banner = None;
        }
    }

    /// Repaint acknowledgements from the render surface.
    pub fn take_acks(&self) -> usize {
        self.relay.take_acks()
    }

    /// Send every held relay message now.
    pub fn flush_relay(&mut self) {
        self.relay.flush();
    }

    /// Display list for this frame, rebuilt only when something changed.
    pub fn frame(&mut self) -> &[DrawCommand] {
        if self.dirty {
            self.dirty = false;
            self.display = match &self.session {
                Some(session) => {
                    let empty;
                    let regions = match session.region_sets.get(&self.task) {
                        Some(set) => set,
                        None => {
                            empty = RegionSet::new(&session.file);
                            &empty
                        }
                    };
                    let preview = session.capture.as_ref().and_then(|c| c.preview());
                    render(&RenderInput {
                        task: self.task,
                        has_image: session.has_image,
                        regions,
                        preview: preview.as_ref(),
                        inspect: &session.inspect,
                        viewport: &session.viewport,
                        palette: &self.palette,
                    })
                }
                None => Vec::new(),
            };
        }
        &self.display
    }

    pub fn needs_repaint(&self) -> bool {
        self.dirty
    }

    fn request_repaint(&mut self) {
        self.dirty = true;
    }

    /// Whether background work is still pending and the UI should keep
    /// ticking without input.
    pub fn is_settling(&self) -> bool {
        self.relay.has_pending() || self.persistence.in_flight() > 0 || self.banner.is_some()
    }

    pub fn show_banner(&mut self, message: String) {
        self.banner = Some(Banner {
            message,
            shown_at: self.now,
        });
    }

    fn notify(&mut self, event: RelayEvent) {
        self.relay.notify(event, self.now);
    }

    // ------------------------------------------------------------------
    // File and task selection
    // ------------------------------------------------------------------

    /// Make `file` the annotation target, fitted into `container`.
    pub fn activate_file(&mut self, file: AnnoFile, has_image: bool, container: (u32, u32)) {
        log::info!("Activating {} ({}x{})", file.name, file.width, file.height);
        if !file.accepts_input() {
            log::warn!("{} is not a valid capture target (invalid: {}, notFit: {})", file.name, file.invalid, file.not_fit);
        }

        let viewport = Viewport::fit(file.width, file.height, container.0, container.1, self.settings.zoom);
        let mut session = FileSession {
            file,
            has_image,
            viewport,
            mode: Mode::Capture,
            inspect: InspectState::default(),
            capture: None,
            pan: None,
            region_sets: HashMap::new(),
        };
        session.capture = CaptureMode::for_task(self.task, self.option).map(Capture::new);
        self.session = Some(session);
        self.ensure_loaded(self.task);

        if let Some(view) = self.file_view() {
            self.notify(RelayEvent::ViewFile(Some(view)));
        }
        self.request_repaint();
    }

    /// Forget the active file if it is `file_id`.
    pub fn close_file(&mut self, file_id: &str) {
        if self.session.as_ref().is_some_and(|s| s.file.id() == file_id) {
            log::info!("Closing {}", file_id);
            self.session = None;
            self.notify(RelayEvent::ViewFile(None));
            self.request_repaint();
        }
    }

    pub fn set_task(&mut self, task: Task) {
        if task == self.task {
            return;
        }
        self.cancel_capture();
        self.task = task;
        self.label.clear();
        self.ensure_loaded(task);

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.inspect = InspectState::default();
        session.capture = CaptureMode::for_task(task, self.option).map(Capture::new);

        let event = RelayEvent::SetTask {
            file_id: session.file.id().to_string(),
            task,
            regions: session.region_sets.get(&task).cloned().unwrap_or_else(|| RegionSet::new(&session.file)),
        };
        self.notify(event);
        self.request_repaint();
    }

    /// Change the region task option; an in-progress shape of the other
    /// kind is discarded.
    pub fn set_region_option(&mut self, option: RegionOption) {
        self.option = option;
        let Some(mode) = CaptureMode::for_task(self.task, option) else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let discarded = match session.capture.as_mut() {
            Some(capture) => capture.ensure_mode(mode),
            None => {
                session.capture = Some(Capture::new(mode));
                false
            }
        };
        if discarded {
            log::debug!("Task option changed; discarded capture session");
            self.notify_stop();
            self.request_repaint();
        }
    }

    /// Load the region set for `task` if this session has not yet.
    fn ensure_loaded(&mut self, task: Task) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.region_sets.contains_key(&task) {
            return;
        }

        let file = session.file.clone();
        let set = match self.store.load_region_set(file.id(), task) {
            Ok(Some(mut set)) => {
                if set.width == 0 || set.height == 0 {
                    set.width = file.width;
                    set.height = file.height;
                }
                log::info!("Loaded {} {} annotations for {}", set.regions.len(), task.key(), file.name);
                set
            }
            Ok(None) => RegionSet::new(&file),
            Err(e) => {
                log::error!("Failed to load {} annotations for {}: {}", task.key(), file.name, e);
                self.show_banner(format!("Could not load annotations: {e}"));
                RegionSet::new(&file)
            }
        };

        if let Some(session) = self.session.as_mut() {
            session.region_sets.insert(task, set);
        }
    }

    fn file_view(&self) -> Option<FileView> {
        let session = self.session.as_ref()?;
        Some(FileView {
            file_id: session.file.id().to_string(),
            task: self.task,
            has_image: session.has_image,
            viewport: session.viewport.clone(),
            regions: session
                .region_sets
                .get(&self.task)
                .cloned()
                .unwrap_or_else(|| RegionSet::new(&session.file)),
            inspect: session.inspect.clone(),
        })
    }

    /// Refit after the canvas container changed size.
    pub fn resize(&mut self, container: (u32, u32)) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let before = session.viewport.clone();
        session.viewport.refit(container.0, container.1);
        if session.viewport == before {
            return;
        }

        let event = RelayEvent::Resolution {
            file_id: session.file.id().to_string(),
            viewport: session.viewport.clone(),
        };
        self.notify(event);
        self.request_repaint();
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    pub fn handle_input(&mut self, event: InputEvent) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if !session.file.accepts_input() {
            return;
        }

        let mode = session.mode;
        match mode {
            Mode::Pan => self.handle_pan(event),
            Mode::Capture => self.handle_capture(event),
        }
    }

    fn handle_pan(&mut self, event: InputEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match event {
            InputEvent::PointerDown(p) => session.pan = Some(session.viewport.begin_pan(p)),
            InputEvent::PointerMove(p) => {
                let Some(gesture) = session.pan else {
                    return;
                };
                if session.viewport.pan_to(&gesture, p) {
                    let event = RelayEvent::SetFileOffset {
                        file_id: session.file.id().to_string(),
                        offset_left: session.viewport.offset_left,
                        offset_top: session.viewport.offset_top,
                    };
                    self.notify(event);
                    self.request_repaint();
                }
            }
            InputEvent::PointerUp(_) | InputEvent::PointerLeave => session.pan = None,
        }
    }

    fn handle_capture(&mut self, event: InputEvent) {
        let task = self.task;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let recorded = session.recorded(task);
        let viewport = &session.viewport;
        let Some(capture) = session.capture.as_mut() else {
            return;
        };

        let machine = capture.machine();
        let step = match event {
            InputEvent::PointerDown(p) => machine.pointer_down(to_model(p, viewport, recorded)),
            InputEvent::PointerMove(p) => machine.pointer_move(to_model(p, viewport, recorded)),
            InputEvent::PointerUp(p) => machine.pointer_up(to_model(p, viewport, recorded)),
            InputEvent::PointerLeave => machine.pointer_leave(),
        };
        self.apply_step(step);
    }

    pub fn command(&mut self, command: Command) {
        match command {
            Command::Cancel => {
                if let Some(step) = self.with_capture(|c| c.machine().cancel()) {
                    self.apply_step(step);
                }
            }
            Command::Save => {
                if let Some(step) = self.with_capture(|c| c.machine().save()) {
                    self.apply_step(step);
                }
            }
            Command::ZoomIn => self.zoom(true),
            Command::ZoomOut => self.zoom(false),
            Command::ToggleMode => {
                let next = match self.session.as_ref().map(|s| s.mode) {
                    Some(Mode::Capture) => Mode::Pan,
                    _ => Mode::Capture,
                };
                self.set_mode(next);
            }
            Command::ToggleInspect => {
                let on = !self.session.as_ref().is_some_and(|s| s.inspect.is_on);
                self.set_inspect(on);
            }
            Command::Cycle(direction) => self.cycle_inspect(direction),
            Command::RemoveActive => {
                let active = self.session.as_ref().and_then(|s| {
                    let count = s.regions(self.task).map_or(0, |r| r.regions.len());
                    s.inspect.active_region(count)
                });
                if let Some(idx) = active {
                    self.remove_region(idx);
                }
            }
        }
    }

    fn with_capture<R>(&mut self, f: impl FnOnce(&mut Capture) -> R) -> Option<R> {
        let session = self.session.as_mut()?;
        if !session.file.accepts_input() {
            return None;
        }
        session.capture.as_mut().map(f)
    }

    /// Switch between annotating and moving the image. Entering pan mode
    /// cancels any in-progress shape first.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Pan {
            self.cancel_capture();
        }
        if let Some(session) = self.session.as_mut() {
            session.mode = mode;
            session.pan = None;
            log::debug!("Mode: {:?}", mode);
        }
    }

    fn cancel_capture(&mut self) {
        if let Some(step) = self.with_capture(|c| if c.is_active() { c.machine().cancel() } else { Step::Ignored }) {
            self.apply_step(step);
        }
    }

    fn zoom(&mut self, zoom_in: bool) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let changed = if zoom_in {
            session.viewport.zoom_in()
        } else {
            session.viewport.zoom_out()
        };
        if !changed {
            return;
        }

        log::debug!("Zoom {:.1}", session.viewport.zoom());
        let event = RelayEvent::SetFileZoom {
            file_id: session.file.id().to_string(),
            zoom_level: session.viewport.zoom_level,
            offset_left: session.viewport.offset_left,
            offset_top: session.viewport.offset_top,
        };
        self.notify(event);
        self.request_repaint();
    }

    fn apply_step(&mut self, step: Step) {
        match step {
            Step::Ignored => {}
            Step::Began => self.relay_preview(true),
            Step::Updated => self.relay_preview(false),
            Step::Committed(shape) => {
                self.notify_stop();
                self.commit(shape);
            }
            Step::Cancelled => {
                log::debug!("Capture cancelled");
                self.notify_stop();
                self.request_repaint();
            }
        }
    }

    fn relay_preview(&mut self, began: bool) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(preview) = session.capture.as_ref().and_then(|c| c.preview()) else {
            return;
        };
        let file_id = session.file.id().to_string();
        let task = self.task;
        let event = if began {
            RelayEvent::BeginPaint { file_id, task, preview }
        } else {
            RelayEvent::ContinuePaint { file_id, task, preview }
        };
        self.notify(event);
        self.request_repaint();
    }

    fn notify_stop(&mut self) {
        if let Some(session) = self.session.as_ref() {
            let event = RelayEvent::StopPaint {
                file_id: session.file.id().to_string(),
                task: self.task,
            };
            self.notify(event);
        }
    }

    /// Append a finished shape, optimistically, then save in the
    /// background.
    fn commit(&mut self, mut shape: Shape) {
        shape.attributes_mut().name = self.label.clone();
        let task = self.task;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let set = session
            .region_sets
            .entry(task)
            .or_insert_with(|| RegionSet::new(&session.file));
        set.regions.push(shape);
        log::info!("Committed {} on {}, total: {}", set.regions.last().map_or("shape", |s| s.kind_label()), session.file.name, set.regions.len());

        self.regions_changed();
    }

    /// Relay, persist and repaint after the active region set changed.
    fn regions_changed(&mut self) {
        let task = self.task;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(set) = session.region_sets.get(&task) else {
            return;
        };
        let count = set.regions.len();
        let set = set.clone();
        let file_id = session.file.id().to_string();
        session.inspect.clamp(count);

        self.persistence.save(&file_id, task, set.clone());
        self.notify(RelayEvent::PaintAnnotations {
            file_id: file_id.clone(),
            task,
            regions: set,
        });
        if let Some(session) = self.session.as_ref() {
            let inspect = session.inspect.clone();
            self.notify(RelayEvent::SetInspect { file_id, inspect });
        }
        self.request_repaint();
    }

    // ------------------------------------------------------------------
    // Inspect and editing
    // ------------------------------------------------------------------

    pub fn set_inspect(&mut self, on: bool) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.inspect.set_on(on);
        self.notify_inspect();
    }

    pub fn cycle_inspect(&mut self, direction: CycleDirection) {
        let task = self.task;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.inspect.is_on {
            return;
        }
        let count = session.regions(task).map_or(0, |r| r.regions.len());
        session.inspect.cycle(direction, count);
        self.notify_inspect();
    }

    /// Select a shape directly by its zero-based index.
    pub fn select_region(&mut self, idx: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.inspect.set_on(true);
        session.inspect.active_index = idx + 1;
        session.inspect.pending_edit = None;
        self.notify_inspect();
    }

    /// Hold an uncommitted name for the inspected shape. Leaving inspect
    /// or moving to another shape discards it.
    pub fn edit_active_name(&mut self, text: String) {
        let task = self.task;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let count = session.regions(task).map_or(0, |r| r.regions.len());
        if session.inspect.active_region(count).is_some() {
            session.inspect.pending_edit = Some(text);
        }
    }

    /// Apply the held name, taking `latest` if the final keystroke came
    /// with the commit.
    pub fn commit_active_name(&mut self, latest: Option<String>) {
        let task = self.task;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let count = session.regions(task).map_or(0, |r| r.regions.len());
        let Some(idx) = session.inspect.active_region(count) else {
            return;
        };
        let Some(name) = latest.or_else(|| session.inspect.pending_edit.take()) else {
            return;
        };
        session.inspect.pending_edit = None;
        self.update_region_name(idx, &name);
    }

    fn notify_inspect(&mut self) {
        if let Some(session) = self.session.as_ref() {
            let event = RelayEvent::SetInspect {
                file_id: session.file.id().to_string(),
                inspect: session.inspect.clone(),
            };
            self.notify(event);
            self.request_repaint();
        }
    }

    pub fn remove_region(&mut self, idx: usize) {
        let task = self.task;
        let Some(set) = self.session.as_mut().and_then(|s| s.region_sets.get_mut(&task)) else {
            return;
        };
        if idx >= set.regions.len() {
            return;
        }
        set.regions.remove(idx);
        log::info!("Removed region {}, total: {}", idx + 1, set.regions.len());
        self.regions_changed();
    }

    pub fn update_region_name(&mut self, idx: usize, name: &str) {
        let task = self.task;
        let Some(set) = self.session.as_mut().and_then(|s| s.region_sets.get_mut(&task)) else {
            return;
        };
        let Some(shape) = set.regions.get_mut(idx) else {
            return;
        };
        if shape.attributes().name == name {
            return;
        }
        shape.attributes_mut().name = name.to_string();
        self.regions_changed();
    }

    /// Remove every annotation of the active file under the current task.
    pub fn clear_annotations(&mut self) {
        let task = self.task;
        let Some(set) = self.session.as_mut().and_then(|s| s.region_sets.get_mut(&task)) else {
            return;
        };
        if set.is_empty() {
            return;
        }
        set.clear();
        log::info!("Cleared {} annotations", task.key());
        self.regions_changed();
    }

    /// Assign or unassign a classification class on the active file.
    pub fn toggle_class(&mut self, class: &str) {
        if self.task != Task::Classification {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.file.accepts_input() {
            return;
        }
        let set = session
            .region_sets
            .entry(Task::Classification)
            .or_insert_with(|| RegionSet::new(&session.file));

        match set.assigned.iter().position(|c| c == class) {
            Some(i) => {
                set.assigned.remove(i);
            }
            None => set.assigned.push(class.to_string()),
        }
        self.regions_changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::persistence::testing::MemoryStore;
    use crate::models::annotation::{Attributes, BoundingBox, ModelPoint};
    use crate::util::geometry::to_display;
    use crate::relay::{paint_channel, RenderSurface};

    const SAVE_TIMEOUT: Duration = Duration::from_secs(5);

    fn file(width: u32, height: u32) -> AnnoFile {
        AnnoFile {
            name: "street.png".to_string(),
            path: "/images/street.png".to_string(),
            width,
            height,
            invalid: false,
            not_fit: false,
        }
    }

    fn annotator_with(store: Arc<MemoryStore>) -> (Annotator, RenderSurface) {
        let settings = Settings::default();
        let (relay, surface) = paint_channel(settings.relay_window(), Palette::default());
        (Annotator::new(settings, store, relay), surface)
    }

    fn annotator() -> (Annotator, RenderSurface, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let (annotator, surface) = annotator_with(store.clone());
        (annotator, surface, store)
    }

    fn down(annotator: &mut Annotator, x: i32, y: i32) {
        annotator.handle_input(InputEvent::PointerDown(Point::new(x, y)));
    }

    fn region_count(annotator: &Annotator) -> usize {
        annotator.active_regions().map_or(0, |r| r.regions.len())
    }

    #[test]
    fn test_box_commit_persists_model_space_shape() {
        let (mut annotator, _surface, store) = annotator();
        annotator.set_label("car");
        annotator.activate_file(file(800, 600), true, (400, 300));
        annotator.command(Command::ZoomIn);

        // Canvas is 400x300 for an 800x600 image; zoom 1.2 anchored at centre
        let vp = annotator.session().unwrap().viewport.clone();
        let recorded = Recorded::new(800, 600);
        let a = to_display(ModelPoint::new(100.0, 100.0), &vp, recorded);
        let b = to_display(ModelPoint::new(300.0, 250.0), &vp, recorded);

        down(&mut annotator, b.x, b.y);
        annotator.handle_input(InputEvent::PointerMove(a));
        annotator.handle_input(InputEvent::PointerUp(a));

        let set = annotator.active_regions().unwrap();
        assert_eq!(set.regions.len(), 1);
        match &set.regions[0] {
            Shape::BoundingBox(b) => {
                assert!((b.top_left_x - 100.0).abs() < 1.0);
                assert!((b.top_left_y - 100.0).abs() < 1.0);
                assert!((b.width - 200.0).abs() < 2.0);
                assert!((b.height - 150.0).abs() < 2.0);
                assert_eq!(b.attributes, Attributes::named("car"));
            }
            other => panic!("expected box, got {:?}", other),
        }

        annotator.persistence.wait(SAVE_TIMEOUT);
        let saved = store.get("/images/street.png", Task::Region).unwrap();
        assert_eq!(saved.regions.len(), 1);
        assert_eq!((saved.width, saved.height), (800, 600));
    }

    #[test]
    fn test_polygon_needs_three_vertices() {
        let (mut annotator, _surface, _store) = annotator();
        annotator.set_region_option(RegionOption::Polygon);
        annotator.activate_file(file(800, 600), true, (800, 600));

        down(&mut annotator, 10, 10);
        down(&mut annotator, 50, 10);
        annotator.command(Command::Save);
        assert_eq!(region_count(&annotator), 0);
        assert!(annotator.session().unwrap().capture_active());

        down(&mut annotator, 50, 50);
        annotator.command(Command::Save);
        assert_eq!(region_count(&annotator), 1);
        assert!(!annotator.session().unwrap().capture_active());
    }

    #[test]
    fn test_cancel_polygon_renders_only_committed_shapes() {
        let (mut annotator, _surface, _store) = annotator();
        annotator.activate_file(file(800, 600), true, (800, 600));

        // One committed box
        down(&mut annotator, 10, 10);
        down(&mut annotator, 60, 60);
        assert_eq!(region_count(&annotator), 1);
        let committed_only = annotator.frame().to_vec();

        annotator.set_region_option(RegionOption::Polygon);
        for (x, y) in [(100, 100), (200, 100), (200, 200), (100, 200)] {
            down(&mut annotator, x, y);
        }
        assert_ne!(annotator.frame(), committed_only.as_slice());

        annotator.command(Command::Cancel);
        assert_eq!(annotator.frame(), committed_only.as_slice());
        assert_eq!(region_count(&annotator), 1);
    }

    #[test]
    fn test_out_of_bounds_down_is_silently_ignored() {
        let (mut annotator, _surface, _store) = annotator();
        annotator.activate_file(file(800, 600), true, (800, 600));
        down(&mut annotator, -5, 20);
        down(&mut annotator, 900, 20);
        assert!(!annotator.session().unwrap().capture_active());
        assert_eq!(annotator.banner(), None);
    }

    #[test]
    fn test_leave_commits_box_with_last_corner() {
        let (mut annotator, _surface, _store) = annotator();
        annotator.activate_file(file(800, 600), true, (800, 600));
        down(&mut annotator, 10, 20);
        annotator.handle_input(InputEvent::PointerMove(Point::new(30, 50)));
        annotator.handle_input(InputEvent::PointerLeave);

        match &annotator.active_regions().unwrap().regions[..] {
            [Shape::BoundingBox(b)] => assert_eq!((b.width, b.height), (20.0, 30.0)),
            other => panic!("unexpected regions {:?}", other),
        }
    }

    #[test]
    fn test_pan_mode_cancels_capture_and_moves_image() {
        let (mut annotator, _surface, _store) = annotator();
        annotator.activate_file(file(800, 600), true, (800, 600));
        annotator.command(Command::ZoomIn);
        annotator.command(Command::ZoomIn);

        down(&mut annotator, 10, 10);
        assert!(annotator.session().unwrap().capture_active());

        annotator.command(Command::ToggleMode);
        let session = annotator.session().unwrap();
        assert_eq!(session.mode, Mode::Pan);
        assert!(!session.capture_active());
        let before = (session.viewport.offset_left, session.viewport.offset_top);

        down(&mut annotator, 100, 100);
        annotator.handle_input(InputEvent::PointerMove(Point::new(120, 90)));
        annotator.handle_input(InputEvent::PointerUp(Point::new(120, 90)));
        let vp = &annotator.session().unwrap().viewport;
        assert_eq!((vp.offset_left, vp.offset_top), (before.0 + 20, before.1 - 10));
        assert_eq!(region_count(&annotator), 0);

        annotator.command(Command::ZoomOut);
        annotator.command(Command::ZoomOut);
        let vp = &annotator.session().unwrap().viewport;
        assert_eq!((vp.offset_left, vp.offset_top), (0, 0));
    }

    #[test]
    fn test_failed_save_keeps_region_and_shows_banner() {
        let store = Arc::new(MemoryStore::failing());
        let (mut annotator, _surface) = annotator_with(store.clone());
        annotator.activate_file(file(800, 600), true, (800, 600));
        down(&mut annotator, 10, 10);
        down(&mut annotator, 60, 60);

        let deadline = Instant::now() + SAVE_TIMEOUT;
        while annotator.banner().is_none() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            annotator.tick(Instant::now());
        }
        let shown_at = annotator.banner().unwrap().shown_at;
        assert!(annotator.banner().unwrap().message.contains("disk full"));
        assert_eq!(region_count(&annotator), 1);

        annotator.tick(shown_at + BANNER_DURATION);
        assert!(annotator.banner().is_none());
        assert_eq!(region_count(&annotator), 1);
    }

    #[test]
    fn test_failed_load_starts_fresh_set_with_banner() {
        let store = Arc::new(MemoryStore::failing_loads());
        let (mut annotator, _surface) = annotator_with(store.clone());
        annotator.activate_file(file(800, 600), true, (800, 600));

        let banner = annotator.banner().unwrap();
        assert!(banner.message.contains("Could not load annotations"));
        assert!(banner.message.contains("truncated record"));
        assert_eq!(region_count(&annotator), 0);

        down(&mut annotator, 10, 10);
        down(&mut annotator, 60, 60);
        assert_eq!(region_count(&annotator), 1);
        annotator.persistence.wait(SAVE_TIMEOUT);
        assert_eq!(store.get("/images/street.png", Task::Region).unwrap().regions.len(), 1);
    }

    #[test]
    fn test_invalid_file_disables_capture() {
        let (mut annotator, _surface, _store) = annotator();
        let mut f = file(2560, 1440);
        f.not_fit = true;
        annotator.activate_file(f, true, (800, 600));

        down(&mut annotator, 10, 10);
        down(&mut annotator, 60, 60);
        assert_eq!(region_count(&annotator), 0);
        assert!(!annotator.session().unwrap().capture_active());

        // Still selectable and closable
        annotator.close_file("/images/street.png");
        assert!(annotator.session().is_none());
        assert!(annotator.frame().is_empty());
    }

    #[test]
    fn test_loads_existing_annotations_and_rescales() {
        let store = Arc::new(MemoryStore::default());
        let mut stored = RegionSet::new(&file(800, 600));
        stored.regions.push(Shape::BoundingBox(BoundingBox {
            top_left_x: 10.0,
            top_left_y: 10.0,
            width: 40.0,
            height: 30.0,
            attributes: Attributes::default(),
        }));
        store
            .records
            .lock()
            .unwrap()
            .insert(("/images/street.png".to_string(), Task::Region), stored);

        let (mut annotator, _surface) = annotator_with(store);
        annotator.activate_file(file(1600, 1200), true, (1600, 1200));

        let frame = annotator.frame();
        match &frame[2] {
            DrawCommand::Rect { rect, .. } => {
                assert_eq!(*rect, egui::Rect::from_min_max(egui::pos2(20.0, 20.0), egui::pos2(100.0, 80.0)));
            }
            other => panic!("expected rect, got {:?}", other),
        }
    }

    #[test]
    fn test_inspect_cycle_and_remove() {
        let (mut annotator, _surface, _store) = annotator();
        annotator.activate_file(file(800, 600), true, (800, 600));
        for x in [10, 100, 200] {
            down(&mut annotator, x, 10);
            down(&mut annotator, x + 50, 60);
        }
        assert_eq!(region_count(&annotator), 3);

        // Cycling does nothing until inspect is on
        annotator.command(Command::Cycle(CycleDirection::Increase));
        assert_eq!(annotator.session().unwrap().inspect.active_index, 0);

        annotator.command(Command::ToggleInspect);
        annotator.command(Command::Cycle(CycleDirection::Decrease));
        assert_eq!(annotator.session().unwrap().inspect.active_index, 3);

        annotator.command(Command::RemoveActive);
        assert_eq!(region_count(&annotator), 2);
        assert_eq!(annotator.session().unwrap().inspect.active_index, 2);

        annotator.command(Command::ToggleInspect);
        annotator.command(Command::RemoveActive);
        assert_eq!(region_count(&annotator), 2);
    }

    #[test]
    fn test_inspect_rename_commits_only_on_request() {
        let (mut annotator, _surface, store) = annotator();
        annotator.activate_file(file(800, 600), true, (800, 600));
        for x in [10, 100] {
            down(&mut annotator, x, 10);
            down(&mut annotator, x + 50, 60);
        }
        annotator.command(Command::ToggleInspect);
        annotator.command(Command::Cycle(CycleDirection::Increase));

        annotator.edit_active_name("bu".to_string());
        annotator.edit_active_name("bus".to_string());
        assert_eq!(annotator.active_regions().unwrap().regions[0].attributes().name, "");

        // Leaving inspect drops the draft
        annotator.command(Command::ToggleInspect);
        assert_eq!(annotator.session().unwrap().inspect.pending_edit, None);
        annotator.commit_active_name(None);
        assert_eq!(annotator.active_regions().unwrap().regions[0].attributes().name, "");

        // So does moving to another shape
        annotator.command(Command::ToggleInspect);
        annotator.command(Command::Cycle(CycleDirection::Increase));
        annotator.edit_active_name("van".to_string());
        annotator.command(Command::Cycle(CycleDirection::Increase));
        annotator.commit_active_name(None);
        assert!(annotator.active_regions().unwrap().regions.iter().all(|r| r.attributes().name.is_empty()));

        annotator.edit_active_name("truck".to_string());
        annotator.commit_active_name(None);
        let regions = &annotator.active_regions().unwrap().regions;
        assert_eq!((regions[0].attributes().name.as_str(), regions[1].attributes().name.as_str()), ("", "truck"));
        assert_eq!(annotator.session().unwrap().inspect.pending_edit, None);

        annotator.persistence.wait(SAVE_TIMEOUT);
        assert_eq!(*store.saves.lock().unwrap(), 3);
    }

    #[test]
    fn test_rename_and_clear() {
        let (mut annotator, _surface, store) = annotator();
        annotator.activate_file(file(800, 600), true, (800, 600));
        down(&mut annotator, 10, 10);
        down(&mut annotator, 60, 60);

        annotator.update_region_name(0, "bus");
        assert_eq!(annotator.active_regions().unwrap().regions[0].attributes().name, "bus");

        annotator.clear_annotations();
        assert_eq!(region_count(&annotator), 0);
        annotator.persistence.wait(SAVE_TIMEOUT);
        assert!(store.get("/images/street.png", Task::Region).unwrap().regions.is_empty());
    }

    #[test]
    fn test_classification_assigns_classes() {
        let (mut annotator, _surface, store) = annotator();
        annotator.activate_file(file(800, 600), true, (800, 600));
        annotator.set_task(Task::Classification);

        // No capture under classification
        down(&mut annotator, 10, 10);
        assert!(!annotator.session().unwrap().capture_active());

        annotator.toggle_class("cat");
        annotator.toggle_class("dog");
        annotator.toggle_class("cat");
        assert_eq!(annotator.active_regions().unwrap().assigned, vec!["dog"]);

        annotator.persistence.wait(SAVE_TIMEOUT);
        assert_eq!(store.get("/images/street.png", Task::Classification).unwrap().assigned, vec!["dog"]);
    }

    #[test]
    fn test_render_surface_matches_capture_surface() {
        let (mut annotator, mut surface, _store) = annotator();
        annotator.set_region_option(RegionOption::Polygon);
        annotator.activate_file(file(1600, 900), true, (800, 600));
        annotator.command(Command::ZoomIn);

        let steps: Vec<Box<dyn Fn(&mut Annotator)>> = vec![
            Box::new(|a| down(a, 100, 100)),
            Box::new(|a| a.handle_input(InputEvent::PointerMove(Point::new(150, 120)))),
            Box::new(|a| down(a, 200, 100)),
            Box::new(|a| a.handle_input(InputEvent::PointerMove(Point::new(210, 200)))),
            Box::new(|a| down(a, 200, 200)),
            Box::new(|a| a.command(Command::Save)),
            Box::new(|a| a.command(Command::ToggleInspect)),
            Box::new(|a| a.command(Command::Cycle(CycleDirection::Increase))),
            Box::new(|a| a.command(Command::ToggleMode)),
            Box::new(|a| {
                a.handle_input(InputEvent::PointerDown(Point::new(300, 200)));
                a.handle_input(InputEvent::PointerMove(Point::new(250, 170)));
            }),
            Box::new(|a| a.resize((1000, 700))),
        ];

        for step in steps {
            step(&mut annotator);
            annotator.flush_relay();
            surface.pump();
            assert_eq!(surface.display(), annotator.frame());
        }
        assert_eq!(surface.dropped(), 0);
        assert!(annotator.take_acks() > 0);
    }

    #[test]
    fn test_switching_files_resets_mirror() {
        let (mut annotator, mut surface, _store) = annotator();
        annotator.activate_file(file(800, 600), true, (800, 600));
        down(&mut annotator, 10, 10);
        annotator.flush_relay();

        let mut other = file(800, 600);
        other.path = "/images/other.png".to_string();
        other.name = "other.png".to_string();
        annotator.activate_file(other, true, (800, 600));
        surface.pump();
        assert_eq!(surface.file_id(), Some("/images/other.png"));
        assert_eq!(surface.display(), annotator.frame());
    }
}
