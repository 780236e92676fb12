// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Cross-surface paint relay.
//!
//! The capture surface (where the user interacts) drives a separate
//! render surface through one-way, fire-and-forget notifications. The
//! render surface keeps its own copy of the state, redraws with the same
//! renderer, and answers each redraw with a `canvas-paint`
//! acknowledgement. High-frequency notifications are coalesced.

use crate::capture::Preview;
use crate::models::inspect::InspectState;
use crate::models::region_set::{RegionSet, Task};
use crate::models::viewport::Viewport;
use crate::render::{render, DrawCommand, Palette, RenderInput};
use crate::util::debounce::Coalescer;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

/// Full state of a newly activated file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileView {
    pub file_id: String,
    pub task: Task,
    pub has_image: bool,
    pub viewport: Viewport,
    pub regions: RegionSet,
    pub inspect: InspectState,
}

/// A relay message, serialized as `{"key": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "camelCase")]
pub enum RelayEvent {
    /// `None` when no file is active any more.
    ViewFile(Option<FileView>),
    SetTask {
        file_id: String,
        task: Task,
        regions: RegionSet,
    },
    BeginPaint {
        file_id: String,
        task: Task,
        preview: Preview,
    },
    ContinuePaint {
        file_id: String,
        task: Task,
        preview: Preview,
    },
    StopPaint {
        file_id: String,
        task: Task,
    },
    PaintAnnotations {
        file_id: String,
        task: Task,
        regions: RegionSet,
    },
    SetInspect {
        file_id: String,
        inspect: InspectState,
    },
    SetFileZoom {
        file_id: String,
        zoom_level: u32,
        offset_left: i32,
        offset_top: i32,
    },
    SetFileOffset {
        file_id: String,
        offset_left: i32,
        offset_top: i32,
    },
    Resolution {
        file_id: String,
        viewport: Viewport,
    },
    #[serde(rename = "canvas-paint")]
    CanvasPaint(bool),
}

impl RelayEvent {
    pub fn key(&self) -> &'static str {
        match self {
            RelayEvent::ViewFile(_) => "viewFile",
            RelayEvent::SetTask { .. } => "setTask",
            RelayEvent::BeginPaint { .. } => "beginPaint",
            RelayEvent::ContinuePaint { .. } => "continuePaint",
            RelayEvent::StopPaint { .. } => "stopPaint",
            RelayEvent::PaintAnnotations { .. } => "paintAnnotations",
            RelayEvent::SetInspect { .. } => "setInspect",
            RelayEvent::SetFileZoom { .. } => "setFileZoom",
            RelayEvent::SetFileOffset { .. } => "setFileOffset",
            RelayEvent::Resolution { .. } => "resolution",
            RelayEvent::CanvasPaint(_) => "canvas-paint",
        }
    }

    /// File the message refers to, for stale-message checks.
    pub fn file_id(&self) -> Option<&str> {
        match self {
            RelayEvent::ViewFile(view) => view.as_ref().map(|v| v.file_id.as_str()),
            RelayEvent::SetTask { file_id, .. }
            | RelayEvent::BeginPaint { file_id, .. }
            | RelayEvent::ContinuePaint { file_id, .. }
            | RelayEvent::StopPaint { file_id, .. }
            | RelayEvent::PaintAnnotations { file_id, .. }
            | RelayEvent::SetInspect { file_id, .. }
            | RelayEvent::SetFileZoom { file_id, .. }
            | RelayEvent::SetFileOffset { file_id, .. }
            | RelayEvent::Resolution { file_id, .. } => Some(file_id),
            RelayEvent::CanvasPaint(_) => None,
        }
    }

    /// Task a paint message was produced under.
    fn paint_task(&self) -> Option<Task> {
        match self {
            RelayEvent::BeginPaint { task, .. }
            | RelayEvent::ContinuePaint { task, .. }
            | RelayEvent::StopPaint { task, .. }
            | RelayEvent::PaintAnnotations { task, .. } => Some(*task),
            _ => None,
        }
    }
}

/// Keys whose notifications are coalesced, in flush order.
const COALESCED_KEYS: [&str; 3] = ["resolution", "setFileOffset", "continuePaint"];

/// Sending half, owned by the capture surface.
pub struct PaintRelay {
    tx: Sender<RelayEvent>,
    acks: Receiver<RelayEvent>,
    coalesced: [Coalescer<RelayEvent>; 3],
}

/// Create a connected relay and render surface.
pub fn paint_channel(window: Duration, palette: Palette) -> (PaintRelay, RenderSurface) {
    let (tx, inbox) = channel();
    let (ack, acks) = channel();

    let relay = PaintRelay {
        tx,
        acks,
        coalesced: [Coalescer::new(window), Coalescer::new(window), Coalescer::new(window)],
    };
    let surface = RenderSurface {
        inbox,
        ack,
        palette,
        state: None,
        display: Vec::new(),
        dropped: 0,
    };
    (relay, surface)
}

impl PaintRelay {
    /// Fire a notification. Coalesced keys may be held back until
    /// [`tick`](Self::tick); any other key first releases what is held so
    /// send order is preserved.
    pub fn notify(&mut self, event: RelayEvent, now: Instant) {
        match COALESCED_KEYS.iter().position(|k| *k == event.key()) {
            Some(slot) => {
                if matches!(event, RelayEvent::Resolution { .. }) {
                    // A resolution change carries the whole viewport
                    self.coalesced[1].flush();
                }
                if let Some(event) = self.coalesced[slot].push(event, now) {
                    self.send(event);
                }
            }
            None => {
                self.flush();
                self.send(event);
            }
        }
    }

    /// Release held notifications whose window elapsed.
    pub fn tick(&mut self, now: Instant) {
        let ready: Vec<RelayEvent> = self.coalesced.iter_mut().filter_map(|c| c.poll(now)).collect();
        for event in ready {
            self.send(event);
        }
    }

    /// Release every held notification now.
    pub fn flush(&mut self) {
        let held: Vec<RelayEvent> = self.coalesced.iter_mut().filter_map(|c| c.flush()).collect();
        for event in held {
            self.send(event);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.coalesced.iter().any(|c| c.has_pending())
    }

    /// Number of repaint acknowledgements received since the last call.
    pub fn take_acks(&self) -> usize {
        self.acks
            .try_iter()
            .filter(|e| matches!(e, RelayEvent::CanvasPaint(true)))
            .count()
    }

    fn send(&self, event: RelayEvent) {
        let key = event.key();
        if self.tx.send(event).is_err() {
            log::debug!("Render surface gone; dropped {}", key);
        }
    }
}

#[derive(Debug, Clone)]
struct MirrorState {
    file_id: String,
    task: Task,
    has_image: bool,
    viewport: Viewport,
    regions: RegionSet,
    preview: Option<Preview>,
    inspect: InspectState,
}

/// Receiving half: the independently displayed render surface.
pub struct RenderSurface {
    inbox: Receiver<RelayEvent>,
    ack: Sender<RelayEvent>,
    palette: Palette,
    state: Option<MirrorState>,
    display: Vec<DrawCommand>,
    dropped: usize,
}

impl RenderSurface {
    /// Apply every queued message; redraw and acknowledge if anything
    /// changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.inbox.try_recv() {
            changed |= self.apply(event);
        }

        if changed {
            self.redraw();
            let _ = self.ack.send(RelayEvent::CanvasPaint(true));
        }
        changed
    }

    pub fn display(&self) -> &[DrawCommand] {
        &self.display
    }

    /// Messages discarded as stale so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn file_id(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.file_id.as_str())
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.state.as_ref().map(|s| &s.viewport)
    }

    fn apply(&mut self, event: RelayEvent) -> bool {
        match event {
            RelayEvent::ViewFile(view) => {
                self.state = view.map(|v| MirrorState {
                    file_id: v.file_id,
                    task: v.task,
                    has_image: v.has_image,
                    viewport: v.viewport,
                    regions: v.regions,
                    preview: None,
                    inspect: v.inspect,
                });
                return true;
            }
            RelayEvent::CanvasPaint(_) => return false,
            _ => {}
        }

        let Some(state) = self.state.as_mut() else {
            log::warn!("Dropped {} with no active file", event.key());
            self.dropped += 1;
            return false;
        };

        let stale_file = event.file_id() != Some(state.file_id.as_str());
        let stale_task = event.paint_task().is_some_and(|t| t != state.task);
        if stale_file || stale_task {
            log::warn!("Dropped stale {} for {:?}", event.key(), event.file_id());
            self.dropped += 1;
            return false;
        }

        match event {
            RelayEvent::SetTask { task, regions, .. } => {
                state.task = task;
                state.regions = regions;
                state.preview = None;
                state.inspect = InspectState::default();
            }
            RelayEvent::BeginPaint { preview, .. } | RelayEvent::ContinuePaint { preview, .. } => {
                state.preview = Some(preview);
            }
            RelayEvent::StopPaint { .. } => state.preview = None,
            RelayEvent::PaintAnnotations { regions, .. } => state.regions = regions,
            RelayEvent::SetInspect { inspect, .. } => state.inspect = inspect,
            RelayEvent::SetFileZoom {
                zoom_level,
                offset_left,
                offset_top,
                ..
            } => {
                state.viewport.zoom_level = zoom_level.min(state.viewport.zoom_range.max_level());
                state.viewport.set_offset(offset_left, offset_top);
            }
            RelayEvent::SetFileOffset {
                offset_left, offset_top, ..
            } => state.viewport.set_offset(offset_left, offset_top),
            RelayEvent::Resolution { viewport, .. } => state.viewport = viewport,
            RelayEvent::ViewFile(_) | RelayEvent::CanvasPaint(_) => return false,
        }
        true
    }

    fn redraw(&mut self) {
        self.display = match &self.state {
            Some(state) => render(&RenderInput {
                task: state.task,
                has_image: state.has_image,
                regions: &state.regions,
                preview: state.preview.as_ref(),
                inspect: &state.inspect,
                viewport: &state.viewport,
                palette: &self.palette,
            }),
            None => Vec::new(),
        };
    }
}
