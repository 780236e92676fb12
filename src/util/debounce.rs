// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Rate limiting for high-frequency notifications.

use std::time::{Duration, Instant};

/// Lets a value through at most once per window, always delivering the
/// latest value once the window has elapsed.
#[derive(Debug)]
pub struct Coalescer<T> {
    window: Duration,
    pending: Option<T>,
    last_fire: Option<Instant>,
}

impl<T> Coalescer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            last_fire: None,
        }
    }

    fn ready(&self, now: Instant) -> bool {
        self.last_fire
            .map_or(true, |last| now.saturating_duration_since(last) >= self.window)
    }

    /// Offer a value. Returns it immediately if the window is open,
    /// otherwise holds it, replacing any older pending value.
    pub fn push(&mut self, value: T, now: Instant) -> Option<T> {
        if self.ready(now) {
            self.pending = None;
            self.last_fire = Some(now);
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Release the pending value if its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.ready(now) {
            self.last_fire = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    /// Release the pending value regardless of timing.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
