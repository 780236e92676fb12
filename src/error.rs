// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the annotation pipeline.
//!
//! None of these are fatal: they end up in the log and, for persistence,
//! in a transient banner while the in-memory state is kept.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Annotation JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// File missing on disk or otherwise unusable.
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Resolution {width}x{height} exceeds {max_width}x{max_height}")]
    ResolutionExceeded {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
}

pub type AnnoResult<T> = Result<T, AnnoError>;
