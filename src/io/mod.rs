// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for images and annotation records.

pub mod media;
pub mod persistence;
pub mod serialization;
pub mod store;
