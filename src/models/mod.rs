// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data model.

pub mod annotation;
pub mod inspect;
pub mod region_set;
pub mod viewport;
