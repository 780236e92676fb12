// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation persistence boundary.
//!
//! The pipeline only talks to [`AnnotationStore`]. The bundled
//! [`JsonStore`] keeps one pretty-printed JSON record per file and task
//! under `<root>/<task>/<file-name>-<path-hash>.json`. The hash of the full
//! path keeps same-named files in different folders apart.

use crate::error::AnnoResult;
use crate::models::region_set::{RegionSet, Task};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Bytes of the path hash kept in a record name.
const KEY_BYTES: usize = 4;

/// Load/save of per-file annotation records.
pub trait AnnotationStore: Send + Sync {
    /// `Ok(None)` when nothing was saved yet.
    fn load_region_set(&self, file_id: &str, task: Task) -> AnnoResult<Option<RegionSet>>;

    fn save_region_set(&self, file_id: &str, task: Task, set: &RegionSet) -> AnnoResult<()>;
}

/// Filesystem store writing JSON records.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn record_path(&self, file_id: &str, task: Task) -> PathBuf {
        self.root.join(task.key()).join(record_name(file_id))
    }
}

/// `<file-name>-<hash>.json`, unique per full file id.
fn record_name(file_id: &str) -> String {
    let name = Path::new(file_id)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "record".to_string());
    let digest = Sha256::digest(file_id.as_bytes());
    let key: String = digest[..KEY_BYTES].iter().map(|b| format!("{b:02x}")).collect();
    format!("{name}-{key}.json")
}

impl AnnotationStore for JsonStore {
    fn load_region_set(&self, file_id: &str, task: Task) -> AnnoResult<Option<RegionSet>> {
        let path = self.record_path(file_id, task);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let set = serde_json::from_str(&json)?;
        Ok(Some(set))
    }

    fn save_region_set(&self, file_id: &str, task: Task, set: &RegionSet) -> AnnoResult<()> {
        let path = self.record_path(file_id, task);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(set)?;
        std::fs::write(&path, json)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}
