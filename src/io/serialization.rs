// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Export of annotation records in YAML and JSON formats.

use crate::models::region_set::RegionSet;
use anyhow::{bail, Result};
use std::path::Path;

/// Export a region set to YAML format.
pub fn export_yaml(data: &RegionSet, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(data)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export a region set to JSON format.
pub fn export_json(data: &RegionSet, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Export by file extension.
pub fn export(data: &RegionSet, path: &Path) -> Result<()> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => export_yaml(data, path),
        Some("json") => export_json(data, path),
        other => bail!("Unsupported file extension: {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::{Attributes, Polygon, Shape};

    fn sample() -> RegionSet {
        let mut polygon = Polygon {
            vertices: vec![[0.0, 0.0], [4.0, 0.0], [4.0, 3.0]],
            attributes: Attributes::default(),
        };
        polygon.attributes.name = "road".to_string();
        RegionSet {
            file: "a.png".to_string(),
            path: "/a.png".to_string(),
            width: 10,
            height: 10,
            regions: vec![Shape::Polygon(polygon)],
            assigned: Vec::new(),
        }
    }

    #[test]
    fn test_export_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("out.yml");
        export(&sample(), &yaml_path).unwrap();
        let yaml = std::fs::read_to_string(&yaml_path).unwrap();
        assert!(yaml.contains("region-polygon"));
        let back: RegionSet = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, sample());

        let json_path = dir.path().join("out.json");
        export(&sample(), &json_path).unwrap();
        assert!(std::fs::read_to_string(&json_path).unwrap().contains("\"road\""));

        assert!(export(&sample(), &dir.path().join("out.txt")).is_err());
    }
}
