// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image file loading.
//!
//! Decodes images into RGBA pixels for egui and classifies the file as a
//! capture target: missing or undecodable files are `invalid`, files over
//! the resolution bound are `not_fit`. Neither is rejected outright.

use crate::error::{AnnoError, AnnoResult};
use crate::models::region_set::AnnoFile;
use crate::settings::Resolution;
use std::path::Path;

/// Extensions offered in the open dialog.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// Decoded RGBA image.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decode an image file into RGBA8 pixels.
pub fn load_image(path: &Path) -> AnnoResult<LoadedImage> {
    if !path.exists() {
        return Err(AnnoError::InvalidFile(format!("{} not found", path.display())));
    }
    let img = image::open(path)?.to_rgba8();
    let (width, height) = img.dimensions();

    Ok(LoadedImage {
        width,
        height,
        pixels: img.into_raw(),
    })
}

fn check_bound(width: u32, height: u32, bound: Resolution) -> AnnoResult<()> {
    if bound.admits(width, height) {
        return Ok(());
    }
    Err(AnnoError::ResolutionExceeded {
        width,
        height,
        max_width: bound.width,
        max_height: bound.height,
    })
}

/// Open a file as an annotation target.
///
/// Always returns the file record; pixels are only present when decoding
/// succeeded.
pub fn open_file(path: &Path, bound: Resolution) -> (AnnoFile, Option<LoadedImage>) {
    let mut file = AnnoFile {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: path.to_string_lossy().into_owned(),
        width: 0,
        height: 0,
        invalid: false,
        not_fit: false,
    };

    let img = match load_image(path) {
        Ok(img) => img,
        Err(e) => {
            log::error!("{}: {}", file.name, e);
            file.invalid = true;
            return (file, None);
        }
    };

    file.width = img.width;
    file.height = img.height;
    if let Err(e) = check_bound(img.width, img.height, bound) {
        log::warn!("{}: {}; capture disabled", file.name, e);
        file.not_fit = true;
    }
    (file, Some(img))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        image::RgbaImage::new(width, height).save(&path).unwrap();
        path
    }

    #[test]
    fn test_open_valid_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "small.png", 8, 6);

        let (file, img) = open_file(&path, Resolution::default());
        assert_eq!((file.width, file.height), (8, 6));
        assert!(file.accepts_input());
        let img = img.unwrap();
        assert_eq!(img.pixels.len(), 8 * 6 * 4);
    }

    #[test]
    fn test_oversized_image_is_not_fit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "wide.png", 20, 4);

        let (file, img) = open_file(&path, Resolution { width: 16, height: 16 });
        assert!(file.not_fit);
        assert!(!file.invalid);
        assert!(img.is_some());
    }

    #[test]
    fn test_missing_or_corrupt_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let (file, img) = open_file(&dir.path().join("gone.png"), Resolution::default());
        assert!(file.invalid);
        assert!(img.is_none());

        let corrupt = dir.path().join("bad.png");
        std::fs::write(&corrupt, b"not an image").unwrap();
        let (file, _) = open_file(&corrupt, Resolution::default());
        assert!(file.invalid);
        assert_eq!(file.name, "bad.png");
    }

    #[test]
    fn test_load_errors_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_image(&dir.path().join("gone.png")), Err(AnnoError::InvalidFile(_))));

        let corrupt = dir.path().join("bad.png");
        std::fs::write(&corrupt, b"not an image").unwrap();
        assert!(matches!(load_image(&corrupt), Err(AnnoError::Image(_))));

        let err = check_bound(2560, 1440, Resolution::default()).unwrap_err();
        assert_eq!(err.to_string(), "Resolution 2560x1440 exceeds 1920x1080");
    }
}
