// SPDX-License-Identifier: MIT

//! Image preprocessing for vision model calls

use image::imageops::FilterType;
use image::GenericImageView;
use std::path::Path;
use tracing::debug;

use crate::scratch::ScratchFile;
use crate::{MedscanError, Result};

/// Fixed output width; height follows the source aspect ratio
pub const TARGET_WIDTH: u32 = 500;

/// Upload formats accepted for analysis
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Media type for a supported file extension
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "bmp" => Some("image/bmp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Decode `source`, rescale it to [`TARGET_WIDTH`] preserving aspect ratio,
/// and save the result as PNG into a uniquely named file under `scratch_dir`.
///
/// The new height is `round(TARGET_WIDTH / (W/H))`, clamped to at least one
/// pixel. Unreadable data and degenerate dimensions fail the enclosing
/// analysis step instead of crashing the process.
pub fn resize_for_analysis(source: &Path, scratch_dir: &Path) -> Result<ScratchFile> {
    let img = image::open(source)?;
    let (width, height) = img.dimensions();

    if width == 0 || height == 0 {
        return Err(MedscanError::InvalidImage(format!(
            "degenerate dimensions {}x{}",
            width, height
        )));
    }

    let aspect_ratio = width as f64 / height as f64;
    let new_height = (TARGET_WIDTH as f64 / aspect_ratio).round().max(1.0) as u32;

    debug!(
        "Resizing {:?} from {}x{} to {}x{}",
        source, width, height, TARGET_WIDTH, new_height
    );

    let resized = img.resize_exact(TARGET_WIDTH, new_height, FilterType::Triangle);

    let output = ScratchFile::reserve(scratch_dir, "medscan_resized", "png");
    resized.save_with_format(output.path(), image::ImageFormat::Png)?;

    Ok(output)
}
