//! I/O helpers for grayscale images and label maps.
//!
//! - `load_grayscale_image`: read a PNG/BMP/etc. into an owned 8-bit gray buffer.
//! - `save_grayscale_image`: write an [`Image`] to a grayscale file.
//! - `save_label_map`: write a per-pixel label map stretched to visible grays.

use super::Image;
use crate::error::{ForestError, Result};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::fs;
use std::path::Path;

/// Load an image from disk and convert to 8-bit grayscale.
pub fn load_grayscale_image(path: &Path) -> Result<Image> {
    let img = image::open(path)
        .map_err(|e| ForestError::InvalidData(format!("failed to open {}: {e}", path.display())))?
        .into_luma8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    Ok(Image::from_raw(width, height, img.into_raw()))
}

/// Save an 8-bit grayscale image; the format is chosen from the extension.
pub fn save_grayscale_image(image: &Image, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let buffer: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_raw(
        image.width() as u32,
        image.height() as u32,
        image.as_slice().to_vec(),
    )
    .ok_or_else(|| ForestError::InvalidData("failed to create image buffer".to_string()))?;
    DynamicImage::ImageLuma8(buffer)
        .save(path)
        .map_err(|e| ForestError::InvalidData(format!("failed to save {}: {e}", path.display())))
}

/// Save a label map, stretching class indices over the full gray range
/// so small label values stay distinguishable by eye.
pub fn save_label_map(labels: &Image, class_count: u32, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let span = class_count.saturating_sub(1).max(1);
    let mut out = GrayImage::new(labels.width() as u32, labels.height() as u32);
    for y in 0..labels.height() {
        for x in 0..labels.width() {
            let stretched = (u32::from(labels.get(x, y)) * 255 / span).min(255);
            out.put_pixel(x as u32, y as u32, Luma([stretched as u8]));
        }
    }
    out.save(path)
        .map_err(|e| ForestError::InvalidData(format!("failed to save {}: {e}", path.display())))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
