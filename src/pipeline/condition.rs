//! Shrinks oversized images to fit the OCR provider's upload ceiling.
//!
//! Key rules:
//! - At or under the ceiling: returned byte-identical, never decoded
//! - Over the ceiling: one resize pass by `sqrt(max / size)` per axis,
//!   Lanczos3, re-encoded as PNG (lossless)
//! - No shrink loop. Encoded size is not linear in pixel area, so a very
//!   detailed image may still exceed the ceiling; that result is accepted

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use thiserror::Error;

use crate::storage::DocumentBlob;

/// Upload ceiling of the OCR provider's free tier: 1 MiB.
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

/// Largest bitmap the conditioner will decode. A small, highly compressed
/// file can declare enormous dimensions; those are refused from the header.
pub const MAX_DECODE_PIXELS: u64 = 40_000_000;

#[derive(Error, Debug)]
pub enum ConditionError {
    #[error("Cannot decode image: {0}")]
    Decode(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

pub struct ImageConditioner {
    max_bytes: usize,
    max_pixels: u64,
}

impl Default for ImageConditioner {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_BYTES)
    }
}

impl ImageConditioner {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            max_pixels: MAX_DECODE_PIXELS,
        }
    }

    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn condition(&self, blob: DocumentBlob) -> Result<DocumentBlob, ConditionError> {
        if blob.size <= self.max_bytes {
            return Ok(blob);
        }

        check_dimensions(&blob.bytes, self.max_pixels)?;
        let decoded = image::load_from_memory(&blob.bytes)
            .map_err(|e| ConditionError::Decode(e.to_string()))?;
        let image = apply_orientation(decoded, read_exif_orientation(&blob.bytes));

        let k = scale_factor(blob.size, self.max_bytes);
        let (width, height) = image.dimensions();
        let (new_width, new_height) = scaled_dimensions(width, height, k);

        let resized = image.resize_exact(new_width, new_height, FilterType::Lanczos3);
        let bytes = encode_png(&resized)?;

        tracing::info!(
            from = format!("{width}x{height}"),
            to = format!("{new_width}x{new_height}"),
            original_bytes = blob.size,
            resized_bytes = bytes.len(),
            "Resized oversized image"
        );
        if bytes.len() > self.max_bytes {
            tracing::warn!(
                resized_bytes = bytes.len(),
                max_bytes = self.max_bytes,
                "Resized image still exceeds upload ceiling, submitting anyway"
            );
        }

        Ok(DocumentBlob::re_encoded(bytes))
    }
}

/// Read the dimensions from the image header, without decoding pixels,
/// and refuse anything over `max_pixels`.
fn check_dimensions(bytes: &[u8], max_pixels: u64) -> Result<(), ConditionError> {
    let (width, height) = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ConditionError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ConditionError::Decode(e.to_string()))?;

    let pixels = u64::from(width) * u64::from(height);
    if pixels > max_pixels {
        return Err(ConditionError::Decode(format!(
            "{width}x{height} exceeds the {max_pixels}-pixel decode limit"
        )));
    }
    Ok(())
}

/// Per-axis scale so pixel area shrinks by `max / size`.
pub fn scale_factor(size: usize, max_bytes: usize) -> f64 {
    if size == 0 {
        return 1.0;
    }
    (max_bytes as f64 / size as f64).sqrt()
}

/// Truncating scale of both axes, never below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, k: f64) -> (u32, u32) {
    let scale = |d: u32| ((d as f64 * k) as u32).max(1);
    (scale(width), scale(height))
}

/// Read EXIF orientation tag (1-8). Returns 1 (normal) when absent.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform so the page is upright.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ConditionError> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ConditionError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}
