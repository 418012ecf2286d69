use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::config::ThumbnailSize;
use crate::error::CatalogError;

/// Renders `image` into a PNG that fits inside `size`, preserving aspect ratio.
pub fn render_thumbnail(
    image: &DynamicImage,
    size: ThumbnailSize,
) -> Result<Vec<u8>, CatalogError> {
    let _span = tracing::debug_span!(
        "assembler.thumbnail",
        width = size.width,
        height = size.height
    )
    .entered();

    let preview = image.thumbnail(size.width, size.height);
    encode_png(&preview)
}

/// A white placeholder with the page's aspect ratio, for pages that carry
/// no embedded image to preview.
pub fn blank_thumbnail(
    page_width: f64,
    page_height: f64,
    size: ThumbnailSize,
) -> Result<Vec<u8>, CatalogError> {
    let (width, height) = fit_within(page_width, page_height, size);
    let canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    encode_png(&DynamicImage::ImageRgb8(canvas))
}

fn fit_within(width: f64, height: f64, size: ThumbnailSize) -> (u32, u32) {
    if !(width > 0.0 && height > 0.0) {
        return (size.width, size.height);
    }
    let scale = (size.width as f64 / width).min(size.height as f64 / height);
    let w = (width * scale).round().clamp(1.0, size.width as f64) as u32;
    let h = (height * scale).round().clamp(1.0, size.height as f64) as u32;
    (w, h)
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CatalogError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| CatalogError::Image(format!("Failed to encode thumbnail: {}", e)))?;
    Ok(buffer.into_inner())
}
