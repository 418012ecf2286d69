use std::fmt;
use std::sync::Arc;

use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, RgbImage};

use crate::error::CatalogError;

/// A raw page bitmap handed over by a capture or picker source.
///
/// Cloning is cheap; the pixel buffer is shared. Baseline JPEG input keeps
/// its encoded bytes so the assembler can embed them without re-encoding.
#[derive(Clone)]
pub struct PageImage {
    pixels: Arc<DynamicImage>,
    jpeg: Option<Arc<[u8]>>,
}

impl PageImage {
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            pixels: Arc::new(image),
            jpeg: None,
        }
    }

    /// Builds a page from tightly packed 8-bit RGB samples.
    pub fn from_rgb8(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, CatalogError> {
        let buffer = RgbImage::from_raw(width, height, samples).ok_or_else(|| {
            CatalogError::Image(format!(
                "RGB buffer does not match {}x{} dimensions",
                width, height
            ))
        })?;
        Ok(Self::from_image(DynamicImage::ImageRgb8(buffer)))
    }

    /// Decodes an encoded image (PNG, JPEG, ...).
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, CatalogError> {
        let format = image::guess_format(bytes)
            .map_err(|e| CatalogError::Image(format!("Unrecognized image data: {}", e)))?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| CatalogError::Image(format!("Failed to decode image: {}", e)))?;

        // DCTDecode embedding only maps cleanly onto gray and RGB JPEGs. The
        // decoder converts CMYK to RGB, so the stream itself has to be asked.
        let passthrough = format == ImageFormat::Jpeg
            && matches!(jpeg_components(bytes), Some(1 | 3))
            && matches!(decoded.color(), ColorType::L8 | ColorType::Rgb8);

        Ok(Self {
            pixels: Arc::new(decoded),
            jpeg: passthrough.then(|| Arc::from(bytes)),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Encoded JPEG bytes, when the page came from a gray or RGB JPEG.
    pub fn jpeg_bytes(&self) -> Option<&[u8]> {
        self.jpeg.as_deref()
    }

    pub fn is_grayscale(&self) -> bool {
        matches!(self.pixels.color(), ColorType::L8 | ColorType::L16)
    }
}

/// Component count declared by the first start-of-frame segment.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        match marker {
            // Fill byte before a marker.
            0xFF => {
                pos += 1;
                continue;
            }
            // Markers without a length field.
            0x01 | 0xD0..=0xD8 => {
                pos += 2;
                continue;
            }
            // Start of scan or end of image before any frame header.
            0xD9 | 0xDA => return None,
            // SOF0..SOF15, minus DHT, JPG and DAC.
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                return bytes.get(pos + 9).copied();
            }
            _ => {}
        }
        let length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        pos += 2 + length;
    }
    None
}

impl From<DynamicImage> for PageImage {
    fn from(image: DynamicImage) -> Self {
        Self::from_image(image)
    }
}

impl fmt::Debug for PageImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("jpeg", &self.jpeg.is_some())
            .finish()
    }
}
