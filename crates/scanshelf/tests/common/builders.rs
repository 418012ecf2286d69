//! Builders for page images, PDFs and configurations.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use scanshelf::assembler::pdf::compose_pdf;
use scanshelf::config::{LoggingConfig, ThumbnailSize};
use scanshelf::{Config, PageImage};

/// A single-colour RGB page.
pub fn solid_page(width: u32, height: u32, colour: [u8; 3]) -> PageImage {
    PageImage::from_image(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        Rgb(colour),
    )))
}

/// A page decoded from JPEG bytes, as a camera capture would arrive.
pub fn jpeg_page(width: u32, height: u32, colour: [u8; 3]) -> PageImage {
    let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(colour)));
    let mut encoded = Cursor::new(Vec::new());
    source
        .write_to(&mut encoded, ImageFormat::Jpeg)
        .expect("Failed to encode JPEG");
    PageImage::from_encoded(encoded.get_ref()).expect("Failed to decode JPEG")
}

/// PDF bytes with `pages` small pages.
pub fn pdf_bytes(pages: usize) -> Vec<u8> {
    let images: Vec<PageImage> = (0..pages)
        .map(|i| solid_page(60, 80, [(i * 40) as u8, 0, 0]))
        .collect();
    compose_pdf(&images).expect("Failed to compose PDF")
}

/// Width and height of every page's MediaBox, in page order.
pub fn page_sizes(pdf: &[u8]) -> Vec<(i64, i64)> {
    let doc = lopdf::Document::load_mem(pdf).expect("Failed to parse PDF");
    doc.get_pages()
        .into_values()
        .map(|id| {
            let page = doc.get_object(id).unwrap().as_dict().unwrap();
            let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
            (media[2].as_i64().unwrap(), media[3].as_i64().unwrap())
        })
        .collect()
}

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn catalog_directory(mut self, path: &Path) -> Self {
        self.config.catalog_directory = path.to_path_buf();
        self
    }

    pub fn database_path(mut self, path: &Path) -> Self {
        self.config.database_path = path.to_path_buf();
        self
    }

    pub fn thumbnail(mut self, width: u32, height: u32) -> Self {
        self.config.thumbnail = ThumbnailSize { width, height };
        self
    }

    pub fn default_name_prefix(mut self, prefix: &str) -> Self {
        self.config.default_name_prefix = prefix.to_string();
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn logging(mut self, level: &str, json: bool) -> Self {
        self.config.logging = LoggingConfig {
            level: level.to_string(),
            json,
        };
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
