use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use crate::error::CatalogError;
use crate::staging::PageImage;

/// Composes one page per image, in slice order. Each page's MediaBox equals
/// the image's pixel dimensions and the image fills the page.
pub fn compose_pdf(images: &[PageImage]) -> Result<Vec<u8>, CatalogError> {
    let _span = tracing::info_span!("assembler.compose", pages = images.len()).entered();

    if images.is_empty() {
        return Err(CatalogError::EmptyInput);
    }
    if let Some(index) = images.iter().position(|i| i.width() == 0 || i.height() == 0) {
        return Err(CatalogError::Image(format!("Page {} has an empty bitmap", index + 1)));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for image in images {
        let (width, height) = image.dimensions();
        let image_id = doc.add_object(Object::Stream(image_xobject(image)));

        let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im1 Do\nQ\n", width, height);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im1" => image_id,
                },
            },
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| CatalogError::Compose(e.to_string()))?;

    Ok(buffer)
}

fn image_xobject(image: &PageImage) -> Stream {
    let (width, height) = image.dimensions();
    let color_space = if image.is_grayscale() {
        "DeviceGray"
    } else {
        "DeviceRGB"
    };

    if let Some(jpeg) = image.jpeg_bytes() {
        return Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg.to_vec(),
        );
    }

    let samples = if image.is_grayscale() {
        image.pixels().to_luma8().into_raw()
    } else {
        image.pixels().to_rgb8().into_raw()
    };

    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
        },
        samples,
    )
}

/// What the catalog needs to know about an existing PDF.
#[derive(Debug)]
pub struct PdfSummary {
    pub page_count: u32,
    /// MediaBox width and height of page 1, in points.
    pub first_page_size: (f64, f64),
    /// The first image drawn on page 1, when it can be decoded.
    pub first_page_image: Option<DynamicImage>,
}

/// Reads page count and a page-1 preview source from PDF bytes.
pub fn inspect_pdf(bytes: &[u8]) -> Result<PdfSummary, CatalogError> {
    let doc = Document::load_mem(bytes).map_err(|e| CatalogError::Compose(e.to_string()))?;
    let pages = doc.get_pages();

    let first_page = match pages.values().next() {
        Some(id) => *id,
        None => return Err(CatalogError::EmptyInput),
    };

    let page_dict = doc
        .get_object(first_page)
        .and_then(Object::as_dict)
        .map_err(|e| CatalogError::Compose(e.to_string()))?;

    Ok(PdfSummary {
        page_count: pages.len() as u32,
        first_page_size: media_box(&doc, page_dict).unwrap_or((612.0, 792.0)),
        first_page_image: first_image(&doc, page_dict),
    })
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn as_f64(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn media_box(doc: &Document, page: &Dictionary) -> Option<(f64, f64)> {
    let array = resolve(doc, page.get(b"MediaBox").ok()?)?.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let values: Vec<f64> = array
        .iter()
        .filter_map(|o| resolve(doc, o).and_then(as_f64))
        .collect();
    if values.len() != 4 {
        return None;
    }
    Some(((values[2] - values[0]).abs(), (values[3] - values[1]).abs()))
}

fn first_image(doc: &Document, page: &Dictionary) -> Option<DynamicImage> {
    let resources = resolve(doc, page.get(b"Resources").ok()?)?.as_dict().ok()?;
    let xobjects = resolve(doc, resources.get(b"XObject").ok()?)?.as_dict().ok()?;

    xobjects.iter().find_map(|(_, object)| match resolve(doc, object)? {
        Object::Stream(stream) => decode_image_stream(stream),
        _ => None,
    })
}

fn is_name(object: Option<&Object>, expected: &[u8]) -> bool {
    matches!(object, Some(Object::Name(name)) if name.as_slice() == expected)
}

fn decode_image_stream(stream: &Stream) -> Option<DynamicImage> {
    let dict = &stream.dict;
    if !is_name(dict.get(b"Subtype").ok(), b"Image") {
        return None;
    }

    let filter = dict.get(b"Filter").ok();
    if is_name(filter, b"DCTDecode") {
        return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
            .ok();
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        return None;
    }

    let samples = match filter {
        None => stream.content.clone(),
        Some(_) if is_name(filter, b"FlateDecode") => stream.decompressed_content().ok()?,
        Some(_) => return None,
    };

    let color_space = dict.get(b"ColorSpace").ok();
    if is_name(color_space, b"DeviceGray") {
        GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
    } else if is_name(color_space, b"DeviceRGB") {
        RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)
    } else {
        None
    }
}
