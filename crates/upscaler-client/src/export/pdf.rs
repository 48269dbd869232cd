use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use super::completed_pages;
use crate::error::ExportError;
use crate::types::Page;

const JPEG_QUALITY: u8 = 92;
const IMAGE_NAME: &str = "Im0";

/// Re-encode as baseline RGB JPEG and wrap it in an image XObject.
fn image_xobject(bytes: &[u8]) -> Result<Stream, ExportError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(&rgb)?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(rgb.width()),
        "Height" => i64::from(rgb.height()),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8_i64,
        "Filter" => "DCTDecode",
    };
    Ok(Stream::new(dict, jpeg).with_compression(false))
}

/// One PDF page per completed image. Each page takes the source page's
/// pixel size, so portrait and landscape pages keep their orientation.
pub fn export_pdf(pages: &[Page]) -> Result<Vec<u8>, ExportError> {
    let done = completed_pages(pages);
    if done.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(done.len());

    for (page, image) in &done {
        let width = i64::from(page.source.width);
        let height = i64::from(page.source.height);
        let image_id = doc.add_object(image_xobject(&image.bytes)?);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![width.into(), 0_i64.into(), 0_i64.into(), height.into(), 0_i64.into(), 0_i64.into()],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(width), Object::Integer(height)],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { IMAGE_NAME => image_id },
            },
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
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
