use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::completed_pages;
use crate::error::ExportError;
use crate::types::Page;

const FOLDER: &str = "upscaled_images";

/// Entry name for a page; numbering is 1-based.
fn entry_name(index: usize, extension: &str) -> String {
    format!("{FOLDER}/image_{:03}.{extension}", index + 1)
}

/// Zip of the enhanced images under `upscaled_images/`.
pub fn export_zip(pages: &[Page]) -> Result<Vec<u8>, ExportError> {
    let done = completed_pages(pages);
    if done.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    // images are already compressed
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (page, image) in done {
        zip.start_file(entry_name(page.index, image.extension()), options)?;
        zip.write_all(&image.bytes)?;
    }
    Ok(zip.finish()?.into_inner())
}
