//! Export of a finished run.
//!
//! ZIP and PDF carry completed pages only, in page order. PPTX has one slide
//! per page and falls back to the source image where no result exists.

mod images;
mod pdf;
mod slides;

pub use images::export_zip;
pub use pdf::export_pdf;
pub use slides::export_pptx;

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use crate::error::ExportError;
use crate::types::{Page, PageStatus, UpscaledImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Zip,
    Pdf,
    Pptx,
}

impl ExportFormat {
    pub const ALL: [Self; 3] = [Self::Zip, Self::Pdf, Self::Pptx];

    pub fn label(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
        }
    }

    /// Default output file name.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Zip => "upscaled_images.zip",
            Self::Pdf => "upscaled_document.pdf",
            Self::Pptx => "upscaled_presentation.pptx",
        }
    }

    pub fn render(self, pages: &[Page]) -> Result<Vec<u8>, ExportError> {
        match self {
            Self::Zip => export_zip(pages),
            Self::Pdf => export_pdf(pages),
            Self::Pptx => export_pptx(pages),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.label() == wanted)
            .ok_or_else(|| format!("unsupported export format '{s}' (expected zip, pdf or pptx)"))
    }
}

/// Completed pages with their results, ordered by page index.
pub fn completed_pages(pages: &[Page]) -> Vec<(&Page, &UpscaledImage)> {
    let mut done: Vec<(&Page, &UpscaledImage)> = pages
        .iter()
        .filter(|p| p.status == PageStatus::Completed)
        .filter_map(|p| p.result.as_ref().map(|r| (p, r)))
        .collect();
    done.sort_by_key(|(p, _)| p.index);
    done
}

/// Pixel size of an encoded image, read from its header.
pub(crate) fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), ExportError> {
    let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}
