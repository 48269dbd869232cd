use std::io::Cursor;
use std::path::Path;
use upscaler_types::models::{AspectRatio, ImageSize, Quota, DEFAULT_GEMINI_BASE_URL};

use crate::error::ClientError;

/// Default gateway address (local dev server).
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway base URL used in access-code mode
    pub server_url: String,
    /// Provider base URL used in direct mode
    pub gemini_base_url: String,
    pub timeout_secs: u64,
    /// Output resolution requested for every page of a run
    pub image_size: ImageSize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_secs: 600,
            image_size: ImageSize::TwoK,
        }
    }
}

/// A source page ready to be sent.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl PageImage {
    /// Read an image file and detect its format and dimensions.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = std::fs::read(path)
            .map_err(|e| ClientError::Page { name: name.clone(), message: e.to_string() })?;
        Self::from_bytes(name, bytes)
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ClientError> {
        let name = name.into();
        let page_error = |message: String| ClientError::Page { name: name.clone(), message };

        let reader = image::ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| page_error(e.to_string()))?;
        let format = reader.format().ok_or_else(|| page_error("unknown image format".to_string()))?;
        let (width, height) = reader.into_dimensions().map_err(|e| page_error(e.to_string()))?;

        Ok(Self { mime_type: format.to_mime_type().to_string(), name, bytes, width, height })
    }

    /// Closest ratio the model can produce for this page.
    pub fn aspect_ratio(&self) -> AspectRatio {
        AspectRatio::closest(self.width, self.height)
    }
}

/// Lifecycle of one page within a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error(String),
}

impl PageStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Error(_))
    }
}

/// Enhanced image returned for a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaledImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl UpscaledImage {
    pub fn extension(&self) -> &'static str {
        upscaler_core::offload::extension_for(&self.mime_type)
    }
}

/// Result of one upscale call; `quota` is present only in access-code mode.
#[derive(Debug, Clone)]
pub struct UpscaleOutcome {
    pub image: UpscaledImage,
    pub quota: Option<Quota>,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub source: PageImage,
    pub selected: bool,
    pub status: PageStatus,
    /// Resolution the page was processed at
    pub resolution: Option<ImageSize>,
    pub result: Option<UpscaledImage>,
}

impl Page {
    pub fn new(index: usize, source: PageImage) -> Self {
        Self {
            index,
            source,
            selected: true,
            status: PageStatus::Pending,
            resolution: None,
            result: None,
        }
    }

    /// Selected and not yet holding a result.
    pub fn needs_processing(&self) -> bool {
        self.selected && self.result.is_none()
    }
}

/// What a processing run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    /// Run ended early on a stop request
    pub stopped: bool,
    /// Last balance reported by the gateway
    pub quota: Option<Quota>,
}

impl RunSummary {
    /// Whether there is anything to save or export.
    pub fn has_results(&self) -> bool {
        self.completed > 0
    }
}
