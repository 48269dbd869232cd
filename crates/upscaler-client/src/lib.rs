#![doc = include_str!("../README.md")]

mod archive;
mod auth;
mod error;
pub mod export;
mod processor;
mod types;

pub use archive::{Archive, ArchivedImage, ARCHIVE_RETENTION_DAYS};
pub use auth::{verify_access_code, AuthMode, DirectUpscaler, PageUpscaler, ProxiedUpscaler};
pub use error::{ArchiveError, ClientError, ExportError};
pub use export::ExportFormat;
pub use processor::{CancellationFlag, PageProcessor};
pub use types::*;
