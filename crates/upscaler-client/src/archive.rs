//! Local archive of enhanced pages.
//!
//! Images live as files next to an `index.json`; entries older than
//! [`ARCHIVE_RETENTION_DAYS`] are dropped when the archive is opened and after
//! every save.

use chrono::{Duration, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ArchiveError;
use crate::types::UpscaledImage;

pub const ARCHIVE_RETENTION_DAYS: i64 = 7;

const INDEX_FILE: &str = "index.json";
const THUMBNAIL_MAX_DIM: u32 = 800;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedImage {
    pub id: u64,
    /// Unix milliseconds
    pub created_at: i64,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    /// Size of the full image in bytes
    pub size: u64,
}

#[derive(Debug)]
pub struct Archive {
    dir: PathBuf,
    entries: Vec<ArchivedImage>,
}

impl Archive {
    /// Default location under the user's data directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("page-upscaler")
            .join("archive")
    }

    /// Open (creating if needed) and prune expired entries.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let index_path = dir.join(INDEX_FILE);
        let entries = if index_path.exists() {
            serde_json::from_slice(&fs::read(&index_path)?)?
        } else {
            Vec::new()
        };

        let mut archive = Self { dir, entries };
        archive.prune_older_than(Utc::now().timestamp_millis(), Duration::days(ARCHIVE_RETENTION_DAYS))?;
        Ok(archive)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store an image and return its id.
    pub fn save(
        &mut self,
        image: &UpscaledImage,
        width: u32,
        height: u32,
        source_name: Option<&str>,
    ) -> Result<u64, ArchiveError> {
        let now = Utc::now().timestamp_millis();
        let id = self.entries.iter().map(|e| e.id).max().map_or(1, |max| max + 1);

        let file_name = format!("{id:06}_{now}.{}", image.extension());
        fs::write(self.dir.join(&file_name), &image.bytes)?;

        let thumbnail = match make_thumbnail(&image.bytes) {
            Ok(bytes) => {
                let name = format!("{id:06}_{now}_thumb.jpg");
                fs::write(self.dir.join(&name), bytes)?;
                Some(name)
            },
            Err(e) => {
                warn!("[Archive] Thumbnail generation failed for #{}: {}", id, e);
                None
            },
        };

        self.entries.push(ArchivedImage {
            id,
            created_at: now,
            file_name,
            thumbnail,
            width,
            height,
            source_name: source_name.map(str::to_string),
            size: image.bytes.len() as u64,
        });
        self.write_index()?;
        self.prune_older_than(now, Duration::days(ARCHIVE_RETENTION_DAYS))?;
        Ok(id)
    }

    /// Entries, newest first.
    pub fn list(&self) -> Vec<&ArchivedImage> {
        let mut entries: Vec<&ArchivedImage> = self.entries.iter().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        entries
    }

    pub fn path_of(&self, entry: &ArchivedImage) -> PathBuf {
        self.dir.join(&entry.file_name)
    }

    /// Delete entries created before `now - max_age`. Returns how many were removed.
    pub fn prune_older_than(&mut self, now_ms: i64, max_age: Duration) -> Result<usize, ArchiveError> {
        let threshold = now_ms - max_age.num_milliseconds();
        let (expired, kept): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.created_at < threshold);
        self.entries = kept;

        if expired.is_empty() {
            return Ok(0);
        }
        self.remove_files(&expired);
        self.write_index()?;
        info!("[Archive] Auto-pruned {} old images", expired.len());
        Ok(expired.len())
    }

    /// Delete the entries with the given ids. Unknown ids are ignored.
    pub fn delete(&mut self, ids: &[u64]) -> Result<usize, ArchiveError> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| ids.contains(&e.id));
        self.entries = kept;

        if removed.is_empty() {
            return Ok(0);
        }
        self.remove_files(&removed);
        self.write_index()?;
        info!("[Archive] Deleted {} images", removed.len());
        Ok(removed.len())
    }

    /// Delete every entry.
    pub fn clear(&mut self) -> Result<usize, ArchiveError> {
        let removed = std::mem::take(&mut self.entries);
        self.remove_files(&removed);
        self.write_index()?;
        info!("[Archive] Cleared {} images", removed.len());
        Ok(removed.len())
    }

    fn remove_files(&self, entries: &[ArchivedImage]) {
        for entry in entries {
            for name in std::iter::once(&entry.file_name).chain(entry.thumbnail.as_ref()) {
                if let Err(e) = fs::remove_file(self.dir.join(name)) {
                    warn!("[Archive] Could not remove {}: {}", name, e);
                }
            }
        }
    }

    fn write_index(&self) -> Result<(), ArchiveError> {
        let tmp = self.dir.join(format!("{INDEX_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(&self.entries)?)?;
        fs::rename(tmp, self.dir.join(INDEX_FILE))?;
        Ok(())
    }
}

/// JPEG thumbnail no larger than [`THUMBNAIL_MAX_DIM`] on either side.
fn make_thumbnail(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let thumb = if img.width().max(img.height()) > THUMBNAIL_MAX_DIM {
        img.thumbnail(THUMBNAIL_MAX_DIM, THUMBNAIL_MAX_DIM)
    } else {
        img
    };
    // JPEG has no alpha channel
    let rgb = image::DynamicImage::ImageRgb8(thumb.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> UpscaledImage {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        UpscaledImage { bytes: out.into_inner(), mime_type: "image/png".to_string() }
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = Archive::open(dir.path()).unwrap();

        let first = archive.save(&png(32, 18), 32, 18, Some("deck.pdf#1")).unwrap();
        let second = archive.save(&png(18, 32), 18, 32, None).unwrap();
        assert_eq!((first, second), (1, 2));

        let reopened = Archive::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 2);
        let newest = reopened.list()[0];
        assert_eq!(newest.id, 2);
        assert!(reopened.path_of(newest).exists());
        assert!(newest.thumbnail.is_some());
        assert_eq!(reopened.list()[1].source_name.as_deref(), Some("deck.pdf#1"));
    }

    #[test]
    fn test_thumbnail_is_bounded() {
        let thumb = make_thumbnail(&png(2000, 1000).bytes).unwrap();
        let img = image::load_from_memory(&thumb).unwrap();
        assert_eq!(img.width(), 800);
        assert_eq!(img.height(), 400);
    }

    #[test]
    fn test_undecodable_image_is_saved_without_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = Archive::open(dir.path()).unwrap();
        let garbage = UpscaledImage { bytes: vec![1, 2, 3], mime_type: "image/webp".to_string() };

        archive.save(&garbage, 1, 1, None).unwrap();

        let entry = archive.list()[0];
        assert!(entry.thumbnail.is_none());
        assert!(entry.file_name.ends_with(".webp"));
        assert_eq!(entry.size, 3);
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = Archive::open(dir.path()).unwrap();
        archive.save(&png(4, 4), 4, 4, None).unwrap();
        archive.save(&png(4, 4), 4, 4, None).unwrap();
        let old_file = archive.path_of(archive.list()[1]);
        archive.entries[0].created_at -= Duration::days(8).num_milliseconds();

        let removed =
            archive.prune_older_than(Utc::now().timestamp_millis(), Duration::days(ARCHIVE_RETENTION_DAYS)).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(archive.len(), 1);
        assert!(!old_file.exists());
        assert_eq!(Archive::open(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_save_prunes_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = Archive::open(dir.path()).unwrap();
        archive.save(&png(4, 4), 4, 4, Some("old")).unwrap();
        let old_file = archive.path_of(archive.list()[0]);
        archive.entries[0].created_at -= Duration::days(8).num_milliseconds();

        archive.save(&png(4, 4), 4, 4, Some("new")).unwrap();

        assert_eq!(archive.len(), 1);
        assert_eq!(archive.list()[0].source_name.as_deref(), Some("new"));
        assert!(!old_file.exists());
    }

    #[test]
    fn test_delete_selected_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = Archive::open(dir.path()).unwrap();
        let a = archive.save(&png(4, 4), 4, 4, None).unwrap();
        let b = archive.save(&png(4, 4), 4, 4, None).unwrap();
        let c = archive.save(&png(4, 4), 4, 4, None).unwrap();
        let b_file = archive.path_of(archive.list().into_iter().find(|e| e.id == b).unwrap());

        assert_eq!(archive.delete(&[b, 99]).unwrap(), 1);
        assert_eq!(archive.delete(&[]).unwrap(), 0);

        let ids: Vec<u64> = archive.list().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![c, a]);
        assert!(!b_file.exists());
        assert_eq!(Archive::open(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = Archive::open(dir.path()).unwrap();
        archive.save(&png(4, 4), 4, 4, None).unwrap();
        archive.save(&png(4, 4), 4, 4, None).unwrap();
        let files: Vec<PathBuf> = archive.list().iter().map(|e| archive.path_of(e)).collect();

        assert_eq!(archive.clear().unwrap(), 2);

        assert!(archive.is_empty());
        assert!(files.iter().all(|f| !f.exists()));
        assert!(Archive::open(dir.path()).unwrap().is_empty());
        assert_eq!(archive.save(&png(4, 4), 4, 4, None).unwrap(), 1);
    }

    #[test]
    fn test_open_prunes_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let stale = ArchivedImage {
            id: 1,
            created_at: Utc::now().timestamp_millis() - Duration::days(30).num_milliseconds(),
            file_name: "000001_0.png".to_string(),
            thumbnail: None,
            width: 1,
            height: 1,
            source_name: None,
            size: 1,
        };
        fs::write(dir.path().join(INDEX_FILE), serde_json::to_vec(&vec![stale]).unwrap()).unwrap();

        let archive = Archive::open(dir.path()).unwrap();

        assert!(archive.is_empty());
    }
}
