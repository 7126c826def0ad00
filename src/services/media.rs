//! Media asset manager: stores uploads under per-entity directories, turns
//! stored references into public URLs and removes files that were replaced
//! or whose owning record is gone.

use std::sync::Arc;

use bytes::Bytes;
use image::ImageFormat;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::services::storage::{StorageBackend, StorageError};

const KB: usize = 1024;

/// Upload constraints for one kind of file.
#[derive(Debug)]
pub struct MediaPolicy {
    pub max_bytes: usize,
    pub accepted: &'static [&'static str],
    kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Image,
    Video,
}

pub const IMAGE: MediaPolicy = MediaPolicy {
    max_bytes: 2048 * KB,
    accepted: &["jpeg", "png", "jpg", "gif", "webp"],
    kind: MediaKind::Image,
};

pub const VIDEO: MediaPolicy = MediaPolicy {
    max_bytes: 51200 * KB,
    accepted: &["mp4", "mov", "avi"],
    kind: MediaKind::Video,
};

/// Storage sub-directory plus the policy its uploads must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub dir: &'static str,
    pub policy: &'static MediaPolicy,
}

impl Category {
    pub const fn image(dir: &'static str) -> Self {
        Self { dir, policy: &IMAGE }
    }

    pub const fn video(dir: &'static str) -> Self {
        Self { dir, policy: &VIDEO }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn declared_extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .map(str::to_ascii_lowercase)
    }
}

impl MediaPolicy {
    /// Returns the extension to store the file under, or every rule it breaks.
    pub fn check(&self, field: &str, file: &UploadedFile) -> Result<&'static str, Vec<String>> {
        let label = field.replace('_', " ");
        let mut problems = Vec::new();

        if file.size() > self.max_bytes {
            problems.push(format!(
                "The {label} must not be greater than {} kilobytes.",
                self.max_bytes / KB
            ));
        }

        let extension = match self.kind {
            MediaKind::Image => sniff_image(&file.data),
            MediaKind::Video => file
                .declared_extension()
                .and_then(|ext| self.accepted.iter().copied().find(|a| *a == ext))
                .or_else(|| video_extension_for(&file.content_type)),
        };
        if extension.is_none() {
            problems.push(format!(
                "The {label} must be a file of type: {}.",
                self.accepted.join(", ")
            ));
        }

        match extension {
            Some(ext) if problems.is_empty() => Ok(ext),
            _ => Err(problems),
        }
    }
}

fn sniff_image(data: &[u8]) -> Option<&'static str> {
    match image::guess_format(data).ok()? {
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Png => Some("png"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::WebP => Some("webp"),
        _ => None,
    }
}

fn video_extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/x-msvideo" | "video/avi" => Some("avi"),
        _ => None,
    }
}

/// A stored pointer to a binary asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    /// Path relative to the storage root.
    Local(String),
    /// Asset hosted elsewhere (e.g. a YouTube link).
    External(Url),
}

impl MediaRef {
    pub fn local(path: &Option<String>) -> Option<MediaRef> {
        path.as_ref()
            .filter(|p| !p.is_empty())
            .map(|p| MediaRef::Local(p.clone()))
    }

    pub fn locals(paths: &[String]) -> Vec<MediaRef> {
        paths.iter().map(|p| MediaRef::Local(p.clone())).collect()
    }
}

/// Reads a JSON column holding an ordered list of relative paths.
pub fn paths_from_json(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("{}", .0.join(" "))]
    Rejected(Vec<String>),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct MediaStore {
    backend: Arc<dyn StorageBackend>,
    base_url: String,
}

impl MediaStore {
    pub fn new(backend: Arc<dyn StorageBackend>, base_url: impl Into<String>) -> Self {
        Self {
            backend,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Persists `file` under `category.dir` and returns its relative path.
    pub async fn store(&self, file: &UploadedFile, category: Category) -> Result<String, MediaError> {
        let extension = category
            .policy
            .check("file", file)
            .map_err(MediaError::Rejected)?;
        let path = format!("{}/{}.{}", category.dir, Uuid::new_v4(), extension);

        self.backend
            .put(&path, file.data.clone(), &file.content_type)
            .await?;
        tracing::debug!(path = %path, size = file.size(), "Stored media");
        Ok(path)
    }

    pub fn to_public_url(&self, media: &MediaRef) -> String {
        match media {
            MediaRef::Local(path) => format!("{}/{}", self.base_url, path.trim_start_matches('/')),
            MediaRef::External(url) => url.to_string(),
        }
    }

    pub fn url_for(&self, path: &Option<String>) -> Value {
        MediaRef::local(path).map_or(Value::Null, |m| Value::String(self.to_public_url(&m)))
    }

    pub fn urls_for(&self, paths: &[String]) -> Value {
        Value::Array(
            paths
                .iter()
                .map(|p| Value::String(self.to_public_url(&MediaRef::Local(p.clone()))))
                .collect(),
        )
    }

    /// Stores the new file, then removes the old one. Losing the old file is
    /// never an error.
    pub async fn replace(
        &self,
        old: Option<&MediaRef>,
        file: &UploadedFile,
        category: Category,
    ) -> Result<String, MediaError> {
        let path = self.store(file, category).await?;
        if let Some(old) = old {
            self.delete(old).await;
        }
        Ok(path)
    }

    /// Best-effort removal; external references are left alone.
    pub async fn delete(&self, media: &MediaRef) {
        let MediaRef::Local(path) = media else {
            return;
        };
        if let Err(e) = self.backend.delete(path).await {
            tracing::warn!(path = %path, error = %e, "Failed to delete media file");
        }
    }

    pub async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.backend.exists(path).await
    }

    pub fn staging(&self) -> Staging {
        Staging {
            media: self.clone(),
            staged: Vec::new(),
            superseded: Vec::new(),
        }
    }
}

/// Two-phase file handling around a row write: files are stored before the
/// row is committed, and whatever the row no longer references is deleted
/// only after the commit succeeded.
pub struct Staging {
    media: MediaStore,
    staged: Vec<String>,
    superseded: Vec<MediaRef>,
}

impl Staging {
    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    pub async fn stage(&mut self, file: &UploadedFile, category: Category) -> Result<String, MediaError> {
        let path = self.media.store(file, category).await?;
        self.staged.push(path.clone());
        Ok(path)
    }

    pub async fn stage_all(
        &mut self,
        files: &[UploadedFile],
        category: Category,
    ) -> Result<Vec<String>, MediaError> {
        let mut paths = Vec::with_capacity(files.len());
        for file in files {
            paths.push(self.stage(file, category).await?);
        }
        Ok(paths)
    }

    /// Stages `file` when present and marks `current` for removal on commit.
    /// Returns the path the row should hold.
    pub async fn stage_replacement(
        &mut self,
        current: &Option<String>,
        file: Option<&UploadedFile>,
        category: Category,
    ) -> Result<Option<String>, MediaError> {
        let Some(file) = file else {
            return Ok(current.clone());
        };
        let path = self.stage(file, category).await?;
        if let Some(old) = MediaRef::local(current) {
            self.superseded.push(old);
        }
        Ok(Some(path))
    }

    pub fn supersede(&mut self, media: impl IntoIterator<Item = MediaRef>) {
        self.superseded.extend(media);
    }

    /// The row is committed: drop files it no longer points to.
    pub async fn commit(self) {
        for media in &self.superseded {
            self.media.delete(media).await;
        }
    }

    /// The row write failed: drop the files stored for it.
    pub async fn rollback(self) {
        for path in &self.staged {
            self.media.delete(&MediaRef::Local(path.clone())).await;
        }
    }
}
