//! Utility functions for URL inspection and path manipulation

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Derive an image identifier from an image URL
///
/// Takes the last `/`-separated segment of the URL and keeps everything before
/// the first `.`. Returns `None` when that leaves nothing.
///
/// # Examples
///
/// ```
/// use image_feed_dl::utils::image_id_from_url;
///
/// assert_eq!(image_id_from_url("https://i.imgur.com/abc123.png"), Some("abc123".to_string()));
/// assert_eq!(image_id_from_url("https://i.imgur.com/"), None);
/// ```
pub fn image_id_from_url(url: &str) -> Option<String> {
    let last_segment = url.rsplit('/').next()?;
    let id = last_segment.split('.').next()?;
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}

/// Whether `url` parses and its host contains `marker`
pub fn host_contains(url: &str, marker: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.contains(marker)))
        .unwrap_or(false)
}

/// Path an image is written to before its content type is known
pub fn provisional_path(dir: &Path, image_id: &str) -> PathBuf {
    artifact_path(dir, image_id, PROVISIONAL_EXTENSION)
}

/// Path of an artifact with the given extension
pub fn artifact_path(dir: &Path, image_id: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", image_id, extension))
}

/// Extension assumed for every image before sniffing
pub const PROVISIONAL_EXTENSION: &str = "png";

/// Create a directory and its parents if missing
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::fs(dir, e))
}
