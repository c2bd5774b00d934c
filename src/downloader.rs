//! Image download and extension correction
//!
//! Every image is first written to `<dir>/<image_id>.png`, then its bytes are
//! sniffed and the file is renamed to the detected extension. An existing file
//! at the provisional path counts as already downloaded.

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::sniff::sniff;
use crate::types::{DownloadOutcome, ImageCandidate};
use crate::utils::{PROVISIONAL_EXTENSION, artifact_path, provisional_path};
use std::path::Path;
use tracing::{debug, warn};

/// Fetches image candidates and stores them under their sniffed extension
#[derive(Clone)]
pub struct Downloader {
    /// HTTP client for fetching images
    http_client: reqwest::Client,
}

impl Downloader {
    /// Create a downloader from the download configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &DownloadConfig, user_agent: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(user_agent)
            .build()?;

        Ok(Self { http_client })
    }

    /// Download one candidate into `output_dir`
    ///
    /// Never fails: errors are logged and reported as [`DownloadOutcome::Failed`]
    /// so one broken image does not stop the rest of the channel.
    pub async fn download(&self, output_dir: &Path, candidate: &ImageCandidate) -> DownloadOutcome {
        match self.try_download(output_dir, candidate).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    image_id = %candidate.image_id,
                    url = %candidate.source_link,
                    error = %e,
                    "Image download failed, skipping"
                );
                DownloadOutcome::Failed {
                    image_id: candidate.image_id.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Download one candidate into `output_dir`, surfacing errors
    ///
    /// # Errors
    /// Returns [`Error::Network`] when the image cannot be fetched and
    /// [`Error::FileSystem`] when it cannot be stored
    pub async fn try_download(
        &self,
        output_dir: &Path,
        candidate: &ImageCandidate,
    ) -> Result<DownloadOutcome> {
        let provisional = provisional_path(output_dir, &candidate.image_id);
        if path_exists(&provisional).await? {
            debug!(path = %provisional.display(), "Image already on disk");
            return Ok(DownloadOutcome::AlreadyPresent { path: provisional });
        }

        // The host serves every image under a .png suffix
        let url = format!("{}.{}", candidate.source_link, PROVISIONAL_EXTENSION);
        debug!(image_id = %candidate.image_id, url = %url, "Fetching image");

        let response = self.http_client.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        if let Err(e) = tokio::fs::write(&provisional, &bytes).await {
            // A partial file would look like a finished download next run
            tokio::fs::remove_file(&provisional).await.ok();
            return Err(Error::fs(provisional, e));
        }

        reclassify(output_dir, &candidate.image_id, &bytes).await
    }
}

/// Move a freshly written provisional file to the extension its bytes sniff as
///
/// `bytes` must be the content written to the provisional path. Unrecognized
/// content stays at the provisional path. When a file with the sniffed
/// extension already exists the provisional file is deleted instead.
///
/// # Errors
/// Returns [`Error::FileSystem`] when the rename or delete fails
pub async fn reclassify(
    output_dir: &Path,
    image_id: &str,
    bytes: &[u8],
) -> Result<DownloadOutcome> {
    let provisional = provisional_path(output_dir, image_id);

    let Some(kind) = sniff(bytes) else {
        debug!(path = %provisional.display(), "Unrecognized content type, keeping provisional name");
        return Ok(DownloadOutcome::Unrecognized { path: provisional });
    };

    if kind.matches_extension(PROVISIONAL_EXTENSION) {
        return Ok(DownloadOutcome::Saved { path: provisional });
    }

    let corrected = artifact_path(output_dir, image_id, kind.extension());
    if path_exists(&corrected).await? {
        tokio::fs::remove_file(&provisional)
            .await
            .map_err(|e| Error::fs(&provisional, e))?;
        debug!(
            existing = %corrected.display(),
            "Canonical file already present, discarded provisional copy"
        );
        return Ok(DownloadOutcome::DuplicateDiscarded {
            discarded: provisional,
            existing: corrected,
        });
    }

    tokio::fs::rename(&provisional, &corrected)
        .await
        .map_err(|e| Error::fs(&provisional, e))?;
    debug!(
        from = %provisional.display(),
        to = %corrected.display(),
        mime = kind.mime_type(),
        "Corrected image extension"
    );
    Ok(DownloadOutcome::Renamed {
        from: provisional,
        to: corrected,
    })
}

async fn path_exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| Error::fs(path, e))
}
