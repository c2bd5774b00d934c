//! Configuration types for image-feed-dl

use crate::error::{Error, Result};
use crate::types::{Channel, FetchOptions, SortMode};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Feed retrieval and extraction settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL channel feeds hang off (default: "https://www.reddit.com/r")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Site root used to build post and profile links (default: "https://www.reddit.com")
    #[serde(default = "default_site_base")]
    pub site_base: String,

    /// Marker an entry's domain and URL host must contain (default: "imgur.com")
    #[serde(default = "default_image_host")]
    pub image_host: String,

    /// Feed ordering
    #[serde(default)]
    pub sort: SortMode,

    /// Raw entries-per-page value, clamped when options are built (default: 50)
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Page cursor to start from (default: start of feed)
    #[serde(default)]
    pub after: String,

    /// Number of pages to follow per channel (default: 1)
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Feed request timeout in seconds (default: 30)
    #[serde(default = "default_feed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            site_base: default_site_base(),
            image_host: default_image_host(),
            sort: SortMode::default(),
            limit: default_limit(),
            after: String::new(),
            max_pages: default_max_pages(),
            user_agent: default_user_agent(),
            timeout_secs: default_feed_timeout_secs(),
        }
    }
}

impl FeedConfig {
    /// Fetch options for the first page, with the limit clamped
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new(self.sort, self.limit).with_after(self.after.clone())
    }

    /// Feed request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Image download settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum image downloads in flight per channel (default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Image request timeout in seconds (default: 60)
    #[serde(default = "default_download_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent(),
            timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl DownloadConfig {
    /// Image request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Main configuration for [`FeedDownloader`](crate::FeedDownloader)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Channels to process, in order
    #[serde(default)]
    pub channels: Vec<String>,

    /// Root directory; each channel gets a subdirectory (default: "./downloads")
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Feed settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Download settings
    #[serde(default)]
    pub download: DownloadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            output_root: default_output_root(),
            feed: FeedConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}

impl Config {
    /// Load a configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::fs(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            message: format!("invalid TOML: {}", e),
            key: None,
        })
    }

    /// Validated channel list, in configured order
    pub fn channel_list(&self) -> Result<Vec<Channel>> {
        self.channels
            .iter()
            .map(|name| Channel::new(name.as_str()))
            .collect()
    }

    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(Error::config(
                "channels",
                "at least one channel is required",
            ));
        }
        self.channel_list()?;

        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "download.max_concurrent_downloads",
                "must be at least 1",
            ));
        }

        if self.feed.max_pages == 0 {
            return Err(Error::config("feed.max_pages", "must be at least 1"));
        }

        if self.feed.image_host.trim().is_empty() {
            return Err(Error::config("feed.image_host", "must not be empty"));
        }

        url::Url::parse(&self.feed.base_url)
            .map_err(|e| Error::config("feed.base_url", format!("invalid URL: {}", e)))?;

        Ok(())
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_base_url() -> String {
    "https://www.reddit.com/r".to_string()
}

fn default_site_base() -> String {
    "https://www.reddit.com".to_string()
}

fn default_image_host() -> String {
    "imgur.com".to_string()
}

fn default_limit() -> i64 {
    50
}

fn default_max_pages() -> usize {
    1
}

fn default_user_agent() -> String {
    concat!("image-feed-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_feed_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    3
}

fn default_download_timeout_secs() -> u64 {
    60
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.output_root, PathBuf::from("./downloads"));
        assert_eq!(config.feed.image_host, "imgur.com");
        assert_eq!(config.feed.sort, SortMode::Default);
        assert_eq!(config.feed.max_pages, 1);
        assert_eq!(config.download.max_concurrent_downloads, 3);
        assert_eq!(config.feed.fetch_options().limit.get(), 50);
    }

    #[test]
    fn test_from_toml_str_with_partial_sections() {
        let config = Config::from_toml_str(
            r#"
channels = ["cats", "dogs"]
output_root = "/tmp/images"

[feed]
sort = "top"
limit = 250
"#,
        )
        .unwrap();

        assert_eq!(config.channels, vec!["cats", "dogs"]);
        assert_eq!(config.output_root, PathBuf::from("/tmp/images"));
        assert_eq!(config.feed.sort, SortMode::Top);
        assert_eq!(config.feed.limit, 250);
        assert_eq!(config.feed.fetch_options().limit.get(), 50);
        assert_eq!(config.feed.base_url, "https://www.reddit.com/r");
        assert_eq!(config.download.timeout_secs, 60);
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("channels = [").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(ref k), .. }) if k == "channels"
        ));

        let config = Config {
            channels: vec!["cats".into(), " ".into()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidChannel(_))));

        let mut config = Config {
            channels: vec!["cats".into()],
            ..Default::default()
        };
        config.download.max_concurrent_downloads = 0;
        assert!(config.validate().is_err());

        let mut config = Config {
            channels: vec!["cats".into()],
            ..Default::default()
        };
        config.feed.base_url = "not a url".into();
        assert!(matches!(
            config.validate(),
            Err(Error::Config { key: Some(ref k), .. }) if k == "feed.base_url"
        ));
    }

    #[test]
    fn test_from_toml_file_missing_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_toml_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::FileSystem { .. }));
    }
}
