//! Test configuration helpers for building downloaders against a mock server

use image_feed_dl::{Config, FeedDownloader};
use std::path::Path;
use wiremock::MockServer;

/// Configuration pointing feed and image host at `server`, writing under `output_root`
pub fn mock_config(server: &MockServer, output_root: &Path, channels: &[&str]) -> Config {
    let mut config = Config {
        channels: channels.iter().map(|c| c.to_string()).collect(),
        output_root: output_root.to_path_buf(),
        ..Default::default()
    };
    config.feed.base_url = format!("{}/r", server.uri());
    config.feed.site_base = server.uri();
    config.feed.image_host = "127.0.0.1".to_string();
    config
}

/// Downloader built from [`mock_config`]
pub fn mock_downloader(
    server: &MockServer,
    output_root: &Path,
    channels: &[&str],
) -> FeedDownloader {
    FeedDownloader::new(mock_config(server, output_root, channels))
        .expect("Failed to create downloader")
}
