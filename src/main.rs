//! Command line entry point for image-feed-dl

use clap::Parser;
use image_feed_dl::{Config, FeedDownloader, SortMode, run_with_shutdown};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Download images from channel feeds
#[derive(Debug, Parser)]
#[command(name = "image-feed-dl", version)]
#[command(about = "Download image-host posts from channel feeds", long_about = None)]
struct Cli {
    /// Channels to scrape (added to any channels from the config file)
    channels: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory for downloaded images
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Feed ordering: new/newest, rising, controversial, top; anything else uses the default feed
    #[arg(short, long)]
    sort: Option<String>,

    /// Entries per feed page; out-of-range values fall back to 50
    #[arg(short, long, allow_negative_numbers = true)]
    limit: Option<i64>,

    /// Feed pages to follow per channel
    #[arg(long)]
    pages: Option<usize>,

    /// Concurrent image downloads per channel
    #[arg(short, long)]
    jobs: Option<usize>,
}

impl Cli {
    /// Merge command line values over a loaded configuration
    fn apply(self, mut config: Config) -> Config {
        config.channels.extend(self.channels);
        if let Some(output) = self.output {
            config.output_root = output;
        }
        if let Some(sort) = self.sort {
            config.feed.sort = SortMode::from(sort.as_str());
        }
        if let Some(limit) = self.limit {
            config.feed.limit = limit;
        }
        if let Some(pages) = self.pages {
            config.feed.max_pages = pages;
        }
        if let Some(jobs) = self.jobs {
            config.download.max_concurrent_downloads = jobs;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };
    let config = cli.apply(config);
    config.validate()?;

    let downloader = Arc::new(FeedDownloader::new(config)?);
    let report = run_with_shutdown(downloader).await?;

    for channel in &report.channels {
        match &channel.skipped {
            Some(reason) => {
                tracing::warn!(channel = %channel.channel, reason = %reason, "Channel skipped")
            }
            None => tracing::info!(
                channel = %channel.channel,
                downloaded = channel.downloaded,
                already_present = channel.already_present,
                duplicates = channel.rejected + channel.discarded,
                failed = channel.failed,
                "Channel summary"
            ),
        }
    }

    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "image-feed-dl",
            "-o",
            "/tmp/out",
            "-s",
            "newest",
            "-l",
            "-5",
            "--pages",
            "3",
            "-j",
            "8",
            "cats",
            "dogs",
        ])
        .unwrap();

        let config = cli.apply(Config {
            channels: vec!["birds".to_string()],
            ..Default::default()
        });

        assert_eq!(config.channels, vec!["birds", "cats", "dogs"]);
        assert_eq!(config.output_root, PathBuf::from("/tmp/out"));
        assert_eq!(config.feed.sort, SortMode::New);
        assert_eq!(config.feed.fetch_options().limit.get(), 50);
        assert_eq!(config.feed.max_pages, 3);
        assert_eq!(config.download.max_concurrent_downloads, 8);
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let cli = Cli::try_parse_from(["image-feed-dl", "cats"]).unwrap();
        let config = cli.apply(Config::default());

        assert_eq!(config.channels, vec!["cats"]);
        assert_eq!(config.feed.sort, SortMode::Default);
        assert_eq!(config.download.max_concurrent_downloads, 3);
    }
}
