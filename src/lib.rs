//! # image-feed-dl
//!
//! Downloads images hosted on a single image host from the listing feeds of
//! one or more channels on a content-aggregation site.
//!
//! For every channel the feed is fetched, entries pointing at the image host
//! are turned into [`ImageCandidate`]s, each image id is admitted at most once
//! per channel, and admitted images are stored as
//! `<output_root>/<channel>/<image_id>.<ext>` where `<ext>` comes from the
//! downloaded bytes rather than the URL.
//!
//! ## Quick Start
//!
//! ```no_run
//! use image_feed_dl::{Config, FeedDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         channels: vec!["cats".to_string(), "dogs".to_string()],
//!         output_root: "downloads".into(),
//!         ..Default::default()
//!     };
//!
//!     let downloader = FeedDownloader::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = downloader.run_configured().await?;
//!     println!("downloaded {} images", report.downloaded());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Per-channel duplicate detection
pub mod dedup;
/// Image download and extension correction
pub mod downloader;
/// Error types
pub mod error;
/// Image candidate extraction
pub mod extract;
/// Channel feed retrieval
pub mod feed;
/// Feed-to-file pipeline
pub mod pipeline;
/// Content type detection
pub mod sniff;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, FeedConfig};
pub use dedup::DedupRegistry;
pub use downloader::Downloader;
pub use error::{Error, Result};
pub use extract::ImageExtractor;
pub use feed::{FeedFetcher, Listing, ListingEntry};
pub use pipeline::FeedDownloader;
pub use sniff::{FileKind, sniff};
pub use types::{
    Author, Channel, ChannelReport, DownloadOutcome, Event, FetchOptions, ImageCandidate,
    ItemLimit, RunReport, SortMode,
};

use std::sync::Arc;

/// Run the configured channels, shutting down cleanly on a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// On a signal no further channel or image is started, images already
/// downloading finish, and the partial report is returned.
///
/// # Example
///
/// ```no_run
/// use image_feed_dl::{Config, FeedDownloader, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config {
///         channels: vec!["cats".to_string()],
///         ..Default::default()
///     };
///     let downloader = Arc::new(FeedDownloader::new(config)?);
///
///     let report = run_with_shutdown(downloader).await?;
///     println!("cancelled: {}", report.cancelled);
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: Arc<FeedDownloader>) -> Result<RunReport> {
    let signal_watcher = {
        let downloader = Arc::clone(&downloader);
        tokio::spawn(async move {
            let signal = wait_for_signal().await;
            tracing::info!(signal, "Stopping after the images already downloading");
            downloader.shutdown();
        })
    };

    let result = downloader.run_configured().await;
    signal_watcher.abort();
    result
}

/// Wait for the first termination signal and return its name
///
/// Registration can fail in restricted environments; whichever of SIGTERM and
/// SIGINT registers is awaited, with `ctrl_c` as the last resort.
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        },
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "SIGINT handler unavailable, a run stops on SIGTERM only");
            sigterm.recv().await;
            "SIGTERM"
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, a run stops on SIGINT only");
            sigint.recv().await;
            "SIGINT"
        }
        (Err(e), Err(_)) => {
            tracing::warn!(error = %e, "No signal handlers registered, falling back to ctrl_c");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without any handler the run can only end on its own
        tracing::error!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}
