//! Per-channel feed-to-file pipeline
//!
//! [`FeedDownloader`] runs each channel through fetch, extraction, admission and
//! download. Channels are processed one after another; failures are isolated
//! at two levels:
//! - a feed or output directory failure skips that channel only
//! - an image failure skips that image only

use crate::config::Config;
use crate::dedup::DedupRegistry;
use crate::downloader::Downloader;
use crate::error::Result;
use crate::extract::ImageExtractor;
use crate::feed::FeedFetcher;
use crate::types::{Channel, ChannelReport, Event, FetchOptions, ImageCandidate, RunReport};
use crate::utils::ensure_dir;
use futures::future;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Buffered events per subscriber before it starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Downloads host images from channel feeds into `<output_root>/<channel>/`
pub struct FeedDownloader {
    config: Config,
    fetcher: FeedFetcher,
    extractor: ImageExtractor,
    downloader: Downloader,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: broadcast::Sender<Event>,
    /// Cancelled by [`FeedDownloader::shutdown`]
    cancel_token: CancellationToken,
}

impl FeedDownloader {
    /// Create a downloader from a configuration
    ///
    /// The channel list is not validated here; see [`Config::validate`].
    ///
    /// # Errors
    /// Returns error if an HTTP client cannot be created
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = FeedFetcher::new(&config.feed)?;
        let extractor = ImageExtractor::from_config(&config.feed);
        let downloader = Downloader::new(&config.download, &config.feed.user_agent)?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            fetcher,
            extractor,
            downloader,
            event_tx,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Subscribe to progress events
    ///
    /// Each subscriber receives all events independently. A subscriber that
    /// falls behind by more than 1000 events receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the current run from starting further channels or downloads
    ///
    /// Downloads already in flight run to completion and are reported.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.cancel_token.cancel();
    }

    /// Whether [`FeedDownloader::shutdown`] was called
    pub fn is_shutting_down(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Run the configured channels with the configured fetch options
    ///
    /// # Errors
    /// Returns error if the configuration does not validate
    pub async fn run_configured(&self) -> Result<RunReport> {
        self.config.validate()?;
        let channels = self.config.channel_list()?;
        let options = self.config.feed.fetch_options();
        Ok(self.run(&channels, &options).await)
    }

    /// Run the given channels in order with a fresh dedup registry
    pub async fn run(&self, channels: &[Channel], options: &FetchOptions) -> RunReport {
        let mut registry = DedupRegistry::new();
        self.run_with_registry(&mut registry, channels, options).await
    }

    /// Run the given channels in order, admitting candidates through `registry`
    ///
    /// Passing the same registry to several runs extends the at-most-once
    /// guarantee across them.
    pub async fn run_with_registry(
        &self,
        registry: &mut DedupRegistry,
        channels: &[Channel],
        options: &FetchOptions,
    ) -> RunReport {
        let mut report = RunReport::default();

        for channel in channels {
            if self.is_shutting_down() {
                report.cancelled = true;
                break;
            }
            let channel_report = self.process_channel(registry, channel, options).await;
            report.channels.push(channel_report);
        }

        if self.is_shutting_down() {
            report.cancelled = true;
        }

        info!(
            channels = report.channels.len(),
            downloaded = report.downloaded(),
            failed = report.failed(),
            cancelled = report.cancelled,
            "Run finished"
        );
        report
    }

    async fn process_channel(
        &self,
        registry: &mut DedupRegistry,
        channel: &Channel,
        options: &FetchOptions,
    ) -> ChannelReport {
        let mut report = ChannelReport::new(channel);
        registry.ensure_channel(channel);
        info!(channel = %channel, sort = %options.sort, limit = options.limit.get(), "Processing channel");
        self.emit_event(Event::ChannelStarted {
            channel: channel.to_string(),
        });

        let listing = match self
            .fetcher
            .fetch_pages(channel, options, self.config.feed.max_pages)
            .await
        {
            Ok(listing) => listing,
            Err(e) => return self.skip_channel(report, channel, e.to_string()),
        };

        let candidates = self.extractor.extract(listing.as_ref(), channel);
        report.candidates = candidates.len();
        debug!(channel = %channel, candidates = candidates.len(), "Extracted candidates");
        self.emit_event(Event::FeedFetched {
            channel: channel.to_string(),
            candidates: candidates.len(),
        });

        let output_dir = self.config.output_root.join(channel.as_str());
        if let Err(e) = ensure_dir(&output_dir).await {
            return self.skip_channel(report, channel, e.to_string());
        }

        // Admission stays on this task so the registry has a single writer
        let mut admitted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if self.is_shutting_down() {
                break;
            }
            if registry.admit(channel, &candidate.image_id) {
                admitted.push(candidate);
            } else {
                report.rejected += 1;
            }
        }

        let started = self
            .download_admitted(channel, &output_dir, &admitted, &mut report)
            .await;

        // Admissions whose download never started are undone
        for candidate in &admitted[started..] {
            registry.release(channel, &candidate.image_id);
        }
        if started < admitted.len() {
            info!(
                channel = %channel,
                pending = admitted.len() - started,
                "Shutdown requested, remaining images left for a later run"
            );
        }
        report.admitted = started;

        info!(
            channel = %channel,
            candidates = report.candidates,
            downloaded = report.downloaded,
            already_present = report.already_present,
            failed = report.failed,
            "Channel finished"
        );
        self.emit_event(Event::ChannelFinished {
            report: report.clone(),
        });
        report
    }

    /// Download `admitted` in feed order, returning how many were started
    ///
    /// Started downloads always finish, so the started candidates are a prefix
    /// of `admitted` and each of them has an outcome in `report`.
    async fn download_admitted(
        &self,
        channel: &Channel,
        output_dir: &Path,
        admitted: &[ImageCandidate],
        report: &mut ChannelReport,
    ) -> usize {
        let concurrency = self.config.download.max_concurrent_downloads.max(1);

        // `buffered` yields in feed order while keeping up to `concurrency` in flight.
        // It pulls the next candidate only when a slot frees up, so the shutdown
        // check runs right before each download would start.
        let mut outcomes = std::pin::pin!(
            stream::iter(admitted)
                .take_while(|_| future::ready(!self.is_shutting_down()))
                .map(|candidate| async move {
                    let outcome = self.downloader.download(output_dir, candidate).await;
                    (candidate, outcome)
                })
                .buffered(concurrency)
        );

        let mut started = 0;
        while let Some((candidate, outcome)) = outcomes.next().await {
            started += 1;
            report.record(&outcome);
            self.emit_event(Event::ImageProcessed {
                channel: channel.to_string(),
                image_id: candidate.image_id.clone(),
                outcome,
            });
        }
        started
    }

    fn skip_channel(
        &self,
        mut report: ChannelReport,
        channel: &Channel,
        reason: String,
    ) -> ChannelReport {
        warn!(channel = %channel, error = %reason, "Skipping channel");
        self.emit_event(Event::ChannelSkipped {
            channel: channel.to_string(),
            reason: reason.clone(),
        });
        report.skipped = Some(reason);
        self.emit_event(Event::ChannelFinished {
            report: report.clone(),
        });
        report
    }

    /// Emit an event to all subscribers; dropped when nobody listens
    fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
