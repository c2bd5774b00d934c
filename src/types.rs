//! Core types and events for image-feed-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Name of a content channel whose feed is scraped (e.g. a community name)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Channel(String);

impl Channel {
    /// Create a channel, rejecting names that are empty or would not stay
    /// a single directory below the output root
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed.contains("..")
            || trimmed.contains(['/', '\\'])
        {
            return Err(Error::InvalidChannel(name));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the channel name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Channel {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        Self::new(name)
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Feed ordering requested from the site
///
/// Anything that is not one of the supported modes, including the site's own
/// default ordering name, parses as [`SortMode::Default`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Newest first
    #[serde(alias = "newest")]
    New,
    /// Currently rising
    Rising,
    /// Most controversial
    Controversial,
    /// Top scoring
    Top,
    /// The feed's default ordering (no sort segment in the URL)
    #[default]
    #[serde(other)]
    Default,
}

impl SortMode {
    /// URL path segment for this mode, `None` for the default feed
    pub fn path_segment(&self) -> Option<&'static str> {
        match self {
            SortMode::Default => None,
            SortMode::New => Some("new"),
            SortMode::Rising => Some("rising"),
            SortMode::Controversial => Some("controversial"),
            SortMode::Top => Some("top"),
        }
    }
}

impl From<&str> for SortMode {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "new" | "newest" => SortMode::New,
            "rising" => SortMode::Rising,
            "controversial" => SortMode::Controversial,
            "top" => SortMode::Top,
            _ => SortMode::Default,
        }
    }
}

impl std::str::FromStr for SortMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment().unwrap_or("default"))
    }
}

/// Number of entries requested per feed page, always in `1..=50`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemLimit(u32);

impl ItemLimit {
    /// Largest page size the site serves
    pub const MAX: u32 = 50;

    /// Upper bound of the accepted input range; anything above resets to [`Self::MAX`]
    const ACCEPTED_MAX: i64 = 500;

    /// Clamp a raw user-supplied limit
    ///
    /// | input        | result    |
    /// |--------------|-----------|
    /// | `<= 0`       | 50        |
    /// | `> 500`      | 50        |
    /// | `51..=500`   | 50        |
    /// | `1..=50`     | unchanged |
    pub fn clamp(raw: i64) -> Self {
        let limit = if raw <= 0 || raw > Self::ACCEPTED_MAX {
            i64::from(Self::MAX)
        } else {
            raw.min(i64::from(Self::MAX))
        };
        // 1..=50 after the checks above
        Self(limit as u32)
    }

    /// Get the clamped value
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for ItemLimit {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl<'de> Deserialize<'de> for ItemLimit {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(Self::clamp)
    }
}

/// Options for a single feed request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Feed ordering
    #[serde(default)]
    pub sort: SortMode,

    /// Entries per page
    #[serde(default)]
    pub limit: ItemLimit,

    /// Opaque paging cursor; empty means the start of the feed
    #[serde(default)]
    pub after: String,
}

impl FetchOptions {
    /// Options for the first page with the given sort mode and raw limit
    pub fn new(sort: SortMode, raw_limit: i64) -> Self {
        Self {
            sort,
            limit: ItemLimit::clamp(raw_limit),
            after: String::new(),
        }
    }

    /// Same options pointing at a different page cursor
    pub fn with_after(&self, after: impl Into<String>) -> Self {
        Self {
            after: after.into(),
            ..self.clone()
        }
    }
}

/// Author of the post an image was found in
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Author handle
    pub name: String,
    /// Link to the author's profile page
    pub profile_link: String,
}

/// A normalized image reference extracted from a feed entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    /// Identifier derived from the image URL's last path segment, extension stripped
    pub image_id: String,
    /// Absolute image URL as listed in the feed
    pub source_link: String,
    /// Link to the post on the aggregation site
    pub post_link: String,
    /// Post title
    pub title: String,
    /// Post author
    pub author: Author,
    /// Channel the post was published in
    pub channel: String,
}

/// Result of processing one admitted candidate
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// A file already sat at the provisional path; nothing was fetched
    AlreadyPresent {
        /// Existing file
        path: PathBuf,
    },
    /// Downloaded and the provisional extension matched the content
    Saved {
        /// Final file
        path: PathBuf,
    },
    /// Downloaded and renamed to the sniffed extension
    Renamed {
        /// Provisional path
        from: PathBuf,
        /// Final file
        to: PathBuf,
    },
    /// Downloaded, but a file with the sniffed extension already existed
    DuplicateDiscarded {
        /// Provisional file that was deleted
        discarded: PathBuf,
        /// File that was already on disk
        existing: PathBuf,
    },
    /// Downloaded, but the content type was not recognized; left at the provisional path
    Unrecognized {
        /// Provisional file
        path: PathBuf,
    },
    /// Fetching or storing the image failed; the candidate was skipped
    Failed {
        /// Image the failure belongs to
        image_id: String,
        /// Error description
        reason: String,
    },
}

impl DownloadOutcome {
    /// Whether a new file ended up on disk as a result of this download
    pub fn is_new_file(&self) -> bool {
        matches!(
            self,
            DownloadOutcome::Saved { .. }
                | DownloadOutcome::Renamed { .. }
                | DownloadOutcome::Unrecognized { .. }
        )
    }

    /// Whether the candidate failed
    pub fn is_failed(&self) -> bool {
        matches!(self, DownloadOutcome::Failed { .. })
    }

    /// Final path of the artifact, if one exists
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            DownloadOutcome::AlreadyPresent { path }
            | DownloadOutcome::Saved { path }
            | DownloadOutcome::Unrecognized { path } => Some(path),
            DownloadOutcome::Renamed { to, .. } => Some(to),
            DownloadOutcome::DuplicateDiscarded { existing, .. } => Some(existing),
            DownloadOutcome::Failed { .. } => None,
        }
    }
}

/// Summary of one channel's run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChannelReport {
    /// Channel name
    pub channel: String,
    /// Candidates extracted from the feed
    pub candidates: usize,
    /// Candidates admitted by the dedup registry
    pub admitted: usize,
    /// Candidates rejected as duplicates or unusable
    pub rejected: usize,
    /// New files written (saved, renamed or unrecognized)
    pub downloaded: usize,
    /// Candidates whose file was already on disk
    pub already_present: usize,
    /// Downloads discarded because the canonical file already existed
    pub discarded: usize,
    /// Candidates that failed
    pub failed: usize,
    /// Set when the whole channel was skipped, with the reason
    pub skipped: Option<String>,
}

impl ChannelReport {
    /// Empty report for a channel
    pub fn new(channel: &Channel) -> Self {
        Self {
            channel: channel.to_string(),
            ..Default::default()
        }
    }

    /// Count one download outcome
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::AlreadyPresent { .. } => self.already_present += 1,
            DownloadOutcome::DuplicateDiscarded { .. } => self.discarded += 1,
            DownloadOutcome::Failed { .. } => self.failed += 1,
            DownloadOutcome::Saved { .. }
            | DownloadOutcome::Renamed { .. }
            | DownloadOutcome::Unrecognized { .. } => self.downloaded += 1,
        }
    }
}

/// Summary of a full run over all channels
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Per-channel reports in processing order
    pub channels: Vec<ChannelReport>,
    /// Whether the run stopped early because of shutdown
    pub cancelled: bool,
}

impl RunReport {
    /// Total new files across all channels
    pub fn downloaded(&self) -> usize {
        self.channels.iter().map(|c| c.downloaded).sum()
    }

    /// Total failed candidates across all channels
    pub fn failed(&self) -> usize {
        self.channels.iter().map(|c| c.failed).sum()
    }

    /// Channels that were skipped entirely
    pub fn skipped_channels(&self) -> impl Iterator<Item = &ChannelReport> {
        self.channels.iter().filter(|c| c.skipped.is_some())
    }

    /// Report for the named channel
    pub fn channel(&self, name: &str) -> Option<&ChannelReport> {
        self.channels.iter().find(|c| c.channel == name)
    }
}

/// Progress events emitted during a run
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Processing of a channel began
    ChannelStarted {
        /// Channel name
        channel: String,
    },
    /// The channel's feed was fetched and parsed
    FeedFetched {
        /// Channel name
        channel: String,
        /// Number of candidates extracted
        candidates: usize,
    },
    /// The channel was skipped because its feed or directory failed
    ChannelSkipped {
        /// Channel name
        channel: String,
        /// Error description
        reason: String,
    },
    /// A candidate finished (successfully or not)
    ImageProcessed {
        /// Channel name
        channel: String,
        /// Image identifier
        image_id: String,
        /// What happened
        outcome: DownloadOutcome,
    },
    /// Processing of a channel finished
    ChannelFinished {
        /// Final channel report
        report: ChannelReport,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_limit_clamp_table() {
        assert_eq!(ItemLimit::clamp(0).get(), 50);
        assert_eq!(ItemLimit::clamp(-5).get(), 50);
        assert_eq!(ItemLimit::clamp(600).get(), 50);
        assert_eq!(ItemLimit::clamp(51).get(), 50);
        assert_eq!(ItemLimit::clamp(500).get(), 50);
        assert_eq!(ItemLimit::clamp(501).get(), 50);
        assert_eq!(ItemLimit::clamp(30).get(), 30);
        assert_eq!(ItemLimit::clamp(1).get(), 1);
        assert_eq!(ItemLimit::clamp(50).get(), 50);
        assert_eq!(ItemLimit::clamp(i64::MIN).get(), 50);
    }

    #[test]
    fn test_item_limit_deserializes_through_clamp() {
        let opts: FetchOptions = serde_json::from_str(r#"{"limit": 250}"#).unwrap();
        assert_eq!(opts.limit.get(), 50);

        let opts: FetchOptions = serde_json::from_str(r#"{"limit": 12}"#).unwrap();
        assert_eq!(opts.limit.get(), 12);
        assert_eq!(opts.sort, SortMode::Default);
        assert_eq!(opts.after, "");
    }

    #[test]
    fn test_sort_mode_parsing() {
        assert_eq!("new".parse::<SortMode>().unwrap(), SortMode::New);
        assert_eq!("TOP".parse::<SortMode>().unwrap(), SortMode::Top);
        assert_eq!("rising".parse::<SortMode>().unwrap(), SortMode::Rising);
        assert_eq!(
            "controversial".parse::<SortMode>().unwrap(),
            SortMode::Controversial
        );
        assert_eq!("newest".parse::<SortMode>().unwrap(), SortMode::New);
        assert_eq!(SortMode::from(" Newest "), SortMode::New);
        assert_eq!("hot".parse::<SortMode>().unwrap(), SortMode::Default);
        assert_eq!("".parse::<SortMode>().unwrap(), SortMode::Default);
    }

    #[test]
    fn test_sort_mode_unknown_deserializes_to_default() {
        let sort: SortMode = serde_json::from_str(r#""best""#).unwrap();
        assert_eq!(sort, SortMode::Default);
        let sort: SortMode = serde_json::from_str(r#""top""#).unwrap();
        assert_eq!(sort, SortMode::Top);
        let sort: SortMode = serde_json::from_str(r#""newest""#).unwrap();
        assert_eq!(sort, SortMode::New);
        assert_eq!(serde_json::to_string(&SortMode::Default).unwrap(), r#""default""#);
        assert_eq!(SortMode::Default.path_segment(), None);
    }

    #[test]
    fn test_channel_validation() {
        assert!(Channel::new("").is_err());
        assert!(Channel::new("   ").is_err());
        assert_eq!(Channel::new(" cats ").unwrap().as_str(), "cats");
        assert_eq!(Channel::new("cats_and_dogs").unwrap().as_str(), "cats_and_dogs");

        let parsed: std::result::Result<Channel, _> = serde_json::from_str(r#""""#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_channel_rejects_names_leaving_output_root() {
        for name in ["/tmp/x", "a/b", "..", "../up", "a\\b", "."] {
            assert!(
                matches!(Channel::new(name), Err(Error::InvalidChannel(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_channel_report_records_outcomes() {
        let channel = Channel::new("cats").unwrap();
        let mut report = ChannelReport::new(&channel);

        report.record(&DownloadOutcome::Saved {
            path: "cats/a.png".into(),
        });
        report.record(&DownloadOutcome::Renamed {
            from: "cats/b.png".into(),
            to: "cats/b.gif".into(),
        });
        report.record(&DownloadOutcome::AlreadyPresent {
            path: "cats/c.png".into(),
        });
        report.record(&DownloadOutcome::Failed {
            image_id: "d".into(),
            reason: "timeout".into(),
        });

        assert_eq!(report.downloaded, 2);
        assert_eq!(report.already_present, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.discarded, 0);
    }
}
