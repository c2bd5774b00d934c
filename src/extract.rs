//! Image candidate extraction from listings

use crate::config::FeedConfig;
use crate::feed::{Listing, ListingEntry};
use crate::types::{Author, Channel, ImageCandidate};
use crate::utils::{host_contains, image_id_from_url};
use tracing::trace;

/// Maps listing entries hosted on the configured image host to [`ImageCandidate`]s
#[derive(Clone, Debug)]
pub struct ImageExtractor {
    /// Marker both the entry domain and the URL host must contain
    image_host: String,

    /// Site root for post and profile links
    site_base: String,
}

impl ImageExtractor {
    /// Create an extractor for the given host marker and site root
    pub fn new(image_host: impl Into<String>, site_base: impl Into<String>) -> Self {
        Self {
            image_host: image_host.into(),
            site_base: site_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create an extractor from the feed configuration
    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.image_host.as_str(), config.site_base.as_str())
    }

    /// Extract candidates in feed order; an absent listing yields nothing
    pub fn extract(&self, listing: Option<&Listing>, channel: &Channel) -> Vec<ImageCandidate> {
        let Some(listing) = listing else {
            return Vec::new();
        };

        listing
            .entries()
            .filter(|entry| {
                entry
                    .domain
                    .as_deref()
                    .is_some_and(|domain| domain.contains(&self.image_host))
            })
            .filter_map(|entry| self.candidate(entry, channel))
            .collect()
    }

    /// Build a candidate from an entry whose domain already matched
    fn candidate(&self, entry: &ListingEntry, channel: &Channel) -> Option<ImageCandidate> {
        let Some(url) = entry
            .url
            .as_deref()
            .filter(|url| host_contains(url, &self.image_host))
        else {
            trace!(id = ?entry.id, url = ?entry.url, "Dropping entry whose URL is not on the image host");
            return None;
        };

        let Some(image_id) = image_id_from_url(url) else {
            trace!(id = ?entry.id, url, "Dropping entry without an image id");
            return None;
        };

        let author = entry.author.clone().unwrap_or_default();
        Some(ImageCandidate {
            image_id,
            source_link: url.to_string(),
            post_link: format!(
                "{}{}",
                self.site_base,
                entry.permalink.as_deref().unwrap_or_default()
            ),
            title: entry.title.clone().unwrap_or_default(),
            author: Author {
                profile_link: format!("{}/user/{}", self.site_base, author),
                name: author,
            },
            channel: entry
                .subreddit
                .clone()
                .unwrap_or_else(|| channel.to_string()),
        })
    }
}
