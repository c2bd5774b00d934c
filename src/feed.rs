//! Channel feed retrieval
//!
//! Builds the paged listing URL for a channel, performs the request and decodes
//! the JSON body. A body that does not match the listing schema is not fatal:
//! [`FeedFetcher::fetch`] returns `Ok(None)` and the extractor treats it as an
//! empty feed.

use crate::config::FeedConfig;
use crate::error::{Error, Result};
use crate::types::{Channel, FetchOptions};
use serde::Deserialize;
use tracing::{debug, warn};

/// Deserialized feed response
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Listing {
    /// Listing payload
    pub data: ListingData,
}

/// Payload of a [`Listing`]
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListingData {
    /// Entries in feed order
    #[serde(default)]
    pub children: Vec<ListingChild>,

    /// Cursor of the next page, absent on the last page
    #[serde(default)]
    pub after: Option<String>,
}

impl Listing {
    /// Entries in feed order
    pub fn entries(&self) -> impl Iterator<Item = &ListingEntry> {
        self.data.children.iter().map(|child| &child.data)
    }

    /// Cursor of the next page, if there is one
    pub fn next_cursor(&self) -> Option<&str> {
        self.data.after.as_deref().filter(|after| !after.is_empty())
    }
}

/// Wrapper object around each entry
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListingChild {
    /// The entry itself
    #[serde(default)]
    pub data: ListingEntry,
}

/// A raw feed entry; every field is optional since entries are heterogeneous
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ListingEntry {
    /// Domain the entry links to
    #[serde(default)]
    pub domain: Option<String>,
    /// Absolute URL the entry links to
    #[serde(default)]
    pub url: Option<String>,
    /// Author handle
    #[serde(default)]
    pub author: Option<String>,
    /// Post identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Site-relative post path
    #[serde(default)]
    pub permalink: Option<String>,
    /// Post title
    #[serde(default)]
    pub title: Option<String>,
    /// Channel the entry was posted in
    #[serde(default)]
    pub subreddit: Option<String>,
}

/// Fetches channel listings over HTTP
pub struct FeedFetcher {
    /// HTTP client for fetching feeds
    http_client: reqwest::Client,

    /// Base URL channel names are appended to
    base_url: String,
}

impl FeedFetcher {
    /// Create a fetcher from the feed configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Compose the listing URL for a channel
    ///
    /// `<base>/<channel>/<sort>.json?limit=<n>&after=<cursor>`; the sort segment
    /// is left out for the default ordering.
    pub fn feed_url(&self, channel: &Channel, options: &FetchOptions) -> String {
        format!(
            "{}/{}/{}.json?limit={}&after={}",
            self.base_url,
            urlencoding::encode(channel.as_str()),
            options.sort.path_segment().unwrap_or(""),
            options.limit.get(),
            urlencoding::encode(&options.after),
        )
    }

    /// Fetch one page of a channel's feed
    ///
    /// # Returns
    /// `Ok(None)` when the body is not a valid listing
    ///
    /// # Errors
    /// Returns [`Error::Network`] on transport failure or a non-success status
    pub async fn fetch(
        &self,
        channel: &Channel,
        options: &FetchOptions,
    ) -> Result<Option<Listing>> {
        match self.fetch_strict(channel, options).await {
            Ok(listing) => Ok(Some(listing)),
            Err(Error::Decode(e)) => {
                warn!(channel = %channel, error = %e, "Feed body is not a valid listing");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch one page of a channel's feed, failing on an undecodable body
    ///
    /// # Errors
    /// Returns [`Error::Network`] on transport failure or a non-success status,
    /// [`Error::Decode`] when the body does not match the listing schema
    pub async fn fetch_strict(&self, channel: &Channel, options: &FetchOptions) -> Result<Listing> {
        let url = self.feed_url(channel, options);
        debug!(channel = %channel, url = %url, "Fetching feed");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;

        let listing: Listing = serde_json::from_slice(&body)?;
        debug!(
            channel = %channel,
            entries = listing.data.children.len(),
            "Feed page decoded"
        );
        Ok(listing)
    }

    /// Fetch up to `max_pages` pages, following each page's cursor
    ///
    /// Entries of all pages are concatenated in feed order. Errors on the first
    /// page propagate; errors on later pages end paging and keep what was read.
    pub async fn fetch_pages(
        &self,
        channel: &Channel,
        options: &FetchOptions,
        max_pages: usize,
    ) -> Result<Option<Listing>> {
        let Some(mut listing) = self.fetch(channel, options).await? else {
            return Ok(None);
        };

        let mut pages = 1;
        while pages < max_pages {
            let Some(cursor) = listing.next_cursor().map(str::to_string) else {
                break;
            };

            match self.fetch(channel, &options.with_after(cursor)).await {
                Ok(Some(page)) => {
                    listing.data.children.extend(page.data.children);
                    listing.data.after = page.data.after;
                    pages += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(channel = %channel, page = pages + 1, error = %e, "Stopped paging feed");
                    break;
                }
            }
        }

        Ok(Some(listing))
    }
}
