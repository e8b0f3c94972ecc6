//! YouTube Data API v3 client used by the scraper.
//!
//! The client tracks an advisory quota counter for its own lifetime: detail
//! lookups (`channels.list`, `videos.list`) cost 1 unit and `search.list`
//! costs 100, charged once per HTTP attempt. A fresh client starts at zero.

pub mod format;
pub mod responses;
pub mod transport;

use crate::error::ApiError;
use crate::models::{Creator, Video};
use chrono::Utc;
use format::{format_channel, format_video};
use log::{error, info, warn};
use responses::{parse_items, Channel, ListResponse, SearchResult};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
pub use transport::{HttpTransport, Transport};

pub const DETAIL_COST: u64 = 1;
pub const SEARCH_COST: u64 = 100;

/// The API refuses `maxResults` above this on every list endpoint.
pub const MAX_PAGE_SIZE: usize = 50;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// The ways a channel can be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelLocator {
    Id(String),
    /// Legacy `/user/<name>` usernames.
    Username(String),
    /// A custom URL or `@handle`, resolved through search.
    Handle(String),
}

impl fmt::Display for ChannelLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelLocator::Id(id) => write!(f, "{id}"),
            ChannelLocator::Username(username) => write!(f, "user/{username}"),
            ChannelLocator::Handle(handle) => write!(f, "{handle}"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QuotaTracker {
    used: u64,
}

impl QuotaTracker {
    pub fn charge(&mut self, cost: u64) {
        self.used += cost;
    }

    pub fn used(&self) -> u64 {
        self.used
    }
}

pub struct YouTubeClient<T = HttpTransport> {
    transport: T,
    quota: QuotaTracker,
    delay: Duration,
    retry_attempts: u32,
}

impl<T: Transport> YouTubeClient<T> {
    /// `delay` is the pause between consecutive paged or per-item calls;
    /// `retry_attempts` is the total number of tries for a transient failure.
    pub fn new(transport: T, delay: Duration, retry_attempts: u32) -> Self {
        Self {
            transport,
            quota: QuotaTracker::default(),
            delay,
            retry_attempts,
        }
    }

    pub fn quota_used(&self) -> u64 {
        self.quota.used()
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_BACKOFF)
    }

    async fn request(
        &mut self,
        endpoint: &str,
        params: &[(&str, String)],
        cost: u64,
    ) -> Result<ListResponse, ApiError> {
        let mut attempt = 0;
        loop {
            self.quota.charge(cost);
            match self.transport.get_json(endpoint, params).await {
                Ok(body) => return Ok(serde_json::from_value(body)?),
                Err(e) if e.is_transient() && attempt + 1 < self.retry_attempts => {
                    let wait = self.backoff(attempt);
                    warn!(
                        "YouTube {endpoint} request failed (attempt {}): {e}. Retrying in {wait:?}",
                        attempt + 1
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Look up one channel and format it as a creator record.
    ///
    /// Returns `Ok(None)` when the platform knows no such channel.
    pub async fn get_channel_details(
        &mut self,
        locator: &ChannelLocator,
    ) -> Result<Option<Creator>, ApiError> {
        let channel_id = match locator {
            ChannelLocator::Id(id) => id.clone(),
            ChannelLocator::Username(username) => {
                return self
                    .lookup_channel(("forUsername", username.clone()))
                    .await
            }
            ChannelLocator::Handle(handle) => match self.resolve_handle(handle).await? {
                Some(id) => id,
                None => {
                    warn!("No channel found for handle {handle}");
                    return Ok(None);
                }
            },
        };

        self.lookup_channel(("id", channel_id)).await
    }

    async fn resolve_handle(&mut self, handle: &str) -> Result<Option<String>, ApiError> {
        let params = [
            ("part", "id".to_string()),
            ("q", handle.to_string()),
            ("type", "channel".to_string()),
            ("maxResults", "1".to_string()),
        ];
        let response = self
            .request("search", &params, SEARCH_COST)
            .await
            .inspect_err(|e| error!("Failed to resolve channel handle {handle}: {e}"))?;

        Ok(parse_items::<SearchResult>(response.items)
            .into_iter()
            .find_map(|hit| hit.id.channel_id))
    }

    async fn lookup_channel(
        &mut self,
        filter: (&str, String),
    ) -> Result<Option<Creator>, ApiError> {
        let params = [
            (
                "part",
                "snippet,statistics,brandingSettings,topicDetails".to_string(),
            ),
            (filter.0, filter.1.clone()),
        ];
        let response = self
            .request("channels", &params, DETAIL_COST)
            .await
            .inspect_err(|e| error!("YouTube API error looking up channel {}: {e}", filter.1))?;

        let Some(channel) = parse_items::<Channel>(response.items).into_iter().next() else {
            return Ok(None);
        };

        format_channel(channel, Utc::now())
            .map(Some)
            .map_err(ApiError::from)
            .inspect_err(|e| error!("Could not format channel {}: {e}", filter.1))
    }

    /// Most recent videos of a channel, newest first, at most `max_results`.
    ///
    /// Each search page is resolved into full video details before the next
    /// page is requested. A page whose detail lookup fails contributes no
    /// videos, but pagination goes on.
    pub async fn get_channel_videos(
        &mut self,
        channel_id: &str,
        max_results: usize,
    ) -> Result<Vec<Video>, ApiError> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        while videos.len() < max_results {
            if page_token.is_some() {
                sleep(self.delay).await;
            }

            let page_size = (max_results - videos.len()).min(MAX_PAGE_SIZE);
            let mut params = vec![
                ("part", "id".to_string()),
                ("channelId", channel_id.to_string()),
                ("type", "video".to_string()),
                ("order", "date".to_string()),
                ("maxResults", page_size.to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let response = self
                .request("search", &params, SEARCH_COST)
                .await
                .inspect_err(|e| error!("Error fetching videos for channel {channel_id}: {e}"))?;

            let video_ids: Vec<String> = parse_items::<SearchResult>(response.items)
                .into_iter()
                .filter_map(|hit| hit.id.video_id)
                .collect();
            if video_ids.is_empty() {
                break;
            }

            // A failed detail batch loses only this page.
            if let Ok(details) = self.get_video_details(&video_ids).await {
                videos.extend(details);
            }

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        videos.truncate(max_results);
        Ok(videos)
    }

    /// Full details for a batch of videos in one request, in API order.
    pub async fn get_video_details<S: AsRef<str>>(
        &mut self,
        video_ids: &[S],
    ) -> Result<Vec<Video>, ApiError> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = video_ids
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        let params = [
            ("part", "snippet,statistics,contentDetails".to_string()),
            ("id", ids),
        ];
        let response = self
            .request("videos", &params, DETAIL_COST)
            .await
            .inspect_err(|e| error!("Error fetching video details: {e}"))?;

        Ok(parse_items::<responses::Video>(response.items)
            .into_iter()
            .filter_map(|video| match format_video(video) {
                Ok(video) => Some(video),
                Err(e) => {
                    warn!("Skipping video: {e}");
                    None
                }
            })
            .collect())
    }

    /// Search channels by free text and resolve each hit into a creator.
    ///
    /// Hits that fail to resolve are dropped from the result.
    pub async fn search_channels(
        &mut self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Creator>, ApiError> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let params = [
            ("part", "id,snippet".to_string()),
            ("q", query.to_string()),
            ("type", "channel".to_string()),
            ("maxResults", max_results.min(MAX_PAGE_SIZE).to_string()),
            ("order", "relevance".to_string()),
        ];
        let response = self
            .request("search", &params, SEARCH_COST)
            .await
            .inspect_err(|e| error!("Error searching channels for '{query}': {e}"))?;

        let channel_ids: Vec<String> = parse_items::<SearchResult>(response.items)
            .into_iter()
            .filter_map(|hit| hit.id.channel_id)
            .collect();
        info!("Search '{query}' returned {} channels", channel_ids.len());

        let mut channels = Vec::with_capacity(channel_ids.len());
        for (i, channel_id) in channel_ids.into_iter().enumerate() {
            if i > 0 {
                sleep(self.delay).await;
            }
            match self
                .get_channel_details(&ChannelLocator::Id(channel_id.clone()))
                .await
            {
                Ok(Some(channel)) => channels.push(channel),
                Ok(None) => warn!("Search hit {channel_id} has no channel details"),
                Err(_) => {}
            }
        }

        Ok(channels)
    }
}
