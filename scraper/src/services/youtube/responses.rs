//! The subset of YouTube Data API v3 payloads the scraper reads.
//!
//! Every field is optional at this layer; required-ness is decided by the
//! formatter so that one odd item never poisons a whole page.
//!
//! See: <https://developers.google.com/youtube/v3/docs>

use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Envelope shared by `channels.list`, `videos.list` and `search.list`.
///
/// Items are kept as raw JSON and decoded one at a time by [`parse_items`].
#[derive(Debug, Default, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A `search` result; only the id part is requested.
#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub id: ResourceId,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceId {
    #[serde(rename = "channelId")]
    pub channel_id: Option<String>,
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub snippet: ChannelSnippet,
    #[serde(default)]
    pub statistics: ChannelStatistics,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "customUrl")]
    pub custom_url: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

/// Channel statistics. The API sends counts as decimal strings.
#[derive(Debug, Default, Deserialize)]
pub struct ChannelStatistics {
    #[serde(rename = "subscriberCount", default, deserialize_with = "count")]
    pub subscriber_count: i64,
    #[serde(rename = "viewCount", default, deserialize_with = "count")]
    pub view_count: i64,
    #[serde(rename = "videoCount", default, deserialize_with = "count")]
    pub video_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub statistics: VideoStatistics,
    #[serde(rename = "contentDetails", default)]
    pub content_details: VideoContentDetails,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    #[serde(rename = "categoryId", default, deserialize_with = "count")]
    pub category_id: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoStatistics {
    #[serde(rename = "viewCount", default, deserialize_with = "count")]
    pub view_count: i64,
    #[serde(rename = "likeCount", default, deserialize_with = "count")]
    pub like_count: i64,
    #[serde(rename = "commentCount", default, deserialize_with = "count")]
    pub comment_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoContentDetails {
    pub duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    pub high: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    #[serde(rename = "default")]
    pub fallback: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: Option<String>,
}

/// Accepts `"123"`, `123` or `null`; anything unreadable counts as 0.
fn count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        _ => 0,
    })
}

/// Decode raw list items, skipping (and logging) the ones that don't fit `T`.
pub fn parse_items<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping malformed API item: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_accept_strings_numbers_and_garbage() {
        let stats: ChannelStatistics = serde_json::from_value(json!({
            "subscriberCount": "1200",
            "viewCount": 55,
            "videoCount": "n/a"
        }))
        .unwrap();
        assert_eq!(stats.subscriber_count, 1200);
        assert_eq!(stats.view_count, 55);
        assert_eq!(stats.video_count, 0);
    }

    #[test]
    fn test_parse_items_skips_malformed() {
        let items = vec![
            json!({"id": {"channelId": "UC1"}}),
            json!({"no_id": true}),
            json!({"id": {"videoId": "v1"}}),
        ];
        let parsed: Vec<SearchResult> = parse_items(items);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id.channel_id.as_deref(), Some("UC1"));
        assert_eq!(parsed[1].id.video_id.as_deref(), Some("v1"));
    }
}
