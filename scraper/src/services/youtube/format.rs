use super::responses::{Channel, Thumbnails, Video as ApiVideo};
use crate::error::FormatError;
use crate::models::{Creator, Video};
use crate::utils::parse_iso8601_duration_to_seconds;
use chrono::{DateTime, Utc};

/// Largest available thumbnail, falling back high → medium → default.
/// Variants without a URL are skipped.
fn best_thumbnail(thumbnails: &Thumbnails) -> Option<&str> {
    [&thumbnails.high, &thumbnails.medium, &thumbnails.fallback]
        .into_iter()
        .flatten()
        .find_map(|t| t.url.as_deref().filter(|url| !url.is_empty()))
}

pub fn format_channel(channel: Channel, scraped_at: DateTime<Utc>) -> Result<Creator, FormatError> {
    let snippet = channel.snippet;

    let profile_image_url = best_thumbnail(&snippet.thumbnails)
        .ok_or_else(|| FormatError::MissingThumbnail {
            id: channel.id.clone(),
        })?
        .to_string();
    let channel_name = snippet.title.ok_or_else(|| FormatError::MissingField {
        id: channel.id.clone(),
        field: "snippet.title",
    })?;

    Ok(Creator {
        channel_id: channel.id,
        channel_name,
        description: snippet.description.unwrap_or_default(),
        subscriber_count: channel.statistics.subscriber_count,
        total_views: channel.statistics.view_count,
        video_count: channel.statistics.video_count,
        profile_image_url,
        country: snippet.country,
        custom_url: snippet.custom_url,
        last_scraped: Some(scraped_at),
    })
}

/// The returned video has no creator reference yet.
pub fn format_video(video: ApiVideo) -> Result<Video, FormatError> {
    let snippet = video.snippet;

    let thumbnail_url = best_thumbnail(&snippet.thumbnails)
        .ok_or_else(|| FormatError::MissingThumbnail {
            id: video.id.clone(),
        })?
        .to_string();
    let title = snippet.title.ok_or_else(|| FormatError::MissingField {
        id: video.id.clone(),
        field: "snippet.title",
    })?;
    let published_at = snippet
        .published_at
        .ok_or_else(|| FormatError::MissingField {
            id: video.id.clone(),
            field: "snippet.publishedAt",
        })?;

    let duration = video.content_details.duration.unwrap_or_default();

    Ok(Video {
        video_id: video.id,
        creator_id: None,
        title,
        description: snippet.description.unwrap_or_default(),
        view_count: video.statistics.view_count,
        like_count: video.statistics.like_count,
        comment_count: video.statistics.comment_count,
        duration_seconds: parse_iso8601_duration_to_seconds(&duration),
        duration,
        published_at,
        thumbnail_url,
        category_id: snippet.category_id,
        tags: snippet.tags,
    })
}
