use chrono::{DateTime, Utc};

/// A YouTube channel as it is written to the `creators` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Creator {
    pub channel_id: String,
    pub channel_name: String,
    pub description: String,
    pub subscriber_count: i64,
    pub total_views: i64,
    pub video_count: i64,
    pub profile_image_url: String,
    pub country: Option<String>,
    pub custom_url: Option<String>,
    /// `None` for creators that were stored but never scraped.
    pub last_scraped: Option<DateTime<Utc>>,
}

/// A creator as it exists in the store, carrying its internal row id.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CreatorRow {
    pub id: i64,
    pub channel_id: String,
    pub channel_name: String,
    pub description: String,
    pub subscriber_count: i64,
    pub total_views: i64,
    pub video_count: i64,
    pub profile_image_url: String,
    pub country: Option<String>,
    pub custom_url: Option<String>,
    pub last_scraped: Option<DateTime<Utc>>,
}

/// A video as it is written to the `videos` table.
///
/// `creator_id` stays `None` until the owning creator has been upserted;
/// see [`Video::stamp`].
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Video {
    pub video_id: String,
    pub creator_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    /// ISO-8601 duration as delivered by the API, e.g. `PT4M13S`.
    pub duration: String,
    /// `duration` in whole seconds; 0 when it could not be parsed.
    pub duration_seconds: i64,
    pub published_at: DateTime<Utc>,
    pub thumbnail_url: String,
    pub category_id: i64,
    #[sqlx(json)]
    pub tags: Vec<String>,
}

impl Video {
    pub fn stamp(&mut self, creator: &CreatorRow) {
        self.creator_id = Some(creator.id);
    }
}

/// Outcome of one pass of the refresh workflow.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub stopped_for_quota: bool,
}
