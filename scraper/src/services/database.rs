use crate::error::StorageError;
use crate::models::{Creator, CreatorRow, Video};
use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

const CREATOR_COLUMNS: &str = r#"
    id, channel_id, channel_name, description,
    subscriber_count, total_views, video_count,
    profile_image_url, country, custom_url, last_scraped
"#;

const VIDEO_COLUMNS: &str = r#"
    video_id, creator_id, title, description,
    view_count, like_count, comment_count,
    duration, duration_seconds, published_at, thumbnail_url, category_id, tags
"#;

/// Storage gateway over the `creators` and `videos` tables.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    ///
    /// The scraper issues one statement at a time, so a single pooled
    /// connection is enough. It is never recycled, which also keeps
    /// `sqlite::memory:` databases alive for the lifetime of the pool.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Connected to database at: {database_url}");

        Ok(Self { pool })
    }

    /// Upsert a creator by `channel_id`, replacing every stored field.
    ///
    /// The internal row id survives the replacement, so videos already
    /// pointing at the creator stay attached.
    pub async fn insert_creator(&self, creator: &Creator) -> Result<CreatorRow, StorageError> {
        let query = format!(
            r#"
            INSERT INTO creators (
                channel_id, channel_name, description,
                subscriber_count, total_views, video_count,
                profile_image_url, country, custom_url, last_scraped
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT(channel_id) DO UPDATE SET
                channel_name = excluded.channel_name,
                description = excluded.description,
                subscriber_count = excluded.subscriber_count,
                total_views = excluded.total_views,
                video_count = excluded.video_count,
                profile_image_url = excluded.profile_image_url,
                country = excluded.country,
                custom_url = excluded.custom_url,
                last_scraped = excluded.last_scraped
            RETURNING {CREATOR_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, CreatorRow>(&query)
            .bind(&creator.channel_id)
            .bind(&creator.channel_name)
            .bind(&creator.description)
            .bind(creator.subscriber_count)
            .bind(creator.total_views)
            .bind(creator.video_count)
            .bind(&creator.profile_image_url)
            .bind(&creator.country)
            .bind(&creator.custom_url)
            .bind(creator.last_scraped)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    /// Upsert a batch of videos by `video_id` in one transaction.
    ///
    /// Every video must already carry the row id of its creator. The batch
    /// is rejected as a whole if any video lacks one or references a creator
    /// that does not exist.
    pub async fn insert_videos(&self, videos: &[Video]) -> Result<usize, StorageError> {
        if videos.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut count = 0;

        for video in videos {
            let creator_id = video
                .creator_id
                .ok_or_else(|| StorageError::MissingCreatorReference {
                    video_id: video.video_id.clone(),
                })?;
            let tags = serde_json::to_string(&video.tags).unwrap_or_else(|_| "[]".to_string());

            let result = sqlx::query(
                r#"
                INSERT INTO videos (
                    video_id, creator_id, title, description,
                    view_count, like_count, comment_count,
                    duration, duration_seconds, published_at, thumbnail_url,
                    category_id, tags
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT(video_id) DO UPDATE SET
                    creator_id = excluded.creator_id,
                    title = excluded.title,
                    description = excluded.description,
                    view_count = excluded.view_count,
                    like_count = excluded.like_count,
                    comment_count = excluded.comment_count,
                    duration = excluded.duration,
                    duration_seconds = excluded.duration_seconds,
                    published_at = excluded.published_at,
                    thumbnail_url = excluded.thumbnail_url,
                    category_id = excluded.category_id,
                    tags = excluded.tags
                "#,
            )
            .bind(&video.video_id)
            .bind(creator_id)
            .bind(&video.title)
            .bind(&video.description)
            .bind(video.view_count)
            .bind(video.like_count)
            .bind(video.comment_count)
            .bind(&video.duration)
            .bind(video.duration_seconds)
            .bind(video.published_at)
            .bind(&video.thumbnail_url)
            .bind(video.category_id)
            .bind(&tags)
            .execute(&mut *tx)
            .await?;

            count += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(count)
    }

    /// Creators ordered by staleness: never scraped first, then oldest
    /// `last_scraped` first.
    pub async fn get_creators_to_update(&self, limit: u32) -> Result<Vec<CreatorRow>, StorageError> {
        let query = format!(
            "SELECT {CREATOR_COLUMNS} FROM creators \
             ORDER BY last_scraped ASC NULLS FIRST, id ASC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, CreatorRow>(&query)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn get_creator(&self, channel_id: &str) -> Result<Option<CreatorRow>, StorageError> {
        let query = format!("SELECT {CREATOR_COLUMNS} FROM creators WHERE channel_id = $1");
        let row = sqlx::query_as::<_, CreatorRow>(&query)
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    /// Videos of one creator, newest first.
    pub async fn get_videos_for_creator(&self, creator_id: i64) -> Result<Vec<Video>, StorageError> {
        let query = format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE creator_id = $1 ORDER BY published_at DESC"
        );
        let rows = sqlx::query_as::<_, Video>(&query)
            .bind(creator_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn count_creators(&self) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM creators")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_videos(&self) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Summed running time of every stored video, in seconds.
    pub async fn total_video_seconds(&self) -> Result<i64, StorageError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(duration_seconds), 0) FROM videos")
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }
}
