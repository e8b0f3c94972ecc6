use crate::config::Config;
use crate::error::ApiError;
use crate::models::{CreatorRow, RefreshSummary};
use crate::services::database::Database;
use crate::services::youtube::{ChannelLocator, HttpTransport, Transport, YouTubeClient};
use log::{error, info, warn};
use tokio::time::sleep;

/// Drives the discovery and refresh workflows.
///
/// Owns one API client, so the quota counter it checks covers exactly the
/// calls made through this scraper.
pub struct Scraper<T = HttpTransport> {
    youtube: YouTubeClient<T>,
    db: Database,
    config: Config,
}

impl Scraper<HttpTransport> {
    pub fn from_config(config: Config, db: Database) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(
            &config.youtube_api_base_url,
            config.youtube_api_key.clone(),
            config.http_timeout,
        )?;
        let youtube = YouTubeClient::new(
            transport,
            config.delay_between_requests,
            config.retry_attempts,
        );
        Ok(Self::new(youtube, db, config))
    }
}

impl<T: Transport> Scraper<T> {
    pub fn new(youtube: YouTubeClient<T>, db: Database, config: Config) -> Self {
        Self {
            youtube,
            db,
            config,
        }
    }

    pub fn quota_used(&self) -> u64 {
        self.youtube.quota_used()
    }

    pub async fn scrape_channel_by_id(&mut self, channel_id: &str) -> bool {
        self.scrape_channel(&ChannelLocator::Id(channel_id.to_string()))
            .await
    }

    /// Refresh one channel and its most recent videos.
    ///
    /// Returns `false` only when the creator itself could not be fetched or
    /// stored; video failures are logged and leave the creator refreshed.
    pub async fn scrape_channel(&mut self, locator: &ChannelLocator) -> bool {
        info!("Scraping channel: {locator}");

        let channel = match self.youtube.get_channel_details(locator).await {
            Ok(Some(channel)) => channel,
            Ok(None) | Err(_) => {
                error!("Could not fetch channel data for {locator}");
                return false;
            }
        };

        let creator = match self.db.insert_creator(&channel).await {
            Ok(row) => row,
            Err(e) => {
                error!("Could not save channel data for {locator}: {e}");
                return false;
            }
        };

        let mut videos = self
            .youtube
            .get_channel_videos(&creator.channel_id, self.config.videos_per_channel)
            .await
            .unwrap_or_default();
        videos.iter_mut().for_each(|video| video.stamp(&creator));

        if !videos.is_empty() {
            match self.db.insert_videos(&videos).await {
                Ok(_) => info!(
                    "Saved {} videos for channel {}",
                    videos.len(),
                    creator.channel_id
                ),
                Err(e) => error!(
                    "Could not save videos for channel {}: {e}",
                    creator.channel_id
                ),
            }
        }

        info!("Successfully scraped channel: {}", creator.channel_name);
        true
    }

    /// Search each query and upsert every resolved channel right away.
    ///
    /// Channels matched by several queries are upserted once per match.
    pub async fn scrape_channels_by_search(
        &mut self,
        queries: &[String],
        max_channels_per_query: usize,
    ) -> Vec<CreatorRow> {
        let mut all_channels = Vec::new();

        for query in queries {
            info!("Searching for channels with query: {query}");

            let channels = self
                .youtube
                .search_channels(query, max_channels_per_query)
                .await
                .unwrap_or_default();

            for channel in channels {
                match self.db.insert_creator(&channel).await {
                    Ok(row) => {
                        info!("Added channel: {}", row.channel_name);
                        all_channels.push(row);
                    }
                    Err(e) => error!("Could not save channel {}: {e}", channel.channel_id),
                }

                sleep(self.config.delay_between_requests).await;
            }
        }

        all_channels
    }

    pub async fn run_discovery_scraping(&mut self) -> Vec<CreatorRow> {
        info!("Starting discovery scraping...");

        let queries = self.config.discovery_queries.clone();
        let discovered = self
            .scrape_channels_by_search(&queries, self.config.channels_per_query)
            .await;

        info!(
            "Discovery complete. Found {} channels, quota used: {}",
            discovered.len(),
            self.quota_used()
        );
        discovered
    }

    /// Re-scrape the stalest creators until the batch is done or the quota
    /// counter reaches 90% of the configured limit.
    pub async fn update_existing_channels(&mut self) -> RefreshSummary {
        let mut summary = RefreshSummary::default();

        let creators = match self.db.get_creators_to_update(self.config.batch_size).await {
            Ok(creators) => creators,
            Err(e) => {
                error!("Error fetching creators: {e}");
                return summary;
            }
        };
        info!("Updating {} existing channels", creators.len());

        for creator in creators {
            if self.quota_used() as f64 >= self.config.quota_threshold() {
                warn!(
                    "Approaching quota limit ({} of {}), stopping updates",
                    self.quota_used(),
                    self.config.quota_limit
                );
                summary.stopped_for_quota = true;
                break;
            }

            summary.attempted += 1;
            if self.scrape_channel_by_id(&creator.channel_id).await {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }

            sleep(self.config.delay_between_requests).await;
        }

        info!(
            "Update complete: {} succeeded, {} failed, quota used: {}",
            summary.succeeded,
            summary.failed,
            self.quota_used()
        );
        summary
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::database::tests::{creator, memory_db};
    use crate::services::youtube::tests::{channel_json, video_json};
    use crate::services::youtube::transport::fake::{FakeTransport, Params};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::time::Duration;

    /// A fake API that knows `channels`, each with `videos_per_channel`
    /// uploads. Channel searches return `search_hits` regardless of query.
    pub(crate) fn fake_api(
        channels: &[&str],
        videos_per_channel: usize,
        search_hits: &[&str],
    ) -> FakeTransport {
        let channels: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
        let search_hits: Vec<String> = search_hits.iter().map(|c| c.to_string()).collect();

        FakeTransport::new(move |endpoint, params: &Params| match endpoint {
            "channels" => {
                let id = &params["id"];
                let items: Vec<Value> = if channels.contains(id) {
                    vec![channel_json(id)]
                } else {
                    Vec::new()
                };
                Ok(json!({ "items": items }))
            }
            "search" if params["type"] == "channel" => {
                let items: Vec<Value> = search_hits
                    .iter()
                    .map(|id| json!({"id": {"channelId": id}}))
                    .collect();
                Ok(json!({ "items": items }))
            }
            "search" => {
                let max: usize = params["maxResults"].parse().unwrap();
                let items: Vec<Value> = (0..videos_per_channel.min(max))
                    .map(|i| json!({"id": {"videoId": format!("{}-v{i}", params["channelId"])}}))
                    .collect();
                Ok(json!({ "items": items }))
            }
            "videos" => {
                let items: Vec<Value> = params["id"].split(',').map(video_json).collect();
                Ok(json!({ "items": items }))
            }
            other => panic!("unexpected endpoint {other}"),
        })
    }

    pub(crate) fn test_config() -> Config {
        Config {
            youtube_api_key: "test".to_string(),
            delay_between_requests: Duration::ZERO,
            ..Config::default()
        }
    }

    pub(crate) fn scraper(
        transport: FakeTransport,
        db: Database,
        config: Config,
    ) -> Scraper<FakeTransport> {
        let youtube = YouTubeClient::new(transport, Duration::ZERO, config.retry_attempts);
        Scraper::new(youtube, db, config)
    }

    #[tokio::test]
    async fn test_scrape_channel_stores_creator_and_videos() {
        let db = memory_db().await;
        let transport = fake_api(&["UC1"], 30, &[]);
        let mut scraper = scraper(transport, db.clone(), test_config());

        assert!(scraper.scrape_channel_by_id("UC1").await);

        let row = db.get_creator("UC1").await.unwrap().unwrap();
        assert_eq!(row.channel_name, "Channel UC1");
        assert!(row.last_scraped.is_some());

        let videos = db.get_videos_for_creator(row.id).await.unwrap();
        assert_eq!(videos.len(), 20);
        assert!(videos.iter().all(|v| v.creator_id == Some(row.id)));
    }

    #[tokio::test]
    async fn test_scrape_unknown_channel_fails_without_writes() {
        let db = memory_db().await;
        let transport = fake_api(&[], 0, &[]);
        let mut scraper = scraper(transport.clone(), db.clone(), test_config());

        assert!(!scraper.scrape_channel_by_id("UC-missing").await);
        assert_eq!(db.count_creators().await.unwrap(), 0);
        assert_eq!(transport.calls_to("search"), 0);
    }

    #[tokio::test]
    async fn test_scrape_survives_video_listing_failure() {
        let db = memory_db().await;
        let transport = FakeTransport::new(|endpoint, params: &Params| match endpoint {
            "channels" => Ok(json!({ "items": [channel_json(&params["id"])] })),
            _ => Err(ApiError::Status {
                status: 403,
                body: "forbidden".to_string(),
            }),
        });
        let mut scraper = scraper(transport, db.clone(), test_config());

        assert!(scraper.scrape_channel_by_id("UC1").await);
        assert_eq!(db.count_creators().await.unwrap(), 1);
        assert_eq!(db.count_videos().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scrape_keeps_videos_from_pages_before_a_failed_batch() {
        let db = memory_db().await;
        let transport = FakeTransport::new(|endpoint, params: &Params| match endpoint {
            "channels" => Ok(json!({ "items": [channel_json(&params["id"])] })),
            "search" if params.contains_key("pageToken") => {
                Ok(json!({ "items": [{"id": {"videoId": "p2"}}] }))
            }
            "search" => Ok(json!({
                "items": [{"id": {"videoId": "p1"}}],
                "nextPageToken": "next"
            })),
            "videos" if params["id"] == "p1" => {
                Ok(json!({ "items": [video_json("p1")] }))
            }
            _ => Err(ApiError::Status {
                status: 400,
                body: "badRequest".to_string(),
            }),
        });
        let mut scraper = scraper(transport, db.clone(), test_config());

        assert!(scraper.scrape_channel_by_id("UC1").await);

        let row = db.get_creator("UC1").await.unwrap().unwrap();
        let videos = db.get_videos_for_creator(row.id).await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_id, "p1");
    }

    #[tokio::test]
    async fn test_refresh_stops_at_quota_threshold() {
        let db = memory_db().await;
        for id in ["UC1", "UC2", "UC3"] {
            db.insert_creator(&creator(id, None)).await.unwrap();
        }
        let transport = fake_api(&["UC1", "UC2", "UC3"], 2, &[]);
        let config = Config {
            quota_limit: 10,
            ..test_config()
        };
        let mut scraper = scraper(transport.clone(), db, config);

        let summary = scraper.update_existing_channels().await;

        assert_eq!(summary.attempted, 1);
        assert_eq!(summary.succeeded, 1);
        assert!(summary.stopped_for_quota);
        assert_eq!(transport.calls_to("channels"), 1);
        assert!(scraper.quota_used() >= 9);
    }

    #[tokio::test]
    async fn test_refresh_visits_stalest_first() {
        let db = memory_db().await;
        let recent = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let old = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
        db.insert_creator(&creator("UC-recent", Some(recent))).await.unwrap();
        db.insert_creator(&creator("UC-old", Some(old))).await.unwrap();
        db.insert_creator(&creator("UC-never", None)).await.unwrap();

        let transport = fake_api(&["UC-recent", "UC-old", "UC-never"], 1, &[]);
        let mut scraper = scraper(transport.clone(), db, test_config());

        let summary = scraper.update_existing_channels().await;

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 3);
        assert!(!summary.stopped_for_quota);
        let order: Vec<String> = transport
            .calls()
            .into_iter()
            .filter(|(endpoint, _)| endpoint == "channels")
            .map(|(_, params)| params["id"].clone())
            .collect();
        assert_eq!(order, vec!["UC-never", "UC-old", "UC-recent"]);
    }

    #[tokio::test]
    async fn test_refresh_counts_failures() {
        let db = memory_db().await;
        db.insert_creator(&creator("UC-gone", None)).await.unwrap();
        db.insert_creator(&creator("UC1", Some(Utc::now()))).await.unwrap();

        let transport = fake_api(&["UC1"], 0, &[]);
        let mut scraper = scraper(transport, db, test_config());

        let summary = scraper.update_existing_channels().await;

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_discovery_upserts_overlapping_hits_once_per_match() {
        let db = memory_db().await;
        let transport = fake_api(&["UC-shared"], 0, &["UC-shared"]);
        let config = Config {
            discovery_queries: vec!["a".to_string(), "b".to_string()],
            channels_per_query: 2,
            ..test_config()
        };
        let mut scraper = scraper(transport.clone(), db.clone(), config);

        let discovered = scraper.run_discovery_scraping().await;

        assert_eq!(discovered.len(), 2);
        assert!(discovered.iter().all(|row| row.channel_id == "UC-shared"));
        assert_eq!(discovered[0].id, discovered[1].id);
        assert_eq!(db.count_creators().await.unwrap(), 1);

        let searches: Vec<Params> = transport
            .calls()
            .into_iter()
            .filter(|(endpoint, _)| endpoint == "search")
            .map(|(_, params)| params)
            .collect();
        assert_eq!(searches.len(), 2);
        assert_eq!(searches[0]["q"], "a");
        assert_eq!(searches[1]["q"], "b");
        assert!(searches.iter().all(|p| p["maxResults"] == "2"));
    }
}
