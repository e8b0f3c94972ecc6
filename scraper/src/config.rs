use crate::error::ConfigError;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://creators.db?mode=rwc";

pub const DEFAULT_DISCOVERY_QUERIES: [&str; 10] = [
    "tech reviewer",
    "beauty influencer",
    "fitness youtuber",
    "gaming content creator",
    "cooking channel",
    "travel vlogger",
    "educational content",
    "music artist",
    "comedy creator",
    "lifestyle blogger",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub youtube_api_key: String,
    pub youtube_api_base_url: String,
    pub database_url: String,
    /// Daily quota ceiling; refresh stops at 90% of it.
    pub quota_limit: u64,
    pub delay_between_requests: Duration,
    pub batch_size: u32,
    pub retry_attempts: u32,
    pub videos_per_channel: usize,
    pub channels_per_query: usize,
    pub discovery_queries: Vec<String>,
    /// Cron expression (with seconds) for the `schedule` command.
    pub refresh_schedule: Option<String>,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            youtube_api_key: String::new(),
            youtube_api_base_url: DEFAULT_API_BASE_URL.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            quota_limit: 10_000,
            delay_between_requests: Duration::from_secs(1),
            batch_size: 50,
            retry_attempts: 3,
            videos_per_channel: 20,
            channels_per_query: 5,
            discovery_queries: DEFAULT_DISCOVERY_QUERIES
                .iter()
                .map(|q| q.to_string())
                .collect(),
            refresh_schedule: None,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a config from any variable source; unset variables keep their
    /// defaults, except the API key which is required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let youtube_api_key =
            get("YOUTUBE_API_KEY").ok_or(ConfigError::Missing("YOUTUBE_API_KEY"))?;

        let discovery_queries = match get("DISCOVERY_QUERIES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.discovery_queries,
        };

        Ok(Self {
            youtube_api_key,
            youtube_api_base_url: get("YOUTUBE_API_BASE_URL")
                .unwrap_or(defaults.youtube_api_base_url),
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            quota_limit: parse_var(&get, "YOUTUBE_QUOTA_LIMIT", defaults.quota_limit)?,
            delay_between_requests: Duration::from_millis(parse_var(
                &get,
                "DELAY_BETWEEN_REQUESTS_MS",
                defaults.delay_between_requests.as_millis() as u64,
            )?),
            batch_size: parse_var(&get, "BATCH_SIZE", defaults.batch_size)?,
            retry_attempts: parse_var(&get, "RETRY_ATTEMPTS", defaults.retry_attempts)?,
            videos_per_channel: parse_var(
                &get,
                "VIDEOS_PER_CHANNEL",
                defaults.videos_per_channel,
            )?,
            channels_per_query: parse_var(
                &get,
                "CHANNELS_PER_QUERY",
                defaults.channels_per_query,
            )?,
            discovery_queries,
            refresh_schedule: get("REFRESH_SCHEDULE"),
            http_timeout: Duration::from_secs(parse_var(
                &get,
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
        })
    }

    /// Quota level at which the refresh workflow stops scheduling scrapes.
    pub fn quota_threshold(&self) -> f64 {
        self.quota_limit as f64 * 0.9
    }
}

fn parse_var<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

pub fn init_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
    info!("Starting creator scraper...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}
