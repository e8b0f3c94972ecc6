pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::database::Database;
pub use services::scraper::Scraper;
pub use services::youtube::{ChannelLocator, YouTubeClient};
