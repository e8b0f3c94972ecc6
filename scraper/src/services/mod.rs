pub mod database;
pub mod scheduler;
pub mod scraper;
pub mod youtube;
