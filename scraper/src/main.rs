use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use creator_scraper::config::{init_logger, load_environment};
use creator_scraper::services::scheduler::setup_refresh_scheduler;
use creator_scraper::utils::parse_channel_input;
use creator_scraper::{Config, Database, Scraper};
use log::info;

#[derive(Parser)]
#[command(name = "creator-scraper", about = "Discover and refresh YouTube creator metadata")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run discovery, then refresh existing channels (default)
    Run,
    /// Search the configured discovery queries and store new channels
    Discover,
    /// Re-scrape the stalest stored channels
    Refresh,
    /// Scrape a single channel by id, handle or URL
    Channel {
        /// e.g. UCXuqSBlHAE6Xw-yeJA0Tunw, @handle or https://www.youtube.com/@handle
        input: String,
    },
    /// Run the refresh workflow on REFRESH_SCHEDULE until interrupted
    Schedule,
    /// Print how many creators and videos are stored, and their total length
    Stats,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    load_environment();
    init_logger();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let db = Database::connect(&config.database_url).await?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let mut scraper = Scraper::from_config(config, db)?;
            info!("1. Running discovery scraping...");
            scraper.run_discovery_scraping().await;
            info!("2. Updating existing channels...");
            scraper.update_existing_channels().await;
        }
        Command::Discover => {
            Scraper::from_config(config, db)?
                .run_discovery_scraping()
                .await;
        }
        Command::Refresh => {
            Scraper::from_config(config, db)?
                .update_existing_channels()
                .await;
        }
        Command::Channel { input } => {
            let locator = parse_channel_input(&input)
                .ok_or_else(|| anyhow!("Invalid channel input: {input}"))?;
            let mut scraper = Scraper::from_config(config, db)?;
            if !scraper.scrape_channel(&locator).await {
                return Err(anyhow!("Failed to scrape channel {locator}"));
            }
        }
        Command::Schedule => {
            let schedule = config
                .refresh_schedule
                .clone()
                .ok_or_else(|| anyhow!("REFRESH_SCHEDULE environment variable must be set"))?;
            let mut scheduler = setup_refresh_scheduler(&schedule, config, db).await?;
            tokio::signal::ctrl_c().await?;
            info!("Shutting down refresh scheduler...");
            scheduler.shutdown().await?;
        }
        Command::Stats => {
            let creators = db.count_creators().await?;
            let videos = db.count_videos().await?;
            let hours = db.total_video_seconds().await? as f64 / 3600.0;
            println!("creators: {creators}\nvideos: {videos}\nvideo hours: {hours:.1}");
        }
    }

    Ok(())
}
