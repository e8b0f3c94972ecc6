use crate::config::Config;
use crate::error::ApiError;
use crate::models::RefreshSummary;
use crate::services::database::Database;
use crate::services::scraper::Scraper;
use crate::services::youtube::Transport;
use anyhow::Result;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Start a scheduler that runs the refresh workflow on every tick of
/// `schedule`.
pub async fn setup_refresh_scheduler(
    schedule: &str,
    config: Config,
    db: Database,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let running = Arc::new(AtomicBool::new(false));

    let refresh_job = Job::new_async(schedule, move |_uuid, _l| {
        let config = config.clone();
        let db = db.clone();
        let running = running.clone();
        Box::pin(async move {
            run_refresh_tick(&running, || Scraper::from_config(config, db)).await;
        })
    })?;

    scheduler.add(refresh_job).await?;
    scheduler.start().await?;
    info!("Refresh scheduler started with schedule '{schedule}'.");

    Ok(scheduler)
}

/// One scheduled refresh run.
///
/// `make_scraper` is called once per run, so every run starts with a fresh
/// quota counter. Returns `None` when the tick was skipped because `running`
/// was already set, or when no scraper could be built.
pub(crate) async fn run_refresh_tick<T, F>(
    running: &AtomicBool,
    make_scraper: F,
) -> Option<RefreshSummary>
where
    T: Transport,
    F: FnOnce() -> Result<Scraper<T>, ApiError>,
{
    if running.swap(true, Ordering::SeqCst) {
        warn!("Previous refresh still running, skipping this tick");
        return None;
    }

    let summary = match make_scraper() {
        Ok(mut scraper) => Some(scraper.update_existing_channels().await),
        Err(e) => {
            error!("Failed to create YouTube client: {e}");
            None
        }
    };

    running.store(false, Ordering::SeqCst);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::tests::{creator, memory_db};
    use crate::services::scraper::tests::{fake_api, scraper, test_config};
    use crate::services::youtube::transport::fake::FakeTransport;

    #[tokio::test]
    async fn test_tick_skipped_while_previous_run_active() {
        let db = memory_db().await;
        db.insert_creator(&creator("UC1", None)).await.unwrap();
        let transport = fake_api(&["UC1"], 1, &[]);
        let running = AtomicBool::new(true);

        let summary = run_refresh_tick(&running, || {
            Ok(scraper(transport.clone(), db.clone(), test_config()))
        })
        .await;

        assert_eq!(summary, None);
        assert!(transport.calls().is_empty());
        // The active run still owns the flag.
        assert!(running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_each_tick_starts_with_fresh_quota() {
        let db = memory_db().await;
        for id in ["UC1", "UC2", "UC3"] {
            db.insert_creator(&creator(id, None)).await.unwrap();
        }
        let transport = fake_api(&["UC1", "UC2", "UC3"], 1, &[]);
        let config = Config {
            quota_limit: 10,
            ..test_config()
        };
        let running = AtomicBool::new(false);

        for _ in 0..2 {
            let summary = run_refresh_tick(&running, || {
                let scraper = scraper(transport.clone(), db.clone(), config.clone());
                assert_eq!(scraper.quota_used(), 0);
                Ok(scraper)
            })
            .await
            .unwrap();

            // A counter carried over from the previous run would stop
            // before the first scrape.
            assert_eq!(summary.attempted, 1);
            assert!(summary.stopped_for_quota);
            assert!(!running.load(Ordering::SeqCst));
        }

        assert_eq!(transport.calls_to("channels"), 2);
    }

    #[tokio::test]
    async fn test_tick_releases_flag_when_scraper_cannot_be_built() {
        let running = AtomicBool::new(false);

        let summary = run_refresh_tick::<FakeTransport, _>(&running, || {
            Err(ApiError::Url(url::ParseError::EmptyHost))
        })
        .await;

        assert_eq!(summary, None);
        assert!(!running.load(Ordering::SeqCst));
    }
}
