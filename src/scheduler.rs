use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::db::Store;
use crate::state::SharedState;

/// Background task that purges expired users on a schedule.
pub struct Sweeper {
    state: SharedState,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Sweeper {
    pub fn new(state: SharedState, config: SchedulerConfig) -> Self {
        Self {
            state,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Sweeper is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting expiration sweeper");

        // One eager run at process start; scheduled runs follow.
        if let Err(e) = sweep_expired_users(&self.state.store).await {
            error!("Startup expiration sweep failed: {}", e);
        }

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let store = self.state.store.clone();
        let running = Arc::clone(&self.running);

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let store = store.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                if let Err(e) = sweep_expired_users(&store).await {
                    error!("Scheduled expiration sweep failed: {}", e);
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Sweeper running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_mins = self.config.sweep_interval_minutes;

        info!("Sweeper running every {} minutes", interval_mins);

        let mut sweep_interval = interval(Duration::from_secs(u64::from(interval_mins) * 60));

        // The first tick completes immediately and the eager startup sweep
        // already ran, so consume it before entering the loop.
        sweep_interval.tick().await;

        loop {
            sweep_interval.tick().await;

            if !*self.running.read().await {
                break;
            }

            if let Err(e) = sweep_expired_users(&self.state.store).await {
                error!("Scheduled expiration sweep failed: {}", e);
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping sweeper...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn run_once(&self) -> Result<u64> {
        info!("Running manual expiration sweep...");
        sweep_expired_users(&self.state.store).await
    }
}

/// Delete every user whose `expired_at` has passed, in one batch.
/// A run with nothing expired is a no-op.
pub async fn sweep_expired_users(store: &Store) -> Result<u64> {
    let now = chrono::Utc::now().to_rfc3339();
    let removed = store.delete_expired_users(&now).await?;

    if removed > 0 {
        info!("Expiration sweep removed {} user(s)", removed);
    } else {
        debug!("Expiration sweep found nothing to remove");
    }

    Ok(removed)
}
