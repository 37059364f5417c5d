//! Daily job scheduler wrapping `tokio-cron-scheduler`.
//!
//! Fires once per calendar day at a fixed wall-clock time in the plant's
//! fixed offset zone, independent of the server's local timezone.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use toma5_types::config::parse_hh_mm;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during scheduling operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Failed to create or manipulate a cron job.
    #[error("scheduler error: {0}")]
    JobError(String),

    /// Invalid wall-clock time.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

/// Convert `HH:MM` into a 6-field (seconds first) cron expression.
pub fn daily_cron(at: &str) -> Result<String, SchedulerError> {
    let (hour, minute) = parse_hh_mm(at).map_err(SchedulerError::InvalidSchedule)?;
    Ok(format!("0 {minute} {hour} * * *"))
}

// ---------------------------------------------------------------------------
// DailyScheduler
// ---------------------------------------------------------------------------

/// Callback invoked each time the daily trigger fires.
pub type DailyCallback =
    Arc<dyn Fn(DateTime<Utc>) -> futures_util::future::BoxFuture<'static, ()> + Send + Sync>;

/// Runs one callback per day at a fixed local time.
pub struct DailyScheduler {
    inner: Arc<RwLock<Option<JobScheduler>>>,
    job_id: RwLock<Option<Uuid>>,
    timezone: FixedOffset,
}

impl DailyScheduler {
    /// Create a scheduler (not yet started) for the given zone.
    pub fn new(timezone: FixedOffset) -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            job_id: RwLock::new(None),
            timezone,
        }
    }

    /// Start the underlying scheduler. Must be called before `schedule`.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;

        scheduler
            .start()
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;

        let mut inner = self.inner.write().await;
        *inner = Some(scheduler);

        tracing::info!("daily scheduler started");
        Ok(())
    }

    /// Stop the scheduler and drop its job.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut inner = self.inner.write().await;
        if let Some(mut scheduler) = inner.take() {
            scheduler
                .shutdown()
                .await
                .map_err(|e| SchedulerError::JobError(e.to_string()))?;
            tracing::info!("daily scheduler stopped");
        }
        *self.job_id.write().await = None;
        Ok(())
    }

    /// Register `callback` to run every day at `at` (`HH:MM`, local time).
    ///
    /// Replaces a previously scheduled job.
    pub async fn schedule(&self, at: &str, callback: DailyCallback) -> Result<Uuid, SchedulerError> {
        let cron_expr = daily_cron(at)?;

        let inner = self.inner.read().await;
        let scheduler = inner
            .as_ref()
            .ok_or_else(|| SchedulerError::JobError("scheduler not started".to_string()))?;

        let job = Job::new_async_tz(cron_expr.as_str(), self.timezone, move |_uuid, _lock| {
            let cb = callback.clone();
            Box::pin(async move {
                let now = Utc::now();
                tracing::debug!(%now, "daily trigger fired");
                cb(now).await;
            })
        })
        .map_err(|e| SchedulerError::InvalidSchedule(e.to_string()))?;

        let job_id = job.guid();
        let mut current = self.job_id.write().await;
        if let Some(previous) = current.take() {
            scheduler
                .remove(&previous)
                .await
                .map_err(|e| SchedulerError::JobError(e.to_string()))?;
        }
        scheduler
            .add(job)
            .await
            .map_err(|e| SchedulerError::JobError(e.to_string()))?;
        *current = Some(job_id);

        tracing::info!(%job_id, cron = %cron_expr, offset = %self.timezone, "daily job scheduled");
        Ok(job_id)
    }

    pub async fn is_scheduled(&self) -> bool {
        self.job_id.read().await.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
