//! Application state wiring the engine to its infrastructure.
//!
//! The engine and dispatcher are generic over their ports; AppState pins them
//! to the SQLite repositories, the SQLite identity directory and the local
//! blob store. Used by both the CLI one-shots and the HTTP handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use toma5_core::notification::{NotificationDispatcher, spawn_delivery_worker};
use toma5_core::workflow::{Clock, DailyCallback, SweepSummary, SystemClock, WorkflowEngine};
use toma5_infra::blob::LocalBlobStore;
use toma5_infra::config::{blob_dir, data_dir, load_config};
use toma5_infra::sqlite::directory::SqliteDirectory;
use toma5_infra::sqlite::notification::SqliteNotificationRepository;
use toma5_infra::sqlite::pool::{DatabasePool, database_url};
use toma5_infra::sqlite::workflow::SqliteWorkflowRepository;
use toma5_types::config::AppConfig;

/// Concrete engine pinned to the infra implementations.
pub type Engine = WorkflowEngine<SqliteWorkflowRepository, SqliteDirectory, LocalBlobStore>;

pub type Dispatcher = NotificationDispatcher<SqliteNotificationRepository>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub dispatcher: Arc<Dispatcher>,
    pub directory: Arc<SqliteDirectory>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
}

/// Result of one run of the daily maintenance job.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MaintenanceReport {
    pub sweep: SweepSummary,
    pub purged_notifications: u64,
}

impl AppState {
    /// Initialize from the resolved data directory (`TOMA5_DATA_DIR` or `~/.toma5`).
    pub async fn init() -> anyhow::Result<Self> {
        Self::init_in(&data_dir()).await
    }

    /// Connect to the database under `data_dir`, spawn the notification
    /// delivery worker and wire the engine.
    ///
    /// Must run inside a Tokio runtime.
    pub async fn init_in(data_dir: &Path) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;

        let config = load_config(data_dir).await;
        let db_pool = DatabasePool::new(&database_url(data_dir)).await?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(SqliteNotificationRepository::new(db_pool.clone())),
            config.notifications.live_buffer,
            clock.clone(),
        ));
        // The worker runs until every outbox handle is dropped.
        let (outbox, _worker) = spawn_delivery_worker(dispatcher.clone());

        let directory = Arc::new(SqliteDirectory::new(db_pool.clone()));
        let blobs = Arc::new(LocalBlobStore::new(
            blob_dir(&config, data_dir),
            config.storage.public_base_url.clone(),
        ));

        let engine = Arc::new(WorkflowEngine::new(
            Arc::new(SqliteWorkflowRepository::new(db_pool.clone())),
            directory.clone(),
            blobs,
            outbox,
            clock,
            config.timezone(),
        ));

        tracing::info!(
            data_dir = %data_dir.display(),
            offset = %config.timezone(),
            "application state initialized"
        );

        Ok(Self {
            engine,
            dispatcher,
            directory,
            config: Arc::new(config),
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// Stale-task sweep followed by the read-notification purge.
    ///
    /// A purge failure is logged and reported as zero purged; the sweep result
    /// is already committed by then.
    pub async fn run_daily_maintenance(
        &self,
        now: DateTime<Utc>,
    ) -> anyhow::Result<MaintenanceReport> {
        let sweep = self.engine.run_stale_sweep(now).await?;

        let purged_notifications = match self
            .dispatcher
            .purge_read(now, self.config.notifications.retention_days)
            .await
        {
            Ok(purged) => purged,
            Err(err) => {
                tracing::warn!(error = %err, "notification purge failed");
                0
            }
        };

        Ok(MaintenanceReport {
            sweep,
            purged_notifications,
        })
    }

    /// The daily maintenance job as a scheduler callback.
    pub fn daily_callback(&self) -> DailyCallback {
        let state = self.clone();
        Arc::new(move |now: DateTime<Utc>| {
            let state = state.clone();
            async move {
                match state.run_daily_maintenance(now).await {
                    Ok(report) => tracing::info!(
                        cancelled = report.sweep.cancelled,
                        failed = report.sweep.failed,
                        purged = report.purged_notifications,
                        "daily maintenance finished"
                    ),
                    Err(err) => tracing::error!(error = %err, "daily maintenance failed"),
                }
            }
            .boxed()
        })
    }
}
