//! Thumbnail worker.
//!
//! A long-lived task that consumes [`ThumbnailJob`]s and writes resized
//! derivatives next to each original image. Several jobs run at once,
//! bounded by a semaphore. Jobs may arrive twice or out of order; writes to
//! the same derivative path simply overwrite each other.

mod queue;
mod thumbnail;

pub use queue::{Delivery, JobReceiver, ThumbnailJob, ThumbnailQueue};
pub use thumbnail::generate_derivative;

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::db::DbPool;
use crate::file::{FileRepository, THUMBNAIL_WIDTHS};
use crate::FilesError;

/// Why a job failed.
#[derive(Error, Debug)]
pub enum JobError {
    /// Job has no file id.
    #[error("Missing fileId")]
    MissingFileId,

    /// Job has no user id.
    #[error("Missing userId")]
    MissingUserId,

    /// No record with this id for this owner.
    #[error("File not found")]
    FileNotFound,

    /// Record has no bytes on disk.
    #[error("file has no content")]
    NoContent,

    /// Some derivative writes failed.
    #[error("{failed} of {total} derivatives failed")]
    Derivatives {
        /// Failed writes.
        failed: usize,
        /// Attempted writes.
        total: usize,
    },

    /// Decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Reading or writing bytes failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(String),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] FilesError),
}

/// Processes thumbnail jobs.
#[derive(Debug, Clone)]
pub struct ThumbnailWorker {
    pool: DbPool,
    concurrency: usize,
}

impl ThumbnailWorker {
    /// Create a worker that runs up to `concurrency` jobs at once.
    pub fn new(pool: DbPool, concurrency: usize) -> Self {
        Self {
            pool,
            concurrency: concurrency.max(1),
        }
    }

    /// Process a single job.
    ///
    /// All widths are attempted even when some fail.
    pub async fn process(&self, job: &ThumbnailJob) -> Result<(), JobError> {
        let file_id = job.file_id.ok_or(JobError::MissingFileId)?;
        let user_id = job.user_id.ok_or(JobError::MissingUserId)?;

        let record = FileRepository::new(&self.pool)
            .find_by_id(file_id, Some(user_id))
            .await?
            .ok_or(JobError::FileNotFound)?;
        let original = record.local_path.ok_or(JobError::NoContent)?;
        let original = Path::new(&original);

        let results = join_all(
            THUMBNAIL_WIDTHS
                .iter()
                .map(|&width| generate_derivative(original, width)),
        )
        .await;

        let mut failed = 0;
        for (width, result) in THUMBNAIL_WIDTHS.iter().zip(results) {
            if let Err(e) = result {
                warn!(file_id, width, "Derivative failed: {}", e);
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(JobError::Derivatives {
                failed,
                total: THUMBNAIL_WIDTHS.len(),
            });
        }

        info!(file_id, user_id, "Thumbnails generated");
        Ok(())
    }

    /// Start consuming `jobs` on a background task.
    ///
    /// Failed deliveries go back to `queue` for another attempt.
    pub fn spawn(self, queue: ThumbnailQueue, mut jobs: JobReceiver) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(concurrency = self.concurrency, "Thumbnail worker started");
            let semaphore = Arc::new(Semaphore::new(self.concurrency));
            let mut in_flight = JoinSet::new();

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                    delivery = jobs.recv() => {
                        let Some(delivery) = delivery else { break };
                        let Ok(permit) = semaphore.clone().acquire_owned().await else {
                            break;
                        };
                        let worker = self.clone();
                        let queue = queue.clone();
                        in_flight.spawn(async move {
                            let _permit = permit;
                            debug!(job = ?delivery.job, attempt = delivery.attempt, "Processing job");
                            if let Err(e) = worker.process(&delivery.job).await {
                                warn!(job = ?delivery.job, attempt = delivery.attempt, "Job failed: {}", e);
                                queue.redeliver(delivery);
                            }
                        });
                    }
                }
            }

            info!(pending = in_flight.len(), "Thumbnail worker stopping");
            while in_flight.join_next().await.is_some() {}
            info!("Thumbnail worker stopped");
        });

        WorkerHandle { shutdown_tx, task }
    }
}

/// Handle to a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop pulling jobs, wait for in-flight jobs to finish, and return.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Thumbnail worker task ended abnormally: {}", e);
        }
    }
}
