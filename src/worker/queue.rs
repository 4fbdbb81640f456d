//! In-process thumbnail job queue.
//!
//! Delivery is at least once: a job whose processing fails is handed back to
//! the queue until it has been attempted `max_attempts` times.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{FilesError, Result};

/// Request to build derivatives for one image.
///
/// Fields are optional on the wire; the worker rejects jobs missing either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailJob {
    /// Owner of the image.
    pub user_id: Option<i64>,
    /// Image record ID.
    pub file_id: Option<i64>,
}

impl ThumbnailJob {
    /// Create a job for `file_id` owned by `user_id`.
    pub fn new(user_id: i64, file_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            file_id: Some(file_id),
        }
    }
}

/// A job together with its delivery count, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The job.
    pub job: ThumbnailJob,
    /// Which attempt this delivery is.
    pub attempt: u32,
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ThumbnailQueue {
    tx: mpsc::UnboundedSender<Delivery>,
    closed: Arc<AtomicBool>,
    max_attempts: u32,
}

/// Consumer side of the queue.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<Delivery>,
}

impl JobReceiver {
    /// Wait for the next delivery. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

impl ThumbnailQueue {
    /// Create a queue and its receiver.
    pub fn new(max_attempts: u32) -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
            max_attempts: max_attempts.max(1),
        };
        (queue, JobReceiver { rx })
    }

    /// Publish a new job.
    pub fn enqueue(&self, job: ThumbnailJob) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FilesError::Queue("queue is closed".to_string()));
        }
        debug!(?job, "Enqueue thumbnail job");
        self.tx
            .send(Delivery { job, attempt: 1 })
            .map_err(|_| FilesError::Queue("no consumer".to_string()))
    }

    /// Hand a failed delivery back for another attempt.
    ///
    /// Returns false when the job has used up its attempts or the consumer
    /// is gone; the job is dropped in that case.
    pub fn redeliver(&self, delivery: Delivery) -> bool {
        if delivery.attempt >= self.max_attempts {
            error!(
                job = ?delivery.job,
                attempts = delivery.attempt,
                "Thumbnail job failed permanently"
            );
            return false;
        }

        let next = Delivery {
            job: delivery.job,
            attempt: delivery.attempt + 1,
        };
        self.tx.send(next).is_ok()
    }

    /// Refuse further jobs.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
