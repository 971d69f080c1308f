use super::{
    jobs::DEFAULT_MAX_ATTEMPTS, IndexError, IndexJob, IndexingPipeline, JobStore, IndexRequest,
};
use crate::types::IndexStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub retry_delay: Duration,
    /// How many jobs may run at the same time.
    pub concurrency: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(2),
            concurrency: 4,
        }
    }
}

/// Accepts indexing work and drains it on a background worker.
///
/// Every job is persisted before `enqueue` returns, so a request that was
/// acknowledged survives a crash and is picked up again by [`IndexQueue::resume_pending`].
#[derive(Clone, Debug)]
pub struct IndexQueue {
    sender: mpsc::UnboundedSender<IndexJob>,
    jobs: JobStore,
    pipeline: IndexingPipeline,
    settings: QueueSettings,
}

impl IndexQueue {
    /// Spawns the worker. Must be called from within a Tokio runtime.
    pub fn start(pipeline: IndexingPipeline, jobs: JobStore, settings: QueueSettings) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(
            receiver,
            pipeline.clone(),
            jobs.clone(),
            settings.clone(),
        ));
        Self {
            sender,
            jobs,
            pipeline,
            settings,
        }
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn pipeline(&self) -> &IndexingPipeline {
        &self.pipeline
    }

    /// Records the job, marks the item pending and hands the job to the worker.
    pub async fn enqueue(&self, request: IndexRequest) -> Result<IndexJob, IndexError> {
        let job = self.jobs.create(&request, self.settings.max_attempts).await?;
        if let Err(e) = self
            .pipeline
            .content_store()
            .set_index_status(&request.id, IndexStatus::Pending, None)
            .await
        {
            warn!(item_id = %request.id, "Failed to mark item pending: {e}");
        }
        info!(job_id = %job.id, item_id = %job.item_id, "Queued indexing job");
        self.sender
            .send(job.clone())
            .map_err(|_| IndexError::QueueClosed)?;
        Ok(job)
    }

    /// Drops the item's current vector document, then enqueues it again.
    ///
    /// Used when the indexed content changed, e.g. a campaign got new media.
    pub async fn reindex(&self, request: IndexRequest) -> Result<IndexJob, IndexError> {
        let collection = &self.pipeline.settings().collection;
        let removed = self
            .pipeline
            .vector_index()
            .delete_document(collection, &request.id)
            .await
            .map_err(IndexError::VectorIndex)?;
        if removed {
            info!(item_id = %request.id, "Removed stale vector document");
        }
        self.enqueue(request).await
    }

    /// Re-dispatches jobs left pending or running by a previous process.
    pub async fn resume_pending(&self) -> Result<usize, IndexError> {
        let unfinished = self.jobs.unfinished().await?;
        let count = unfinished.len();
        for job in unfinished {
            self.sender.send(job).map_err(|_| IndexError::QueueClosed)?;
        }
        if count > 0 {
            info!(count, "Resumed unfinished indexing jobs");
        }
        Ok(count)
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<IndexJob>,
    pipeline: IndexingPipeline,
    jobs: JobStore,
    settings: QueueSettings,
) {
    let permits = Arc::new(Semaphore::new(settings.concurrency.max(1)));
    while let Some(job) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let pipeline = pipeline.clone();
        let jobs = jobs.clone();
        let settings = settings.clone();
        tokio::spawn(async move {
            process_job(&pipeline, &jobs, &settings, job).await;
            drop(permit);
        });
    }
    info!("Indexing queue worker stopped");
}

async fn process_job(
    pipeline: &IndexingPipeline,
    jobs: &JobStore,
    settings: &QueueSettings,
    job: IndexJob,
) {
    let mut attempts = job.attempts;
    let max_attempts = job.max_attempts.max(1);

    while attempts < max_attempts {
        attempts += 1;
        if let Err(e) = jobs.start_attempt(&job.id).await {
            error!(job_id = %job.id, "Failed to record job attempt: {e}");
            return;
        }

        match pipeline.ensure_indexed(&job.request).await {
            Ok(report) => {
                if let Err(e) = jobs.complete(&job.id, &report).await {
                    error!(job_id = %job.id, "Failed to record job outcome: {e}");
                }
                info!(job_id = %job.id, item_id = %job.item_id, attempts, "Indexing job finished");
                return;
            }
            Err(e) => {
                let message = e.to_string();
                let terminal = attempts >= max_attempts;
                warn!(
                    job_id = %job.id,
                    item_id = %job.item_id,
                    attempt = attempts,
                    max_attempts,
                    "Indexing attempt failed: {message}"
                );
                if let Err(e) = jobs.record_failure(&job.id, &message, terminal).await {
                    error!(job_id = %job.id, "Failed to record job failure: {e}");
                }
                if terminal {
                    if let Err(e) = pipeline
                        .content_store()
                        .set_index_status(&job.item_id, IndexStatus::Failed, Some(&message))
                        .await
                    {
                        warn!(item_id = %job.item_id, "Failed to mark item failed: {e}");
                    }
                    error!(job_id = %job.id, item_id = %job.item_id, "Indexing job gave up");
                    return;
                }
                tokio::time::sleep(settings.retry_delay).await;
            }
        }
    }

    // A resumed job may already have used up its attempts.
    warn!(job_id = %job.id, attempts, "Job has no attempts left");
    if let Err(e) = pipeline
        .content_store()
        .set_index_status(&job.item_id, IndexStatus::Failed, Some("no attempts left"))
        .await
    {
        warn!(item_id = %job.item_id, "Failed to mark item failed: {e}");
    }
    if let Err(e) = jobs
        .record_failure(&job.id, "no attempts left", true)
        .await
    {
        error!(job_id = %job.id, "Failed to record job failure: {e}");
    }
}
