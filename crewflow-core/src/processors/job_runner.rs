//! JobRunner processor.
//!
//! Polls `scheduled_jobs` for due work. Jobs live in the database, so a
//! process restart picks up where the previous instance left off — the
//! abandoned-checkout re-check survives redeploys that an in-process
//! timer would silently drop.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{error, info};

use crate::collaborators::WorkflowEngine;
use crate::entities::JobKind;
use crate::entities::scheduled_jobs::ScheduledJobRecord;
use crate::error::FlowError;
use crate::reporter::ErrorReporter;
use crate::stores::JobStore;

const CLAIM_BATCH: i64 = 10;
const MAX_JOB_ATTEMPTS: i32 = 3;
const JOB_RETRY_DELAY: time::Duration = time::Duration::minutes(5);

pub struct JobRunner {
    jobs: Arc<dyn JobStore>,
    workflows: Arc<dyn WorkflowEngine>,
    reporter: ErrorReporter,
    shutdown_rx: watch::Receiver<bool>,
    poll_interval: Duration,
}

impl JobRunner {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        workflows: Arc<dyn WorkflowEngine>,
        reporter: ErrorReporter,
        shutdown_rx: watch::Receiver<bool>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            jobs,
            workflows,
            reporter,
            shutdown_rx,
            poll_interval,
        }
    }

    pub async fn run(mut self) {
        info!("JobRunner started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("JobRunner received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.poll_interval) => {
                    if let Err(err) = self.tick().await {
                        error!(error = %err, "Job poll failed");
                    }
                }
            }
        }

        info!("JobRunner shutdown complete");
    }

    /// Claim and execute one batch of due jobs.
    pub async fn tick(&self) -> Result<(), FlowError> {
        let due = self.jobs.claim_due(CLAIM_BATCH).await?;
        for job in due {
            match self.execute(&job).await {
                Ok(()) => {
                    if let Err(err) = self.jobs.complete(job.id).await {
                        error!(job_id = %job.id, error = %err, "Failed to complete job");
                    }
                }
                Err(err) => {
                    self.reporter
                        .report(
                            Some(job.tenant_id),
                            "job_runner",
                            job.kind.as_str(),
                            &err,
                            serde_json::json!({ "job_id": job.id, "attempts": job.attempts }),
                        )
                        .await;
                    // The claim already counted this attempt.
                    let retry_at = (job.attempts < MAX_JOB_ATTEMPTS)
                        .then(|| OffsetDateTime::now_utc() + JOB_RETRY_DELAY);
                    if let Err(fail_err) =
                        self.jobs.fail(job.id, &err.to_string(), retry_at).await
                    {
                        error!(job_id = %job.id, error = %fail_err, "Failed to record job failure");
                    }
                }
            }
        }
        Ok(())
    }

    async fn execute(&self, job: &ScheduledJobRecord) -> Result<(), FlowError> {
        match job.kind {
            JobKind::AbandonedCheckoutCheck => {
                // Still pending at its due time means nothing converted
                // or closed the checkout in the meantime.
                let run = self
                    .workflows
                    .execute_workflow("abandoned_cart_recovery", &job.payload, job.tenant_id)
                    .await?;
                info!(
                    job_id = %job.id,
                    store = %job.store_domain,
                    workflow_id = ?run.workflow_id,
                    "Triggered abandoned-cart recovery"
                );
                Ok(())
            }
        }
    }
}
