use crate::entities::{JobKind, JobStatus};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use time::OffsetDateTime;
use uuid::Uuid;

const JOB_COLUMNS: &str = "id, tenant_id, store_domain, kind, dedup_key, payload, due_at, \
     status, attempts, last_error, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduledJobRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub store_domain: String,
    pub kind: JobKind,
    pub dedup_key: String,
    pub payload: serde_json::Value,
    pub due_at: OffsetDateTime,
    pub status: JobStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
/// Schedule (or reschedule) a delayed follow-up.
///
/// Re-scheduling the same (store, dedup key) resets the row to a fresh
/// pending job with the new payload and due time.
pub struct ScheduleJob {
    pub tenant_id: Uuid,
    pub store_domain: String,
    pub kind: JobKind,
    pub dedup_key: String,
    pub payload: serde_json::Value,
    pub due_at: OffsetDateTime,
}

impl Processor<ScheduleJob> for DatabaseProcessor {
    type Output = Uuid;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ScheduleJob")]
    async fn process(&self, schedule: ScheduleJob) -> Result<Uuid, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO scheduled_jobs
                (tenant_id, store_domain, kind, dedup_key, payload, due_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (store_domain, dedup_key) DO UPDATE
                SET payload = EXCLUDED.payload,
                    due_at = EXCLUDED.due_at,
                    status = 'pending',
                    attempts = 0,
                    last_error = NULL
            RETURNING id
            "#,
        )
        .bind(schedule.tenant_id)
        .bind(&schedule.store_domain)
        .bind(schedule.kind)
        .bind(&schedule.dedup_key)
        .bind(&schedule.payload)
        .bind(schedule.due_at)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Cancel a pending job, e.g. when the checkout it watches converted.
pub struct CancelJob {
    pub store_domain: String,
    pub dedup_key: String,
}

impl Processor<CancelJob> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CancelJob")]
    async fn process(&self, cancel: CancelJob) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE scheduled_jobs SET status = 'cancelled' \
             WHERE store_domain = $1 AND dedup_key = $2 AND status = 'pending'",
        )
        .bind(&cancel.store_domain)
        .bind(&cancel.dedup_key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
/// Cancel every pending job for a store (app uninstall).
pub struct CancelJobsForStore {
    pub store_domain: String,
}

impl Processor<CancelJobsForStore> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CancelJobsForStore")]
    async fn process(&self, cancel: CancelJobsForStore) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE scheduled_jobs SET status = 'cancelled' \
             WHERE store_domain = $1 AND status = 'pending'",
        )
        .bind(&cancel.store_domain)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Claim a batch of due jobs for execution.
///
/// `FOR UPDATE SKIP LOCKED` keeps concurrently polling runners from
/// claiming the same rows; the attempt counter is bumped as part of the
/// claim so a crash mid-execution still counts against the budget.
pub struct ClaimDueJobs {
    pub limit: i64,
}

impl Processor<ClaimDueJobs> for DatabaseProcessor {
    type Output = Vec<ScheduledJobRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ClaimDueJobs")]
    async fn process(&self, claim: ClaimDueJobs) -> Result<Vec<ScheduledJobRecord>, sqlx::Error> {
        let sql = format!(
            "UPDATE scheduled_jobs SET attempts = attempts + 1 \
             WHERE id IN ( \
                 SELECT id FROM scheduled_jobs \
                 WHERE status = 'pending' AND due_at <= now() \
                 ORDER BY due_at ASC LIMIT $1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {JOB_COLUMNS}"
        );
        sqlx::query_as::<_, ScheduledJobRecord>(&sql)
            .bind(claim.limit)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct CompleteJob {
    pub id: Uuid,
}

impl Processor<CompleteJob> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CompleteJob")]
    async fn process(&self, complete: CompleteJob) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE scheduled_jobs SET status = 'done' WHERE id = $1")
            .bind(complete.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Record a job failure. With `retry_at` the job stays pending and comes
/// due again; without it the failure is terminal.
pub struct FailJob {
    pub id: Uuid,
    pub error: String,
    pub retry_at: Option<OffsetDateTime>,
}

impl Processor<FailJob> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:FailJob")]
    async fn process(&self, fail: FailJob) -> Result<(), sqlx::Error> {
        match fail.retry_at {
            Some(retry_at) => {
                sqlx::query(
                    "UPDATE scheduled_jobs SET last_error = $2, due_at = $3 WHERE id = $1",
                )
                .bind(fail.id)
                .bind(&fail.error)
                .bind(retry_at)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "UPDATE scheduled_jobs SET status = 'failed', last_error = $2 WHERE id = $1",
                )
                .bind(fail.id)
                .bind(&fail.error)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}
