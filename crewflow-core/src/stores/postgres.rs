//! Postgres-backed store implementations.
//!
//! Thin adapters from the trait seams onto the entity messages in
//! [`crate::entities`]; all SQL lives there.

use async_trait::async_trait;
use kanau::processor::Processor;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::EventStatus;
use crate::entities::cache_entries::{GetFreshCacheEntry, UpsertCacheEntry};
use crate::entities::error_logs::InsertErrorLog;
use crate::entities::scheduled_jobs::{
    CancelJob, CancelJobsForStore, ClaimDueJobs, CompleteJob, FailJob, ScheduleJob,
    ScheduledJobRecord,
};
use crate::entities::webhook_events::{
    InsertPendingEvent, MarkEventFailed, MarkEventIgnored, MarkEventProcessed, ProbeStorage,
};
use crate::entities::webhook_subscriptions::{
    BumpTriggerCount, DisableStoreSubscriptions, FindEnabledSubscription, FindTenantForStore,
};
use crate::error::FlowError;
use crate::framework::DatabaseProcessor;
use crate::stores::{
    CacheStore, ErrorLogStore, EventStore, InsertOutcome, JobStore, NewErrorLog, NewEvent, NewJob,
    SubscriptionInfo, SubscriptionStore,
};

#[derive(Clone)]
pub struct PgStore {
    processor: DatabaseProcessor,
}

impl PgStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            processor: DatabaseProcessor::new(pool),
        }
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn insert_pending(&self, event: NewEvent) -> Result<InsertOutcome, FlowError> {
        let inserted = self
            .processor
            .process(InsertPendingEvent {
                tenant_id: event.tenant_id,
                store_domain: event.store_domain.into(),
                topic: event.topic.into(),
                provider_event_id: event.provider_event_id,
                payload: event.payload,
                headers: event.headers,
            })
            .await?;
        Ok(match inserted {
            Some(id) => InsertOutcome::Inserted(id),
            None => InsertOutcome::Duplicate,
        })
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        processing_ms: i64,
        workflows: Vec<String>,
        actions: Vec<String>,
    ) -> Result<(), FlowError> {
        let updated = self
            .processor
            .process(MarkEventProcessed {
                id,
                expected_status: EventStatus::Pending,
                processing_ms,
                triggered_workflows: workflows,
                triggered_actions: actions,
            })
            .await?;
        if !updated {
            tracing::warn!(event_id = %id, "mark_processed skipped: event was not pending");
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        processing_ms: i64,
        error_text: &str,
    ) -> Result<(), FlowError> {
        let updated = self
            .processor
            .process(MarkEventFailed {
                id,
                expected_status: EventStatus::Pending,
                processing_ms,
                error_text: error_text.to_owned(),
            })
            .await?;
        if !updated {
            tracing::warn!(event_id = %id, "mark_failed skipped: event was not pending");
        }
        Ok(())
    }

    async fn mark_ignored(&self, id: Uuid, reason: &str) -> Result<(), FlowError> {
        self.processor
            .process(MarkEventIgnored {
                id,
                reason: reason.to_owned(),
            })
            .await?;
        Ok(())
    }

    async fn probe(&self) -> Result<(), FlowError> {
        self.processor.process(ProbeStorage).await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn tenant_for_store(&self, store_domain: &str) -> Result<Option<Uuid>, FlowError> {
        Ok(self
            .processor
            .process(FindTenantForStore {
                store_domain: store_domain.to_owned(),
            })
            .await?)
    }

    async fn find_enabled(
        &self,
        store_domain: &str,
        topic: &str,
    ) -> Result<Option<SubscriptionInfo>, FlowError> {
        let record = self
            .processor
            .process(FindEnabledSubscription {
                store_domain: store_domain.to_owned(),
                topic: topic.to_owned(),
            })
            .await?;
        Ok(record.map(|r| SubscriptionInfo {
            id: r.id,
            tenant_id: r.tenant_id,
        }))
    }

    async fn bump_trigger_count(&self, id: Uuid) -> Result<(), FlowError> {
        self.processor.process(BumpTriggerCount { id }).await?;
        Ok(())
    }

    async fn disable_store(&self, store_domain: &str) -> Result<u64, FlowError> {
        Ok(self
            .processor
            .process(DisableStoreSubscriptions {
                store_domain: store_domain.to_owned(),
            })
            .await?)
    }
}

#[async_trait]
impl CacheStore for PgStore {
    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        max_age: Option<Duration>,
    ) -> Result<(), FlowError> {
        let expires_at = max_age.map(|age| OffsetDateTime::now_utc() + age);
        self.processor
            .process(UpsertCacheEntry {
                key: key.to_owned(),
                value,
                expires_at,
            })
            .await?;
        Ok(())
    }

    async fn get_fresh(&self, key: &str) -> Result<Option<serde_json::Value>, FlowError> {
        Ok(self
            .processor
            .process(GetFreshCacheEntry {
                key: key.to_owned(),
            })
            .await?)
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn schedule(&self, job: NewJob) -> Result<Uuid, FlowError> {
        Ok(self
            .processor
            .process(ScheduleJob {
                tenant_id: job.tenant_id,
                store_domain: job.store_domain.into(),
                kind: job.kind,
                dedup_key: job.dedup_key,
                payload: job.payload,
                due_at: job.due_at,
            })
            .await?)
    }

    async fn cancel(&self, store_domain: &str, dedup_key: &str) -> Result<bool, FlowError> {
        Ok(self
            .processor
            .process(CancelJob {
                store_domain: store_domain.to_owned(),
                dedup_key: dedup_key.to_owned(),
            })
            .await?)
    }

    async fn cancel_for_store(&self, store_domain: &str) -> Result<u64, FlowError> {
        Ok(self
            .processor
            .process(CancelJobsForStore {
                store_domain: store_domain.to_owned(),
            })
            .await?)
    }

    async fn claim_due(&self, limit: i64) -> Result<Vec<ScheduledJobRecord>, FlowError> {
        Ok(self.processor.process(ClaimDueJobs { limit }).await?)
    }

    async fn complete(&self, id: Uuid) -> Result<(), FlowError> {
        self.processor.process(CompleteJob { id }).await?;
        Ok(())
    }

    async fn fail(
        &self,
        id: Uuid,
        error: &str,
        retry_at: Option<OffsetDateTime>,
    ) -> Result<(), FlowError> {
        self.processor
            .process(FailJob {
                id,
                error: error.to_owned(),
                retry_at,
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ErrorLogStore for PgStore {
    async fn record(&self, entry: NewErrorLog) -> Result<Uuid, FlowError> {
        Ok(self
            .processor
            .process(InsertErrorLog {
                tenant_id: entry.tenant_id,
                component: entry.component.into(),
                operation: entry.operation.into(),
                error_kind: entry.kind.as_str().to_owned(),
                severity: entry.severity,
                message: entry.message,
                context: entry.context,
                retry_count: entry.retry_count,
            })
            .await?)
    }
}
