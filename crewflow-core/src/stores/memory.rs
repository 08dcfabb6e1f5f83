//! In-memory store for isolated tests and lightweight deployments.
//!
//! Implements every store trait over plain vectors and maps behind a
//! `tokio::sync::Mutex`. Semantics mirror the Postgres implementation,
//! including provider-id deduplication, status-transition guards, and
//! expiry-based cache freshness.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::scheduled_jobs::ScheduledJobRecord;
use crate::entities::webhook_events::WebhookEventRecord;
use crate::entities::webhook_subscriptions::SubscriptionRecord;
use crate::entities::{EventStatus, JobStatus};
use crate::error::FlowError;
use crate::stores::{
    CacheStore, ErrorLogStore, EventStore, InsertOutcome, JobStore, NewErrorLog, NewEvent, NewJob,
    SubscriptionInfo, SubscriptionStore,
};

#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<Vec<WebhookEventRecord>>,
    subscriptions: Mutex<Vec<SubscriptionRecord>>,
    cache: Mutex<HashMap<String, (serde_json::Value, Option<OffsetDateTime>)>>,
    jobs: Mutex<Vec<ScheduledJobRecord>>,
    error_logs: Mutex<Vec<NewErrorLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enabled subscription. Returns its id.
    pub async fn add_subscription(
        &self,
        tenant_id: Uuid,
        store_domain: &str,
        topic: &str,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.subscriptions.lock().await.push(SubscriptionRecord {
            id,
            tenant_id,
            store_domain: store_domain.to_owned(),
            topic: topic.to_owned(),
            address: format!("https://crewflow.test/webhooks/{topic}"),
            enabled: true,
            created_at: OffsetDateTime::now_utc(),
            last_triggered_at: None,
            trigger_count: 0,
            metadata: serde_json::Value::Null,
        });
        id
    }

    pub async fn events_snapshot(&self) -> Vec<WebhookEventRecord> {
        self.events.lock().await.clone()
    }

    pub async fn subscriptions_snapshot(&self) -> Vec<SubscriptionRecord> {
        self.subscriptions.lock().await.clone()
    }

    pub async fn jobs_snapshot(&self) -> Vec<ScheduledJobRecord> {
        self.jobs.lock().await.clone()
    }

    pub async fn error_logs_snapshot(&self) -> Vec<NewErrorLog> {
        self.error_logs.lock().await.clone()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_pending(&self, event: NewEvent) -> Result<InsertOutcome, FlowError> {
        let mut events = self.events.lock().await;
        if let Some(provider_id) = &event.provider_event_id {
            let duplicate = events.iter().any(|e| {
                e.store_domain == event.store_domain.as_str()
                    && e.provider_event_id.as_deref() == Some(provider_id.as_str())
            });
            if duplicate {
                return Ok(InsertOutcome::Duplicate);
            }
        }
        let id = Uuid::new_v4();
        events.push(WebhookEventRecord {
            id,
            tenant_id: event.tenant_id,
            store_domain: event.store_domain.into(),
            topic: event.topic.into(),
            provider_event_id: event.provider_event_id,
            payload: event.payload,
            headers: event.headers,
            received_at: OffsetDateTime::now_utc(),
            status: EventStatus::Pending,
            processing_ms: None,
            error_text: None,
            triggered_workflows: Vec::new(),
            triggered_actions: Vec::new(),
        });
        Ok(InsertOutcome::Inserted(id))
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        processing_ms: i64,
        workflows: Vec<String>,
        actions: Vec<String>,
    ) -> Result<(), FlowError> {
        let mut events = self.events.lock().await;
        if let Some(event) = events
            .iter_mut()
            .find(|e| e.id == id && e.status == EventStatus::Pending)
        {
            event.status = EventStatus::Processed;
            event.processing_ms = Some(processing_ms);
            event.error_text = None;
            event.triggered_workflows = workflows;
            event.triggered_actions = actions;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        processing_ms: i64,
        error_text: &str,
    ) -> Result<(), FlowError> {
        let mut events = self.events.lock().await;
        if let Some(event) = events
            .iter_mut()
            .find(|e| e.id == id && e.status == EventStatus::Pending)
        {
            event.status = EventStatus::Failed;
            event.processing_ms = Some(processing_ms);
            event.error_text = Some(error_text.to_owned());
        }
        Ok(())
    }

    async fn mark_ignored(&self, id: Uuid, reason: &str) -> Result<(), FlowError> {
        let mut events = self.events.lock().await;
        if let Some(event) = events
            .iter_mut()
            .find(|e| e.id == id && e.status == EventStatus::Pending)
        {
            event.status = EventStatus::Ignored;
            event.error_text = Some(reason.to_owned());
        }
        Ok(())
    }

    async fn probe(&self) -> Result<(), FlowError> {
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn tenant_for_store(&self, store_domain: &str) -> Result<Option<Uuid>, FlowError> {
        let subscriptions = self.subscriptions.lock().await;
        Ok(subscriptions
            .iter()
            .find(|s| s.store_domain == store_domain)
            .map(|s| s.tenant_id))
    }

    async fn find_enabled(
        &self,
        store_domain: &str,
        topic: &str,
    ) -> Result<Option<SubscriptionInfo>, FlowError> {
        let subscriptions = self.subscriptions.lock().await;
        Ok(subscriptions
            .iter()
            .find(|s| s.store_domain == store_domain && s.topic == topic && s.enabled)
            .map(|s| SubscriptionInfo {
                id: s.id,
                tenant_id: s.tenant_id,
            }))
    }

    async fn bump_trigger_count(&self, id: Uuid) -> Result<(), FlowError> {
        let mut subscriptions = self.subscriptions.lock().await;
        if let Some(subscription) = subscriptions.iter_mut().find(|s| s.id == id) {
            subscription.trigger_count += 1;
            subscription.last_triggered_at = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn disable_store(&self, store_domain: &str) -> Result<u64, FlowError> {
        let mut subscriptions = self.subscriptions.lock().await;
        let mut disabled = 0;
        for subscription in subscriptions
            .iter_mut()
            .filter(|s| s.store_domain == store_domain && s.enabled)
        {
            subscription.enabled = false;
            disabled += 1;
        }
        Ok(disabled)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        max_age: Option<Duration>,
    ) -> Result<(), FlowError> {
        let expires_at = max_age.map(|age| OffsetDateTime::now_utc() + age);
        self.cache
            .lock()
            .await
            .insert(key.to_owned(), (value, expires_at));
        Ok(())
    }

    async fn get_fresh(&self, key: &str) -> Result<Option<serde_json::Value>, FlowError> {
        let cache = self.cache.lock().await;
        Ok(cache.get(key).and_then(|(value, expires_at)| {
            let fresh = expires_at.is_none_or(|at| at > OffsetDateTime::now_utc());
            fresh.then(|| value.clone())
        }))
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn schedule(&self, job: NewJob) -> Result<Uuid, FlowError> {
        let mut jobs = self.jobs.lock().await;
        if let Some(existing) = jobs
            .iter_mut()
            .find(|j| j.store_domain == job.store_domain.as_str() && j.dedup_key == job.dedup_key)
        {
            existing.payload = job.payload;
            existing.due_at = job.due_at;
            existing.status = JobStatus::Pending;
            existing.attempts = 0;
            existing.last_error = None;
            return Ok(existing.id);
        }
        let id = Uuid::new_v4();
        jobs.push(ScheduledJobRecord {
            id,
            tenant_id: job.tenant_id,
            store_domain: job.store_domain.into(),
            kind: job.kind,
            dedup_key: job.dedup_key,
            payload: job.payload,
            due_at: job.due_at,
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn cancel(&self, store_domain: &str, dedup_key: &str) -> Result<bool, FlowError> {
        let mut jobs = self.jobs.lock().await;
        match jobs.iter_mut().find(|j| {
            j.store_domain == store_domain
                && j.dedup_key == dedup_key
                && j.status == JobStatus::Pending
        }) {
            Some(job) => {
                job.status = JobStatus::Cancelled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cancel_for_store(&self, store_domain: &str) -> Result<u64, FlowError> {
        let mut jobs = self.jobs.lock().await;
        let mut cancelled = 0;
        for job in jobs
            .iter_mut()
            .filter(|j| j.store_domain == store_domain && j.status == JobStatus::Pending)
        {
            job.status = JobStatus::Cancelled;
            cancelled += 1;
        }
        Ok(cancelled)
    }

    async fn claim_due(&self, limit: i64) -> Result<Vec<ScheduledJobRecord>, FlowError> {
        let now = OffsetDateTime::now_utc();
        let mut jobs = self.jobs.lock().await;
        let mut claimed = Vec::new();
        for job in jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending && j.due_at <= now)
            .take(limit.max(0) as usize)
        {
            job.attempts += 1;
            claimed.push(job.clone());
        }
        Ok(claimed)
    }

    async fn complete(&self, id: Uuid) -> Result<(), FlowError> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            job.status = JobStatus::Done;
        }
        Ok(())
    }

    async fn fail(
        &self,
        id: Uuid,
        error: &str,
        retry_at: Option<OffsetDateTime>,
    ) -> Result<(), FlowError> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            job.last_error = Some(error.to_owned());
            match retry_at {
                Some(at) => job.due_at = at,
                None => job.status = JobStatus::Failed,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ErrorLogStore for MemoryStore {
    async fn record(&self, entry: NewErrorLog) -> Result<Uuid, FlowError> {
        self.error_logs.lock().await.push(entry);
        Ok(Uuid::new_v4())
    }
}
