//! Store seams between the pipeline and its persistence.
//!
//! The pipeline, health checker, and background processors talk to these
//! traits rather than to the database directly, so an isolated test
//! instance runs against [`MemoryStore`] while the server wires up
//! [`PgStore`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use compact_str::CompactString;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::JobKind;
use crate::entities::scheduled_jobs::ScheduledJobRecord;
use crate::error::{ErrorKind, FlowError, Severity};

/// A freshly verified delivery, ready to be recorded.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub tenant_id: Uuid,
    pub store_domain: CompactString,
    pub topic: CompactString,
    pub provider_event_id: Option<String>,
    pub payload: serde_json::Value,
    pub headers: serde_json::Value,
}

/// Result of recording a new event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(Uuid),
    /// The provider redelivered an event id we already hold; nothing was
    /// written and handlers must not run again.
    Duplicate,
}

/// The slice of a subscription the pipeline needs for routing.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionInfo {
    pub id: Uuid,
    pub tenant_id: Uuid,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_pending(&self, event: NewEvent) -> Result<InsertOutcome, FlowError>;
    async fn mark_processed(
        &self,
        id: Uuid,
        processing_ms: i64,
        workflows: Vec<String>,
        actions: Vec<String>,
    ) -> Result<(), FlowError>;
    async fn mark_failed(
        &self,
        id: Uuid,
        processing_ms: i64,
        error_text: &str,
    ) -> Result<(), FlowError>;
    async fn mark_ignored(&self, id: Uuid, reason: &str) -> Result<(), FlowError>;
    /// Trivial reachability probe for the health checker.
    async fn probe(&self) -> Result<(), FlowError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Resolve the tenant owning a store, from any registered
    /// subscription. `None` means the store is unknown to us.
    async fn tenant_for_store(&self, store_domain: &str) -> Result<Option<Uuid>, FlowError>;
    async fn find_enabled(
        &self,
        store_domain: &str,
        topic: &str,
    ) -> Result<Option<SubscriptionInfo>, FlowError>;
    async fn bump_trigger_count(&self, id: Uuid) -> Result<(), FlowError>;
    /// Disable every subscription for a store; returns how many were
    /// still enabled.
    async fn disable_store(&self, store_domain: &str) -> Result<u64, FlowError>;
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Upsert `value` under `key`. `max_age` fixes the entry's expiry at
    /// write time; `None` never expires.
    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        max_age: Option<Duration>,
    ) -> Result<(), FlowError>;
    /// Read a value whose expiry has not passed.
    async fn get_fresh(&self, key: &str) -> Result<Option<serde_json::Value>, FlowError>;
}

/// A delayed follow-up to persist.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub tenant_id: Uuid,
    pub store_domain: CompactString,
    pub kind: JobKind,
    pub dedup_key: String,
    pub payload: serde_json::Value,
    pub due_at: OffsetDateTime,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn schedule(&self, job: NewJob) -> Result<Uuid, FlowError>;
    async fn cancel(&self, store_domain: &str, dedup_key: &str) -> Result<bool, FlowError>;
    async fn cancel_for_store(&self, store_domain: &str) -> Result<u64, FlowError>;
    async fn claim_due(&self, limit: i64) -> Result<Vec<ScheduledJobRecord>, FlowError>;
    async fn complete(&self, id: Uuid) -> Result<(), FlowError>;
    async fn fail(
        &self,
        id: Uuid,
        error: &str,
        retry_at: Option<OffsetDateTime>,
    ) -> Result<(), FlowError>;
}

/// A classified error to persist for operators.
#[derive(Debug, Clone)]
pub struct NewErrorLog {
    pub tenant_id: Option<Uuid>,
    pub component: CompactString,
    pub operation: CompactString,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub context: serde_json::Value,
    pub retry_count: i32,
}

#[async_trait]
pub trait ErrorLogStore: Send + Sync {
    async fn record(&self, entry: NewErrorLog) -> Result<Uuid, FlowError>;
}
