pub mod cache_entries;
pub mod error_logs;
pub mod scheduled_jobs;
pub mod webhook_events;
pub mod webhook_subscriptions;

/// Processing status of an inbound webhook event.
///
/// Transitions only `pending -> {processed | failed | ignored}`; the
/// UPDATE statements guard on the expected current status so an illegal
/// transition is a no-op rather than silent corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Processed,
    Failed,
    Ignored,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Processed => "processed",
            EventStatus::Failed => "failed",
            EventStatus::Ignored => "ignored",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Done,
    Failed,
    Cancelled,
}

/// What a scheduled job does when it comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "job_kind", rename_all = "snake_case")]
pub enum JobKind {
    AbandonedCheckoutCheck,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::AbandonedCheckoutCheck => "abandoned_checkout_check",
        }
    }
}
