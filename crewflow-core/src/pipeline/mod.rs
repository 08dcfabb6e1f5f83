//! The webhook ingestion pipeline.
//!
//! Control flow for one delivery:
//!
//! 1. Signature verification — rejected deliveries never touch storage.
//! 2. Tenant resolution from the store's registered subscriptions.
//! 3. Event recorded as `pending` (a redelivered provider event id is a
//!    duplicate and stops here).
//! 4. Topic routed to its handler; unknown topics and unsubscribed
//!    stores end `ignored`.
//! 5. Terminal status written (`processed`/`failed`), the subscription's
//!    trigger counter bumped, and — for high-value topics — a monitoring
//!    sweep enqueued regardless of handler outcome.

mod handlers;

pub use handlers::RouteOutcome;

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use compact_str::CompactString;
use uuid::Uuid;

use crate::collaborators::{Notifier, WorkflowEngine};
use crate::config::SharedConfig;
use crate::error::FlowError;
use crate::events::{MonitoringSweep, MonitoringSweepSender};
use crate::reporter::ErrorReporter;
use crate::stores::{EventStore, InsertOutcome, JobStore, NewEvent, SubscriptionStore};
use crewflow_sdk::Topic;
use crewflow_sdk::objects::WebhookAck;
use crewflow_sdk::signature::check_signature;

const COMPONENT: &str = "webhook_pipeline";

/// A raw inbound delivery as the HTTP layer hands it over.
#[derive(Debug, Clone)]
pub struct InboundDelivery {
    /// Topic path from the route (`orders/paid`), not derived from the
    /// body.
    pub topic: String,
    pub store_domain: CompactString,
    pub provider_event_id: Option<String>,
    /// Value of the signature header, if present.
    pub signature: Option<String>,
    pub body: Bytes,
    /// Relevant request headers, stored with the event for audit.
    pub headers: serde_json::Value,
}

/// Everything one event's handlers need, borrowed from the processor.
pub(crate) struct HandlerContext {
    pub event_id: Uuid,
    pub tenant_id: Uuid,
    pub topic: Topic,
    pub store_domain: CompactString,
    pub payload: serde_json::Value,
}

/// The ingestion pipeline with its injected collaborators.
pub struct WebhookProcessor {
    pub(crate) events: Arc<dyn EventStore>,
    pub(crate) subscriptions: Arc<dyn SubscriptionStore>,
    pub(crate) jobs: Arc<dyn JobStore>,
    pub(crate) workflows: Arc<dyn WorkflowEngine>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) sweep_tx: MonitoringSweepSender,
    pub(crate) reporter: ErrorReporter,
    pub(crate) config: SharedConfig,
}

impl WebhookProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: Arc<dyn EventStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        jobs: Arc<dyn JobStore>,
        workflows: Arc<dyn WorkflowEngine>,
        notifier: Arc<dyn Notifier>,
        sweep_tx: MonitoringSweepSender,
        reporter: ErrorReporter,
        config: SharedConfig,
    ) -> Self {
        Self {
            events,
            subscriptions,
            jobs,
            workflows,
            notifier,
            sweep_tx,
            reporter,
            config,
        }
    }

    /// Process one inbound delivery end to end.
    pub async fn process_webhook(&self, delivery: InboundDelivery) -> WebhookAck {
        let started = Instant::now();

        let secret = { self.config.provider.read().await.webhook_secret.clone() };
        if let Err(reason) =
            check_signature(&secret, &delivery.body, delivery.signature.as_deref())
        {
            tracing::warn!(
                store = %delivery.store_domain,
                topic = %delivery.topic,
                reason = %reason,
                "Rejected webhook delivery"
            );
            return WebhookAck::rejected("Invalid webhook signature");
        }

        let payload: serde_json::Value = match serde_json::from_slice(&delivery.body) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    store = %delivery.store_domain,
                    topic = %delivery.topic,
                    error = %err,
                    "Webhook body is not valid JSON"
                );
                return WebhookAck::rejected(format!("invalid JSON payload: {err}"));
            }
        };

        let tenant_id = match self
            .subscriptions
            .tenant_for_store(&delivery.store_domain)
            .await
        {
            Ok(Some(tenant_id)) => tenant_id,
            Ok(None) => {
                tracing::warn!(store = %delivery.store_domain, "Delivery from unknown store");
                return WebhookAck::rejected(format!(
                    "unknown store: {}",
                    delivery.store_domain
                ));
            }
            Err(err) => {
                self.reporter
                    .report(None, COMPONENT, "tenant_for_store", &err, serde_json::Value::Null)
                    .await;
                return WebhookAck::rejected(err.to_string());
            }
        };

        let topic = Topic::parse(&delivery.topic);
        let subscription = match topic {
            Some(topic) => {
                match self
                    .subscriptions
                    .find_enabled(&delivery.store_domain, topic.as_str())
                    .await
                {
                    Ok(subscription) => subscription,
                    Err(err) => {
                        self.reporter
                            .report(
                                Some(tenant_id),
                                COMPONENT,
                                "find_enabled",
                                &err,
                                serde_json::Value::Null,
                            )
                            .await;
                        return WebhookAck::rejected(err.to_string());
                    }
                }
            }
            None => None,
        };

        let event_id = match self
            .events
            .insert_pending(NewEvent {
                tenant_id,
                store_domain: delivery.store_domain.clone(),
                topic: delivery.topic.as_str().into(),
                provider_event_id: delivery.provider_event_id.clone(),
                payload: payload.clone(),
                headers: delivery.headers.clone(),
            })
            .await
        {
            Ok(InsertOutcome::Inserted(id)) => id,
            Ok(InsertOutcome::Duplicate) => {
                tracing::info!(
                    store = %delivery.store_domain,
                    topic = %delivery.topic,
                    provider_event_id = ?delivery.provider_event_id,
                    "Duplicate delivery, handlers skipped"
                );
                return WebhookAck::accepted(None);
            }
            Err(err) => {
                self.reporter
                    .report(
                        Some(tenant_id),
                        COMPONENT,
                        "insert_pending",
                        &err,
                        serde_json::Value::Null,
                    )
                    .await;
                return WebhookAck::rejected(err.to_string());
            }
        };

        match (topic, subscription) {
            (None, _) => {
                let reason = format!("unrecognized topic: {}", delivery.topic);
                tracing::warn!(event_id = %event_id, topic = %delivery.topic, "Ignoring event");
                self.finish_ignored(event_id, &reason).await;
                WebhookAck::accepted(Some(event_id))
            }
            (Some(topic), None) => {
                tracing::info!(
                    event_id = %event_id,
                    topic = %topic,
                    store = %delivery.store_domain,
                    "No enabled subscription, ignoring event"
                );
                self.finish_ignored(event_id, "no enabled subscription for topic")
                    .await;
                WebhookAck::accepted(Some(event_id))
            }
            (Some(topic), Some(subscription)) => {
                let ctx = HandlerContext {
                    event_id,
                    tenant_id,
                    topic,
                    store_domain: delivery.store_domain.clone(),
                    payload,
                };
                self.run_routed(started, ctx, subscription.id).await
            }
        }
    }

    async fn run_routed(
        &self,
        started: Instant,
        ctx: HandlerContext,
        subscription_id: Uuid,
    ) -> WebhookAck {
        let route_result = self.route(&ctx).await;
        let processing_ms = started.elapsed().as_millis() as i64;

        // The trigger counter and the monitoring sweep are bookkeeping
        // on the delivery itself, independent of handler outcome.
        if let Err(err) = self.subscriptions.bump_trigger_count(subscription_id).await {
            tracing::warn!(subscription_id = %subscription_id, error = %err, "Trigger count bump failed");
        }
        if ctx.topic.is_high_value() {
            self.request_sweep(ctx.tenant_id, ctx.topic);
        }

        match route_result {
            Ok(outcome) => {
                if let Err(err) = self
                    .events
                    .mark_processed(
                        ctx.event_id,
                        processing_ms,
                        outcome.workflows,
                        outcome.actions,
                    )
                    .await
                {
                    self.reporter
                        .report(
                            Some(ctx.tenant_id),
                            COMPONENT,
                            "mark_processed",
                            &err,
                            serde_json::json!({ "event_id": ctx.event_id }),
                        )
                        .await;
                    return WebhookAck::failed(ctx.event_id, err.to_string());
                }
                tracing::info!(
                    event_id = %ctx.event_id,
                    topic = %ctx.topic,
                    processing_ms,
                    "Webhook processed"
                );
                WebhookAck::accepted(Some(ctx.event_id))
            }
            Err(err) => {
                self.reporter
                    .report(
                        Some(ctx.tenant_id),
                        COMPONENT,
                        ctx.topic.as_str(),
                        &err,
                        serde_json::json!({ "event_id": ctx.event_id }),
                    )
                    .await;
                if let Err(mark_err) = self
                    .events
                    .mark_failed(ctx.event_id, processing_ms, &err.to_string())
                    .await
                {
                    tracing::error!(event_id = %ctx.event_id, error = %mark_err, "mark_failed failed");
                }
                WebhookAck::failed(ctx.event_id, err.to_string())
            }
        }
    }

    async fn finish_ignored(&self, event_id: Uuid, reason: &str) {
        if let Err(err) = self.events.mark_ignored(event_id, reason).await {
            tracing::error!(event_id = %event_id, error = %err, "mark_ignored failed");
        }
    }

    fn request_sweep(&self, tenant_id: Uuid, topic: Topic) {
        let sweep = MonitoringSweep { tenant_id, topic };
        if let Err(err) = self.sweep_tx.try_send(sweep) {
            tracing::warn!(
                tenant = %tenant_id,
                error = %err,
                "Monitoring sweep queue full, sweep dropped"
            );
        }
    }

    /// Re-run the handlers for an already-recorded event (admin replay).
    ///
    /// Returns the route outcome; the caller owns the status update
    /// since replay transitions from `failed`, not `pending`.
    pub async fn replay(
        &self,
        event_id: Uuid,
        tenant_id: Uuid,
        topic: Topic,
        store_domain: &str,
        payload: serde_json::Value,
    ) -> Result<RouteOutcome, FlowError> {
        let ctx = HandlerContext {
            event_id,
            tenant_id,
            topic,
            store_domain: store_domain.into(),
            payload,
        };
        self.route(&ctx).await
    }
}
