//! End-to-end pipeline scenarios against the in-memory stores.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock, watch};
use url::Url;
use uuid::Uuid;

use crewflow_core::collaborators::{Notifier, WorkflowEngine};
use crewflow_core::config::{
    AdminConfig, ProviderConfig, ResilienceConfig, ServerConfig, SharedConfig,
};
use crewflow_core::entities::{EventStatus, JobStatus};
use crewflow_core::error::FlowError;
use crewflow_core::events::{MonitoringSweepReceiver, monitoring_sweep_channel};
use crewflow_core::pipeline::{InboundDelivery, WebhookProcessor};
use crewflow_core::processors::JobRunner;
use crewflow_core::reporter::ErrorReporter;
use crewflow_core::stores::{JobStore, MemoryStore, NewJob};
use crewflow_sdk::objects::{NotificationKind, NotificationRequest, WorkflowRunResponse};
use crewflow_sdk::signature::compute_signature;

const SECRET: &[u8] = b"test-webhook-secret";
const STORE: &str = "demo-store.myshopify.com";

#[derive(Default)]
struct RecordingEngine {
    calls: Mutex<Vec<(String, Uuid)>>,
    fail: AtomicBool,
}

#[async_trait]
impl WorkflowEngine for RecordingEngine {
    async fn execute_workflow(
        &self,
        name: &str,
        _payload: &serde_json::Value,
        tenant_id: Uuid,
    ) -> Result<WorkflowRunResponse, FlowError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FlowError::network("workflow engine unreachable"));
        }
        let mut calls = self.calls.lock().await;
        calls.push((name.to_owned(), tenant_id));
        let instance = format!("wf-{}", calls.len());
        Ok(WorkflowRunResponse {
            workflow_id: Some(instance),
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<NotificationRequest>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn create_notification(&self, request: NotificationRequest) -> Result<(), FlowError> {
        self.sent.lock().await.push(request);
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    engine: Arc<RecordingEngine>,
    notifier: Arc<RecordingNotifier>,
    sweep_rx: MonitoringSweepReceiver,
    processor: WebhookProcessor,
    tenant: Uuid,
}

fn shared_config() -> SharedConfig {
    let listen: SocketAddr = "127.0.0.1:8080".parse().unwrap();
    SharedConfig {
        server: Arc::new(RwLock::new(ServerConfig { listen })),
        admin: Arc::new(RwLock::new(AdminConfig::new(b"admin-secret".as_slice()))),
        provider: Arc::new(RwLock::new(ProviderConfig::new(
            SECRET,
            Url::parse("https://hooks.crewflow.test/").unwrap(),
            5,
        ))),
        resilience: Arc::new(RwLock::new(ResilienceConfig::default())),
    }
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(RecordingEngine::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let (sweep_tx, sweep_rx) = monitoring_sweep_channel();
    let reporter = ErrorReporter::new(store.clone(), notifier.clone());
    let tenant = Uuid::new_v4();

    for topic in [
        "orders/create",
        "orders/paid",
        "products/create",
        "inventory_levels/update",
        "customers/delete",
        "app/uninstalled",
        "checkouts/create",
        "checkouts/update",
        "checkouts/delete",
    ] {
        store.add_subscription(tenant, STORE, topic).await;
    }

    let processor = WebhookProcessor::new(
        store.clone(),
        store.clone(),
        store.clone(),
        engine.clone(),
        notifier.clone(),
        sweep_tx,
        reporter,
        shared_config(),
    );

    Harness {
        store,
        engine,
        notifier,
        sweep_rx,
        processor,
        tenant,
    }
}

fn delivery(topic: &str, provider_event_id: Option<&str>, body: &serde_json::Value) -> InboundDelivery {
    let bytes = serde_json::to_vec(body).unwrap();
    let signature = compute_signature(SECRET, &bytes);
    InboundDelivery {
        topic: topic.to_owned(),
        store_domain: STORE.into(),
        provider_event_id: provider_event_id.map(str::to_owned),
        signature: Some(signature),
        body: bytes.into(),
        headers: json!({ "x-provider-topic": topic }),
    }
}

fn paid_order_body() -> serde_json::Value {
    json!({ "id": 555666777_i64, "name": "#1001", "total_price": "149.99" })
}

#[tokio::test]
async fn paid_order_triggers_fulfillment_and_alerts() {
    let mut h = harness().await;

    let ack = h
        .processor
        .process_webhook(delivery("orders/paid", Some("evt-1"), &paid_order_body()))
        .await;
    assert!(ack.success);
    let event_id = ack.event_id.unwrap();

    let events = h.store.events_snapshot().await;
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.id, event_id);
    assert_eq!(event.status, EventStatus::Processed);
    assert!(event.processing_ms.is_some());
    assert_eq!(event.triggered_workflows.len(), 1);
    assert!(event.triggered_workflows[0].starts_with("new_order_fulfillment"));
    assert!(event.triggered_actions.contains(&"order_paid".to_owned()));

    let calls = h.engine.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "new_order_fulfillment");
    assert_eq!(calls[0].1, h.tenant);
    drop(calls);

    let sent = h.notifier.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::SystemAlert);
    assert!(sent[0].body.contains("555666777"));
    drop(sent);

    // orders/paid is high-value: a monitoring sweep was enqueued.
    let sweep = h.sweep_rx.try_recv().unwrap();
    assert_eq!(sweep.tenant_id, h.tenant);

    // The subscription's denormalized counter moved.
    let subs = h.store.subscriptions_snapshot().await;
    let paid_sub = subs.iter().find(|s| s.topic == "orders/paid").unwrap();
    assert_eq!(paid_sub.trigger_count, 1);
    assert!(paid_sub.last_triggered_at.is_some());
}

#[tokio::test]
async fn invalid_signature_is_rejected_before_persistence() {
    let h = harness().await;

    let mut bad = delivery("orders/paid", Some("evt-1"), &paid_order_body());
    bad.signature = Some("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_owned());

    let ack = h.processor.process_webhook(bad).await;
    assert!(!ack.success);
    assert_eq!(ack.error.as_deref(), Some("Invalid webhook signature"));
    assert!(ack.event_id.is_none());
    assert!(h.store.events_snapshot().await.is_empty());
    assert!(h.engine.calls.lock().await.is_empty());
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let h = harness().await;
    let mut unsigned = delivery("orders/paid", None, &paid_order_body());
    unsigned.signature = None;

    let ack = h.processor.process_webhook(unsigned).await;
    assert!(!ack.success);
    assert!(h.store.events_snapshot().await.is_empty());
}

#[tokio::test]
async fn redelivered_event_id_does_not_double_trigger() {
    let h = harness().await;

    let first = h
        .processor
        .process_webhook(delivery("orders/paid", Some("evt-dup"), &paid_order_body()))
        .await;
    assert!(first.success);
    assert!(first.event_id.is_some());

    let second = h
        .processor
        .process_webhook(delivery("orders/paid", Some("evt-dup"), &paid_order_body()))
        .await;
    assert!(second.success);
    assert!(second.event_id.is_none());

    assert_eq!(h.store.events_snapshot().await.len(), 1);
    assert_eq!(h.engine.calls.lock().await.len(), 1);
}

#[tokio::test]
async fn unknown_topic_is_persisted_as_ignored() {
    let h = harness().await;

    let ack = h
        .processor
        .process_webhook(delivery("orders/refunded", Some("evt-2"), &json!({ "id": 1 })))
        .await;
    assert!(ack.success);

    let events = h.store.events_snapshot().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Ignored);
    assert!(
        events[0]
            .error_text
            .as_deref()
            .unwrap()
            .contains("unrecognized topic")
    );
    assert!(h.engine.calls.lock().await.is_empty());
}

#[tokio::test]
async fn unsubscribed_topic_is_ignored() {
    let h = harness().await;

    // carts/create is in the catalog but this store never opted in.
    let ack = h
        .processor
        .process_webhook(delivery("carts/create", Some("evt-3"), &json!({ "id": "c1" })))
        .await;
    assert!(ack.success);

    let events = h.store.events_snapshot().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Ignored);
}

#[tokio::test]
async fn unknown_store_is_rejected_without_a_row() {
    let h = harness().await;

    let mut foreign = delivery("orders/paid", Some("evt-4"), &paid_order_body());
    foreign.store_domain = "stranger.myshopify.com".into();

    let ack = h.processor.process_webhook(foreign).await;
    assert!(!ack.success);
    assert!(ack.error.unwrap().contains("unknown store"));
    assert!(h.store.events_snapshot().await.is_empty());
}

#[tokio::test]
async fn invalid_json_body_is_rejected_without_a_row() {
    let h = harness().await;

    let bytes: &[u8] = b"{not json";
    let signature = compute_signature(SECRET, bytes);
    let ack = h
        .processor
        .process_webhook(InboundDelivery {
            topic: "orders/paid".to_owned(),
            store_domain: STORE.into(),
            provider_event_id: None,
            signature: Some(signature),
            body: bytes.to_vec().into(),
            headers: serde_json::Value::Null,
        })
        .await;
    assert!(!ack.success);
    assert!(h.store.events_snapshot().await.is_empty());
}

#[tokio::test]
async fn handler_failure_marks_the_event_failed() {
    let h = harness().await;
    h.engine.fail.store(true, Ordering::SeqCst);

    let ack = h
        .processor
        .process_webhook(delivery("orders/paid", Some("evt-5"), &paid_order_body()))
        .await;
    assert!(!ack.success);
    assert!(ack.event_id.is_some());

    let events = h.store.events_snapshot().await;
    assert_eq!(events[0].status, EventStatus::Failed);
    assert!(
        events[0]
            .error_text
            .as_deref()
            .unwrap()
            .contains("workflow engine unreachable")
    );

    // The failure went through the error reporter too.
    assert!(!h.store.error_logs_snapshot().await.is_empty());
}

#[tokio::test]
async fn malformed_order_payload_fails_validation() {
    let h = harness().await;

    let ack = h
        .processor
        .process_webhook(delivery("orders/paid", Some("evt-6"), &json!({ "name": "#9" })))
        .await;
    assert!(!ack.success);
    let events = h.store.events_snapshot().await;
    assert_eq!(events[0].status, EventStatus::Failed);
    assert!(h.engine.calls.lock().await.is_empty());
}

#[tokio::test]
async fn checkout_lifecycle_schedules_and_cancels_the_recheck() {
    let h = harness().await;

    let checkout = json!({ "id": 7001_i64, "token": "tok-abc", "total_price": "55.00" });
    let ack = h
        .processor
        .process_webhook(delivery("checkouts/create", Some("evt-7"), &checkout))
        .await;
    assert!(ack.success);

    let jobs = h.store.jobs_snapshot().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Pending);
    assert_eq!(jobs[0].dedup_key, "abandoned_checkout:tok-abc");
    let eta = jobs[0].due_at - OffsetDateTime::now_utc();
    assert!(eta > time::Duration::minutes(59));
    assert!(eta <= time::Duration::minutes(61));

    // The checkout converts into an order carrying its token.
    let order = json!({ "id": 9001_i64, "name": "#1002", "checkout_token": "tok-abc" });
    let ack = h
        .processor
        .process_webhook(delivery("orders/create", Some("evt-8"), &order))
        .await;
    assert!(ack.success);

    let jobs = h.store.jobs_snapshot().await;
    assert_eq!(jobs[0].status, JobStatus::Cancelled);
}

#[tokio::test]
async fn checkout_delete_cancels_the_recheck() {
    let h = harness().await;

    let checkout = json!({ "id": 7002_i64, "token": "tok-del" });
    h.processor
        .process_webhook(delivery("checkouts/create", Some("evt-9"), &checkout))
        .await;
    let ack = h
        .processor
        .process_webhook(delivery("checkouts/delete", Some("evt-10"), &checkout))
        .await;
    assert!(ack.success);

    let jobs = h.store.jobs_snapshot().await;
    assert_eq!(jobs[0].status, JobStatus::Cancelled);
    let events = h.store.events_snapshot().await;
    assert!(
        events[1]
            .triggered_actions
            .contains(&"abandoned_checkout_cancelled".to_owned())
    );
}

#[tokio::test]
async fn low_stock_emits_an_inventory_alert() {
    let h = harness().await;

    let level = json!({ "inventory_item_id": 31_i64, "location_id": 7_i64, "available": 2_i64 });
    let ack = h
        .processor
        .process_webhook(delivery("inventory_levels/update", Some("evt-11"), &level))
        .await;
    assert!(ack.success);

    let events = h.store.events_snapshot().await;
    assert!(
        events[0]
            .triggered_actions
            .contains(&"low_stock_alert".to_owned())
    );
    let sent = h.notifier.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::InventoryAlert);
}

#[tokio::test]
async fn healthy_stock_does_not_alert() {
    let h = harness().await;

    let level = json!({ "inventory_item_id": 31_i64, "available": 250_i64 });
    h.processor
        .process_webhook(delivery("inventory_levels/update", Some("evt-12"), &level))
        .await;

    let events = h.store.events_snapshot().await;
    assert_eq!(events[0].triggered_actions, vec!["inventory_synced"]);
    assert!(h.notifier.sent.lock().await.is_empty());
}

#[tokio::test]
async fn app_uninstall_disables_the_store() {
    let h = harness().await;

    // A pending job that must not survive the uninstall.
    h.processor
        .process_webhook(delivery(
            "checkouts/create",
            Some("evt-13"),
            &json!({ "id": 1_i64, "token": "tok-x" }),
        ))
        .await;

    let ack = h
        .processor
        .process_webhook(delivery("app/uninstalled", Some("evt-14"), &json!({})))
        .await;
    assert!(ack.success);

    let subs = h.store.subscriptions_snapshot().await;
    assert!(subs.iter().all(|s| !s.enabled));
    let jobs = h.store.jobs_snapshot().await;
    assert!(jobs.iter().all(|j| j.status == JobStatus::Cancelled));

    let sent = h.notifier.sent.lock().await;
    assert!(
        sent.iter()
            .any(|n| n.kind == NotificationKind::SystemAlert && n.body.contains(STORE))
    );
}

#[tokio::test]
async fn low_value_topics_do_not_request_sweeps() {
    let mut h = harness().await;

    h.processor
        .process_webhook(delivery(
            "products/create",
            Some("evt-15"),
            &json!({ "id": 5_i64, "title": "Widget" }),
        ))
        .await;

    assert!(h.sweep_rx.try_recv().is_err());
}

#[tokio::test]
async fn due_jobs_trigger_abandoned_cart_recovery() {
    let h = harness().await;
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = JobRunner::new(
        h.store.clone(),
        h.engine.clone(),
        ErrorReporter::new(h.store.clone(), h.notifier.clone()),
        shutdown_rx,
        Duration::from_millis(10),
    );

    h.store
        .schedule(NewJob {
            tenant_id: h.tenant,
            store_domain: STORE.into(),
            kind: crewflow_core::entities::JobKind::AbandonedCheckoutCheck,
            dedup_key: "abandoned_checkout:tok-due".to_owned(),
            payload: json!({ "id": 1_i64, "token": "tok-due" }),
            due_at: OffsetDateTime::now_utc() - time::Duration::minutes(1),
        })
        .await
        .unwrap();

    runner.tick().await.unwrap();

    let jobs = h.store.jobs_snapshot().await;
    assert_eq!(jobs[0].status, JobStatus::Done);
    assert_eq!(jobs[0].attempts, 1);
    let calls = h.engine.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "abandoned_cart_recovery");
}

#[tokio::test]
async fn failed_jobs_are_rescheduled_with_backoff() {
    let h = harness().await;
    h.engine.fail.store(true, Ordering::SeqCst);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = JobRunner::new(
        h.store.clone(),
        h.engine.clone(),
        ErrorReporter::new(h.store.clone(), h.notifier.clone()),
        shutdown_rx,
        Duration::from_millis(10),
    );

    h.store
        .schedule(NewJob {
            tenant_id: h.tenant,
            store_domain: STORE.into(),
            kind: crewflow_core::entities::JobKind::AbandonedCheckoutCheck,
            dedup_key: "abandoned_checkout:tok-fail".to_owned(),
            payload: json!({ "id": 2_i64 }),
            due_at: OffsetDateTime::now_utc() - time::Duration::minutes(1),
        })
        .await
        .unwrap();

    runner.tick().await.unwrap();

    let jobs = h.store.jobs_snapshot().await;
    assert_eq!(jobs[0].status, JobStatus::Pending);
    assert_eq!(jobs[0].attempts, 1);
    assert!(jobs[0].last_error.is_some());
    assert!(jobs[0].due_at > OffsetDateTime::now_utc());
    assert!(!h.store.error_logs_snapshot().await.is_empty());
}
