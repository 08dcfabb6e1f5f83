//! Per-topic handlers.
//!
//! Handlers return the workflows and action tags they triggered; the
//! pipeline records both on the event. Notifications are best-effort —
//! an emit failure is reported but never fails the event.

use time::OffsetDateTime;

use crate::entities::JobKind;
use crate::error::FlowError;
use crate::pipeline::{HandlerContext, WebhookProcessor};
use crate::stores::NewJob;
use crewflow_sdk::Topic;
use crewflow_sdk::objects::catalog::InventoryLevelPayload;
use crewflow_sdk::objects::checkouts::CheckoutPayload;
use crewflow_sdk::objects::orders::OrderPayload;
use crewflow_sdk::objects::{NotificationKind, NotificationRequest};

/// How long a checkout may sit before the abandonment re-check fires.
const ABANDONED_CHECKOUT_DELAY: time::Duration = time::Duration::hours(1);

/// What a handler did with the event.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Workflow instances spawned, as `name` or `name:instance_id`.
    pub workflows: Vec<String>,
    /// Action tags describing side effects taken.
    pub actions: Vec<String>,
}

impl RouteOutcome {
    fn action(tag: &str) -> Self {
        Self {
            workflows: Vec::new(),
            actions: vec![tag.to_owned()],
        }
    }

    fn push_action(mut self, tag: &str) -> Self {
        self.actions.push(tag.to_owned());
        self
    }
}

impl WebhookProcessor {
    pub(crate) async fn route(&self, ctx: &HandlerContext) -> Result<RouteOutcome, FlowError> {
        match ctx.topic {
            Topic::OrdersCreate => self.handle_order_created(ctx).await,
            Topic::OrdersPaid => self.handle_order_paid(ctx).await,
            Topic::OrdersCancelled => self.handle_order_cancelled(ctx).await,
            Topic::OrdersUpdated => Ok(RouteOutcome::action("order_updated")),
            Topic::OrdersFulfilled => Ok(RouteOutcome::action("order_fulfilled")),
            Topic::OrdersPartiallyFulfilled => {
                Ok(RouteOutcome::action("order_partially_fulfilled"))
            }
            Topic::ProductsCreate => Ok(RouteOutcome::action("catalog_product_added")),
            Topic::ProductsUpdate => Ok(RouteOutcome::action("catalog_product_updated")),
            Topic::ProductsDelete => Ok(RouteOutcome::action("catalog_product_removed")),
            Topic::InventoryLevelsUpdate => self.handle_inventory_level_updated(ctx).await,
            Topic::InventoryItemsCreate => Ok(RouteOutcome::action("inventory_item_added")),
            Topic::InventoryItemsUpdate => Ok(RouteOutcome::action("inventory_item_updated")),
            Topic::CustomersCreate => Ok(RouteOutcome::action("customer_added")),
            Topic::CustomersUpdate => Ok(RouteOutcome::action("customer_updated")),
            Topic::CustomersDelete => Ok(RouteOutcome::action("customer_redacted")),
            Topic::AppUninstalled => self.handle_app_uninstalled(ctx).await,
            Topic::CartsCreate => Ok(RouteOutcome::action("cart_opened")),
            Topic::CartsUpdate => Ok(RouteOutcome::action("cart_updated")),
            Topic::CheckoutsCreate => self.handle_checkout_created(ctx).await,
            Topic::CheckoutsUpdate => self.handle_checkout_updated(ctx).await,
            Topic::CheckoutsDelete => self.handle_checkout_deleted(ctx).await,
        }
    }

    async fn handle_order_created(&self, ctx: &HandlerContext) -> Result<RouteOutcome, FlowError> {
        let order = parse_order(ctx)?;

        // A checkout that became an order is no longer abandoned.
        if let Some(token) = &order.checkout_token {
            let key = abandoned_checkout_key(token);
            if let Err(err) = self.jobs.cancel(&ctx.store_domain, &key).await {
                tracing::warn!(error = %err, "Failed to cancel abandoned-checkout job");
            }
        }

        self.notify(
            ctx,
            NotificationKind::OrderActivity,
            format!("New order {}", order_label(&order)),
            format!("Order {} was created.", order.id),
            serde_json::json!({ "order_id": order.id }),
        )
        .await;

        Ok(RouteOutcome::action("order_recorded"))
    }

    async fn handle_order_paid(&self, ctx: &HandlerContext) -> Result<RouteOutcome, FlowError> {
        let order = parse_order(ctx)?;

        let run = self
            .workflows
            .execute_workflow("new_order_fulfillment", &ctx.payload, ctx.tenant_id)
            .await?;
        let workflow_entry = match &run.workflow_id {
            Some(id) => format!("new_order_fulfillment:{id}"),
            None => "new_order_fulfillment".to_owned(),
        };

        let body = match &order.total_price {
            Some(total) => format!(
                "Order {} ({}) paid: {total}",
                order.id,
                order_label(&order)
            ),
            None => format!("Order {} ({}) paid.", order.id, order_label(&order)),
        };
        self.notify(
            ctx,
            NotificationKind::SystemAlert,
            format!("Order {} paid", order_label(&order)),
            body,
            serde_json::json!({ "order_id": order.id, "workflow": workflow_entry }),
        )
        .await;

        Ok(RouteOutcome {
            workflows: vec![workflow_entry],
            actions: vec!["order_paid".to_owned()],
        })
    }

    async fn handle_order_cancelled(
        &self,
        ctx: &HandlerContext,
    ) -> Result<RouteOutcome, FlowError> {
        let order = parse_order(ctx)?;
        self.notify(
            ctx,
            NotificationKind::OrderActivity,
            format!("Order {} cancelled", order_label(&order)),
            format!("Order {} was cancelled.", order.id),
            serde_json::json!({ "order_id": order.id }),
        )
        .await;
        Ok(RouteOutcome::action("order_cancelled"))
    }

    async fn handle_inventory_level_updated(
        &self,
        ctx: &HandlerContext,
    ) -> Result<RouteOutcome, FlowError> {
        let level: InventoryLevelPayload = serde_json::from_value(ctx.payload.clone())
            .map_err(|err| FlowError::validation(format!("malformed inventory payload: {err}")))?;

        let threshold = { self.config.provider.read().await.low_stock_threshold };
        let outcome = RouteOutcome::action("inventory_synced");

        match level.available {
            Some(available) if available <= threshold => {
                self.notify(
                    ctx,
                    NotificationKind::InventoryAlert,
                    "Low stock".to_owned(),
                    format!(
                        "Inventory item {} is down to {available} unit(s).",
                        level.inventory_item_id
                    ),
                    serde_json::json!({
                        "inventory_item_id": level.inventory_item_id,
                        "available": available,
                        "location_id": level.location_id,
                    }),
                )
                .await;
                Ok(outcome.push_action("low_stock_alert"))
            }
            _ => Ok(outcome),
        }
    }

    async fn handle_app_uninstalled(
        &self,
        ctx: &HandlerContext,
    ) -> Result<RouteOutcome, FlowError> {
        let disabled = self.subscriptions.disable_store(&ctx.store_domain).await?;
        let cancelled = self.jobs.cancel_for_store(&ctx.store_domain).await?;
        tracing::info!(
            store = %ctx.store_domain,
            disabled,
            cancelled,
            "Store uninstalled the app"
        );

        self.notify(
            ctx,
            NotificationKind::SystemAlert,
            "Store disconnected".to_owned(),
            format!(
                "{} uninstalled the app; {disabled} subscription(s) disabled.",
                ctx.store_domain
            ),
            serde_json::json!({ "store_domain": ctx.store_domain.as_str() }),
        )
        .await;

        Ok(RouteOutcome::action("store_disconnected"))
    }

    async fn handle_checkout_created(
        &self,
        ctx: &HandlerContext,
    ) -> Result<RouteOutcome, FlowError> {
        let checkout = parse_checkout(ctx)?;
        self.schedule_abandonment_check(ctx, &checkout).await?;
        Ok(RouteOutcome::action("abandoned_checkout_scheduled"))
    }

    async fn handle_checkout_updated(
        &self,
        ctx: &HandlerContext,
    ) -> Result<RouteOutcome, FlowError> {
        // Re-scheduling pushes the due time out: abandonment is measured
        // from the last checkout activity, not the first.
        let checkout = parse_checkout(ctx)?;
        self.schedule_abandonment_check(ctx, &checkout).await?;
        Ok(RouteOutcome::action("checkout_activity"))
    }

    async fn handle_checkout_deleted(
        &self,
        ctx: &HandlerContext,
    ) -> Result<RouteOutcome, FlowError> {
        let checkout = parse_checkout(ctx)?;
        let key = abandoned_checkout_key(&checkout_token(&checkout));
        let cancelled = self.jobs.cancel(&ctx.store_domain, &key).await?;
        Ok(RouteOutcome::action(if cancelled {
            "abandoned_checkout_cancelled"
        } else {
            "checkout_closed"
        }))
    }

    async fn schedule_abandonment_check(
        &self,
        ctx: &HandlerContext,
        checkout: &CheckoutPayload,
    ) -> Result<(), FlowError> {
        let job = NewJob {
            tenant_id: ctx.tenant_id,
            store_domain: ctx.store_domain.clone(),
            kind: JobKind::AbandonedCheckoutCheck,
            dedup_key: abandoned_checkout_key(&checkout_token(checkout)),
            payload: ctx.payload.clone(),
            due_at: OffsetDateTime::now_utc() + ABANDONED_CHECKOUT_DELAY,
        };
        let job_id = self.jobs.schedule(job).await?;
        tracing::debug!(
            job_id = %job_id,
            checkout_id = checkout.id,
            store = %ctx.store_domain,
            "Scheduled abandoned-checkout re-check"
        );
        Ok(())
    }

    async fn notify(
        &self,
        ctx: &HandlerContext,
        kind: NotificationKind,
        title: String,
        body: String,
        options: serde_json::Value,
    ) {
        let request = NotificationRequest {
            tenant_id: ctx.tenant_id,
            kind,
            title,
            body,
            options,
        };
        if let Err(err) = self.notifier.create_notification(request).await {
            self.reporter
                .report(
                    Some(ctx.tenant_id),
                    "notification_emitter",
                    ctx.topic.as_str(),
                    &err,
                    serde_json::json!({ "event_id": ctx.event_id }),
                )
                .await;
        }
    }
}

fn parse_order(ctx: &HandlerContext) -> Result<OrderPayload, FlowError> {
    serde_json::from_value(ctx.payload.clone())
        .map_err(|err| FlowError::validation(format!("malformed order payload: {err}")))
}

fn parse_checkout(ctx: &HandlerContext) -> Result<CheckoutPayload, FlowError> {
    serde_json::from_value(ctx.payload.clone())
        .map_err(|err| FlowError::validation(format!("malformed checkout payload: {err}")))
}

fn order_label(order: &OrderPayload) -> &str {
    order.name.as_deref().unwrap_or("order")
}

/// Checkouts without a token fall back to the numeric id.
fn checkout_token(checkout: &CheckoutPayload) -> String {
    checkout
        .token
        .clone()
        .unwrap_or_else(|| checkout.id.to_string())
}

fn abandoned_checkout_key(token: &str) -> String {
    format!("abandoned_checkout:{token}")
}
