use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use time::OffsetDateTime;
use uuid::Uuid;

const SUBSCRIPTION_COLUMNS: &str = "id, tenant_id, store_domain, topic, address, enabled, \
     created_at, last_triggered_at, trigger_count, metadata";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub store_domain: String,
    pub topic: String,
    pub address: String,
    pub enabled: bool,
    pub created_at: OffsetDateTime,
    pub last_triggered_at: Option<OffsetDateTime>,
    pub trigger_count: i64,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
/// Register a store's topic subscription, re-enabling and refreshing the
/// delivery address if it already exists.
pub struct UpsertSubscription {
    pub tenant_id: Uuid,
    pub store_domain: String,
    pub topic: String,
    pub address: String,
    pub metadata: serde_json::Value,
}

impl Processor<UpsertSubscription> for DatabaseProcessor {
    type Output = SubscriptionRecord;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertSubscription")]
    async fn process(&self, upsert: UpsertSubscription) -> Result<SubscriptionRecord, sqlx::Error> {
        let sql = format!(
            "INSERT INTO webhook_subscriptions \
                 (tenant_id, store_domain, topic, address, metadata) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (store_domain, topic) DO UPDATE \
                 SET address = EXCLUDED.address, \
                     metadata = EXCLUDED.metadata, \
                     enabled = TRUE \
             RETURNING {SUBSCRIPTION_COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionRecord>(&sql)
            .bind(upsert.tenant_id)
            .bind(&upsert.store_domain)
            .bind(&upsert.topic)
            .bind(&upsert.address)
            .bind(&upsert.metadata)
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Find the enabled subscription a delivery should be routed under.
pub struct FindEnabledSubscription {
    pub store_domain: String,
    pub topic: String,
}

impl Processor<FindEnabledSubscription> for DatabaseProcessor {
    type Output = Option<SubscriptionRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:FindEnabledSubscription")]
    async fn process(
        &self,
        query: FindEnabledSubscription,
    ) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM webhook_subscriptions \
             WHERE store_domain = $1 AND topic = $2 AND enabled"
        );
        sqlx::query_as::<_, SubscriptionRecord>(&sql)
            .bind(&query.store_domain)
            .bind(&query.topic)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Resolve the tenant that owns a store, from any of its subscriptions.
pub struct FindTenantForStore {
    pub store_domain: String,
}

impl Processor<FindTenantForStore> for DatabaseProcessor {
    type Output = Option<Uuid>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:FindTenantForStore")]
    async fn process(&self, query: FindTenantForStore) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT tenant_id FROM webhook_subscriptions WHERE store_domain = $1 LIMIT 1",
        )
        .bind(&query.store_domain)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Atomic increment of the denormalized trigger counter.
///
/// `trigger_count = trigger_count + 1` in SQL, so concurrent deliveries
/// for the same subscription never lose an update.
pub struct BumpTriggerCount {
    pub id: Uuid,
}

impl Processor<BumpTriggerCount> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:BumpTriggerCount")]
    async fn process(&self, bump: BumpTriggerCount) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE webhook_subscriptions \
             SET trigger_count = trigger_count + 1, last_triggered_at = now() \
             WHERE id = $1",
        )
        .bind(bump.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Disable every subscription for a store. Rows are kept for audit.
pub struct DisableStoreSubscriptions {
    pub store_domain: String,
}

impl Processor<DisableStoreSubscriptions> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DisableStoreSubscriptions")]
    async fn process(&self, disable: DisableStoreSubscriptions) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE webhook_subscriptions SET enabled = FALSE WHERE store_domain = $1 AND enabled",
        )
        .bind(&disable.store_domain)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
pub struct ListSubscriptions {
    pub limit: i64,
    pub offset: i64,
}

impl Processor<ListSubscriptions> for DatabaseProcessor {
    type Output = Vec<SubscriptionRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListSubscriptions")]
    async fn process(&self, query: ListSubscriptions) -> Result<Vec<SubscriptionRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM webhook_subscriptions \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, SubscriptionRecord>(&sql)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
    }
}
