use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use time::OffsetDateTime;

#[derive(Debug, Clone)]
/// Write-through of a successful primary result for later fallback.
///
/// `expires_at` is the single source of freshness: it is computed once
/// at write time and compared against `now()` at read time.
pub struct UpsertCacheEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub expires_at: Option<OffsetDateTime>,
}

impl Processor<UpsertCacheEntry> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertCacheEntry")]
    async fn process(&self, upsert: UpsertCacheEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (cache_key, value, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (cache_key) DO UPDATE
                SET value = EXCLUDED.value,
                    expires_at = EXCLUDED.expires_at,
                    updated_at = now()
            "#,
        )
        .bind(&upsert.key)
        .bind(&upsert.value)
        .bind(upsert.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Read a cached value that has not yet expired.
pub struct GetFreshCacheEntry {
    pub key: String,
}

impl Processor<GetFreshCacheEntry> for DatabaseProcessor {
    type Output = Option<serde_json::Value>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetFreshCacheEntry")]
    async fn process(
        &self,
        query: GetFreshCacheEntry,
    ) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT value FROM cache_entries \
             WHERE cache_key = $1 AND (expires_at IS NULL OR expires_at > now())",
        )
        .bind(&query.key)
        .fetch_optional(&self.pool)
        .await
    }
}
