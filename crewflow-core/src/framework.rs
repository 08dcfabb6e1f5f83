use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Executes entity messages against the shared connection pool.
///
/// Every database operation in this crate is a message struct with a
/// `kanau::processor::Processor` implementation on this type, so call
/// sites read as `processor.process(MarkEventProcessed { .. })`.
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Clone for DatabaseProcessor {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

/// Build the connection pool shared by the server and the background
/// processors.
pub async fn connect_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
