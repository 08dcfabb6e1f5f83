//! Graceful degradation: secondary operations and cached fallbacks.

use std::future::Future;
use std::time::Duration;

use crate::error::FlowError;
use crate::stores::CacheStore;

/// Try `primary`; on failure run `secondary`, optionally after a fixed
/// delay. The primary's error is logged and replaced by whatever the
/// secondary produces.
pub async fn with_fallback<T, P, PFut, S, SFut>(
    primary: P,
    secondary: S,
    delay: Option<Duration>,
) -> Result<T, FlowError>
where
    P: FnOnce() -> PFut,
    PFut: Future<Output = Result<T, FlowError>>,
    S: FnOnce() -> SFut,
    SFut: Future<Output = Result<T, FlowError>>,
{
    match primary().await {
        Ok(value) => Ok(value),
        Err(primary_err) => {
            tracing::warn!(error = %primary_err, "Primary operation failed, running fallback");
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            secondary().await
        }
    }
}

/// Try `primary`; persist its result under `key` on success, serve the
/// last cached value on failure while one is still fresh.
///
/// When no fresh cache entry exists the *original* error propagates —
/// cache trouble never masks the primary failure.
pub async fn with_cached_fallback<T, F, Fut>(
    cache: &dyn CacheStore,
    key: &str,
    max_age: Option<Duration>,
    primary: F,
) -> Result<T, FlowError>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, FlowError>>,
{
    match primary().await {
        Ok(value) => {
            match serde_json::to_value(&value) {
                Ok(json) => {
                    if let Err(err) = cache.put(key, json, max_age).await {
                        tracing::warn!(key, error = %err, "Failed to cache primary result");
                    }
                }
                Err(err) => {
                    tracing::warn!(key, error = %err, "Primary result is not cacheable");
                }
            }
            Ok(value)
        }
        Err(primary_err) => match cache.get_fresh(key).await {
            Ok(Some(json)) => match serde_json::from_value(json) {
                Ok(value) => {
                    tracing::warn!(
                        key,
                        error = %primary_err,
                        "Primary operation failed, serving cached value"
                    );
                    Ok(value)
                }
                Err(decode_err) => {
                    tracing::error!(key, error = %decode_err, "Cached value failed to decode");
                    Err(primary_err)
                }
            },
            Ok(None) => Err(primary_err),
            Err(cache_err) => {
                tracing::error!(key, error = %cache_err, "Cache lookup failed during fallback");
                Err(primary_err)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::stores::MemoryStore;

    #[tokio::test]
    async fn fallback_runs_secondary_on_primary_failure() {
        let result = with_fallback(
            || async { Err::<i32, _>(FlowError::network("down")) },
            || async { Ok(7) },
            None,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn fallback_skips_secondary_on_primary_success() {
        let result = with_fallback(
            || async { Ok::<i32, FlowError>(1) },
            || async { Ok(2) },
            None,
        )
        .await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn cached_fallback_stores_and_serves() {
        let cache = MemoryStore::new();

        let first = with_cached_fallback(&cache, "inventory:42", None, || async {
            Ok::<_, FlowError>(vec![1u32, 2, 3])
        })
        .await;
        assert_eq!(first.unwrap(), vec![1, 2, 3]);

        let second: Result<Vec<u32>, _> =
            with_cached_fallback(&cache, "inventory:42", None, || async {
                Err(FlowError::timeout("upstream slow"))
            })
            .await;
        assert_eq!(second.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn cached_fallback_propagates_without_a_fresh_entry() {
        let cache = MemoryStore::new();
        let result: Result<Vec<u32>, _> =
            with_cached_fallback(&cache, "inventory:missing", None, || async {
                Err(FlowError::timeout("upstream slow"))
            })
            .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn expired_entries_do_not_serve() {
        let cache = MemoryStore::new();

        let warm = with_cached_fallback(
            &cache,
            "rates",
            Some(Duration::from_millis(1)),
            || async { Ok::<_, FlowError>(100u64) },
        )
        .await;
        assert_eq!(warm.unwrap(), 100);

        tokio::time::sleep(Duration::from_millis(10)).await;

        let stale: Result<u64, _> = with_cached_fallback(
            &cache,
            "rates",
            Some(Duration::from_millis(1)),
            || async { Err(FlowError::network("down")) },
        )
        .await;
        assert_eq!(stale.unwrap_err().kind, ErrorKind::Network);
    }
}
