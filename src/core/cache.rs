use crate::utils::error::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct CachedValue<T> {
    computed_at: Instant,
    value: Arc<T>,
}

/// 分析結果快取。TTL 為 0 時停用，每次請求都重新計算
///
/// Callers that arrive while a value is being computed wait on the lock and
/// reuse the fresh result instead of starting a second computation.
pub struct AnalysisCache<T> {
    ttl: Duration,
    slot: Mutex<Option<CachedValue<T>>>,
}

impl<T> AnalysisCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn get_or_try_compute<F, Fut>(&self, compute: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.is_enabled() {
            return compute().await.map(Arc::new);
        }

        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.computed_at.elapsed() < self.ttl {
                tracing::debug!("Serving cached analysis ({:?} old)", cached.computed_at.elapsed());
                return Ok(Arc::clone(&cached.value));
            }
        }

        let value = Arc::new(compute().await?);
        *slot = Some(CachedValue {
            computed_at: Instant::now(),
            value: Arc::clone(&value),
        });
        Ok(value)
    }
}
