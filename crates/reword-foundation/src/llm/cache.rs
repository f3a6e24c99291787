//! Prompt-keyed completion cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reword_kernel::{CompletionGateway, GenerationResult, Role};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_MAX_ENTRIES: usize = 1024;

struct CachedCompletion {
    text: String,
    stored_at: Instant,
}

/// Decorator that memoizes successful completions by `(role, prompt)`.
///
/// Failures are never cached. A miss goes straight to the inner gateway, so
/// cancellation behaves exactly as it does without the cache.
pub struct CachedGateway {
    inner: Arc<dyn CompletionGateway>,
    ttl: Duration,
    max_entries: usize,
    entries: DashMap<(Role, String), CachedCompletion>,
}

impl CachedGateway {
    pub fn new(inner: Arc<dyn CompletionGateway>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
            entries: DashMap::new(),
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, key: &(Role, String)) -> Option<String> {
        let entry = self.entries.get(key)?;
        (entry.stored_at.elapsed() < self.ttl).then(|| entry.text.clone())
    }

    fn store(&self, key: (Role, String), text: String) {
        if self.entries.len() >= self.max_entries {
            let ttl = self.ttl;
            self.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        }
        if self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.stored_at)
                .map(|entry| entry.key().clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            key,
            CachedCompletion {
                text,
                stored_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl CompletionGateway for CachedGateway {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        role: Role,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> GenerationResult<String> {
        let key = (role, prompt.to_string());
        if let Some(text) = self.lookup(&key) {
            debug!(%role, "completion cache hit");
            return Ok(text);
        }

        let text = self.inner.complete(role, prompt, cancel).await?;
        self.store(key, text.clone());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGateway;
    use reword_kernel::GenerationError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_gateway() -> (Arc<ScriptedGateway>, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let gateway = Arc::new(ScriptedGateway::new(move |role, prompt| {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{role}:{prompt}:{n}"))
        }));
        (gateway, counter)
    }

    #[tokio::test(start_paused = true)]
    async fn hits_until_ttl_expires() {
        let (inner, calls) = counting_gateway();
        let cache = CachedGateway::new(inner, Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let first = cache.complete(Role::Moderator, "p", &cancel).await.unwrap();
        let second = cache.complete(Role::Moderator, "p", &cancel).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        let third = cache.complete(Role::Moderator, "p", &cancel).await.unwrap();
        assert_ne!(first, third);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn key_includes_role() {
        let (inner, calls) = counting_gateway();
        let cache = CachedGateway::new(inner, Duration::from_secs(60));
        let cancel = CancellationToken::new();

        cache.complete(Role::Moderator, "p", &cancel).await.unwrap();
        cache.complete(Role::Assistant, "p", &cancel).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let inner = Arc::new(ScriptedGateway::new(move |_, _| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(GenerationError::Unreachable("blip".into()))
            } else {
                Ok("ok".into())
            }
        }));
        let cache = CachedGateway::new(inner, Duration::from_secs(60));
        let cancel = CancellationToken::new();

        assert!(cache.complete(Role::Assistant, "p", &cancel).await.is_err());
        assert_eq!(cache.complete(Role::Assistant, "p", &cancel).await.unwrap(), "ok");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn capacity_evicts_oldest() {
        let (inner, _) = counting_gateway();
        let cache = CachedGateway::new(inner, Duration::from_secs(60)).with_max_entries(2);
        let cancel = CancellationToken::new();

        for prompt in ["a", "b", "c"] {
            cache.complete(Role::Assistant, prompt, &cancel).await.unwrap();
        }
        assert_eq!(cache.len(), 2);
    }
}
