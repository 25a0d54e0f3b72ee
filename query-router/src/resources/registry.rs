//! Per-tenant lazy resource registry
//!
//! Each tenant key owns one slot. Slots are created atomically in a sharded
//! map, and the resource inside a slot is built at most once: concurrent
//! callers for the same key wait on the slot's cell, callers for other keys
//! never touch it. A failed construction leaves the cell empty so the next
//! caller builds from scratch.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::OnceCell;

use crate::error::RouterError;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Sanitized tenant identifier, safe to use as a schema or index name.
///
/// Only ASCII letters, digits and `_`; always starts with a letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantKey(String);

impl TenantKey {
    pub fn parse(raw: &str) -> Result<Self, RouterError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RouterError::InvalidTenant("tenant id is empty".to_string()));
        }

        let mut key = UNSAFE_CHARS.replace_all(raw, "_").into_owned();
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            key.insert_str(0, "p_");
        }
        Ok(TenantKey(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

type Slot<T> = Arc<OnceCell<Arc<T>>>;

pub struct ResourceRegistry<T> {
    kind: &'static str,
    slots: DashMap<TenantKey, Slot<T>>,
}

impl<T> ResourceRegistry<T>
where
    T: Send + Sync,
{
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: DashMap::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Cached resource for `key`, building it with `constructor` on first use.
    ///
    /// Errors from `constructor` come back as [`RouterError::Construction`]
    /// and are not retried here.
    pub async fn get_or_create<F, Fut>(&self, key: &TenantKey, constructor: F) -> Result<Arc<T>, RouterError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RouterError>>,
    {
        // The shard guard is released at the end of this statement, so
        // construction below never holds the map lock.
        let slot: Slot<T> = self.slots.entry(key.clone()).or_default().clone();

        let handle = slot
            .get_or_try_init(|| async {
                log::info!("[REGISTRY] Constructing {} for tenant '{}'", self.kind, key);
                match constructor().await {
                    Ok(resource) => Ok(Arc::new(resource)),
                    Err(e) => {
                        log::error!("[REGISTRY] {} for tenant '{}' failed: {}", self.kind, key, e);
                        Err(RouterError::Construction {
                            kind: self.kind,
                            tenant: key.to_string(),
                            source: Box::new(e),
                        })
                    }
                }
            })
            .await?;

        Ok(Arc::clone(handle))
    }

    /// Already-constructed resource, without building one
    pub fn get(&self, key: &TenantKey) -> Option<Arc<T>> {
        self.slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Number of tenants with a constructed resource
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[test]
    fn test_tenant_key_sanitization() {
        assert_eq!(TenantKey::parse("proj42").unwrap().as_str(), "proj42");
        assert_eq!(TenantKey::parse("my-proj.1").unwrap().as_str(), "my_proj_1");
        assert_eq!(TenantKey::parse("42abc").unwrap().as_str(), "p_42abc");
        assert_eq!(TenantKey::parse("_x").unwrap().as_str(), "p__x");
        assert_eq!(TenantKey::parse(" Proj 7 ").unwrap().as_str(), "Proj_7");
        assert!(matches!(TenantKey::parse("  "), Err(RouterError::InvalidTenant(_))));
    }

    #[test]
    fn test_equivalent_raw_ids_share_a_key() {
        assert_eq!(TenantKey::parse("a-b").unwrap(), TenantKey::parse("a.b").unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_constructs_once() {
        let registry = Arc::new(ResourceRegistry::<String>::new("test resource"));
        let constructions = Arc::new(AtomicUsize::new(0));
        let key = TenantKey::parse("proj42").unwrap();

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            let constructions = Arc::clone(&constructions);
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                registry
                    .get_or_create(&key, || async {
                        constructions.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok("handle".to_string())
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_keys_do_not_block() {
        let registry = Arc::new(ResourceRegistry::<String>::new("test resource"));
        let b_done = Arc::new(Notify::new());

        // A's construction only finishes once B's has, which deadlocks if
        // the two keys share a lock.
        let slow = {
            let registry = Arc::clone(&registry);
            let b_done = Arc::clone(&b_done);
            tokio::spawn(async move {
                let key = TenantKey::parse("tenant_a").unwrap();
                registry
                    .get_or_create(&key, || async move {
                        b_done.notified().await;
                        Ok("a".to_string())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;

        let key_b = TenantKey::parse("tenant_b").unwrap();
        let b = tokio::time::timeout(
            Duration::from_secs(2),
            registry.get_or_create(&key_b, || async { Ok("b".to_string()) }),
        )
        .await
        .expect("tenant_b blocked behind tenant_a")
        .unwrap();
        assert_eq!(b.as_str(), "b");
        b_done.notify_one();

        let a = tokio::time::timeout(Duration::from_secs(2), slow)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(a.as_str(), "a");
    }

    #[tokio::test]
    async fn test_failed_construction_leaves_slot_empty() {
        let registry = ResourceRegistry::<String>::new("test resource");
        let key = TenantKey::parse("proj42").unwrap();

        let err = registry
            .get_or_create(&key, || async { Err(RouterError::retryable("connection refused")) })
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Construction { kind: "test resource", .. }));
        assert!(err.is_retryable());
        assert!(registry.get(&key).is_none());
        assert!(registry.is_empty());

        let handle = registry
            .get_or_create(&key, || async { Ok("second try".to_string()) })
            .await
            .unwrap();
        assert_eq!(handle.as_str(), "second try");
        assert!(registry.get(&key).is_some());
    }

    #[tokio::test]
    async fn test_cached_handle_skips_constructor() {
        let registry = ResourceRegistry::<u32>::new("counter");
        let key = TenantKey::parse("proj42").unwrap();

        let first = registry.get_or_create(&key, || async { Ok(1) }).await.unwrap();
        let second = registry
            .get_or_create(&key, || async { Err(RouterError::upstream("should not run")) })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
