//! TTL cache for resolved API keys with an injectable clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(15 * 60);

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CachedKey {
    value: String,
    loaded_at: Instant,
}

pub struct ApiKeyCache {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedKey>>,
}

impl ApiKeyCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `name`, or run `loader` and cache its
    /// result. Failed loads are not cached.
    pub fn get_or_load<E>(
        &self,
        name: &str,
        loader: impl FnOnce() -> Result<String, E>,
    ) -> Result<String, E> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = entries.get(name)
            && now.saturating_duration_since(entry.loaded_at) < self.ttl
        {
            return Ok(entry.value.clone());
        }

        debug!(key = name, "loading API key");
        let value = loader()?;
        entries.insert(
            name.to_string(),
            CachedKey {
                value: value.clone(),
                loaded_at: now,
            },
        );
        Ok(value)
    }

    pub fn invalidate(&self, name: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct ManualClock {
        start: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                start: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            })
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + *self.offset.lock().unwrap()
        }
    }

    fn counting_loader<'a>(
        calls: &'a Cell<u32>,
        value: &'a str,
    ) -> impl FnOnce() -> Result<String, String> + 'a {
        move || {
            calls.set(calls.get() + 1);
            Ok(value.to_string())
        }
    }

    #[test]
    fn test_cached_until_ttl_expires() {
        let clock = ManualClock::new();
        let cache = ApiKeyCache::with_clock(Duration::from_secs(60), clock.clone());
        let calls = Cell::new(0);

        assert_eq!(cache.get_or_load("FAL_KEY", counting_loader(&calls, "a")), Ok("a".into()));
        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get_or_load("FAL_KEY", counting_loader(&calls, "b")), Ok("a".into()));
        assert_eq!(calls.get(), 1);

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get_or_load("FAL_KEY", counting_loader(&calls, "b")), Ok("b".into()));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let cache = ApiKeyCache::with_clock(Duration::from_secs(60), ManualClock::new());
        let calls = Cell::new(0);

        cache.get_or_load("A", counting_loader(&calls, "1")).unwrap();
        cache.get_or_load("B", counting_loader(&calls, "2")).unwrap();
        cache.invalidate("A");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_or_load("A", counting_loader(&calls, "3")), Ok("3".into()));
        assert_eq!(cache.get_or_load("B", counting_loader(&calls, "4")), Ok("2".into()));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache = ApiKeyCache::new(Duration::from_secs(60));
        let err: Result<String, &str> = cache.get_or_load("MISSING", || Err("unset"));
        assert_eq!(err, Err("unset"));
        assert!(cache.is_empty());
    }
}
