use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Key/value store where every entry dies `ttl` after it was written.
///
/// Expiry is enforced on read and stale entries are evicted right there;
/// there is no background sweep and no capacity bound. Callers own the
/// instance and serialize access themselves (the service layer keeps each
/// cache behind a `tokio::sync::Mutex`).
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&mut self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fixed-window rate gate: one admission per key per window, everything
/// else inside the window is rejected outright (no token bucket, no
/// smoothing). Rejections do not touch the stored timestamp.
pub struct Cooldown {
    marks: HashMap<String, Instant>,
    window: Duration,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            marks: HashMap::new(),
            window,
        }
    }

    pub fn try_admit(&mut self, key: &str) -> bool {
        let now = Instant::now();
        if let Some(last) = self.marks.get(key) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }
        self.marks.insert(key.to_string(), now);
        true
    }

    /// Time left before `key` would be admitted again. `None` means a call
    /// to `try_admit` would succeed right now.
    pub fn remaining(&self, key: &str) -> Option<Duration> {
        let last = self.marks.get(key)?;
        let elapsed = last.elapsed();
        if elapsed < self.window {
            Some(self.window - elapsed)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_what_set_stored() {
        let mut cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(600));
        cache.set("rank:123".to_string(), 7);
        assert_eq!(cache.get(&"rank:123".to_string()), Some(7));
        assert_eq!(cache.get(&"rank:456".to_string()), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let mut cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(20));
        cache.set("k".to_string(), 1);
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&"k".to_string()), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_set_refreshes_expiry() {
        let mut cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(50));
        cache.set("k".to_string(), 1);
        std::thread::sleep(Duration::from_millis(30));
        cache.set("k".to_string(), 2);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get(&"k".to_string()), Some(2));
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(600));
        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cooldown_admits_once_per_window() {
        let mut gate = Cooldown::new(Duration::from_millis(50));
        assert!(gate.try_admit("user:1"));
        assert!(!gate.try_admit("user:1"));
        assert!(gate.remaining("user:1").is_some());
        std::thread::sleep(Duration::from_millis(60));
        assert!(gate.try_admit("user:1"));
    }

    #[test]
    fn test_cooldown_keys_do_not_interfere() {
        let mut gate = Cooldown::new(Duration::from_secs(5));
        assert!(gate.try_admit("user:1"));
        assert!(gate.try_admit("user:2"));
        assert!(!gate.try_admit("user:1"));
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let mut gate = Cooldown::new(Duration::from_millis(50));
        assert!(gate.try_admit("k"));
        std::thread::sleep(Duration::from_millis(30));
        // Rejected, but the original mark must stay in place.
        assert!(!gate.try_admit("k"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(gate.try_admit("k"));
    }
}
