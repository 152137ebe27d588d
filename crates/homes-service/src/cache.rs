//! Time-expiring loading cache with single-flight loads.
//!
//! Each key is either a ready value stamped with its write time or an
//! in-flight load. Concurrent `get`s of a missing key wait for the one
//! loader instead of hitting storage again. Expiry is lazy; `cleanup`
//! sweeps whatever expired without being read.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

type Loader<K, V, E> = Box<dyn Fn(&K) -> Result<V, E> + Send + Sync>;

enum FlightState<V, E> {
    Pending,
    Done(Result<V, E>),
    /// The loader unwound; waiters retry.
    Abandoned,
}

struct InFlight<V, E> {
    state: Mutex<FlightState<V, E>>,
    ready: Condvar,
}

impl<V: Clone, E: Clone> InFlight<V, E> {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Pending),
            ready: Condvar::new(),
        }
    }

    fn finish(&self, state: FlightState<V, E>) {
        *self.state.lock() = state;
        self.ready.notify_all();
    }

    /// `None` when the load was abandoned.
    fn wait(&self) -> Option<Result<V, E>> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                FlightState::Pending => self.ready.wait(&mut state),
                FlightState::Done(result) => return Some(result.clone()),
                FlightState::Abandoned => return None,
            }
        }
    }
}

enum Slot<V, E> {
    Ready { value: V, written_at: Instant },
    Loading(Arc<InFlight<V, E>>),
}

enum Claim<V, E> {
    Hit(V),
    Wait(Arc<InFlight<V, E>>),
    Load(Arc<InFlight<V, E>>),
}

/// Releases waiters if the loader panics.
struct LoadGuard<'a, K: Eq + Hash, V: Clone, E: Clone> {
    cache: &'a LoadingCache<K, V, E>,
    key: &'a K,
    flight: Arc<InFlight<V, E>>,
    armed: bool,
}

impl<K: Eq + Hash, V: Clone, E: Clone> Drop for LoadGuard<'_, K, V, E> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.remove_if_current(self.key, &self.flight);
            self.flight.finish(FlightState::Abandoned);
        }
    }
}

/// A cache that loads missing keys through its loader.
///
/// Errors are handed to every waiter of that load but never stored.
pub struct LoadingCache<K, V, E> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V, E>>>,
    loader: Loader<K, V, E>,
}

impl<K, V, E> LoadingCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    /// Entries expire `ttl` after they were written.
    pub fn new<F>(ttl: Duration, loader: F) -> Self
    where
        F: Fn(&K) -> Result<V, E> + Send + Sync + 'static,
    {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
            loader: Box::new(loader),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the value for `key`, loading it if missing or expired.
    ///
    /// Blocks while another thread loads the same key.
    pub fn get(&self, key: &K) -> Result<V, E> {
        loop {
            match self.claim(key) {
                Claim::Hit(value) => return Ok(value),
                Claim::Wait(flight) => {
                    if let Some(result) = flight.wait() {
                        return result;
                    }
                }
                Claim::Load(flight) => return self.load(key, flight),
            }
        }
    }

    /// The cached value, if present and fresh. Never loads.
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        match self.slots.lock().get(key) {
            Some(Slot::Ready { value, written_at }) if written_at.elapsed() < self.ttl => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    /// Store a value directly, replacing any entry or in-flight load.
    pub fn put(&self, key: K, value: V) {
        self.slots.lock().insert(
            key,
            Slot::Ready {
                value,
                written_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for `key`.
    ///
    /// A load in flight for `key` still answers its waiters, but its result
    /// is not installed.
    pub fn invalidate(&self, key: &K) {
        self.slots.lock().remove(key);
    }

    pub fn invalidate_all(&self) {
        self.slots.lock().clear();
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| match slot {
            Slot::Ready { written_at, .. } => written_at.elapsed() < self.ttl,
            Slot::Loading(_) => true,
        });
        before - slots.len()
    }

    /// Number of entries, counting in-flight loads and unswept expired ones.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn claim(&self, key: &K) -> Claim<V, E> {
        let mut slots = self.slots.lock();
        match slots.get(key) {
            Some(Slot::Ready { value, written_at }) if written_at.elapsed() < self.ttl => {
                return Claim::Hit(value.clone());
            }
            Some(Slot::Loading(flight)) => return Claim::Wait(Arc::clone(flight)),
            _ => {}
        }
        let flight = Arc::new(InFlight::new());
        slots.insert(key.clone(), Slot::Loading(Arc::clone(&flight)));
        Claim::Load(flight)
    }

    fn load(&self, key: &K, flight: Arc<InFlight<V, E>>) -> Result<V, E> {
        let mut guard = LoadGuard {
            cache: self,
            key,
            flight,
            armed: true,
        };

        let result = (self.loader)(key);

        {
            let mut slots = self.slots.lock();
            let current = matches!(
                slots.get(key),
                Some(Slot::Loading(flight)) if Arc::ptr_eq(flight, &guard.flight)
            );
            if current {
                match &result {
                    Ok(value) => {
                        slots.insert(
                            key.clone(),
                            Slot::Ready {
                                value: value.clone(),
                                written_at: Instant::now(),
                            },
                        );
                    }
                    Err(_) => {
                        slots.remove(key);
                    }
                }
            }
        }

        guard.armed = false;
        guard.flight.finish(FlightState::Done(result.clone()));
        result
    }
}

impl<K: Eq + Hash, V: Clone, E: Clone> LoadingCache<K, V, E> {
    fn remove_if_current(&self, key: &K, flight: &Arc<InFlight<V, E>>) {
        let mut slots = self.slots.lock();
        if matches!(slots.get(key), Some(Slot::Loading(current)) if Arc::ptr_eq(current, flight))
        {
            slots.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    fn counting_cache(
        ttl: Duration,
        delay: Duration,
    ) -> (Arc<LoadingCache<u32, String, String>>, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let cache = LoadingCache::new(ttl, move |key: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(delay);
            if *key == 0 {
                Err("zero".to_string())
            } else {
                Ok(format!("value-{key}"))
            }
        });
        (Arc::new(cache), loads)
    }

    #[test]
    fn loads_once_then_hits() {
        let (cache, loads) = counting_cache(Duration::from_secs(60), Duration::ZERO);

        assert_eq!(cache.get(&1).unwrap(), "value-1");
        assert_eq!(cache.get(&1).unwrap(), "value-1");
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get_if_present(&1).as_deref(), Some("value-1"));
    }

    #[test]
    fn concurrent_misses_share_one_load() {
        let (cache, loads) = counting_cache(Duration::from_secs(60), Duration::from_millis(100));
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get(&7)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), "value-7");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn errors_reach_every_waiter_and_are_not_cached() {
        let (cache, loads) = counting_cache(Duration::from_secs(60), Duration::from_millis(50));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get(&0)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap_err(), "zero");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());

        assert!(cache.get(&0).is_err());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let (cache, loads) = counting_cache(Duration::from_millis(30), Duration::ZERO);

        cache.get(&1).unwrap();
        thread::sleep(Duration::from_millis(60));
        assert!(cache.get_if_present(&1).is_none());

        cache.get(&1).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cleanup_sweeps_expired_entries() {
        let (cache, _) = counting_cache(Duration::from_millis(30), Duration::ZERO);
        cache.get(&1).unwrap();
        cache.get(&2).unwrap();
        assert_eq!(cache.len(), 2);

        thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.cleanup(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_forces_reload() {
        let (cache, loads) = counting_cache(Duration::from_secs(60), Duration::ZERO);
        cache.get(&1).unwrap();
        cache.get(&2).unwrap();

        cache.invalidate(&1);
        assert!(cache.get_if_present(&1).is_none());
        assert!(cache.get_if_present(&2).is_some());
        cache.get(&1).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 3);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidation_during_load_discards_result() {
        let (cache, loads) = counting_cache(Duration::from_secs(60), Duration::from_millis(100));

        let loader = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get(&3))
        };
        thread::sleep(Duration::from_millis(30));
        cache.invalidate(&3);

        assert_eq!(loader.join().unwrap().unwrap(), "value-3");
        assert!(cache.get_if_present(&3).is_none());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn put_replaces_value() {
        let (cache, loads) = counting_cache(Duration::from_secs(60), Duration::ZERO);
        cache.put(5, "manual".to_string());
        assert_eq!(cache.get(&5).unwrap(), "manual");
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_loader_releases_key() {
        let cache: LoadingCache<u32, u32, ()> = LoadingCache::new(Duration::from_secs(60), |key| {
            if *key == 1 {
                panic!("loader failed");
            }
            Ok(*key)
        });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cache.get(&1)));
        assert!(outcome.is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.get(&2), Ok(2));
    }
}
