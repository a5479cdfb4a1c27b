//! In-memory program cache.
//!
//! Programs are keyed by everything that changes the compiled binary: the
//! device, the routine, the precision, the full resolved parameter set and a
//! hash of the source text. Each key owns a slot guarded by its own mutex, so
//! concurrent requests for one key compile once while other keys proceed.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use crate::database::ParameterSet;
use crate::runtime::DeviceKey;
use crate::types::Precision;

/// 64-bit FNV-1a over the program source.
pub fn source_hash(source: &str) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    source
        .bytes()
        .fold(FNV_OFFSET_BASIS, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub device: DeviceKey,
    pub routine: String,
    pub precision: Precision,
    pub parameters: ParameterSet,
    pub source_hash: u64,
}

type Slot<P> = Arc<Mutex<Option<Arc<P>>>>;

/// Compiled programs of one context. No eviction.
pub struct ProgramCache<P> {
    slots: Mutex<HashMap<ProgramKey, Slot<P>>>,
    compilations: AtomicUsize,
}

impl<P> Default for ProgramCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ProgramCache<P> {
    pub fn new() -> Self {
        ProgramCache { slots: Mutex::new(HashMap::new()), compilations: AtomicUsize::new(0) }
    }

    /// Returns the cached program for `key`, compiling it on a miss.
    ///
    /// Callers racing on the same key wait for the first compilation and share
    /// its result. A failed compilation stores nothing, so the next caller
    /// tries again.
    pub fn get_or_compile<E>(
        &self,
        key: &ProgramKey,
        compile: impl FnOnce() -> Result<P, E>,
    ) -> Result<Arc<P>, E> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(program) = guard.as_ref() {
            log::trace!("program cache hit: {} {} on {}", key.routine, key.precision, key.device);
            return Ok(Arc::clone(program));
        }

        log::debug!(
            "program cache miss: {} {} on {} (source {:016x})",
            key.routine,
            key.precision,
            key.device,
            key.source_hash
        );
        self.compilations.fetch_add(1, Ordering::Relaxed);
        match compile() {
            Ok(program) => {
                let program = Arc::new(program);
                *guard = Some(Arc::clone(&program));
                drop(guard);
                // a failed compilation before ours may have dropped the slot
                let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
                slots.entry(key.clone()).or_insert(slot);
                Ok(program)
            }
            Err(e) => {
                drop(guard);
                self.remove_if_empty(key, &slot);
                Err(e)
            }
        }
    }

    /// Drops the slot of a failed compilation unless another caller already
    /// holds it; that caller compiles again and owns the slot from here on.
    fn remove_if_empty(&self, key: &ProgramKey, slot: &Slot<P>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if !slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            return;
        }
        let empty = match slot.try_lock() {
            Ok(guard) => guard.is_none(),
            Err(TryLockError::Poisoned(e)) => e.into_inner().is_none(),
            Err(TryLockError::WouldBlock) => false,
        };
        if empty {
            slots.remove(key);
        }
    }

    pub fn get(&self, key: &ProgramKey) -> Option<Arc<P>> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.get(key)?)
        };
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Number of compiled programs held.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot<P>> =
            self.slots.lock().unwrap_or_else(PoisonError::into_inner).values().cloned().collect();
        slots
            .iter()
            .filter(|s| s.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Compilations attempted so far, failed ones included.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DeviceType;

    fn key(routine: &str, wgs: usize) -> ProgramKey {
        ProgramKey {
            device: DeviceKey { device_type: DeviceType::Gpu, vendor: "AMD".into(), name: "Hawaii".into() },
            routine: routine.to_string(),
            precision: Precision::Single,
            parameters: [("WGS", wgs)].into_iter().collect(),
            source_hash: source_hash(routine),
        }
    }

    #[test]
    fn test_hit_after_miss() {
        let cache: ProgramCache<String> = ProgramCache::new();
        let a = cache.get_or_compile::<()>(&key("Xaxpy", 64), || Ok("bin".into())).unwrap();
        let b = cache
            .get_or_compile::<()>(&key("Xaxpy", 64), || panic!("must not recompile"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.compilations(), 1);
    }

    #[test]
    fn test_distinct_parameters_are_distinct_entries() {
        let cache: ProgramCache<usize> = ProgramCache::new();
        cache.get_or_compile::<()>(&key("Xaxpy", 64), || Ok(1)).unwrap();
        cache.get_or_compile::<()>(&key("Xaxpy", 128), || Ok(2)).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("Xaxpy", 128)).as_deref(), Some(&2));
    }

    #[test]
    fn test_failure_leaves_no_entry() {
        let cache: ProgramCache<usize> = ProgramCache::new();
        let err = cache.get_or_compile(&key("Xdot", 64), || Err("boom")).unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());
        assert!(cache.get(&key("Xdot", 64)).is_none());
        let ok = cache.get_or_compile::<&str>(&key("Xdot", 64), || Ok(7)).unwrap();
        assert_eq!(*ok, 7);
        assert_eq!(cache.compilations(), 2);
    }

    #[test]
    fn test_slow_compile_does_not_block_other_keys() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::{Duration, Instant};

        let cache: ProgramCache<usize> = ProgramCache::new();
        let cache = &cache;
        let (started, compiling) = mpsc::channel();
        thread::scope(|s| {
            s.spawn(move || {
                cache
                    .get_or_compile::<()>(&key("Xgemv", 64), || {
                        started.send(()).unwrap();
                        thread::sleep(Duration::from_millis(400));
                        Ok(1)
                    })
                    .unwrap();
            });
            compiling.recv().unwrap();
            // waits on the slow slot without holding the map
            let counter = s.spawn(move || cache.len());
            thread::sleep(Duration::from_millis(50));

            let start = Instant::now();
            cache.get_or_compile::<()>(&key("Xaxpy", 64), || Ok(2)).unwrap();
            assert!(start.elapsed() < Duration::from_millis(200), "took {:?}", start.elapsed());
            assert_eq!(cache.get(&key("Xaxpy", 64)).as_deref(), Some(&2));
            assert!(counter.join().unwrap() >= 1);
        });
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failure_keeps_slot_of_waiting_caller() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let cache: ProgramCache<usize> = ProgramCache::new();
        let cache = &cache;
        let (started, compiling) = mpsc::channel();
        thread::scope(|s| {
            let first = s.spawn(move || {
                cache.get_or_compile(&key("Xdot", 64), || {
                    started.send(()).unwrap();
                    thread::sleep(Duration::from_millis(100));
                    Err("boom")
                })
            });
            compiling.recv().unwrap();
            let second = cache.get_or_compile::<&str>(&key("Xdot", 64), || Ok(3)).unwrap();
            assert_eq!(*second, 3);
            assert_eq!(first.join().unwrap().unwrap_err(), "boom");
        });
        assert_eq!(cache.get(&key("Xdot", 64)).as_deref(), Some(&3));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache: ProgramCache<usize> = ProgramCache::new();
        cache.get_or_compile::<()>(&key("Xaxpy", 64), || Ok(1)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_source_hash_is_stable() {
        assert_eq!(source_hash(""), 0xcbf29ce484222325);
        assert_ne!(source_hash("#define WGS 64"), source_hash("#define WGS 128"));
    }
}
