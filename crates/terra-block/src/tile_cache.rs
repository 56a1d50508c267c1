//! `TileCache` (§4.3, §5): an LRU byte-budgeted cache of materialized block
//! payloads, generalized from `vfx-compute::backend::cache::RegionCache` to
//! add the refcounted pin/evict semantics a concurrent block rasterizer
//! needs (a tile a worker thread is actively reading must not be evicted
//! out from under it) — a concern `RegionCache` never had to deal with,
//! since its callers were all single-threaded.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::error::Result;

/// Identifies one cached block: which resource/plane it belongs to and its
/// grid-aligned origin and size. Distinct block sizes at the same origin are
/// distinct entries, since a cache is only ever populated by one
/// `BlockRasterizeView` using one fixed block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub resource_id: u64,
    pub plane: i64,
    pub block_col: i64,
    pub block_row: i64,
    pub block_width: i64,
    pub block_height: i64,
}

/// Produces the bytes for a tile on demand. Implementations run outside the
/// cache's lock, so they may be slow (a full block rasterize).
pub trait TileGenerator: Send + Sync {
    fn size_bytes(&self) -> u64;
    fn generate(&self) -> Result<Vec<u8>>;
}

enum EntryState {
    Pending(Arc<dyn TileGenerator>),
    Ready(Arc<Vec<u8>>),
}

struct Entry {
    state: EntryState,
    size_bytes: u64,
    pin_count: usize,
}

struct Inner {
    entries: HashMap<TileKey, Entry>,
    /// LRU order among materialized (`Ready`) entries; front is least
    /// recently used.
    access_order: VecDeque<TileKey>,
    total_bytes: u64,
    budget_bytes: u64,
    hits: u64,
    misses: u64,
}

impl Inner {
    fn touch(&mut self, key: TileKey) {
        if let Some(pos) = self.access_order.iter().position(|k| *k == key) {
            self.access_order.remove(pos);
        }
        self.access_order.push_back(key);
    }

    /// Evicts unpinned entries, least-recently-used first, until resident
    /// bytes are within budget or nothing more can be evicted.
    fn evict_to_budget(&mut self) {
        while self.total_bytes > self.budget_bytes {
            let Some(pos) = self.access_order.iter().position(|k| self.entries.get(k).is_some_and(|e| e.pin_count == 0)) else {
                break;
            };
            let key = self.access_order.remove(pos).expect("position just located");
            if let Some(entry) = self.entries.remove(&key) {
                self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
            }
        }
    }
}

/// A byte-budgeted tile cache shared across a block rasterizer's worker
/// threads. Always held behind an `Arc` so `CacheHandle`s can release their
/// pin back into the cache on drop.
pub struct TileCache {
    inner: Mutex<Inner>,
}

impl TileCache {
    /// Default budget (§4.3): 10^9 bytes of resident tile bytes.
    pub const DEFAULT_BUDGET_BYTES: u64 = 1_000_000_000;

    pub fn new(budget_bytes: u64) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                access_order: VecDeque::new(),
                total_bytes: 0,
                budget_bytes,
                hits: 0,
                misses: 0,
            }),
        })
    }

    /// Registers (or re-pins) a tile and returns a handle pinning it.
    ///
    /// If `key` is already tracked, a fresh pin is added to the existing
    /// entry and `generator` is discarded unused. Otherwise a new pending
    /// entry is created; it does not count against the byte budget, and
    /// `generator` is not invoked, until the handle's bytes are actually
    /// requested.
    pub fn insert(self: &Arc<Self>, key: TileKey, generator: Arc<dyn TileGenerator>) -> CacheHandle {
        let mut inner = self.inner.lock().expect("tile cache mutex poisoned");
        match inner.entries.get_mut(&key) {
            Some(entry) => {
                entry.pin_count += 1;
                inner.hits += 1;
            }
            None => {
                let size_bytes = generator.size_bytes();
                inner.entries.insert(key, Entry { state: EntryState::Pending(generator), size_bytes, pin_count: 1 });
                inner.misses += 1;
            }
        }
        CacheHandle { cache: self.clone(), key }
    }

    pub fn resident_bytes(&self) -> u64 {
        self.inner.lock().expect("tile cache mutex poisoned").total_bytes
    }

    pub fn hit_miss(&self) -> (u64, u64) {
        let inner = self.inner.lock().expect("tile cache mutex poisoned");
        (inner.hits, inner.misses)
    }

    fn release(&self, key: TileKey) {
        let mut inner = self.inner.lock().expect("tile cache mutex poisoned");
        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.pin_count = entry.pin_count.saturating_sub(1);
        }
        inner.evict_to_budget();
    }

    /// Materializes `key`'s bytes, generating them (outside the lock) on
    /// first access. A handle must already have pinned `key` via `insert`.
    fn materialize(&self, key: TileKey) -> Result<Arc<Vec<u8>>> {
        {
            let mut inner = self.inner.lock().expect("tile cache mutex poisoned");
            if let Some(entry) = inner.entries.get(&key) {
                if let EntryState::Ready(bytes) = &entry.state {
                    let bytes = bytes.clone();
                    inner.touch(key);
                    return Ok(bytes);
                }
            }
        }

        let generator = {
            let inner = self.inner.lock().expect("tile cache mutex poisoned");
            match inner.entries.get(&key) {
                Some(Entry { state: EntryState::Pending(g), .. }) => g.clone(),
                Some(Entry { state: EntryState::Ready(bytes), .. }) => return Ok(bytes.clone()),
                None => panic!("TileCache::materialize called for a key not registered via insert()"),
            }
        };

        let data = Arc::new(generator.generate()?);

        let mut inner = self.inner.lock().expect("tile cache mutex poisoned");
        match inner.entries.get_mut(&key) {
            Some(entry) => {
                if let EntryState::Ready(existing) = &entry.state {
                    // Another thread materialized this tile while we were
                    // generating our own copy; use theirs and drop ours.
                    return Ok(existing.clone());
                }
                entry.state = EntryState::Ready(data.clone());
                inner.total_bytes += entry.size_bytes;
                inner.access_order.push_back(key);
            }
            None => panic!("tile entry for {key:?} vanished mid-generation"),
        }
        inner.evict_to_budget();
        Ok(data)
    }
}

/// A pinned reference to a cached (or pending) tile. Holding a handle
/// prevents eviction; dropping it releases the pin, after which the tile may
/// be evicted on the next cache activity if the budget is exceeded.
pub struct CacheHandle {
    cache: Arc<TileCache>,
    key: TileKey,
}

impl CacheHandle {
    pub fn key(&self) -> TileKey {
        self.key
    }

    /// Returns the tile's bytes, generating them on first access.
    pub fn bytes(&self) -> Result<Arc<Vec<u8>>> {
        self.cache.materialize(self.key)
    }
}

impl Drop for CacheHandle {
    fn drop(&mut self) {
        self.cache.release(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGenerator {
        calls: Arc<AtomicUsize>,
        bytes: Vec<u8>,
    }

    impl TileGenerator for CountingGenerator {
        fn size_bytes(&self) -> u64 {
            self.bytes.len() as u64
        }

        fn generate(&self) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.bytes.clone())
        }
    }

    fn key(block_col: i64) -> TileKey {
        TileKey { resource_id: 1, plane: 0, block_col, block_row: 0, block_width: 4, block_height: 4 }
    }

    #[test]
    fn generation_is_deferred_and_memoized() {
        let cache = TileCache::new(TileCache::DEFAULT_BUDGET_BYTES);
        let calls = Arc::new(AtomicUsize::new(0));
        let gen = Arc::new(CountingGenerator { calls: calls.clone(), bytes: vec![1, 2, 3, 4] });
        let handle = cache.insert(key(0), gen);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "generator must not run until bytes() is called");
        assert_eq!(*handle.bytes().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(*handle.bytes().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "a second bytes() call must not regenerate");
    }

    #[test]
    fn unpinned_lru_entry_is_evicted_when_over_budget() {
        let cache = TileCache::new(8);
        let gen = |b: Vec<u8>| Arc::new(CountingGenerator { calls: Arc::new(AtomicUsize::new(0)), bytes: b }) as Arc<dyn TileGenerator>;

        let h1 = cache.insert(key(0), gen(vec![0u8; 4]));
        h1.bytes().unwrap();
        let h2 = cache.insert(key(1), gen(vec![0u8; 4]));
        h2.bytes().unwrap();
        assert_eq!(cache.resident_bytes(), 8);

        drop(h1); // unpin tile 0
        let h3 = cache.insert(key(2), gen(vec![0u8; 4]));
        h3.bytes().unwrap(); // pushes over budget, evicts LRU unpinned (tile 0)
        assert_eq!(cache.resident_bytes(), 8);

        // tile 0 was evicted: requesting it again must regenerate.
        let calls0 = Arc::new(AtomicUsize::new(0));
        let h1_again = cache.insert(key(0), Arc::new(CountingGenerator { calls: calls0.clone(), bytes: vec![0u8; 4] }));
        h1_again.bytes().unwrap();
        assert_eq!(calls0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pinned_entries_are_never_evicted() {
        let cache = TileCache::new(4);
        let gen = |b: Vec<u8>| Arc::new(CountingGenerator { calls: Arc::new(AtomicUsize::new(0)), bytes: b }) as Arc<dyn TileGenerator>;
        let h1 = cache.insert(key(0), gen(vec![0u8; 4]));
        h1.bytes().unwrap();
        let h2 = cache.insert(key(1), gen(vec![0u8; 4]));
        h2.bytes().unwrap(); // would need to evict tile 0, but it's still pinned
        assert_eq!(cache.resident_bytes(), 8, "over budget is acceptable while entries remain pinned");
    }
}
