//! Arena-backed LRU store: a hash index plus an intrusive doubly-linked
//! recency sequence over a `Vec` arena of entries, addressed by integer
//! slot rather than by raw pointer, behind a single reader/writer lock
//! with atomic activity counters alongside it.

use std::collections::HashMap;

use crate::config::CacheConfig;
use crate::sync::{AtomicU64, Ordering, RwLock};

/// Snapshot of cache activity counters.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Successful `lookup` calls that found a live entry.
    pub hits: u64,
    /// `lookup` calls that found nothing.
    pub misses: u64,
    /// Entries evicted to satisfy the total byte budget.
    pub evictions: u64,
    /// `insert` calls that added or updated an entry.
    pub inserts: u64,
    /// `insert` calls rejected because the payload exceeded `max_entry_bytes`.
    pub oversize_rejections: u64,
    /// Current sum of all live entries' byte sizes.
    pub current_bytes: u64,
    /// Current number of live entries.
    pub len: usize,
}

impl CacheStats {
    /// Fraction of `lookup` calls that were hits, in `[0.0, 1.0]`.
    ///
    /// Returns `0.0` when there have been no lookups at all.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// One cached response, owned exclusively by the store.
struct Entry {
    key: String,
    payload: Box<[u8]>,
    size: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

/// The data actually protected by the reader/writer lock: the arena, the
/// free list of reclaimed slots, the key index, and the recency sequence's
/// head/tail pointers plus the running byte total.
struct Inner {
    entries: Vec<Option<Entry>>,
    free_list: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    current_bytes: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            current_bytes: 0,
        }
    }

    fn entry(&self, slot: usize) -> &Entry {
        self.entries[slot]
            .as_ref()
            .expect("index must never reference a vacant slot")
    }

    fn entry_mut(&mut self, slot: usize) -> &mut Entry {
        self.entries[slot]
            .as_mut()
            .expect("index must never reference a vacant slot")
    }

    fn push_front(&mut self, slot: usize) {
        let old_head = self.head;
        {
            let e = self.entry_mut(slot);
            e.prev = None;
            e.next = old_head;
        }
        match old_head {
            Some(h) => self.entry_mut(h).prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }

    fn detach(&mut self, slot: usize) {
        let (prev, next) = {
            let e = self.entry(slot);
            (e.prev, e.next)
        };
        match prev {
            Some(p) => self.entry_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entry_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    fn promote(&mut self, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        self.detach(slot);
        self.push_front(slot);
    }

    fn alloc_slot(&mut self, entry: Entry) -> usize {
        if let Some(slot) = self.free_list.pop() {
            self.entries[slot] = Some(entry);
            slot
        } else {
            self.entries.push(Some(entry));
            self.entries.len() - 1
        }
    }

    /// Evicts tail entries until `current_bytes + incoming <= cap`, or the
    /// sequence is empty. Deterministic: always the unique current tail.
    fn evict_to_fit(&mut self, incoming: u64, cap: u64, evictions: &AtomicU64) {
        while self.current_bytes + incoming > cap {
            let Some(tail) = self.tail else { break };
            self.detach(tail);
            let entry = self.entries[tail]
                .take()
                .expect("tail pointer must reference an occupied slot");
            self.index.remove(&entry.key);
            self.current_bytes -= entry.size;
            self.free_list.push(tail);
            evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %entry.key, size = entry.size, "cache eviction");
        }
    }
}

/// The process-wide (or test-local) response cache.
///
/// Construct with [`CacheStore::init`]; tear down with
/// [`CacheStore::destroy`]. Every mutating operation acquires the single
/// reader/writer lock exclusively; [`CacheStore::lookup`] follows a
/// mandatory shared-probe / release / exclusive-upgrade / re-probe protocol
/// so that promotion on a hit never happens while holding only the shared
/// lock, and so that an entry evicted between the probe and the upgrade is
/// correctly reported as a miss rather than returned stale.
pub struct CacheStore {
    config: CacheConfig,
    inner: RwLock<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    inserts: AtomicU64,
    oversize_rejections: AtomicU64,
}

impl CacheStore {
    /// Initializes a new, empty cache store with the given byte budgets.
    ///
    /// This is the one-shot constructor workers are handed before any
    /// connection is accepted; there is no implicit global instance, so
    /// there is no "double init" to guard against — each call produces an
    /// independent store (see `DESIGN.md` for why this is preferred over a
    /// process-global mutable singleton).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if either budget is zero or
    /// if `max_entry_bytes` exceeds `max_total_bytes`.
    pub fn init(max_total_bytes: u64, max_entry_bytes: u64) -> crate::Result<Self> {
        let config = CacheConfig {
            max_total_bytes,
            max_entry_bytes,
        }
        .validated()?;
        tracing::info!(
            max_total_bytes = config.max_total_bytes,
            max_entry_bytes = config.max_entry_bytes,
            "cache store initialized"
        );
        Ok(Self {
            config,
            inner: RwLock::new(Inner::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            oversize_rejections: AtomicU64::new(0),
        })
    }

    /// Convenience constructor for tests: builds a store with the given
    /// budgets, panicking if they are invalid.
    #[cfg(test)]
    pub(crate) fn new(max_total_bytes: u64, max_entry_bytes: u64) -> Self {
        Self::init(max_total_bytes, max_entry_bytes).expect("test cache config must be valid")
    }

    /// Releases every entry. Consumes `self`: once destroyed, a store
    /// cannot be operated on again because there is no value left to call
    /// methods on.
    pub fn destroy(self) {
        let len = self.inner.read().index.len();
        tracing::info!(entries = len, "cache store destroyed");
        // Dropping `self` here releases the arena and the lock.
    }

    /// The configured total-byte and per-entry-byte budgets.
    #[must_use]
    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Looks up `key`, returning an owned copy of the cached payload on a
    /// hit and promoting the entry to most-recently-used.
    ///
    /// Implements the mandatory Cache Access Protocol:
    /// 1. Acquire the lock in shared mode and probe the index.
    /// 2. Release the shared lock immediately (a miss returns here).
    /// 3. Acquire the lock in exclusive mode.
    /// 4. Re-probe the index — a concurrent eviction or insert may have
    ///    removed or replaced the entry since step 1.
    /// 5. On a re-probe hit, promote the entry and copy its payload out
    ///    while still holding the exclusive lock, then release.
    ///
    /// The shared lock is never held across promotion, and the re-probe is
    /// never skipped: both are required for correctness under concurrent
    /// eviction/insert, not merely defensive.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        let optimistic_hit = {
            let guard = self.inner.read();
            guard.index.contains_key(key)
        };
        if !optimistic_hit {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let mut guard = self.inner.write();
        let Some(&slot) = guard.index.get(key) else {
            drop(guard);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        guard.promote(slot);
        let payload = guard.entry(slot).payload.to_vec();
        drop(guard);

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(payload)
    }

    /// Inserts or updates the entry for `key` with `bytes`, promoting it to
    /// most-recently-used.
    ///
    /// If `bytes.len()` exceeds `max_entry_bytes`, this is a silent no-op
    /// (the `OversizeEntry` case — not an error). Otherwise, an existing
    /// entry's payload is replaced in place; a new entry triggers eviction
    /// of tail entries as needed to keep the running total within
    /// `max_total_bytes`.
    pub fn insert(&self, key: String, bytes: Vec<u8>) {
        let size = bytes.len() as u64;
        if size > self.config.max_entry_bytes {
            self.oversize_rejections.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, size, "insert skipped: oversize entry");
            return;
        }

        let mut guard = self.inner.write();

        if let Some(&slot) = guard.index.get(&key) {
            let old_size = guard.entry(slot).size;
            {
                let e = guard.entry_mut(slot);
                e.payload = bytes.into_boxed_slice();
                e.size = size;
            }
            guard.current_bytes = guard.current_bytes - old_size + size;
            guard.promote(slot);
            guard.evict_to_fit(0, self.config.max_total_bytes, &self.evictions);
            drop(guard);
            tracing::info!(key = %key, size, "cache insert");
        } else {
            guard.evict_to_fit(size, self.config.max_total_bytes, &self.evictions);
            let slot = guard.alloc_slot(Entry {
                key: key.clone(),
                payload: bytes.into_boxed_slice(),
                size,
                prev: None,
                next: None,
            });
            guard.index.insert(key.clone(), slot);
            guard.push_front(slot);
            guard.current_bytes += size;
            drop(guard);
            tracing::info!(key = %key, size, "cache insert");
        }

        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Current number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().index.len()
    }

    /// `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current sum of all live entries' byte sizes.
    #[must_use]
    pub fn current_bytes(&self) -> u64 {
        self.inner.read().current_bytes
    }

    /// A snapshot of activity counters plus the current size/occupancy.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let guard = self.inner.read();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            oversize_rejections: self.oversize_rejections.load(Ordering::Relaxed),
            current_bytes: guard.current_bytes,
            len: guard.index.len(),
        }
    }
}
