//! Exhaustive interleaving check for the lock-upgrade race, using `loom`
//! to replay every legal scheduling of the shared-probe / release /
//! exclusive-upgrade / re-probe protocol in [`CacheStore::lookup`]
//! against a concurrent `insert`.
//!
//! Run with:
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --features loom --release -p cachefront-core
//! ```

use super::CacheStore;
use crate::sync::{thread, Arc};

#[test]
fn lookup_never_observes_a_torn_payload_under_concurrent_insert() {
    loom::model(|| {
        let cache = Arc::new(CacheStore::new(1_000, 100));
        cache.insert("k".to_string(), vec![0xAA; 4]);

        let writer_cache = Arc::clone(&cache);
        let writer = thread::spawn(move || {
            writer_cache.insert("k".to_string(), vec![0xBB; 8]);
        });

        let reader_cache = Arc::clone(&cache);
        let reader = thread::spawn(move || reader_cache.lookup("k"));

        writer.join().unwrap();
        let observed = reader.join().unwrap();

        // The re-probe in step 5 of the upgrade protocol guarantees the
        // reader sees a consistent snapshot: the pre-write payload, the
        // post-write payload, or nothing — never a mix of both.
        if let Some(bytes) = observed {
            let is_old_payload = bytes == vec![0xAA; 4];
            let is_new_payload = bytes == vec![0xBB; 8];
            assert!(
                is_old_payload || is_new_payload,
                "lookup returned neither the pre- nor post-write payload: {bytes:?}"
            );
        }
    });
}

#[test]
fn lookup_never_observes_a_dangling_entry_under_concurrent_eviction() {
    loom::model(|| {
        // Total cap exactly fits one 8-byte entry; inserting a distinct
        // key forces eviction of "k" between the reader's probe and its
        // upgrade.
        let cache = Arc::new(CacheStore::new(8, 8));
        cache.insert("k".to_string(), vec![0xCC; 8]);

        let evictor_cache = Arc::clone(&cache);
        let evictor = thread::spawn(move || {
            evictor_cache.insert("other".to_string(), vec![0xDD; 8]);
        });

        let reader_cache = Arc::clone(&cache);
        let reader = thread::spawn(move || reader_cache.lookup("k"));

        evictor.join().unwrap();
        let observed = reader.join().unwrap();

        if let Some(bytes) = observed {
            assert_eq!(
                bytes,
                vec![0xCC; 8],
                "lookup returned a dangling payload for an evicted entry"
            );
        }
    });
}

#[test]
fn concurrent_lookups_of_distinct_keys_never_deadlock() {
    loom::model(|| {
        let cache = Arc::new(CacheStore::new(1_000, 100));
        cache.insert("a".to_string(), vec![1u8; 4]);
        cache.insert("b".to_string(), vec![2u8; 4]);

        let cache_a = Arc::clone(&cache);
        let t1 = thread::spawn(move || cache_a.lookup("a"));
        let cache_b = Arc::clone(&cache);
        let t2 = thread::spawn(move || cache_b.lookup("b"));

        assert_eq!(t1.join().unwrap(), Some(vec![1u8; 4]));
        assert_eq!(t2.join().unwrap(), Some(vec![2u8; 4]));
    });
}
