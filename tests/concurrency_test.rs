//! Concurrent access: parallel readers and writers across shards, shared
//! eviction policy state, and cancellation observed from another thread.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::thread_rng;
use simcache::eviction::Lru;
use simcache::prelude::*;

#[test]
fn parallel_writers_and_readers() {
    const WRITERS: usize = 4;
    const READERS: usize = 4;
    const KEYS_PER_WRITER: usize = 200;

    let cache: Arc<Cache<String, usize>> = Arc::new(
        Cache::builder()
            .shards(16)
            .max_size(WRITERS * KEYS_PER_WRITER * 2)
            .build(),
    );
    let barrier = Arc::new(Barrier::new(WRITERS + READERS));
    let mut handles = Vec::new();

    for w in 0..WRITERS {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let ctx = Context::background();
            barrier.wait();
            let mut keys: Vec<usize> = (0..KEYS_PER_WRITER).collect();
            keys.shuffle(&mut thread_rng());
            for i in keys {
                cache.set(&ctx, format!("w{w}-k{i}"), i).unwrap();
            }
        }));
    }

    for r in 0..READERS {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let ctx = Context::background();
            barrier.wait();
            for i in 0..KEYS_PER_WRITER {
                // Reads race the writers; any answer is fine, but the call
                // must neither block forever nor corrupt state.
                let _ = cache.get(&ctx, &format!("w{}-k{i}", r % WRITERS));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let ctx = Context::background();
    assert_eq!(cache.len(), WRITERS * KEYS_PER_WRITER);
    for w in 0..WRITERS {
        for i in 0..KEYS_PER_WRITER {
            assert_eq!(cache.get(&ctx, &format!("w{w}-k{i}")), Some(i));
        }
    }
}

#[test]
fn shared_lru_policy_survives_contention() {
    const THREADS: usize = 8;
    const OPS: usize = 300;
    const MAX_SIZE: usize = 64;

    // One shard keeps the policy's tracked set equal to the resident set,
    // so the capacity bound is exact even under contention.
    let cache: Arc<Cache<usize, usize>> = Arc::new(
        Cache::builder()
            .shards(1)
            .max_size(MAX_SIZE)
            .eviction(Arc::new(Lru::new()))
            .enable_stats(true)
            .build(),
    );
    let barrier = Arc::new(Barrier::new(THREADS));
    let mut handles = Vec::new();

    for t in 0..THREADS {
        let cache = Arc::clone(&cache);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let ctx = Context::background();
            barrier.wait();
            for i in 0..OPS {
                let key = t * OPS + i;
                cache.set(&ctx, key, key).unwrap();
                let _ = cache.get(&ctx, &(key / 2));
                if i % 7 == 0 {
                    cache.delete(&ctx, &(key / 3));
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(
        cache.len() <= MAX_SIZE,
        "len {} exceeded bound {MAX_SIZE}",
        cache.len()
    );

    let stats = cache.stats();
    assert!(stats.sets as usize >= THREADS * OPS);
    assert!(stats.sets >= stats.deletes + stats.evictions + cache.len() as u64);
}

#[test]
fn concurrent_similarity_searches_and_writes() {
    let cache: Arc<Cache<String, String>> = Arc::new(
        Cache::builder()
            .shards(8)
            .threshold(0.7)
            .build()
            .with_similarity(|a: &String, b: &String| levenshtein(a, b)),
    );
    let ctx = Context::background();
    for i in 0..100 {
        cache.set(&ctx, format!("term{i}"), format!("value{i}")).unwrap();
    }

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let ctx = Context::background();
            for i in 100..200 {
                cache.set(&ctx, format!("term{i}"), format!("value{i}")).unwrap();
                thread::sleep(Duration::from_micros(50));
            }
        })
    };

    let searcher = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let ctx = Context::background();
            let mut hits = 0;
            for i in 0..100 {
                if let Some(found) = cache.get_similar(&ctx, &format!("term{i}")) {
                    assert!(found.score >= 0.7);
                    hits += 1;
                }
            }
            hits
        })
    };

    writer.join().unwrap();
    let hits = searcher.join().unwrap();
    assert!(hits > 0, "similarity searches never matched during writes");
}

#[test]
fn cancellation_is_observed_across_threads() {
    let cache: Arc<Cache<String, String>> = Arc::new(Cache::new());
    let ctx = Context::background();
    cache.set(&ctx, "k".into(), "v".into()).unwrap();

    let (cancelled_ctx, handle) = ctx.with_cancel();
    let canceller = thread::spawn(move || {
        handle.cancel();
    });
    canceller.join().unwrap();

    let worker = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || cache.set(&cancelled_ctx, "other".into(), "v".into()))
    };

    assert_eq!(worker.join().unwrap(), Err(CacheError::Cancelled));
    assert_eq!(cache.len(), 1);
}

#[test]
fn touch_under_read_lock_does_not_lose_counts() {
    const READERS: usize = 8;
    const READS: usize = 500;

    let cache: Arc<Cache<String, u32>> = Arc::new(Cache::builder().enable_stats(true).build());
    let ctx = Context::background();
    cache.set(&ctx, "hot".into(), 1).unwrap();

    let barrier = Arc::new(Barrier::new(READERS));
    let handles: Vec<_> = (0..READERS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let ctx = Context::background();
                barrier.wait();
                for _ in 0..READS {
                    assert_eq!(cache.get(&ctx, &"hot".into()), Some(1));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Hit accounting goes through atomics, so concurrent read-lock holders
    // must not lose increments.
    assert_eq!(cache.stats().hits, (READERS * READS) as u64);
}
