//! # Pool Allocator Concurrency Tests
//!
//! Many threads hammer one pool with create/destroy pairs. A shared bitmap
//! of live addresses catches the pool handing the same slot to two owners.
//! A small pool raced to full capacity checks that growth never reports
//! exhaustion early.
//!
//! Run with: cargo test --package oroboros_core --test pool_concurrency

// SAFETY: raw pool objects are owned by exactly one thread at a time.
#![allow(unsafe_code)]

use std::collections::HashSet as StdHashSet;
use std::ptr::NonNull;
use std::sync::{Arc, Barrier};
use std::thread;

use parking_lot::Mutex;

use oroboros_core::{CoreError, PoolAllocator, PoolConfig};

const THREADS: usize = 8;
const ROUNDS: usize = 2_000;
const BATCH: usize = 16;

#[derive(Debug)]
struct Payload {
    owner: usize,
    round: usize,
}

#[test]
fn verify_no_slot_handed_out_twice() {
    let pool: Arc<PoolAllocator<Payload>> = Arc::new(PoolAllocator::new());
    let live: Arc<Mutex<StdHashSet<usize>>> = Arc::new(Mutex::new(StdHashSet::new()));

    let workers: Vec<_> = (0..THREADS)
        .map(|owner| {
            let pool = Arc::clone(&pool);
            let live = Arc::clone(&live);
            thread::spawn(move || {
                let mut held: Vec<NonNull<Payload>> = Vec::with_capacity(BATCH);
                for round in 0..ROUNDS {
                    for _ in 0..BATCH {
                        let object = pool.create(Payload { owner, round });
                        let mut guard = live.lock();
                        let fresh = guard.insert(object.as_ptr() as usize);
                        assert!(fresh, "slot {:p} handed out twice", object.as_ptr());
                        assert_live_within_capacity(&pool);
                        drop(guard);
                        held.push(object);
                    }
                    for object in held.drain(..) {
                        // SAFETY: created above by this thread and never shared.
                        let payload = unsafe { object.as_ref() };
                        assert_eq!(payload.owner, owner);
                        assert_eq!(payload.round, round);
                        live.lock().remove(&(object.as_ptr() as usize));
                        // SAFETY: created from this pool, destroyed once.
                        unsafe { pool.destroy(object) };
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }

    assert_eq!(pool.live_count(), 0);
    assert!(live.lock().is_empty());
    // At most THREADS * BATCH objects were ever live at once.
    assert!(pool.capacity() >= THREADS * BATCH);
    assert!(pool.capacity() <= pool.max_capacity());
}

/// Live count first: capacity only grows, so a later read still bounds it.
fn assert_live_within_capacity<T>(pool: &PoolAllocator<T>) {
    let live = pool.live_count();
    let capacity = pool.capacity();
    assert!(live <= capacity, "{live} live objects in {capacity} slots");
}

#[test]
fn verify_growth_reaches_max_capacity_under_contention() {
    const ROUNDS_SMALL: usize = 200;
    let config = PoolConfig {
        puddle_elements: 8,
        max_puddles: 4,
    };

    for _ in 0..ROUNDS_SMALL {
        let pool: PoolAllocator<usize> =
            PoolAllocator::with_config(config).expect("valid geometry");
        let per_thread = pool.max_capacity() / THREADS;
        let harness = Mutex::new(());
        let barrier = Barrier::new(THREADS);

        let addresses: Vec<usize> = thread::scope(|scope| {
            let workers: Vec<_> = (0..THREADS)
                .map(|t| {
                    let (pool, harness, barrier) = (&pool, &harness, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        let mut got = Vec::with_capacity(per_thread);
                        for _ in 0..per_thread {
                            match pool.try_create(t) {
                                Ok(object) => got.push(object.as_ptr() as usize),
                                Err(err) => panic!("{err} with {} live", pool.live_count()),
                            }
                            let _guard = harness.lock();
                            assert_live_within_capacity(pool);
                        }
                        got
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|w| w.join().expect("worker panicked"))
                .collect()
        });

        assert_eq!(addresses.len(), pool.max_capacity());
        assert_eq!(pool.live_count(), pool.max_capacity());
        assert_eq!(pool.puddle_count(), config.max_puddles);
        assert!(matches!(
            pool.try_create(0),
            Err(CoreError::PoolExhausted { capacity: 32 })
        ));
        let unique: StdHashSet<usize> = addresses.iter().copied().collect();
        assert_eq!(unique.len(), addresses.len());

        for addr in addresses {
            // SAFETY: every address came from this pool exactly once.
            unsafe { pool.destroy(NonNull::new_unchecked(addr as *mut usize)) };
        }
    }
}

#[test]
fn verify_fixed_pool_exhaustion_under_contention() {
    const CAPACITY: usize = 64;
    let pool: Arc<PoolAllocator<u64>> =
        Arc::new(PoolAllocator::fixed(CAPACITY).expect("valid capacity"));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let mut got = Vec::new();
                loop {
                    match pool.try_create(t as u64) {
                        Ok(object) => got.push(object.as_ptr() as usize),
                        Err(CoreError::PoolExhausted { capacity }) => {
                            assert_eq!(capacity, CAPACITY);
                            break;
                        }
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
                got
            })
        })
        .collect();

    let mut all = StdHashSet::new();
    for worker in workers {
        for addr in worker.join().expect("worker panicked") {
            assert!(all.insert(addr), "duplicate slot {addr:#x}");
        }
    }
    assert_eq!(all.len(), CAPACITY);
    assert_eq!(pool.live_count(), CAPACITY);

    for addr in all {
        // SAFETY: every address came from this pool exactly once.
        unsafe { pool.destroy(NonNull::new_unchecked(addr as *mut u64)) };
    }
    assert_eq!(pool.live_count(), 0);
}

#[test]
fn verify_pool_boxes_cross_threads() {
    let pool: Arc<PoolAllocator<[u32; 8]>> = Arc::new(PoolAllocator::new());
    thread::scope(|scope| {
        for t in 0..THREADS {
            let pool = &pool;
            scope.spawn(move || {
                for i in 0..ROUNDS {
                    let mut slot = pool.boxed([0; 8]);
                    slot[0] = t as u32;
                    slot[7] = i as u32;
                    assert_eq!(slot[0], t as u32);
                }
            });
        }
    });
    assert_eq!(pool.live_count(), 0);
}
