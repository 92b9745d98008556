//! # Container Benchmark
//!
//! Growth, ordered insertion and lookup costs of the core containers,
//! measured against the std equivalents where one exists.
//!
//! Run with: `cargo bench --package oroboros_core --bench container_benchmark`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use oroboros_core::{Array, Dictionary, HashSet, Queue, Set, SetHasher};

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

/// Knuth multiplicative scatter so ordered inserts land all over the array.
fn scatter(i: usize) -> u32 {
    (i as u32).wrapping_mul(2_654_435_761)
}

struct Fibonacci;

impl SetHasher<u32> for Fibonacci {
    fn hash(value: &u32) -> u32 {
        value.wrapping_mul(2_654_435_769)
    }
}

/// Benchmark: Array push vs Vec push.
fn bench_array_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_push");
    for count in SIZES {
        group.bench_with_input(BenchmarkId::new("Array", count), &count, |b, &count| {
            b.iter(|| {
                let mut array = Array::new();
                for i in 0..count {
                    array.add(i);
                }
                black_box(array.len())
            });
        });
        group.bench_with_input(BenchmarkId::new("Vec", count), &count, |b, &count| {
            b.iter(|| {
                let mut vec = Vec::new();
                for i in 0..count {
                    vec.push(i);
                }
                black_box(vec.len())
            });
        });
    }
    group.finish();
}

/// Benchmark: Set sorted insertion, one by one vs bulk.
fn bench_set_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_insert");
    for count in [1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |b, &count| {
            b.iter(|| {
                let mut set = Set::new();
                for i in 0..count {
                    set.insert(scatter(i));
                }
                black_box(set.len())
            });
        });
        group.bench_with_input(BenchmarkId::new("bulk", count), &count, |b, &count| {
            b.iter(|| {
                let mut set = Set::new();
                set.begin_bulk();
                for i in 0..count {
                    set.insert_bulk(scatter(i));
                }
                set.end_bulk();
                black_box(set.len())
            });
        });
    }
    group.finish();
}

/// Benchmark: Dictionary lookup vs BTreeMap lookup.
fn bench_dictionary_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("dictionary_find");
    for count in SIZES {
        let dict: Dictionary<u32, usize> = (0..count).map(|i| (scatter(i), i)).collect();
        let map: std::collections::BTreeMap<u32, usize> =
            (0..count).map(|i| (scatter(i), i)).collect();

        group.bench_with_input(BenchmarkId::new("Dictionary", count), &count, |b, &count| {
            b.iter(|| {
                let mut sum = 0;
                for i in (0..count).step_by(7) {
                    sum += dict.find(&scatter(i)).copied().unwrap_or(0);
                }
                black_box(sum)
            });
        });
        group.bench_with_input(BenchmarkId::new("BTreeMap", count), &count, |b, &count| {
            b.iter(|| {
                let mut sum = 0;
                for i in (0..count).step_by(7) {
                    sum += map.get(&scatter(i)).copied().unwrap_or(0);
                }
                black_box(sum)
            });
        });
    }
    group.finish();
}

/// Benchmark: HashSet insert + contains.
fn bench_hash_set(c: &mut Criterion) {
    c.bench_function("hash_set_insert_contains_10k", |b| {
        b.iter(|| {
            let mut set: HashSet<u32, Fibonacci, 256> = HashSet::new();
            for i in 0..10_000 {
                set.insert(scatter(i));
            }
            let mut hits = 0;
            for i in 0..10_000 {
                if set.contains(&scatter(i)) {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });
}

/// Benchmark: Queue steady state, where the buffer compacts instead of growing.
fn bench_queue_steady_state(c: &mut Criterion) {
    c.bench_function("queue_enqueue_dequeue_100k", |b| {
        let mut queue = Queue::new();
        for i in 0..64 {
            queue.enqueue(i);
        }
        b.iter(|| {
            let mut sum = 0usize;
            for i in 0..100_000 {
                queue.enqueue(i);
                sum = sum.wrapping_add(queue.dequeue());
            }
            black_box(sum)
        });
    });
}

criterion_group!(
    benches,
    bench_array_push,
    bench_set_insert,
    bench_dictionary_find,
    bench_hash_set,
    bench_queue_steady_state,
);
criterion_main!(benches);
