//! Benchmark comparing the synchronization-strategy ladder:
//! coarse vs fine-grained vs optimistic vs lazy vs lock-free vs skip list,
//! with crossbeam-skiplist as an external reference point.
//!
//! Run with: cargo bench --package strata-crossbeam --bench set_benchmark

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use crossbeam_skiplist::SkipSet;
use mimalloc::MiMalloc;
use rand::Rng;
use std::sync::Arc;
use std::thread;

use strata_core::{ConcurrentSet, Key};
use strata_crossbeam::{
    EpochLazyList, EpochLazySkipList, EpochLockFreeList, EpochOptimisticList,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const OPS_PER_THREAD: usize = 1000;
const KEY_RANGE: Key = 1000;

// ============================================================================
// Generic workload: the classic 1/3 add, 1/3 remove, 1/3 contains mix
// over a bounded random key range
// ============================================================================

fn bench_mixed_workload<S>(set: Arc<S>, thread_count: usize, ops_per_thread: usize)
where
    S: ConcurrentSet + 'static,
{
    let mut handles = vec![];

    for _ in 0..thread_count {
        let set = Arc::clone(&set);
        let handle = thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..ops_per_thread {
                let key: Key = rng.gen_range(0..KEY_RANGE);
                match rng.gen_range(0..3) {
                    0 => {
                        set.add(key);
                    }
                    1 => {
                        set.remove(key);
                    }
                    _ => {
                        set.contains(key);
                    }
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_crossbeam_mixed(thread_count: usize, ops_per_thread: usize) {
    let set: Arc<SkipSet<Key>> = Arc::new(SkipSet::new());
    let mut handles = vec![];

    for _ in 0..thread_count {
        let set = Arc::clone(&set);
        let handle = thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..ops_per_thread {
                let key: Key = rng.gen_range(0..KEY_RANGE);
                match rng.gen_range(0..3) {
                    0 => {
                        set.insert(key);
                    }
                    1 => {
                        let _ = set.remove(&key);
                    }
                    _ => {
                        set.contains(&key);
                    }
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

fn run_mixed<S>(thread_count: usize, ops_per_thread: usize)
where
    S: ConcurrentSet + Default + 'static,
{
    let set = Arc::new(S::default());
    bench_mixed_workload(set, thread_count, ops_per_thread);
}

/// Thread-scaling comparison across the whole ladder.
fn mixed_workload_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_workload");

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("coarse", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    run_mixed::<strata_core::CoarseList>(
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("fine", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    run_mixed::<strata_core::FineList>(
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("optimistic", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    run_mixed::<EpochOptimisticList>(black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("lazy", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    run_mixed::<EpochLazyList>(black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("lock_free", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    run_mixed::<EpochLockFreeList>(black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("lazy_skip_list", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    run_mixed::<EpochLazySkipList>(black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("crossbeam_skiplist", threads),
            &threads,
            |b, &threads| {
                b.iter(|| bench_crossbeam_mixed(black_box(threads), black_box(OPS_PER_THREAD)))
            },
        );
    }

    group.finish();
}

// ============================================================================
// Read-dominated workload: wait-free contains is the whole point of the
// lazy and lock-free rungs
// ============================================================================

fn bench_read_heavy<S>(thread_count: usize, ops_per_thread: usize)
where
    S: ConcurrentSet + Default + 'static,
{
    let set = Arc::new(S::default());
    for key in 0..KEY_RANGE {
        set.add(key);
    }

    let mut handles = vec![];
    for _ in 0..thread_count {
        let set = Arc::clone(&set);
        handles.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for i in 0..ops_per_thread {
                let key: Key = rng.gen_range(0..KEY_RANGE);
                if i % 10 == 0 {
                    set.remove(key);
                    set.add(key);
                } else {
                    set.contains(key);
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

fn read_heavy_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_heavy");

    for threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("coarse", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_read_heavy::<strata_core::CoarseList>(
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("lazy", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_read_heavy::<EpochLazyList>(black_box(threads), black_box(OPS_PER_THREAD))
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("lock_free", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_read_heavy::<EpochLockFreeList>(
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("lazy_skip_list", threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    bench_read_heavy::<EpochLazySkipList>(
                        black_box(threads),
                        black_box(OPS_PER_THREAD),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, mixed_workload_benchmark, read_heavy_benchmark);
criterion_main!(benches);
