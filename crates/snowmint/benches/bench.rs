use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use snowmint::{Config, MonotonicClock, Registry, SnowflakeGenerator, SystemClock, TimeSource};
use std::{
    sync::Barrier,
    thread::scope,
    time::Instant,
};

// Number of IDs generated per benchmark iteration (per-thread for
// multi-threaded).
const TOTAL_IDS: usize = 4096;

/// Benchmarks the single-threaded hot path with a given clock.
fn bench_generator<T>(c: &mut Criterion, group_name: &str, clock_factory: impl Fn() -> T)
where
    T: TimeSource,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let mut elapsed = core::time::Duration::ZERO;
            for _ in 0..iters {
                let generator =
                    SnowflakeGenerator::new(0, 0, Config::default(), clock_factory()).unwrap();
                let start = Instant::now();
                for _ in 0..TOTAL_IDS {
                    black_box(generator.next_id().unwrap());
                }
                elapsed += start.elapsed();
            }
            elapsed
        });
    });

    group.finish();
}

/// Benchmarks one shared generator under contention from several threads.
fn bench_contended(c: &mut Criterion, group_name: &str) {
    let threads = num_cpus::get().clamp(2, 8);
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements((TOTAL_IDS * threads) as u64));

    group.bench_function(format!("threads/{threads}/elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let generator =
                SnowflakeGenerator::with_system_clock(0, 0, Config::default()).unwrap();
            let barrier = Barrier::new(threads + 1);

            scope(|s| {
                for _ in 0..threads {
                    s.spawn(|| {
                        barrier.wait();
                        for _ in 0..iters {
                            for _ in 0..TOTAL_IDS {
                                black_box(generator.next_id().unwrap());
                            }
                        }
                    });
                }

                barrier.wait();
                let start = Instant::now();
                // Scope end joins the workers before `elapsed` is read.
                start
            })
            .elapsed()
        });
    });

    group.finish();
}

/// Benchmarks the registry's get-or-create hit path.
fn bench_registry_lookup(c: &mut Criterion) {
    let registry = Registry::new();
    for worker_id in 0..32 {
        registry
            .get_or_create(worker_id, 0, Config::default())
            .unwrap();
    }

    let mut group = c.benchmark_group("registry");
    group.bench_function("get_or_create/hit", |b| {
        let mut worker_id = 0;
        b.iter(|| {
            worker_id = (worker_id + 1) % 32;
            black_box(registry.get_or_create(worker_id, 0, Config::default()).unwrap());
        });
    });
    group.finish();
}

fn benchmarks(c: &mut Criterion) {
    bench_generator(c, "generator/system_clock", || SystemClock);
    let clock = MonotonicClock::new();
    bench_generator(c, "generator/monotonic_clock", || clock.clone());
    bench_contended(c, "generator/contended");
    bench_registry_lookup(c);
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
