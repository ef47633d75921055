use call_throttle::{ActionName, PolicyRegistry, RatePolicy, SystemClock};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

// Large enough that no benchmark run drains a bucket.
const BURST: f64 = 1e12;

fn registry(actions: usize) -> PolicyRegistry {
    let mut builder = PolicyRegistry::builder();
    for i in 0..actions {
        builder = builder
            .register(format!("action{}", i), RatePolicy::direct(BURST, 1.0).unwrap())
            .register(
                format!("action{}ByNextToken", i),
                RatePolicy::alias(format!("action{}", i)),
            );
    }
    builder.build(Arc::new(SystemClock::new())).unwrap()
}

/// Benchmark resolve-and-consume on a single thread
fn bench_single_threaded_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_threaded");
    group.throughput(Throughput::Elements(1000));

    let registry = registry(1);

    group.bench_function("direct", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                let handle = registry.resolve(black_box("action0")).unwrap();
                black_box(handle.try_consume());
            }
        })
    });

    group.bench_function("through_alias", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                let handle = registry.resolve(black_box("action0ByNextToken")).unwrap();
                black_box(handle.try_consume());
            }
        })
    });

    group.bench_function("time_until_available", |b| {
        let handle = registry.resolve("action0").unwrap();
        b.iter(|| {
            for _ in 0..1000 {
                black_box(handle.time_until_available());
            }
        })
    });

    group.finish();
}

/// Benchmark concurrent admission on one shared bucket vs one bucket per thread
fn bench_concurrent_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2, 4, 8].iter() {
        group.throughput(Throughput::Elements((*num_threads as u64) * 1000));

        for shared in [true, false] {
            let name = if shared { "shared_bucket" } else { "own_bucket" };
            let registry = Arc::new(registry(*num_threads));

            group.bench_with_input(
                BenchmarkId::new(name, num_threads),
                num_threads,
                |b, &num_threads| {
                    b.iter(|| {
                        let mut handles = vec![];
                        for i in 0..num_threads {
                            let registry = Arc::clone(&registry);
                            let action = if shared {
                                ActionName::from("action0")
                            } else {
                                ActionName::from(format!("action{}", i))
                            };
                            handles.push(std::thread::spawn(move || {
                                for _ in 0..1000 {
                                    let handle = registry.resolve(action.as_str()).unwrap();
                                    black_box(handle.try_consume());
                                }
                            }));
                        }

                        for handle in handles {
                            handle.join().unwrap();
                        }
                    })
                },
            );
        }
    }

    group.finish();
}

/// Benchmark registry construction and alias validation
fn bench_registry_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_build");

    for num_actions in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("actions", num_actions),
            num_actions,
            |b, &num_actions| b.iter(|| black_box(registry(num_actions))),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_threaded_admission,
    bench_concurrent_admission,
    bench_registry_build,
);
criterion_main!(benches);
