//! Allocator benchmarks: pool classes against the system allocator.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mpool_core::Mpool;

fn bench_alloc_repool_cycle(c: &mut Criterion) {
    let sizes: &[usize] = &[16, 64, 256, 1024, 4096, 32768];
    let mut group = c.benchmark_group("alloc_repool_cycle");

    for &size in sizes {
        group.bench_with_input(BenchmarkId::new("mpool", size), &size, |b, &sz| {
            let mut pool = Mpool::new(3, 16).unwrap();
            b.iter(|| {
                let ptr = pool.alloc(sz).unwrap();
                criterion::black_box(ptr);
                // SAFETY: ptr came from this pool this iteration.
                unsafe { pool.repool(ptr) };
            });
        });
        group.bench_with_input(BenchmarkId::new("system", size), &size, |b, &sz| {
            b.iter(|| {
                let v = vec![0u8; sz];
                criterion::black_box(v);
            });
        });
    }
    group.finish();
}

fn bench_alloc_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_burst");

    group.bench_function("mpool_1000x64B", |b| {
        let mut pool = Mpool::new(3, 16).unwrap();
        b.iter(|| {
            let ptrs: Vec<_> = (0..1000).map(|_| pool.alloc(64).unwrap()).collect();
            for ptr in ptrs {
                // SAFETY: every ptr came from this pool this iteration.
                unsafe { pool.repool(ptr) };
            }
        });
    });
    group.bench_function("system_1000x64B", |b| {
        b.iter(|| {
            let allocs: Vec<Vec<u8>> = (0..1000).map(|_| vec![0u8; 64]).collect();
            criterion::black_box(allocs);
        });
    });

    group.finish();
}

fn bench_fastbin_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("fastbin_churn");

    // Tiny same-class objects freed and immediately re-requested: the
    // workload the fastbin exists for.
    group.bench_function("mpool_16B", |b| {
        let mut pool = Mpool::new(3, 16).unwrap();
        let warm = pool.alloc(12).unwrap();
        // SAFETY: warm came from this pool.
        unsafe { pool.repool(warm) };
        b.iter(|| {
            let a = pool.alloc(12).unwrap();
            let b2 = pool.alloc(12).unwrap();
            // SAFETY: both came from this pool this iteration.
            unsafe {
                pool.repool(b2);
                pool.repool(a);
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_alloc_repool_cycle,
    bench_alloc_burst,
    bench_fastbin_churn
);
criterion_main!(benches);
