use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use epoch_reclaim::gc::{GcBox, GcInstance};
use std::hint::black_box;
use std::thread;

fn bench_limbo_retire(c: &mut Criterion) {
    c.bench_function("gc_limbo_retire", |b| {
        let (_cycle, gc) = GcInstance::create::<GcBox<u64>>();

        b.iter(|| {
            let boxed = GcBox::new(0u64);
            unsafe {
                gc.limbo(Box::into_raw(boxed) as *mut u8);
            }
        });
    });
}

fn bench_cycle_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("gc_cycle_drain");

    for batch_size in [16, 64, 256, 1024].iter() {
        group.bench_with_input(
            BenchmarkId::new("objects", batch_size),
            batch_size,
            |b, &batch_size| {
                let (mut cycle, gc) = GcInstance::create::<GcBox<u64>>();
                let _reader = gc.register();

                b.iter(|| {
                    for i in 0..batch_size {
                        let boxed = GcBox::new(i as u64);
                        unsafe {
                            gc.limbo(Box::into_raw(boxed) as *mut u8);
                        }
                    }
                    cycle.full(0);
                });
            },
        );
    }

    group.finish();
}

fn bench_concurrent_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("gc_concurrent_producers");

    for num_producers in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::new("producers", num_producers),
            num_producers,
            |b, &num_producers| {
                b.iter(|| {
                    let (mut cycle, gc) = GcInstance::create::<GcBox<u64>>();

                    let handles: Vec<_> = (0..num_producers)
                        .map(|_| {
                            let gc = gc.clone();
                            thread::spawn(move || {
                                let reader = gc.register();
                                for i in 0..100u64 {
                                    reader.crit_enter();
                                    let boxed = GcBox::new(i);
                                    unsafe {
                                        gc.limbo(Box::into_raw(boxed) as *mut u8);
                                    }
                                    reader.crit_exit();
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        let _ = handle.join();
                    }

                    cycle.full(0);
                    black_box(());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_limbo_retire,
    bench_cycle_drain,
    bench_concurrent_producers
);
criterion_main!(benches);
