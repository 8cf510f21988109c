use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use epoch_reclaim::EbrInstance;
use std::hint::black_box;
use std::thread;

fn bench_enter_exit(c: &mut Criterion) {
    c.bench_function("ebr_enter_exit", |b| {
        let (_sync, ebr) = EbrInstance::create();
        let reader = ebr.register();

        b.iter(|| {
            reader.enter();
            black_box(());
            reader.exit();
        });
    });

    c.bench_function("crossbeam_epoch_pin_unpin", |b| {
        b.iter(|| {
            let guard = crossbeam_epoch::pin();
            black_box(&guard);
        });
    });
}

fn bench_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("ebr_sync");

    for num_readers in [2, 4, 8, 16, 32].iter() {
        group.bench_with_input(
            BenchmarkId::new("idle_readers", num_readers),
            num_readers,
            |b, &num_readers| {
                let (mut sync, ebr) = EbrInstance::create();
                let _readers: Vec<_> = (0..num_readers).map(|_| ebr.register()).collect();

                b.iter(|| black_box(sync.sync()));
            },
        );
    }

    group.finish();
}

fn bench_reader_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("ebr_reader_registration");

    for num_readers in [2, 4, 8, 16].iter() {
        group.bench_with_input(
            BenchmarkId::new("readers", num_readers),
            num_readers,
            |b, &num_readers| {
                b.iter(|| {
                    let (_sync, ebr) = EbrInstance::create();

                    let handles: Vec<_> = (0..num_readers)
                        .map(|_| {
                            let ebr = ebr.clone();
                            thread::spawn(move || {
                                let reader = ebr.register();
                                reader.enter();
                                reader.exit();
                            })
                        })
                        .collect();

                    for handle in handles {
                        let _ = handle.join();
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("crossbeam_epoch", num_readers),
            num_readers,
            |b, &num_readers| {
                b.iter(|| {
                    let handles: Vec<_> = (0..num_readers)
                        .map(|_| {
                            thread::spawn(|| {
                                let guard = crossbeam_epoch::pin();
                                black_box(&guard);
                            })
                        })
                        .collect();

                    for handle in handles {
                        let _ = handle.join();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_enter_exit,
    bench_sync,
    bench_reader_registration
);
criterion_main!(benches);
