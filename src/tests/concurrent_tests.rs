//! Multi-threaded tests: concurrent registration, concurrent `checkpoint`/
//! `enter`/`exit` from many readers, and multi-producer limbo, many threads
//! retiring concurrently into the same lock-free inbox while a single
//! drainer cycles.

use crate::ebr::EbrInstance;
use crate::gc::{GcBox, GcInstance};
use crate::qsbr::QsbrInstance;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn qsbr_many_readers_checkpoint_concurrently() {
    let qsbr = QsbrInstance::create();
    let target = qsbr.barrier();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let qsbr = qsbr.clone();
            thread::spawn(move || {
                let reader = qsbr.register();
                reader.checkpoint();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let writer = qsbr.register();
    assert!(writer.sync(target));
}

#[test]
fn ebr_many_readers_enter_exit_concurrently_while_syncing() {
    let (mut sync, ebr) = EbrInstance::create();
    let barrier = Arc::new(std::sync::Barrier::new(9));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ebr = ebr.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let reader = ebr.register();
                barrier.wait();
                for _ in 0..200 {
                    reader.enter();
                    reader.exit();
                }
            })
        })
        .collect();

    barrier.wait();
    for _ in 0..50 {
        sync.sync();
    }

    for h in handles {
        h.join().unwrap();
    }
}

// Many concurrent producers retiring into the same limbo inbox, single
// drainer thread.
#[test]
fn gc_multi_producer_limbo_all_objects_eventually_reclaimed() {
    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    struct Counted;
    impl Drop for Counted {
        fn drop(&mut self) {
            DESTROYED.fetch_add(1, Ordering::SeqCst);
        }
    }

    let (mut cycle, gc) = GcInstance::create::<GcBox<Counted>>();
    let producers = 8;
    let per_producer = 500;

    let handles: Vec<_> = (0..producers)
        .map(|_| {
            let gc = gc.clone();
            thread::spawn(move || {
                let reader = gc.register();
                for _ in 0..per_producer {
                    reader.crit_enter();
                    let boxed = GcBox::new(Counted);
                    unsafe {
                        gc.limbo(Box::into_raw(boxed) as *mut u8);
                    }
                    reader.crit_exit();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    cycle.full(0);
    assert_eq!(DESTROYED.load(Ordering::SeqCst), producers * per_producer);
}

#[test]
fn gc_drainer_runs_concurrently_with_producers() {
    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    struct Counted;
    impl Drop for Counted {
        fn drop(&mut self) {
            DESTROYED.fetch_add(1, Ordering::SeqCst);
        }
    }

    let (mut cycle, gc) = GcInstance::create::<GcBox<Counted>>();
    let total = 2_000;

    let producer_gc = gc.clone();
    let producer = thread::spawn(move || {
        let reader = producer_gc.register();
        for _ in 0..total {
            reader.crit_enter();
            let boxed = GcBox::new(Counted);
            unsafe {
                producer_gc.limbo(Box::into_raw(boxed) as *mut u8);
            }
            reader.crit_exit();
        }
    });

    // Drain opportunistically while the producer is still running.
    while !producer.is_finished() {
        cycle.cycle();
    }
    producer.join().unwrap();

    cycle.full(0);
    assert_eq!(DESTROYED.load(Ordering::SeqCst), total);
}
