//! # Hot-path throughput — log shipper buffer
//!
//! **Scenario**: a burst of events is buffered and drained through the
//! queue, the way a log shipper absorbs a spike. The hot tier is small
//! enough that most of the burst spills.
//!
//! Baseline: a plain `crossbeam-channel` bounded channel doing the same
//! push/pop volume with no tiering and no cancellation plumbing — the
//! price of the two-tier machinery is the gap between the bars.

use criterion::{Criterion, criterion_group, criterion_main};
use spillway::{CancelToken, MemoryQueue, Mode, TieredQueue, Wait};

const ITEMS: usize = 10_000;
const HOT: usize = 256;

fn bench_tiered(c: &mut Criterion, name: &str, mode: Mode) {
    c.bench_function(name, |b| {
        b.iter(|| {
            let queue = TieredQueue::new(
                MemoryQueue::bounded(HOT),
                MemoryQueue::unbounded(),
                mode,
            );
            let token = CancelToken::never();
            for i in 0..ITEMS {
                queue.try_push(i, Wait::NoWait, token).unwrap();
            }
            for _ in 0..ITEMS {
                queue.try_pop(Wait::NoWait, token).unwrap();
            }
        })
    });
}

fn bench_baseline(c: &mut Criterion) {
    c.bench_function("crossbeam_bounded", |b| {
        b.iter(|| {
            let (tx, rx) = crossbeam_channel::bounded(ITEMS);
            for i in 0..ITEMS {
                tx.send(i).unwrap();
            }
            for _ in 0..ITEMS {
                rx.recv().unwrap();
            }
        })
    });
}

fn benches(c: &mut Criterion) {
    bench_tiered(c, "tiered_ordered", Mode::Ordered);
    bench_tiered(c, "tiered_hot_first", Mode::HotFirst);
    bench_baseline(c);
}

criterion_group!(all, benches);
criterion_main!(all);
