use std::{collections::HashSet, thread::scope};

use portable_atomic::{AtomicU64, Ordering};

use crate::{
    Allocator, Error, Generator, Options, SnowflakeId, Strategy, SystemClock, TickSource,
    time::unix_millis,
};

/// A clock that only moves when told to, or when a generator waits for the
/// next tick.
struct ManualTick {
    tick: AtomicU64,
}

impl ManualTick {
    fn at(tick: u64) -> Self {
        Self {
            tick: AtomicU64::new(tick),
        }
    }

    fn set(&self, tick: u64) {
        self.tick.store(tick, Ordering::SeqCst);
    }
}

impl TickSource for ManualTick {
    fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    fn next_tick(&self, after: u64) -> u64 {
        self.tick.fetch_max(after + 1, Ordering::SeqCst).max(after + 1)
    }
}

fn options(worker_id: u64, sequence_bits: u32) -> Options {
    Options::builder()
        .epoch_millis(1_609_459_200_000)
        .worker_id(worker_id)
        .sequence_bits(sequence_bits)
        .build()
        .unwrap()
}

fn recent_epoch_options(strategy: Strategy, sequence_bits: u32) -> Options {
    Options::builder()
        .epoch_millis(unix_millis() - 60_000)
        .worker_id(5)
        .sequence_bits(sequence_bits)
        .strategy(strategy)
        .build()
        .unwrap()
}

fn run_sequence_increments_within_same_tick<C: TickSource>(allocator: &Allocator<C>) {
    let options = *allocator.options();
    let id1 = allocator.next_id().unwrap();
    let id2 = allocator.next_id().unwrap();
    let id3 = allocator.next_id().unwrap();

    for (id, sequence) in [(id1, 0), (id2, 1), (id3, 2)] {
        let parts = options.decode(id);
        assert_eq!(parts.tick_offset, 42);
        assert_eq!(parts.sequence, sequence);
    }
    assert!(id1 < id2 && id2 < id3);
}

fn run_sequence_rollover(allocator: &Allocator<&ManualTick>) {
    let options = *allocator.options();
    let max_sequence = options.layout().max_sequence();
    let start = allocator.clock().current_tick();

    let mut seen = HashSet::new();
    for i in 0..=max_sequence {
        let parts = options.decode(allocator.next_id().unwrap());
        assert_eq!(parts.sequence, i);
        assert_eq!(parts.tick_offset, start);
        assert!(seen.insert(parts.sequence));
    }
    assert_eq!(seen.len() as u64, max_sequence + 1);

    // Sequence space for the starting tick is gone; the allocator waits for
    // the next one.
    let parts = options.decode(allocator.next_id().unwrap());
    assert_eq!(parts.tick_offset, start + 1);
    assert_eq!(parts.sequence, options.layout().min_sequence());
    assert_eq!(allocator.clock().current_tick(), start + 1);
}

fn run_unique_and_increasing(generator: &Generator, total: usize) {
    let mut last = None::<SnowflakeId>;
    let mut seen = HashSet::with_capacity(total);
    for _ in 0..total {
        let id = generator.next_id().unwrap();
        if let Some(last) = last {
            assert!(id > last, "{id:?} not after {last:?}");
        }
        assert!(seen.insert(id));
        last = Some(id);
    }
}

fn run_unique_threaded(generator: &Generator) {
    const THREADS: usize = 8;
    const IDS_PER_THREAD: usize = 4096 * 16;

    let per_thread: Vec<Vec<SnowflakeId>> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    let mut ids = Vec::with_capacity(IDS_PER_THREAD);
                    for _ in 0..IDS_PER_THREAD {
                        ids.push(generator.next_id().unwrap());
                    }
                    ids
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut seen = HashSet::with_capacity(THREADS * IDS_PER_THREAD);
    for ids in &per_thread {
        // Lock order is consistent with each thread's own call order.
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        for id in ids {
            assert!(seen.insert(*id), "duplicate {id:?}");
        }
    }
    assert_eq!(seen.len(), THREADS * IDS_PER_THREAD);
}

fn run_decode_round_trip(strategy: Strategy) {
    let options = recent_epoch_options(strategy, 12);
    let generator = Generator::new(options).unwrap();
    let clock = SystemClock::with_epoch(options.epoch());

    for _ in 0..1024 {
        let before = clock.current_tick();
        let id = generator.next_id().unwrap();
        let after = clock.current_tick();

        let parts = options.decode(id);
        assert_eq!(parts.worker_id, 5);
        // The cached clock trails the wall clock by up to a tick, more if the
        // ticker thread is descheduled.
        assert!(parts.tick_offset + 50 >= before);
        assert!(parts.tick_offset <= after + 1);
        assert_eq!(options.compose(parts.tick_offset, parts.sequence), id);
    }
}

#[test]
fn allocator_sequence_increments_within_same_tick() {
    let clock = ManualTick::at(42);
    run_sequence_increments_within_same_tick(&Allocator::new(options(1, 12), &clock));
}

#[test]
fn allocator_handles_rollover() {
    let clock = ManualTick::at(42);
    run_sequence_rollover(&Allocator::new(options(1, 12), &clock));
}

#[test]
fn allocator_handles_rollover_with_narrow_sequence() {
    let clock = ManualTick::at(42);
    run_sequence_rollover(&Allocator::new(options(1, 2), &clock));
}

#[test]
fn allocator_handles_rollover_from_tick_zero() {
    let clock = ManualTick::at(0);
    run_sequence_rollover(&Allocator::new(options(1, 2), &clock));
}

#[test]
fn allocator_resets_sequence_on_new_tick() {
    let clock = ManualTick::at(42);
    let allocator = Allocator::new(options(1, 12), &clock);
    let layout = *allocator.options().layout();

    allocator.next_id().unwrap();
    allocator.next_id().unwrap();
    clock.set(50);

    let parts = layout.decompose(allocator.next_id().unwrap());
    assert_eq!(parts.tick_offset, 50);
    assert_eq!(parts.sequence, layout.min_sequence());
}

#[test]
fn allocator_rejects_clock_regression_and_recovers() {
    let clock = ManualTick::at(42);
    let allocator = Allocator::new(options(1, 12), &clock);

    allocator.next_id().unwrap();
    allocator.next_id().unwrap();
    let before = allocator.state().unwrap();

    clock.set(41);
    assert_eq!(
        allocator.next_id(),
        Err(Error::ClockMovedBackwards { last: 42, now: 41 })
    );
    assert_eq!(
        allocator.next_id().unwrap_err(),
        Error::ClockMovedBackwards { last: 42, now: 41 }
    );
    assert_eq!(allocator.state().unwrap(), before);
    assert_eq!(before.last_tick(), Some(42));
    assert_eq!(before.sequence(), 1);

    // Clock corrected back to the last tick: the sequence carries on.
    clock.set(42);
    let parts = allocator.options().decode(allocator.next_id().unwrap());
    assert_eq!((parts.tick_offset, parts.sequence), (42, 2));

    clock.set(43);
    let parts = allocator.options().decode(allocator.next_id().unwrap());
    assert_eq!((parts.tick_offset, parts.sequence), (43, 0));
}

#[test]
fn allocator_rejects_timestamp_overflow() {
    let options = Options::builder()
        .timestamp_bits(8)
        .worker_id(1)
        .build()
        .unwrap();
    let clock = ManualTick::at(255);
    let allocator = Allocator::new(options, &clock);

    allocator.next_id().unwrap();
    let before = allocator.state().unwrap();

    clock.set(256);
    assert_eq!(
        allocator.next_id(),
        Err(Error::TimestampOverflow { tick: 256, max: 255 })
    );
    assert_eq!(allocator.state().unwrap(), before);
}

#[test]
fn allocators_for_different_workers_do_not_interact() {
    let clock = ManualTick::at(42);
    let a = Allocator::new(options(1, 12), &clock);
    let b = Allocator::new(options(2, 12), &clock);

    let a1 = a.next_id().unwrap();
    let a2 = a.next_id().unwrap();
    let b1 = b.next_id().unwrap();

    assert_eq!(a.options().decode(a1).sequence, 0);
    assert_eq!(a.options().decode(a2).sequence, 1);
    assert_eq!(b.options().decode(b1).sequence, 0);
    assert_eq!(b.options().decode(b1).worker_id, 2);
    assert_ne!(a1, b1);
}

#[test]
fn same_tick_ids_differ_only_in_sequence() {
    let clock = ManualTick::at(1_000);
    let allocator = Allocator::new(options(5, 12), &clock);
    let layout = allocator.options().layout();
    assert_eq!(layout.timestamp_bits(), 41);
    assert_eq!(layout.worker_id_bits(), 10);

    let first = allocator.next_id().unwrap().to_raw();
    let second = allocator.next_id().unwrap().to_raw();

    assert_eq!((second & 0xFFF) - (first & 0xFFF), 1);
    assert_eq!((first >> 12) & 0x3FF, 5);
    assert_eq!((second >> 12) & 0x3FF, 5);
    assert_eq!(first >> 22, second >> 22);
}

#[test]
fn generator_same_tick_pairs_differ_by_one() {
    for strategy in [Strategy::Classic, Strategy::Fast] {
        let options = Options::builder()
            .epoch_millis(1_609_459_200_000)
            .worker_id(5)
            .strategy(strategy)
            .build()
            .unwrap();
        let generator = Generator::new(options).unwrap();
        let ids: Vec<u64> = (0..4096)
            .map(|_| generator.next_id().unwrap().to_raw())
            .collect();

        let mut same_tick_pairs = 0;
        for pair in ids.windows(2) {
            assert_eq!((pair[0] >> 12) & 0x3FF, 5);
            if pair[0] >> 22 == pair[1] >> 22 {
                assert_eq!((pair[1] & 0xFFF) - (pair[0] & 0xFFF), 1);
                same_tick_pairs += 1;
            }
        }
        // 4096 calls cannot each land in a different millisecond.
        assert!(same_tick_pairs > 0);
    }
}

#[test]
fn generator_classic_unique_and_increasing() {
    let generator = Generator::new(recent_epoch_options(Strategy::Classic, 12)).unwrap();
    run_unique_and_increasing(&generator, 4096 * 64);
}

#[test]
fn generator_fast_unique_and_increasing() {
    let generator = Generator::new(recent_epoch_options(Strategy::Fast, 12)).unwrap();
    run_unique_and_increasing(&generator, 4096 * 64);
}

#[test]
fn generator_waits_through_exhausted_ticks() {
    for strategy in [Strategy::Classic, Strategy::Fast] {
        // Two IDs per tick forces a wait on nearly every other call.
        let generator = Generator::new(recent_epoch_options(strategy, 1)).unwrap();
        run_unique_and_increasing(&generator, 200);
    }
}

#[test]
fn generator_classic_unique_threaded() {
    let generator = Generator::new(recent_epoch_options(Strategy::Classic, 12)).unwrap();
    run_unique_threaded(&generator);
}

#[test]
fn generator_fast_unique_threaded() {
    let generator = Generator::new(recent_epoch_options(Strategy::Fast, 12)).unwrap();
    run_unique_threaded(&generator);
}

#[test]
fn generator_classic_decode_round_trip() {
    run_decode_round_trip(Strategy::Classic);
}

#[test]
fn generator_fast_decode_round_trip() {
    run_decode_round_trip(Strategy::Fast);
}

#[test]
fn generator_rejects_future_epoch() {
    let options = Options::builder()
        .epoch_millis(unix_millis() + 3_600_000)
        .build()
        .unwrap();
    assert!(matches!(
        Generator::new(options),
        Err(Error::InvalidConfig { .. })
    ));
}

#[test]
fn generator_rejects_rolled_over_layout() {
    // 2^20 ms is about 17 minutes; the Unix epoch is long past that.
    let options = Options::builder()
        .epoch_millis(0)
        .timestamp_bits(20)
        .build()
        .unwrap();
    let err = Generator::new(options).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
    assert!(err.to_string().contains("20-bit"));
}

#[test]
fn generator_exposes_its_options() {
    let options = recent_epoch_options(Strategy::Fast, 12);
    let generator = Generator::new(options).unwrap();
    assert_eq!(generator.options(), &options);
}

#[test]
fn generator_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Generator>();
}

/// A clock that panics on its first read, while the allocator holds its lock.
#[cfg(not(feature = "parking-lot"))]
struct PanicOnceTick {
    panicked: portable_atomic::AtomicBool,
}

#[cfg(not(feature = "parking-lot"))]
impl TickSource for PanicOnceTick {
    fn current_tick(&self) -> u64 {
        assert!(
            self.panicked.swap(true, Ordering::SeqCst),
            "clock failed while the lock was held"
        );
        42
    }
}

#[cfg(not(feature = "parking-lot"))]
#[test]
fn allocator_reports_poisoned_lock() {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    let clock = PanicOnceTick {
        panicked: portable_atomic::AtomicBool::new(false),
    };
    let allocator = Allocator::new(options(1, 12), &clock);

    let result = catch_unwind(AssertUnwindSafe(|| allocator.next_id()));
    assert!(result.is_err());

    assert_eq!(allocator.next_id(), Err(Error::LockPoisoned));
    assert_eq!(allocator.state(), Err(Error::LockPoisoned));
}
