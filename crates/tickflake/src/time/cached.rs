use core::time::Duration;
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{SystemTime, UNIX_EPOCH},
};

use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::time::{CUSTOM_EPOCH, TickSource, epoch_millis, unix_millis};

/// State shared between the ticker thread and its readers.
#[derive(Debug)]
struct Ticker {
    #[cfg(feature = "cache-padded")]
    current: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    current: AtomicU64,
    stopped: AtomicBool,
}

/// A tick source backed by a background thread that republishes the wall
/// clock once per millisecond.
///
/// Reads are a single atomic load, which takes the clock syscall off the ID
/// hot path in exchange for up to one tick of staleness. Used by
/// [`Strategy::Fast`].
///
/// The ticker thread is the only writer. It is started by [`with_epoch`] and
/// stopped and joined when the clock is dropped, so a clock never outlives
/// its thread and vice versa.
///
/// # Example
///
/// ```
/// use std::time::{Duration, SystemTime, UNIX_EPOCH};
/// use tickflake::{CachedClock, TickSource};
///
/// let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
/// let clock = CachedClock::with_epoch(now);
///
/// let first = clock.current_tick();
/// let later = clock.next_tick(first);
/// assert!(later > first);
/// ```
///
/// [`Strategy::Fast`]: crate::Strategy::Fast
/// [`with_epoch`]: CachedClock::with_epoch
#[derive(Debug)]
pub struct CachedClock {
    inner: Arc<Ticker>,
    handle: Option<JoinHandle<()>>,
    epoch_millis: u64,
}

impl Default for CachedClock {
    fn default() -> Self {
        Self::with_epoch(CUSTOM_EPOCH)
    }
}

impl CachedClock {
    /// Counts ticks from `epoch`, a [`Duration`] since 1970-01-01 UTC, and
    /// starts the ticker thread.
    ///
    /// The first tick is published before this returns, so reads are valid
    /// immediately.
    pub fn with_epoch(epoch: Duration) -> Self {
        let epoch_millis = epoch_millis(epoch);
        let inner = Arc::new(Ticker {
            current: AtomicU64::new(unix_millis().saturating_sub(epoch_millis)).into(),
            stopped: AtomicBool::new(false),
        });

        let ticker = Arc::clone(&inner);
        let handle = thread::spawn(move || {
            while !ticker.stopped.load(Ordering::Acquire) {
                thread::sleep(until_next_millisecond());

                // Plain store: a wall clock stepped back must stay visible to
                // the generator.
                let tick = unix_millis().saturating_sub(epoch_millis);
                ticker.current.store(tick, Ordering::Release);
            }
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(epoch_millis, "cached clock ticker started");

        Self {
            inner,
            handle: Some(handle),
            epoch_millis,
        }
    }

    pub const fn epoch_millis(&self) -> u64 {
        self.epoch_millis
    }

    /// Returns `true` while the ticker thread is publishing.
    pub fn is_running(&self) -> bool {
        !self.inner.stopped.load(Ordering::Acquire)
            && self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn stop(&mut self) {
        self.inner.stopped.store(true, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return;
        };

        // The ticker sleeps at most one millisecond between checks.
        if handle.join().is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!("cached clock ticker panicked");
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(epoch_millis = self.epoch_millis, "cached clock ticker stopped");
    }
}

impl Drop for CachedClock {
    fn drop(&mut self) {
        self.stop();
    }
}

impl TickSource for CachedClock {
    fn current_tick(&self) -> u64 {
        self.inner.current.load(Ordering::Acquire)
    }
}

/// Time left until the wall clock crosses its next millisecond boundary.
fn until_next_millisecond() -> Duration {
    let sub_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.subsec_nanos() % 1_000_000);
    Duration::from_nanos(u64::from(1_000_000 - sub_millis))
}
