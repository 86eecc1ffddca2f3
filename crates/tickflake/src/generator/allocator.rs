#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Options, Result, SnowflakeId,
    generator::{Mutex, SequenceState},
    time::{CachedClock, SystemClock, TickSource},
};

/// Allocator reading the wall clock on every call.
pub type ClassicAllocator = Allocator<SystemClock>;

/// Allocator reading a tick published by a background thread.
pub type FastAllocator = Allocator<CachedClock>;

/// A lock-based Snowflake ID allocator over any [`TickSource`].
///
/// Owns one [`Options`], one [`SequenceState`] behind its own mutex, and one
/// clock. The clock is read while the lock is held, so the order IDs come
/// out in is the order callers acquired the lock in, and a thread preempted
/// between reading the clock and taking the lock can never be mistaken for
/// clock regression.
///
/// Allocators share nothing with each other: two workers never contend on
/// the same lock.
///
/// ## See Also
/// - [`Generator`], which picks the clock from [`Options::strategy`]
///
/// [`Generator`]: crate::Generator
#[derive(Debug)]
pub struct Allocator<C>
where
    C: TickSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<SequenceState>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<SequenceState>,
    options: Options,
    clock: C,
}

impl<C> Allocator<C>
where
    C: TickSource,
{
    /// Creates an allocator that has issued nothing yet.
    ///
    /// The clock must count ticks from `options.epoch()`; the allocator
    /// embeds whatever it reports.
    ///
    /// # Example
    /// ```
    /// use tickflake::{Allocator, Options, SystemClock};
    ///
    /// let options = Options::builder().worker_id(3).build().unwrap();
    /// let allocator = Allocator::new(options, SystemClock::with_epoch(options.epoch()));
    ///
    /// let id = allocator.next_id().unwrap();
    /// assert_eq!(options.decode(id).worker_id, 3);
    /// ```
    pub fn new(options: Options, clock: C) -> Self {
        let state = Mutex::new(SequenceState::new(options.layout()));
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(state),
            #[cfg(not(feature = "cache-padded"))]
            state,
            options,
            clock,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns a copy of the current sequence state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock is poisoned (only without
    /// the `parking-lot` feature).
    ///
    /// [`Error::LockPoisoned`]: crate::Error
    pub fn state(&self) -> Result<SequenceState> {
        #[cfg(feature = "parking-lot")]
        let state = self.state.lock();
        #[cfg(not(feature = "parking-lot"))]
        let state = self.state.lock()?;
        Ok(*state)
    }

    /// Issues the next ID.
    ///
    /// Blocks for at most one tick when the current tick's sequence space is
    /// used up.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackwards`] if the clock reports a tick before
    ///   the last issued one.
    /// - [`Error::TimestampOverflow`] if the tick no longer fits the layout.
    /// - [`Error::LockPoisoned`] if the lock is poisoned (only without the
    ///   `parking-lot` feature).
    ///
    /// The sequence state is unchanged whenever an error is returned.
    ///
    /// [`Error::ClockMovedBackwards`]: crate::Error::ClockMovedBackwards
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::LockPoisoned`]: crate::Error
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        #[cfg(feature = "parking-lot")]
        let mut state = self.state.lock();
        #[cfg(not(feature = "parking-lot"))]
        let mut state = self.state.lock()?;

        let now = self.clock.current_tick();
        let (tick, sequence) = state.advance(now, &self.clock)?;
        Ok(self.options.compose(tick, sequence))
    }
}
