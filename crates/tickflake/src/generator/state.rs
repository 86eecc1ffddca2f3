use core::cmp::Ordering;

use crate::{Error, Layout, Result, time::TickSource};

/// The mutable core of a generator: the tick of the last issued ID and the
/// sequence number used within it.
///
/// Lives behind the generator's lock for the generator's lifetime and is
/// never persisted. A rebuilt generator starts from a fresh state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SequenceState {
    last_tick: Option<u64>,
    sequence: u64,
    min_sequence: u64,
    max_sequence: u64,
    max_timestamp: u64,
}

impl SequenceState {
    /// A state that has issued nothing yet, bounded by `layout`.
    pub const fn new(layout: &Layout) -> Self {
        Self {
            last_tick: None,
            sequence: layout.min_sequence(),
            min_sequence: layout.min_sequence(),
            max_sequence: layout.max_sequence(),
            max_timestamp: layout.max_timestamp(),
        }
    }

    /// Tick of the most recently issued ID, `None` until the first one.
    pub const fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    /// Sequence number of the most recently issued ID.
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Claims the next `(tick, sequence)` pair given the observed tick `now`.
    ///
    /// - First call: the sequence starts at the minimum.
    /// - Same tick as last time: the sequence is incremented. If it would
    ///   pass the maximum, the sequence restarts at the minimum and `clock`
    ///   is waited on until it reports a later tick.
    /// - Later tick: the sequence restarts at the minimum.
    /// - Earlier tick: fails with [`Error::ClockMovedBackwards`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockMovedBackwards`] if `now` is before the last
    /// issued tick, or [`Error::TimestampOverflow`] if the tick does not fit
    /// the timestamp field. The state is untouched in both cases.
    pub fn advance(&mut self, now: u64, clock: &impl TickSource) -> Result<(u64, u64)> {
        let (tick, sequence) = match self.last_tick {
            None => (now, self.min_sequence),
            Some(last) => match now.cmp(&last) {
                Ordering::Equal if self.sequence < self.max_sequence => (now, self.sequence + 1),
                Ordering::Equal => (Self::cold_exhausted(now, clock), self.min_sequence),
                Ordering::Greater => (now, self.min_sequence),
                Ordering::Less => return Err(Self::cold_clock_behind(last, now)),
            },
        };

        if tick > self.max_timestamp {
            return Err(Self::cold_overflow(tick, self.max_timestamp));
        }

        self.last_tick = Some(tick);
        self.sequence = sequence;
        Ok((tick, sequence))
    }

    #[cold]
    #[inline(never)]
    fn cold_exhausted(now: u64, clock: &impl TickSource) -> u64 {
        let tick = clock.next_tick(now);
        debug_assert!(tick > now);
        tick
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(last: u64, now: u64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::warn!(last, now, behind = last - now, "clock moved backwards");
        Error::ClockMovedBackwards { last, now }
    }

    #[cold]
    #[inline(never)]
    fn cold_overflow(tick: u64, max: u64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::warn!(tick, max, "tick no longer fits the timestamp field");
        Error::TimestampOverflow { tick, max }
    }
}
