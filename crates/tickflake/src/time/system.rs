use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::time::{CUSTOM_EPOCH, TickSource};

/// Milliseconds since 1970-01-01 UTC according to the wall clock, or zero if
/// the wall clock is set before it.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, epoch_millis)
}

/// Converts an epoch to milliseconds, saturating at `u64::MAX` so an
/// over-large epoch reads as the far future instead of wrapping.
pub(crate) fn epoch_millis(epoch: Duration) -> u64 {
    u64::try_from(epoch.as_millis()).unwrap_or(u64::MAX)
}

/// A tick source that reads the wall clock on every call.
///
/// Always as fresh as the system clock's resolution allows, at the cost of
/// a clock read per ID. Used by [`Strategy::Classic`].
///
/// Reads before the epoch saturate to tick zero.
///
/// [`Strategy::Classic`]: crate::Strategy::Classic
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SystemClock {
    epoch_millis: u64,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::with_epoch(CUSTOM_EPOCH)
    }
}

impl SystemClock {
    /// Counts ticks from `epoch`, a [`Duration`] since 1970-01-01 UTC.
    pub fn with_epoch(epoch: Duration) -> Self {
        Self {
            epoch_millis: epoch_millis(epoch),
        }
    }

    pub const fn epoch_millis(&self) -> u64 {
        self.epoch_millis
    }
}

impl TickSource for SystemClock {
    fn current_tick(&self) -> u64 {
        unix_millis().saturating_sub(self.epoch_millis)
    }
}
