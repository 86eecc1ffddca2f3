/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `tickflake` can produce.
///
/// Configuration problems surface once, when [`Options`] are built. Every
/// other variant is returned from [`Generator::next_id`] and leaves the
/// generator's sequence state exactly as it was, so the caller may retry.
///
/// [`Options`]: crate::Options
/// [`Generator::next_id`]: crate::Generator::next_id
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The options describe a layout or worker id that cannot be encoded.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// The clock reported a tick earlier than the last issued ID.
    ///
    /// Only a wall-clock adjustment can cause this. The generator does not
    /// retry on its own.
    #[error("clock moved backwards: last tick {last}, observed tick {now}")]
    ClockMovedBackwards { last: u64, now: u64 },

    /// The tick no longer fits in the configured timestamp field.
    #[error("timestamp overflow: tick {tick} exceeds the maximum of {max}")]
    TimestampOverflow { tick: u64, max: u64 },

    /// Another thread panicked while holding the generator's lock.
    ///
    /// When the `parking-lot` feature is enabled, mutexes do **not** poison,
    /// so this variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
