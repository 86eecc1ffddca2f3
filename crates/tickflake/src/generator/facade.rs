#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Error, Options, Result, SnowflakeId, Strategy,
    generator::{ClassicAllocator, FastAllocator},
    time::{CachedClock, SystemClock, unix_millis},
};

#[derive(Debug)]
enum Inner {
    Classic(ClassicAllocator),
    Fast(FastAllocator),
}

/// The ID generator handed to callers.
///
/// Wraps one [`Allocator`] whose clock is chosen by [`Options::strategy`]:
/// [`SystemClock`] for [`Strategy::Classic`], [`CachedClock`] for
/// [`Strategy::Fast`]. Both emit the same layout, so switching strategy
/// never changes what an ID means.
///
/// A `Generator` is `Send + Sync`; share it behind an `Arc` or a reference.
/// With [`Strategy::Fast`] the ticker thread lives exactly as long as the
/// generator.
///
/// # Example
/// ```
/// use std::{sync::Arc, thread};
/// use tickflake::{Generator, Options, Strategy};
///
/// let options = Options::builder()
///     .worker_id(5)
///     .strategy(Strategy::Fast)
///     .build()
///     .unwrap();
/// let generator = Arc::new(Generator::new(options).unwrap());
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let generator = Arc::clone(&generator);
///         thread::spawn(move || generator.next_id().unwrap())
///     })
///     .collect();
///
/// for handle in handles {
///     let id = handle.join().unwrap();
///     assert_eq!(options.decode(id).worker_id, 5);
/// }
/// ```
///
/// [`Allocator`]: crate::Allocator
#[derive(Debug)]
pub struct Generator {
    inner: Inner,
}

impl Generator {
    /// Builds a generator for `options`, starting the ticker thread when the
    /// strategy is [`Strategy::Fast`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the epoch is in the future or the
    /// time since the epoch already overflows the timestamp field.
    pub fn new(options: Options) -> Result<Self> {
        let now = unix_millis();
        let epoch = options.epoch_millis();
        if epoch > now {
            return Err(Error::invalid_config(format!(
                "epoch {epoch} ms is after the current time {now} ms"
            )));
        }

        let max = options.layout().max_timestamp();
        if now - epoch > max {
            return Err(Error::invalid_config(format!(
                "{} ms since the epoch exceed the {}-bit timestamp field (max {max})",
                now - epoch,
                options.layout().timestamp_bits()
            )));
        }

        let inner = match options.strategy() {
            Strategy::Classic => Inner::Classic(ClassicAllocator::new(
                options,
                SystemClock::with_epoch(options.epoch()),
            )),
            Strategy::Fast => Inner::Fast(FastAllocator::new(
                options,
                CachedClock::with_epoch(options.epoch()),
            )),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            worker_id = options.worker_id(),
            strategy = %options.strategy(),
            "generator ready"
        );

        Ok(Self { inner })
    }

    /// The options this generator encodes IDs with. Pass the returned value
    /// to [`Options::decode`] to take an ID apart.
    pub fn options(&self) -> &Options {
        match &self.inner {
            Inner::Classic(allocator) => allocator.options(),
            Inner::Fast(allocator) => allocator.options(),
        }
    }

    /// Issues the next ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockMovedBackwards`] if the wall clock was stepped
    /// back past the last issued ID, or [`Error::TimestampOverflow`] once the
    /// layout has rolled over. Neither is retried here; the generator's state
    /// is unchanged, so calling again after the clock recovers is safe.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        match &self.inner {
            Inner::Classic(allocator) => allocator.next_id(),
            Inner::Fast(allocator) => allocator.next_id(),
        }
    }
}
