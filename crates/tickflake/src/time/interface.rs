use core::time::Duration;

/// Custom epoch: Wednesday, January 1, 2025 00:00:00 UTC
pub const CUSTOM_EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: Duration = Duration::from_millis(1_420_070_400_000);

/// Instagram epoch: Saturday, January 1, 2011 00:00:00 UTC
pub const INSTAGRAM_EPOCH: Duration = Duration::from_millis(1_293_840_000_000);

/// Mastodon uses standard UNIX epoch: Thursday, January 1, 1970 00:00:00 UTC
pub const MASTODON_EPOCH: Duration = Duration::from_millis(0);

/// A source of the current tick: milliseconds elapsed since a configured
/// epoch.
///
/// Consecutive reads must be non-decreasing while the underlying wall clock
/// behaves. A source is free to report a smaller value after the wall clock
/// is stepped back; the generator turns that into
/// [`Error::ClockMovedBackwards`].
///
/// # Example
///
/// ```
/// use tickflake::TickSource;
///
/// struct FixedTick;
/// impl TickSource for FixedTick {
///     fn current_tick(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTick.current_tick(), 1234);
/// ```
///
/// [`Error::ClockMovedBackwards`]: crate::Error::ClockMovedBackwards
pub trait TickSource {
    /// Returns the current tick.
    fn current_tick(&self) -> u64;

    /// Blocks until the tick is strictly greater than `after` and returns it.
    ///
    /// Called when a worker has used every sequence number of a tick. Under a
    /// correctly advancing clock this waits at most one tick.
    fn next_tick(&self, after: u64) -> u64 {
        loop {
            let tick = self.current_tick();
            if tick > after {
                return tick;
            }
            std::thread::yield_now();
        }
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn current_tick(&self) -> u64 {
        (**self).current_tick()
    }

    fn next_tick(&self, after: u64) -> u64 {
        (**self).next_tick(after)
    }
}
