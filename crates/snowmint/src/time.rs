use core::time::Duration;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

/// Custom epoch: Wednesday, January 1, 2025 00:00:00 UTC
pub const CUSTOM_EPOCH: u64 = 1_735_689_600_000;

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: u64 = 1_288_834_974_657;

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: u64 = 1_420_070_400_000;

/// Instagram epoch: Saturday, January 1, 2011 00:00:00 UTC
pub const INSTAGRAM_EPOCH: u64 = 1_293_840_000_000;

/// A source of wall-clock milliseconds since the Unix epoch.
///
/// Generators sample it once per ID while holding their lock. Swap in a mock
/// to drive a generator through clock anomalies in tests.
///
/// # Example
///
/// ```
/// use snowmint::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since 1970-01-01 UTC.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// The operating system's wall clock.
///
/// Follows every adjustment of the system time, including steps backwards,
/// which generators report as [`ClockError::MovedBackwards`].
///
/// [`ClockError::MovedBackwards`]: crate::ClockError::MovedBackwards
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // A clock set before 1970 reads as zero, which every epoch rejects.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}

#[derive(Debug)]
struct SharedTicker {
    elapsed: AtomicU64,
}

/// A time source that never goes backwards.
///
/// The wall clock is read once at construction. From then on a background
/// thread advances a shared counter once per millisecond using [`Instant`],
/// so NTP steps and manual clock changes are invisible to generators. The
/// thread exits once every clone of the clock has been dropped.
///
/// Clones share the same ticker.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    inner: Arc<SharedTicker>,
    origin: u64, // wall-clock millis at construction
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Starts a ticker anchored at the current wall-clock time.
    pub fn new() -> Self {
        let start = Instant::now();
        let origin = SystemClock.current_millis();
        let inner = Arc::new(SharedTicker {
            elapsed: AtomicU64::new(0),
        });

        let weak = Arc::downgrade(&inner);
        thread::spawn(move || {
            let mut tick = 0;
            loop {
                let Some(ticker) = weak.upgrade() else {
                    break;
                };

                // Sleep until the absolute time of the next tick
                let target = start + Duration::from_millis(tick);
                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                let elapsed = start.elapsed().as_millis() as u64;
                ticker.elapsed.store(elapsed, Ordering::Release);
                tick = elapsed + 1;
            }
        });

        Self { inner, origin }
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.origin + self.inner.elapsed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_after_custom_epoch() {
        assert!(SystemClock.current_millis() > CUSTOM_EPOCH);
    }

    #[test]
    fn monotonic_clock_advances_and_never_regresses() {
        let clock = MonotonicClock::new();
        let first = clock.current_millis();
        let mut last = first;
        for _ in 0..1_000 {
            let now = clock.current_millis();
            assert!(now >= last);
            last = now;
        }

        thread::sleep(Duration::from_millis(10));
        assert!(clock.current_millis() > first);
    }

    #[test]
    fn monotonic_clock_tracks_wall_clock() {
        let clock = MonotonicClock::new();
        let wall = SystemClock.current_millis();
        // Both were anchored within the same few milliseconds.
        assert!(clock.current_millis().abs_diff(wall) < 1_000);
    }
}
