use core::cmp::Ordering;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    ClockError, Config, ConfigError, IdField, Result, SnowflakeParts, SystemClock, TimeSource,
    generator::{Mutex, MutexGuard, Poll},
};

/// Sequencing state guarded by the generator lock.
#[derive(Debug, Default)]
struct State {
    /// Millisecond of the last issued ID. `None` until the first ID.
    last_timestamp: Option<u64>,
    sequence: u64,
}

/// What the next ID should carry, decided under the lock.
enum Step {
    Issue { timestamp: u64, sequence: u64 },
    Exhausted { last: u64 },
}

/// A lock-based Snowflake generator for one `(worker_id, machine_id)` pair.
///
/// Every call to [`next_id`] runs under a single mutex: the clock is sampled,
/// compared against the last issued millisecond, and the sequence advanced
/// before the lock is released. IDs from one generator are therefore strictly
/// increasing, and generators with distinct identity pairs never collide.
///
/// Share it across threads with an [`Arc`], or hand out instances through a
/// [`Registry`].
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Any layout accepted by [`Config::validate`]
/// - ✅ Reports clock regressions instead of guessing a timestamp
///
/// [`next_id`]: SnowflakeGenerator::next_id
/// [`Arc`]: std::sync::Arc
/// [`Registry`]: crate::Registry
#[derive(Debug)]
pub struct SnowflakeGenerator<T = SystemClock>
where
    T: TimeSource,
{
    worker_id: u64,
    machine_id: u64,
    config: Config,
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<State>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<State>,
    time: T,
}

impl SnowflakeGenerator<SystemClock> {
    /// Creates a generator that reads the operating system's wall clock.
    ///
    /// # Errors
    ///
    /// See [`SnowflakeGenerator::new`].
    pub fn with_system_clock(
        worker_id: u64,
        machine_id: u64,
        config: Config,
    ) -> Result<Self, ConfigError> {
        Self::new(worker_id, machine_id, config, SystemClock)
    }
}

impl<T> SnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator for the given identity pair.
    ///
    /// The identifiers are checked against the bounds derived from `config`,
    /// not against a fixed layout. No ID has been issued yet and the sequence
    /// starts at zero.
    ///
    /// # Errors
    ///
    /// - Any error from [`Config::validate`].
    /// - [`ConfigError::IdOutOfRange`] if `worker_id` or `machine_id` does
    ///   not fit its field.
    ///
    /// # Example
    ///
    /// ```
    /// use snowmint::{Config, ConfigError, SnowflakeGenerator, SystemClock};
    ///
    /// let config = Config::default();
    /// assert!(SnowflakeGenerator::new(31, 31, config, SystemClock).is_ok());
    /// assert!(matches!(
    ///     SnowflakeGenerator::new(32, 0, config, SystemClock),
    ///     Err(ConfigError::IdOutOfRange { .. })
    /// ));
    /// ```
    pub fn new(
        worker_id: u64,
        machine_id: u64,
        config: Config,
        time: T,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        check_range(IdField::Worker, worker_id, config.max_worker_id())?;
        check_range(IdField::Machine, machine_id, config.max_machine_id())?;

        Ok(Self {
            worker_id,
            machine_id,
            config,
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(State::default())),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(State::default()),
            time,
        })
    }

    /// Worker ID stamped into every ID from this generator.
    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// Machine ID stamped into every ID from this generator.
    pub fn machine_id(&self) -> u64 {
        self.machine_id
    }

    /// Layout this generator composes IDs with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Splits an ID issued under this generator's layout into its fields.
    pub fn decode(&self, id: i64) -> SnowflakeParts {
        self.config.decompose(id)
    }

    /// Generates the next ID, waiting out the current millisecond if its
    /// sequence is used up.
    ///
    /// When the sequence overflows, the generator keeps sampling the clock
    /// (spinning, or pausing for the configured sub-millisecond poll
    /// interval) until it reads a millisecond past the last one issued. That
    /// wait has no timeout and is invisible to the caller apart from latency.
    ///
    /// # Errors
    ///
    /// - [`ClockError::MovedBackwards`] if the clock reads earlier than the
    ///   last issued millisecond. The generator stays usable.
    /// - [`ClockError::BeforeEpoch`] or [`ClockError::TimestampOverflow`] if
    ///   the time cannot be represented in the layout.
    /// - [`Error::LockPoisoned`] if another thread panicked while holding the
    ///   lock (std mutex only).
    ///
    /// # Example
    ///
    /// ```
    /// use snowmint::{Config, SnowflakeGenerator};
    ///
    /// let generator = SnowflakeGenerator::with_system_clock(3, 4, Config::default()).unwrap();
    /// let a = generator.next_id().unwrap();
    /// let b = generator.next_id().unwrap();
    /// assert!(a < b);
    ///
    /// let parts = generator.decode(b);
    /// assert_eq!((parts.worker_id, parts.machine_id), (3, 4));
    /// ```
    ///
    /// [`Error::LockPoisoned`]: crate::Error
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<i64> {
        let mut state = self.lock()?;
        let (timestamp, sequence) = match self.step(&state)? {
            Step::Issue {
                timestamp,
                sequence,
            } => (timestamp, sequence),
            Step::Exhausted { last } => (self.cold_wait_past(last), 0),
        };
        self.commit(&mut state, timestamp, sequence)
    }

    /// Generates the next ID without waiting.
    ///
    /// Behaves like [`next_id`](Self::next_id), except that an exhausted
    /// sequence returns [`Poll::Pending`] and leaves the state untouched.
    ///
    /// # Errors
    ///
    /// Same as [`next_id`](Self::next_id).
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let mut state = self.lock()?;
        match self.step(&state)? {
            Step::Issue {
                timestamp,
                sequence,
            } => Ok(Poll::Ready {
                id: self.commit(&mut state, timestamp, sequence)?,
            }),
            Step::Exhausted { .. } => Ok(Poll::Pending { yield_for: 1 }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }

    /// Samples the clock and decides the next `(timestamp, sequence)` pair.
    fn step(&self, state: &State) -> Result<Step, ClockError> {
        let now = self.time.current_millis();
        let Some(last) = state.last_timestamp else {
            return Ok(Step::Issue {
                timestamp: now,
                sequence: 0,
            });
        };

        match now.cmp(&last) {
            Ordering::Greater => Ok(Step::Issue {
                timestamp: now,
                sequence: 0,
            }),
            Ordering::Equal if state.sequence < self.config.max_sequence() => Ok(Step::Issue {
                timestamp: now,
                sequence: state.sequence + 1,
            }),
            Ordering::Equal => Ok(Step::Exhausted { last }),
            Ordering::Less => Err(self.cold_clock_behind(now, last)),
        }
    }

    /// Packs the ID, then records the pair. Nothing is recorded on error.
    fn commit(&self, state: &mut State, timestamp: u64, sequence: u64) -> Result<i64> {
        let id = self
            .config
            .compose(timestamp, self.worker_id, self.machine_id, sequence)?;
        state.last_timestamp = Some(timestamp);
        state.sequence = sequence;
        Ok(id)
    }

    /// Polls the clock at millisecond granularity until it passes `last`.
    #[cold]
    #[inline(never)]
    fn cold_wait_past(&self, last: u64) -> u64 {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            last,
            worker_id = self.worker_id,
            machine_id = self.machine_id,
            "sequence exhausted, waiting for next millisecond"
        );

        let interval = self.config.poll_interval();
        loop {
            let now = self.time.current_millis();
            if now > last {
                return now;
            }
            if interval.is_zero() {
                core::hint::spin_loop();
            } else {
                std::thread::sleep(interval);
            }
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(&self, now: u64, last: u64) -> ClockError {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            now,
            last,
            worker_id = self.worker_id,
            machine_id = self.machine_id,
            "clock moved backwards"
        );
        ClockError::MovedBackwards { now, last }
    }
}

fn check_range(field: IdField, value: u64, max: u64) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::IdOutOfRange { field, value, max });
    }
    Ok(())
}
