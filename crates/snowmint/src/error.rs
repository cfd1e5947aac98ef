use core::{fmt, time::Duration};

/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Which identity field of a generator failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdField {
    Worker,
    Machine,
}

impl fmt::Display for IdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worker => f.write_str("worker_id"),
            Self::Machine => f.write_str("machine_id"),
        }
    }
}

/// Errors raised while building a generator or validating a [`Config`].
///
/// None of these are retryable: the caller has to supply different
/// identifiers or a different layout.
///
/// [`Config`]: crate::Config
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A worker or machine identifier does not fit the configured bit width.
    #[error("identifier out of range: {field} = {value} exceeds max {max}")]
    IdOutOfRange { field: IdField, value: u64, max: u64 },

    /// The bit widths leave no room for a timestamp, or one of them is zero.
    ///
    /// Every field needs at least one bit, and together the three fields may
    /// use at most 62 bits so that one timestamp bit and the sign bit remain.
    #[error(
        "invalid layout: worker_bits={worker_bits}, machine_bits={machine_bits}, \
         sequence_bits={sequence_bits}"
    )]
    InvalidLayout {
        worker_bits: u8,
        machine_bits: u8,
        sequence_bits: u8,
    },

    /// The poll interval used while waiting for the next millisecond is not
    /// finer than a millisecond.
    #[error("poll interval {0:?} must be shorter than one millisecond")]
    PollIntervalTooCoarse(Duration),
}

/// Errors raised by the clock checks in [`SnowflakeGenerator::next_id`].
///
/// The generator never substitutes a fallback timestamp. Its state is left
/// untouched, so a later call succeeds once the clock recovers.
///
/// [`SnowflakeGenerator::next_id`]: crate::SnowflakeGenerator::next_id
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ClockError {
    /// The clock reads earlier than the last issued timestamp.
    #[error("clock moved backwards: now {now} ms < last {last} ms")]
    MovedBackwards { now: u64, last: u64 },

    /// The clock reads earlier than the configured epoch.
    #[error("clock is before the epoch: now {now} ms < epoch {epoch} ms")]
    BeforeEpoch { now: u64, epoch: u64 },

    /// Time since the epoch no longer fits in the timestamp field.
    #[error("timestamp overflow: {elapsed} ms since epoch exceeds max {max}")]
    TimestampOverflow { elapsed: u64, max: u64 },
}

/// All errors that `snowmint` can produce.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Clock(#[from] ClockError),

    /// The generator lock was poisoned by a thread that panicked while
    /// holding it. Not available with `parking-lot`, whose mutex does not
    /// poison.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
// Collapse every poisoned guard into `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
