use core::time::Duration;

use crate::{ClockError, ConfigError, CUSTOM_EPOCH, SnowflakeParts};

/// Bits available to an ID. The sign bit of the `i64` is always zero.
const ID_BITS: u32 = 63;

/// Bit layout and timing parameters shared by every generator built from it.
///
/// An ID packs four fields, from most to least significant bit:
///
/// ```text
///  +--------------+----------------+---------------+----------------+-----------------+
///  | reserved (1) | timestamp (*)  | worker (w)    | machine (m)    | sequence (s)    |
///  +--------------+----------------+---------------+----------------+-----------------+
///  |<---- MSB -------------------- 64 bits ---------------------------------- LSB ---->|
/// ```
///
/// The timestamp field stores milliseconds elapsed since [`Config::epoch`]
/// and takes whatever bits the other three fields leave over.
///
/// The default is the familiar 41/5/5/12 split anchored at [`CUSTOM_EPOCH`].
///
/// # Example
///
/// ```
/// use snowmint::{Config, TWITTER_EPOCH};
///
/// let config = Config::new(TWITTER_EPOCH, 5, 5, 12);
/// assert_eq!(config.max_worker_id(), 31);
/// assert_eq!(config.max_sequence(), 4095);
/// assert_eq!(config.timestamp_bits(), 41);
/// assert!(config.validate().is_ok());
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Config {
    epoch: u64,
    worker_bits: u8,
    machine_bits: u8,
    sequence_bits: u8,
    poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(CUSTOM_EPOCH, 5, 5, 12)
    }
}

impl Config {
    /// Creates a layout from an epoch (milliseconds since the Unix epoch) and
    /// the widths of the worker, machine and sequence fields.
    ///
    /// The result is not validated here; [`SnowflakeGenerator::new`] calls
    /// [`Config::validate`] before using it.
    ///
    /// [`SnowflakeGenerator::new`]: crate::SnowflakeGenerator::new
    pub const fn new(epoch: u64, worker_bits: u8, machine_bits: u8, sequence_bits: u8) -> Self {
        Self {
            epoch,
            worker_bits,
            machine_bits,
            sequence_bits,
            poll_interval: Duration::ZERO,
        }
    }

    /// Returns a copy with a different epoch.
    #[must_use]
    pub const fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Returns a copy with a different pause between clock samples while a
    /// generator waits for the next millisecond.
    ///
    /// `Duration::ZERO` spins with [`core::hint::spin_loop`]. Anything else
    /// must be shorter than a millisecond.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Checks that the layout fits a signed 64-bit integer and that the poll
    /// interval keeps millisecond granularity.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidLayout`] if any width is zero or the widths
    ///   leave no bit for the timestamp.
    /// - [`ConfigError::PollIntervalTooCoarse`] if the poll interval is one
    ///   millisecond or longer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let widths = [self.worker_bits, self.machine_bits, self.sequence_bits];
        if widths.contains(&0) || self.field_bits() >= ID_BITS {
            return Err(ConfigError::InvalidLayout {
                worker_bits: self.worker_bits,
                machine_bits: self.machine_bits,
                sequence_bits: self.sequence_bits,
            });
        }
        if self.poll_interval >= Duration::from_millis(1) {
            return Err(ConfigError::PollIntervalTooCoarse(self.poll_interval));
        }
        Ok(())
    }

    /// Milliseconds since the Unix epoch that timestamps are measured from.
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Width of the worker ID field.
    pub const fn worker_bits(&self) -> u8 {
        self.worker_bits
    }

    /// Width of the machine ID field.
    pub const fn machine_bits(&self) -> u8 {
        self.machine_bits
    }

    /// Width of the per-millisecond sequence field.
    pub const fn sequence_bits(&self) -> u8 {
        self.sequence_bits
    }

    /// Pause between clock samples while waiting for the next millisecond.
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Width of the timestamp field: the bits left after the other fields.
    pub const fn timestamp_bits(&self) -> u32 {
        ID_BITS.saturating_sub(self.field_bits())
    }

    /// Largest worker ID the layout can hold.
    pub const fn max_worker_id(&self) -> u64 {
        mask(self.worker_bits as u32)
    }

    /// Largest machine ID the layout can hold.
    pub const fn max_machine_id(&self) -> u64 {
        mask(self.machine_bits as u32)
    }

    /// Largest sequence number issued within one millisecond.
    pub const fn max_sequence(&self) -> u64 {
        mask(self.sequence_bits as u32)
    }

    /// Largest number of milliseconds since the epoch the layout can hold.
    pub const fn max_timestamp(&self) -> u64 {
        mask(self.timestamp_bits())
    }

    /// Bit offset of the machine ID field.
    pub const fn machine_shift(&self) -> u32 {
        self.sequence_bits as u32
    }

    /// Bit offset of the worker ID field.
    pub const fn worker_shift(&self) -> u32 {
        self.machine_shift() + self.machine_bits as u32
    }

    /// Bit offset of the timestamp field.
    pub const fn timestamp_shift(&self) -> u32 {
        self.worker_shift() + self.worker_bits as u32
    }

    /// Packs the fields into an ID.
    ///
    /// `timestamp` is absolute (milliseconds since the Unix epoch).
    ///
    /// `worker_id`, `machine_id` and `sequence` are masked to their widths
    /// and excess high bits are silently dropped. An out-of-range worker ID
    /// therefore wraps onto another worker's value. Only
    /// [`SnowflakeGenerator::new`] checks identifiers against the layout, so
    /// callers composing IDs directly must keep them within
    /// [`max_worker_id`](Self::max_worker_id),
    /// [`max_machine_id`](Self::max_machine_id) and
    /// [`max_sequence`](Self::max_sequence) themselves.
    ///
    /// # Errors
    ///
    /// - [`ClockError::BeforeEpoch`] if `timestamp` precedes the epoch.
    /// - [`ClockError::TimestampOverflow`] if the elapsed time does not fit
    ///   the timestamp field.
    ///
    /// [`SnowflakeGenerator::new`]: crate::SnowflakeGenerator::new
    pub fn compose(
        &self,
        timestamp: u64,
        worker_id: u64,
        machine_id: u64,
        sequence: u64,
    ) -> Result<i64, ClockError> {
        let elapsed = timestamp
            .checked_sub(self.epoch)
            .ok_or(ClockError::BeforeEpoch {
                now: timestamp,
                epoch: self.epoch,
            })?;
        let max = self.max_timestamp();
        if elapsed > max {
            return Err(ClockError::TimestampOverflow { elapsed, max });
        }

        let raw = shl(elapsed, self.timestamp_shift())
            | shl(worker_id & self.max_worker_id(), self.worker_shift())
            | shl(machine_id & self.max_machine_id(), self.machine_shift())
            | (sequence & self.max_sequence());
        // The top bit stays clear: elapsed fits in `timestamp_bits`.
        Ok(raw as i64)
    }

    /// Splits an ID produced under this layout back into its fields.
    pub const fn decompose(&self, id: i64) -> SnowflakeParts {
        let raw = id as u64;
        let elapsed = shr(raw, self.timestamp_shift()) & self.max_timestamp();
        SnowflakeParts {
            timestamp: self.epoch.saturating_add(elapsed),
            worker_id: shr(raw, self.worker_shift()) & self.max_worker_id(),
            machine_id: shr(raw, self.machine_shift()) & self.max_machine_id(),
            sequence: raw & self.max_sequence(),
        }
    }

    const fn field_bits(&self) -> u32 {
        self.worker_bits as u32 + self.machine_bits as u32 + self.sequence_bits as u32
    }
}

/// `2^bits - 1`, saturating at `u64::MAX`.
const fn mask(bits: u32) -> u64 {
    match bits {
        0 => 0,
        1..64 => (1 << bits) - 1,
        _ => u64::MAX,
    }
}

// Shifts past the word width yield zero instead of panicking, so an
// unvalidated layout can still be inspected.
const fn shl(value: u64, bits: u32) -> u64 {
    match value.checked_shl(bits) {
        Some(v) => v,
        None => 0,
    }
}

const fn shr(value: u64, bits: u32) -> u64 {
    match value.checked_shr(bits) {
        Some(v) => v,
        None => 0,
    }
}
