use core::fmt;

/// The decoded fields of a generated ID.
///
/// Produced by [`Config::decompose`] or [`SnowflakeGenerator::decode`]. The
/// timestamp is absolute: the epoch has already been added back.
///
/// # Example
///
/// ```
/// use snowmint::Config;
///
/// let config = Config::new(0, 5, 5, 12);
/// let id = config.compose(1_000, 2, 3, 4).unwrap();
/// let parts = config.decompose(id);
/// assert_eq!(parts.timestamp, 1_000);
/// assert_eq!(parts.worker_id, 2);
/// assert_eq!(parts.machine_id, 3);
/// assert_eq!(parts.sequence, 4);
/// ```
///
/// [`Config::decompose`]: crate::Config::decompose
/// [`SnowflakeGenerator::decode`]: crate::SnowflakeGenerator::decode
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeParts {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub worker_id: u64,
    pub machine_id: u64,
    pub sequence: u64,
}

impl fmt::Display for SnowflakeParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timestamp={} worker_id={} machine_id={} sequence={}",
            self.timestamp, self.worker_id, self.machine_id, self.sequence
        )
    }
}
