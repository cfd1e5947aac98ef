/// Outcome of [`SnowflakeGenerator::try_poll_id`].
///
/// - [`Poll::Ready`] carries a freshly generated ID.
/// - [`Poll::Pending`] means the sequence for the current millisecond is used
///   up. Nothing was consumed; try again after `yield_for` milliseconds.
///
/// This lets cooperative or async callers back off on their own terms instead
/// of spinning inside [`SnowflakeGenerator::next_id`].
///
/// # Example
///
/// ```
/// use snowmint::{Config, Poll, SnowflakeGenerator};
///
/// let generator = SnowflakeGenerator::with_system_clock(1, 1, Config::default()).unwrap();
/// let id = loop {
///     match generator.try_poll_id().unwrap() {
///         Poll::Ready { id } => break id,
///         Poll::Pending { .. } => std::thread::yield_now(),
///     }
/// };
/// assert!(id > 0);
/// ```
///
/// [`SnowflakeGenerator::try_poll_id`]: crate::SnowflakeGenerator::try_poll_id
/// [`SnowflakeGenerator::next_id`]: crate::SnowflakeGenerator::next_id
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Poll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: i64,
    },
    /// The sequence is exhausted for the current millisecond.
    Pending {
        /// Milliseconds to wait before trying again.
        yield_for: u64,
    },
}
