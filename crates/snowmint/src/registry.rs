use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use crate::{
    Config, ConfigError, SnowflakeGenerator, SystemClock, TimeSource,
    generator::{Mutex, MutexGuard},
};

/// Hands out at most one [`SnowflakeGenerator`] per worker ID.
///
/// The registry is an ordinary owned value: construct one where IDs are
/// issued and share it (or the generators it returns) as needed. Entries are
/// created lazily and live as long as the registry.
///
/// Its lock only guards the map. Generating IDs goes through each
/// generator's own lock, so busy workers never contend on the registry.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use snowmint::{Config, Registry};
///
/// let registry = Registry::new();
/// let a = registry.get_or_create(7, 1, Config::default()).unwrap();
/// let b = registry.get_or_create(7, 99, Config::default()).unwrap();
///
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(b.machine_id(), 1);
/// ```
#[derive(Debug)]
pub struct Registry<T = SystemClock>
where
    T: TimeSource + Clone,
{
    generators: Mutex<HashMap<u64, Arc<SnowflakeGenerator<T>>>>,
    time: T,
}

impl Default for Registry<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry<SystemClock> {
    /// Creates an empty registry whose generators read the system clock.
    pub fn new() -> Self {
        Self::with_time_source(SystemClock)
    }
}

impl<T> Registry<T>
where
    T: TimeSource + Clone,
{
    /// Creates an empty registry. Each new generator gets a clone of `time`.
    pub fn with_time_source(time: T) -> Self {
        Self {
            generators: Mutex::new(HashMap::new()),
            time,
        }
    }

    /// Returns the generator registered for `worker_id`, creating it on first
    /// use.
    ///
    /// Once a worker ID is registered, `machine_id` and `config` are
    /// **ignored** and the existing generator is returned as-is: the first
    /// caller's identity wins. This idempotency is the contract, so that
    /// repeated lookups can never mint a second generator for the same worker
    /// and reintroduce collisions.
    ///
    /// The lookup and the insert happen under one lock, so concurrent callers
    /// racing on an unseen `worker_id` all receive the same instance.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from [`SnowflakeGenerator::new`]. Nothing is
    /// registered when construction fails.
    pub fn get_or_create(
        &self,
        worker_id: u64,
        machine_id: u64,
        config: Config,
    ) -> Result<Arc<SnowflakeGenerator<T>>, ConfigError> {
        let mut generators = self.entries();
        match generators.entry(worker_id) {
            Entry::Occupied(entry) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(worker_id, "reusing registered generator");
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                let generator =
                    SnowflakeGenerator::new(worker_id, machine_id, config, self.time.clone())?;
                #[cfg(feature = "tracing")]
                tracing::debug!(worker_id, machine_id, "registered generator");
                Ok(Arc::clone(entry.insert(Arc::new(generator))))
            }
        }
    }

    /// Returns the generator for `worker_id` if one has been created.
    pub fn get(&self, worker_id: u64) -> Option<Arc<SnowflakeGenerator<T>>> {
        self.entries().get(&worker_id).cloned()
    }

    /// Number of registered generators.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` if no generator has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Registered worker IDs in ascending order.
    pub fn worker_ids(&self) -> Vec<u64> {
        let mut ids: Vec<_> = self.entries().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<u64, Arc<SnowflakeGenerator<T>>>> {
        #[cfg(feature = "parking-lot")]
        {
            self.generators.lock()
        }
        // Every insert is a single map operation, so a poisoned map is still
        // consistent.
        #[cfg(not(feature = "parking-lot"))]
        {
            self.generators
                .lock()
                .unwrap_or_else(crate::generator::PoisonError::into_inner)
        }
    }
}
