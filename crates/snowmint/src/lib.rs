//! Snowflake-style 64-bit IDs with a configurable layout.
//!
//! Each [`SnowflakeGenerator`] owns one `(worker_id, machine_id)` pair and
//! packs the current millisecond, its identity, and a per-millisecond
//! sequence into a positive `i64`. IDs from one generator strictly increase;
//! IDs from generators with distinct pairs never collide. A [`Registry`]
//! keeps at most one generator per worker ID.
//!
//! ```
//! use snowmint::{Config, Registry};
//!
//! let registry = Registry::new();
//! let generator = registry.get_or_create(1, 2, Config::default()).unwrap();
//!
//! let id = generator.next_id().unwrap();
//! let parts = generator.decode(id);
//! assert_eq!((parts.worker_id, parts.machine_id), (1, 2));
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod error;
mod generator;
mod id;
mod registry;
mod time;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::registry::*;
pub use crate::time::*;
