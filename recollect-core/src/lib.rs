//! # Recollect Core
//!
//! A time-windowed history of seen keys, for suppressing duplicate work.
//!
//! ## Features
//!
//! - Records "key seen at instant T" and answers "seen within the last TTL?"
//! - Local backend: an in-process map behind a single mutex
//! - Remote backend: a sorted set on an [`OrderedSet`] service (Redis with the
//!   `redis` feature), scored by the recorded instant so stale entries are
//!   removed with one range call
//! - Background cleaner per tracker, stopped when the tracker is dropped
//! - Optional key hashing (MD5 by default, pluggable)
//! - Best-effort operations that never fail, plus `try_` variants that do
//!
//! ## Example
//!
//! ```rust,no_run
//! use recollect_core::{HistoryConfig, HistoryTracker};
//! use std::time::{Duration, SystemTime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), recollect_core::Error> {
//!     let config = HistoryConfig::new("orders")
//!         .with_time_to_live(Duration::from_secs(300))
//!         .with_clean_interval(Duration::from_secs(30));
//!     let history = HistoryTracker::local(config)?;
//!
//!     if !history.has("order-42").await {
//!         // ... process the order once ...
//!         history.add("order-42", SystemTime::now()).await;
//!     }
//!
//!     // Manual cleanup (also done automatically by the background task)
//!     let removed_count = history.clean().await;
//!     # let _ = removed_count;
//!     Ok(())
//! }
//! ```

mod config;
mod entry;
mod error;
mod hash;
mod interval;
mod key;
mod local;
mod remote;
mod tracker;

#[cfg(feature = "redis")]
mod redis_set;

pub use config::HistoryConfig;
pub use entry::Entry;
pub use error::Error;
pub use hash::{default_hash_fn, hash_it, HashFn};
pub use interval::{every, Interval};
pub use key::{create_key, nid};
pub use local::LocalStore;
pub use remote::{from_score, to_score, OrderedSet, RemoteStore};
pub use tracker::{BackendKind, HistoryTracker};

/// Re-exported so [`OrderedSet`] can be implemented without a direct dependency
pub use async_trait::async_trait;

#[cfg(feature = "redis")]
pub use redis_set::RedisOrderedSet;
