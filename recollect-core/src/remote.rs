//! Remote ordered-set backend.
//!
//! A history kept in a named sorted set hosted by an external service. Each
//! member is a tracked value and its score is the recorded instant in seconds
//! since the Unix epoch, so stale entries can be found and removed with a
//! single range operation instead of a scan.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// A sorted-set service (e.g. Redis ZSETs).
///
/// Implementations must be thread-safe; the connection and its lifetime belong
/// to whoever builds the implementation, not to the tracker using it.
#[async_trait]
pub trait OrderedSet: Send + Sync + 'static {
    /// Adds `member` to `collection` with `score`, or updates its score.
    async fn upsert(&self, collection: &str, member: &str, score: f64) -> Result<(), Error>;

    /// Returns the score of `member`, or `Ok(None)` if it is absent.
    async fn score(&self, collection: &str, member: &str) -> Result<Option<f64>, Error>;

    /// Removes `member`. Absent members are not an error.
    async fn remove(&self, collection: &str, member: &str) -> Result<(), Error>;

    /// Removes every member with a score strictly below `max`.
    ///
    /// Returns the number of members removed.
    async fn remove_below(&self, collection: &str, max: f64) -> Result<u64, Error>;
}

/// Converts an instant to a sorted-set score (fractional Unix seconds).
pub fn to_score(at: SystemTime) -> f64 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// Converts a sorted-set score back to an instant.
///
/// Returns `None` for scores that are not finite or do not fit in a `SystemTime`.
pub fn from_score(score: f64) -> Option<SystemTime> {
    if !score.is_finite() {
        return None;
    }
    let offset = Duration::try_from_secs_f64(score.abs()).ok()?;
    if score >= 0.0 {
        UNIX_EPOCH.checked_add(offset)
    } else {
        UNIX_EPOCH.checked_sub(offset)
    }
}

/// Adapter binding an [`OrderedSet`] service to one collection key
#[derive(Clone)]
pub struct RemoteStore {
    service: Arc<dyn OrderedSet>,
    collection: String,
}

impl RemoteStore {
    /// Creates an adapter over `service` for the sorted set named `collection`
    pub fn new(service: Arc<dyn OrderedSet>, collection: impl Into<String>) -> Self {
        Self {
            service,
            collection: collection.into(),
        }
    }

    /// Returns the sorted-set key this adapter works on
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Records `value` with its instant as the score
    pub async fn insert(&self, value: &str, recorded_at: SystemTime, timeout: Option<Duration>) -> Result<(), Error> {
        bounded(timeout, self.service.upsert(&self.collection, value, to_score(recorded_at))).await
    }

    /// Returns the recorded instant for `value`, ignoring staleness
    pub async fn recorded_at(&self, value: &str, timeout: Option<Duration>) -> Result<Option<SystemTime>, Error> {
        let score = bounded(timeout, self.service.score(&self.collection, value)).await?;
        Ok(score.and_then(from_score))
    }

    /// Checks if `value` is present with a score at or above `cutoff`
    pub async fn contains_since(&self, value: &str, cutoff: SystemTime, timeout: Option<Duration>) -> Result<bool, Error> {
        let score = bounded(timeout, self.service.score(&self.collection, value)).await?;
        Ok(score.is_some_and(|s| s >= to_score(cutoff)))
    }

    /// Removes `value` from the set
    pub async fn remove(&self, value: &str, timeout: Option<Duration>) -> Result<(), Error> {
        bounded(timeout, self.service.remove(&self.collection, value)).await
    }

    /// Removes every member recorded strictly before `cutoff`
    pub async fn purge_before(&self, cutoff: SystemTime, timeout: Option<Duration>) -> Result<u64, Error> {
        bounded(timeout, self.service.remove_below(&self.collection, to_score(cutoff))).await
    }
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

/// Runs `call`, failing with `Error::Timeout` if it outlives `timeout`
async fn bounded<T>(timeout: Option<Duration>, call: impl Future<Output = Result<T, Error>>) -> Result<T, Error> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| Error::Timeout(limit))?,
        None => call.await,
    }
}
