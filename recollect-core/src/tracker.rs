use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;

use crate::config::HistoryConfig;
use crate::error::Error;
use crate::hash::{default_hash_fn, HashFn};
use crate::interval::{every, Interval};
use crate::key::{create_key, nid};
use crate::local::LocalStore;
use crate::remote::{OrderedSet, RemoteStore};

/// Namespace every collection key starts with
const KEY_PREFIX: &str = "history";

/// Separator between collection key parts
const KEY_SEPARATOR: &str = ":";

/// Which storage strategy a tracker was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Remote,
}

/// Storage strategy, fixed at construction
#[derive(Debug)]
enum Backend {
    Local(LocalStore),
    Remote(RemoteStore),
}

/// Runtime-adjustable settings, read as a snapshot by each operation
#[derive(Clone)]
struct Settings {
    time_to_live: Duration,
    use_hashing: bool,
    hash_fn: HashFn,
    remote_timeout: Option<Duration>,
}

/// Internal shared state for the tracker
struct TrackerInner {
    backend: Backend,
    collection_key: String,
    settings: RwLock<Settings>,
    /// Runtime the tracker was built on, where cleaners are spawned
    runtime: Handle,
    /// Background cleaner, `None` while disabled
    cleaner: Mutex<Option<Interval>>,
    clean_interval: Mutex<Duration>,
}

/// Remembers which keys were seen and when, for a limited time.
///
/// A tracker records `key -> instant` pairs and answers "was this key recorded
/// within the last TTL?". Entries live either in a local mutex-guarded map or
/// in a remote sorted set (see [`OrderedSet`]); the choice is made once at
/// construction. A background cleaner periodically evicts stale entries.
///
/// Every operation comes in two flavors. The plain ones (`add`, `has`, `get`,
/// `remove`, `clean`) never fail: backend errors are logged and treated as
/// "no effect". The `try_` ones return the error instead.
///
/// Clones share the same history. The cleaner stops when the last clone is
/// dropped or when [`HistoryTracker::shutdown`] is called.
///
/// # Example
///
/// ```rust,no_run
/// use recollect_core::{HistoryConfig, HistoryTracker};
/// use std::time::{Duration, SystemTime};
///
/// #[tokio::main]
/// async fn main() -> Result<(), recollect_core::Error> {
///     let config = HistoryConfig::new("orders")
///         .with_time_to_live(Duration::from_secs(2))
///         .with_clean_interval(Duration::from_secs(1));
///     let history = HistoryTracker::local(config)?;
///
///     history.add("order-42", SystemTime::now()).await;
///     assert!(history.has("order-42").await);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct HistoryTracker {
    inner: Arc<TrackerInner>,
}

impl HistoryTracker {
    /// Creates a tracker backed by a local in-memory map
    pub fn local(config: HistoryConfig) -> Result<Self, Error> {
        Self::new(config, None)
    }

    /// Creates a tracker backed by a remote ordered-set service
    pub fn remote(config: HistoryConfig, service: Arc<dyn OrderedSet>) -> Result<Self, Error> {
        Self::new(config, Some(service))
    }

    /// Creates a tracker, remote if `service` is given, local otherwise.
    ///
    /// The collection key is `history:<name>`. An empty name falls back to a
    /// generated one instead of failing.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoRuntime` if called outside of a Tokio runtime. The
    /// background cleaner always runs on that runtime, even when the tracker is
    /// later reconfigured from another thread.
    pub fn new(config: HistoryConfig, service: Option<Arc<dyn OrderedSet>>) -> Result<Self, Error> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let collection_key = create_key(&[config.name.as_str()], KEY_PREFIX, KEY_SEPARATOR)
            .unwrap_or_else(|e| {
                let fallback = format!("{}{}{}", KEY_PREFIX, KEY_SEPARATOR, nid("h", 16));
                tracing::warn!("{}, using generated collection key {}", e, fallback);
                fallback
            });

        let backend = match service {
            Some(service) => Backend::Remote(RemoteStore::new(service, collection_key.clone())),
            None => Backend::Local(LocalStore::new()),
        };

        let time_to_live = if config.time_to_live.is_zero() {
            HistoryConfig::default().time_to_live
        } else {
            config.time_to_live
        };

        let tracker = Self {
            inner: Arc::new(TrackerInner {
                backend,
                collection_key,
                settings: RwLock::new(Settings {
                    time_to_live,
                    use_hashing: config.use_hashing,
                    hash_fn: default_hash_fn(),
                    remote_timeout: config.remote_timeout,
                }),
                runtime,
                cleaner: Mutex::new(None),
                clean_interval: Mutex::new(Duration::ZERO),
            }),
        };
        tracker.set_clean_interval(config.clean_interval);

        tracing::debug!(
            collection = %tracker.inner.collection_key,
            backend = ?tracker.backend_kind(),
            "history tracker created"
        );
        Ok(tracker)
    }

    /// Records `key` as seen at `at`. Re-adding a key overwrites its instant.
    ///
    /// `at` is the instant the window is measured from: the key counts as seen
    /// until `at + ttl`. An instant in the future therefore extends that, e.g.
    /// adding at `now + 2s` with a 2s TTL keeps the key seen for 4s.
    pub async fn add(&self, key: &str, at: SystemTime) {
        if let Err(e) = self.try_add(key, at).await {
            tracing::warn!("add {} had no effect: {}", truncate_key_for_log(key), e);
        }
    }

    /// Records `key` as seen at `at`, reporting backend failures
    pub async fn try_add(&self, key: &str, at: SystemTime) -> Result<(), Error> {
        self.inner.try_add(key, at).await
    }

    /// Checks if `key` was recorded within the last TTL.
    ///
    /// True iff the entry exists and its instant is at or after `now - ttl`.
    /// Stale entries are not removed here; that is left to `clean`.
    pub async fn has(&self, key: &str) -> bool {
        self.try_has(key).await.unwrap_or_else(|e| {
            tracing::warn!("has {} treated as unseen: {}", truncate_key_for_log(key), e);
            false
        })
    }

    /// Checks if `key` was recorded within the last TTL, reporting backend failures
    pub async fn try_has(&self, key: &str) -> Result<bool, Error> {
        self.inner.try_has(key).await
    }

    /// Returns the instant recorded for `key`, even if it is stale.
    ///
    /// Only `clean` and `remove` erase history; staleness alone does not.
    pub async fn get(&self, key: &str) -> Option<SystemTime> {
        self.try_get(key).await.unwrap_or_else(|e| {
            tracing::warn!("get {} treated as not found: {}", truncate_key_for_log(key), e);
            None
        })
    }

    /// Returns the instant recorded for `key`, reporting backend failures
    pub async fn try_get(&self, key: &str) -> Result<Option<SystemTime>, Error> {
        self.inner.try_get(key).await
    }

    /// Forgets `key`. Removing an absent key is a no-op.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key).await {
            tracing::warn!("remove {} had no effect: {}", truncate_key_for_log(key), e);
        }
    }

    /// Forgets `key`, reporting backend failures
    pub async fn try_remove(&self, key: &str) -> Result<(), Error> {
        self.inner.try_remove(key).await
    }

    /// Evicts every entry recorded strictly before `now - ttl`.
    ///
    /// Returns the number of entries evicted. This is also done periodically
    /// by the background cleaner.
    pub async fn clean(&self) -> usize {
        self.inner.clean().await
    }

    /// Evicts stale entries, reporting backend failures
    pub async fn try_clean(&self) -> Result<usize, Error> {
        self.inner.try_clean().await
    }

    /// Sets the time-to-live used by later `has` and `clean` calls.
    ///
    /// A zero duration is ignored.
    pub fn set_time_to_live(&self, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.inner.settings.write().time_to_live = ttl;
    }

    /// Replaces the background cleaner with one running every `interval`.
    ///
    /// The previous cleaner is stopped first, so at most one is ever active.
    /// A zero interval stops background cleaning altogether.
    pub fn set_clean_interval(&self, interval: Duration) {
        let mut cleaner = self.inner.cleaner.lock();
        if let Some(previous) = cleaner.take() {
            previous.stop();
        }
        if interval.is_zero() {
            *self.inner.clean_interval.lock() = interval;
            tracing::info!(collection = %self.inner.collection_key, "background cleaning disabled");
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        match every(&self.inner.runtime, interval, false, move || run_clean(weak.clone())) {
            Ok(started) => {
                tracing::info!(collection = %self.inner.collection_key, ?interval, "cleaner started");
                *self.inner.clean_interval.lock() = interval;
                *cleaner = Some(started);
            }
            Err(e) => tracing::warn!("cleaner not started: {}", e),
        }
    }

    /// Installs a custom hash function and enables hashing
    pub fn set_hash_function<F>(&self, hash_fn: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let mut settings = self.inner.settings.write();
        settings.hash_fn = Arc::new(hash_fn);
        settings.use_hashing = true;
    }

    /// Enables or disables hashing for later operations.
    ///
    /// Entries already stored are not rehashed.
    pub fn use_hashing(&self, enabled: bool) {
        self.inner.settings.write().use_hashing = enabled;
    }

    /// Sets the timeout applied to every remote call (`None` waits indefinitely)
    pub fn set_remote_timeout(&self, timeout: Option<Duration>) {
        self.inner.settings.write().remote_timeout = timeout;
    }

    /// Stops the background cleaner. Safe to call any number of times.
    pub fn shutdown(&self) {
        if let Some(cleaner) = self.inner.cleaner.lock().take() {
            cleaner.stop();
            tracing::info!(collection = %self.inner.collection_key, "cleaner stopped");
        }
    }

    /// Returns the current time-to-live
    pub fn time_to_live(&self) -> Duration {
        self.inner.settings.read().time_to_live
    }

    /// Returns the last requested clean interval
    pub fn clean_interval(&self) -> Duration {
        *self.inner.clean_interval.lock()
    }

    /// Returns `true` if keys are hashed before being stored
    pub fn is_hashing(&self) -> bool {
        self.inner.settings.read().use_hashing
    }

    /// Returns the name of the tracked collection
    pub fn collection_key(&self) -> &str {
        &self.inner.collection_key
    }

    /// Returns which backend this tracker uses
    pub fn backend_kind(&self) -> BackendKind {
        match self.inner.backend {
            Backend::Local(_) => BackendKind::Local,
            Backend::Remote(_) => BackendKind::Remote,
        }
    }

    /// Returns the number of stored entries (stale ones included) for a local
    /// tracker, `None` for a remote one
    pub fn len(&self) -> Option<usize> {
        match &self.inner.backend {
            Backend::Local(store) => Some(store.len()),
            Backend::Remote(_) => None,
        }
    }

    /// Returns `Some(true)` if a local tracker holds no entries, `None` for a remote one
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|n| n == 0)
    }

    /// Returns `true` while a background cleaner is running
    pub fn is_cleaning(&self) -> bool {
        self.inner
            .cleaner
            .lock()
            .as_ref()
            .is_some_and(Interval::is_running)
    }
}

impl std::fmt::Debug for HistoryTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryTracker")
            .field("collection_key", &self.inner.collection_key)
            .field("backend", &self.backend_kind())
            .field("time_to_live", &self.time_to_live())
            .finish_non_exhaustive()
    }
}

/// One background clean run. Ends the cleaner once the tracker is gone.
async fn run_clean(tracker: Weak<TrackerInner>) -> bool {
    match tracker.upgrade() {
        Some(inner) => {
            inner.clean().await;
            true
        }
        None => false,
    }
}

impl TrackerInner {
    fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Maps a key to the stored value under the current hashing settings
    fn value_for(settings: &Settings, key: &str) -> String {
        if settings.use_hashing {
            (settings.hash_fn)(key)
        } else {
            key.to_string()
        }
    }

    async fn try_add(&self, key: &str, at: SystemTime) -> Result<(), Error> {
        let settings = self.settings();
        let value = Self::value_for(&settings, key);
        match &self.backend {
            Backend::Local(store) => store.insert(&value, at),
            Backend::Remote(store) => store.insert(&value, at, settings.remote_timeout).await?,
        }
        tracing::debug!("added {}", truncate_key_for_log(key));
        Ok(())
    }

    async fn try_has(&self, key: &str) -> Result<bool, Error> {
        let settings = self.settings();
        let value = Self::value_for(&settings, key);
        let cutoff = cutoff(settings.time_to_live);
        match &self.backend {
            Backend::Local(store) => Ok(store.contains_since(&value, cutoff)),
            Backend::Remote(store) => store.contains_since(&value, cutoff, settings.remote_timeout).await,
        }
    }

    async fn try_get(&self, key: &str) -> Result<Option<SystemTime>, Error> {
        let settings = self.settings();
        let value = Self::value_for(&settings, key);
        match &self.backend {
            Backend::Local(store) => Ok(store.recorded_at(&value)),
            Backend::Remote(store) => store.recorded_at(&value, settings.remote_timeout).await,
        }
    }

    async fn try_remove(&self, key: &str) -> Result<(), Error> {
        let settings = self.settings();
        let value = Self::value_for(&settings, key);
        match &self.backend {
            Backend::Local(store) => {
                store.remove(&value);
            }
            Backend::Remote(store) => store.remove(&value, settings.remote_timeout).await?,
        }
        tracing::debug!("removed {}", truncate_key_for_log(key));
        Ok(())
    }

    async fn try_clean(&self) -> Result<usize, Error> {
        let settings = self.settings();
        let cutoff = cutoff(settings.time_to_live);
        let removed = match &self.backend {
            Backend::Local(store) => store.purge_before(cutoff),
            Backend::Remote(store) => {
                let removed = store.purge_before(cutoff, settings.remote_timeout).await?;
                usize::try_from(removed).unwrap_or(usize::MAX)
            }
        };
        tracing::debug!(collection = %self.collection_key, removed, "clean finished");
        Ok(removed)
    }

    async fn clean(&self) -> usize {
        self.try_clean().await.unwrap_or_else(|e| {
            tracing::warn!(collection = %self.collection_key, "clean had no effect: {}", e);
            0
        })
    }
}

/// Oldest instant still inside the window ending now
fn cutoff(ttl: Duration) -> SystemTime {
    SystemTime::now().checked_sub(ttl).unwrap_or(UNIX_EPOCH)
}

/// Truncates a key for safe logging (prevents leaking sensitive key data)
fn truncate_key_for_log(key: &str) -> String {
    const MAX_LOG_LEN: usize = 16;
    match key.char_indices().nth(MAX_LOG_LEN) {
        Some((end, _)) => format!("{}...", &key[..end]),
        None => key.to_string(),
    }
}
