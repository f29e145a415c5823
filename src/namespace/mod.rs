//! Named cache spaces and the read-through load pipeline.
//!
//! A `Namespace` ties together one backing source, one local payload cache
//! and one single-flight group. Its `get` is the public entry point of the
//! whole system: hit the local cache, otherwise run the load pipeline,
//! which either asks the authoritative peer or falls back to the backing
//! source. All namespaces of a node live in a `Namespaces` registry that
//! the RPC handler consults on inbound requests.


use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Instant;

use async_trait::async_trait;

use crate::error::CacheError;
use crate::flight::FlightGroup;
use crate::peers::PeerPicker;
use crate::store::{Payload, SyncCache};

/// The user-supplied backing source, called on an authoritative cache miss.
///
/// The cache never invokes `load` concurrently for the same key; returned
/// bytes are copied verbatim into a payload.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> anyhow::Result<Vec<u8>>;
}

/// Adapter turning an async closure into a [`Loader`].
pub struct LoaderFn<F>(F);

#[async_trait]
impl<F, Fut> Loader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send,
{
    async fn load(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        (self.0)(key.to_string()).await
    }
}

/// Wraps an async closure as a backing source.
pub fn loader_fn<F, Fut>(f: F) -> LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send,
{
    LoaderFn(f)
}

/// A named cache space with its own backing source and store.
pub struct Namespace {
    name: String,
    loader: Arc<dyn Loader>,
    main_cache: SyncCache,
    flight: FlightGroup<Payload>,
    picker: OnceLock<Arc<dyn PeerPicker>>,
}

impl Namespace {
    fn new(name: &str, cache_bytes: u64, loader: Arc<dyn Loader>) -> Self {
        Self {
            name: name.to_string(),
            loader,
            main_cache: SyncCache::new(cache_bytes),
            flight: FlightGroup::new(),
            picker: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up `key`, loading it through the pipeline on a miss. `expiry`
    /// applies to the entry created by a local load.
    pub async fn get(&self, key: &str, expiry: Option<Instant>) -> Result<Payload, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        if let Some(hit) = self.main_cache.get(key) {
            tracing::debug!("cache hit for {}/{}", self.name, key);
            return Ok(hit);
        }

        self.load(key, expiry).await
    }

    /// The miss path. The whole decision runs under single-flight, so
    /// concurrent misses on one key produce exactly one peer fetch or one
    /// backing-source call.
    async fn load(&self, key: &str, expiry: Option<Instant>) -> Result<Payload, CacheError> {
        self.flight
            .run(key, || async {
                if let Some(picker) = self.picker.get() {
                    if let Some(fetcher) = picker.pick_peer(key) {
                        match fetcher.fetch(&self.name, key).await {
                            Ok(bytes) => return Ok(Payload::new(&bytes)),
                            Err(e) => {
                                tracing::warn!(
                                    "failed to fetch {}/{} from peer, loading locally: {}",
                                    self.name,
                                    key,
                                    e
                                );
                            }
                        }
                    }
                }
                self.load_locally(key, expiry).await
            })
            .await
    }

    /// Asks the backing source and memoizes the answer. Only runs on the
    /// authoritative node (or as fallback after a failed peer fetch), so a
    /// key is cached on exactly one node.
    async fn load_locally(&self, key: &str, expiry: Option<Instant>) -> Result<Payload, CacheError> {
        let bytes = self
            .loader
            .load(key)
            .await
            .map_err(|e| CacheError::BackingSource {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let value = Payload::with_expiry(&bytes, expiry);
        self.main_cache.add(key, value.clone());
        Ok(value)
    }

    /// Drops the local entry for `key`, if any. Entries cached on other
    /// nodes are untouched.
    pub fn remove(&self, key: &str) -> bool {
        self.main_cache.remove(key)
    }

    /// Installs the peer picker. May be called at most once per namespace;
    /// a second call is a programming error.
    ///
    /// # Panics
    /// Panics when a picker is already registered.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        if self.picker.set(picker).is_err() {
            panic!("register_peers called more than once for namespace {}", self.name);
        }
    }

    /// Number of locally cached entries.
    pub fn entry_count(&self) -> usize {
        self.main_cache.len()
    }

    /// Bytes held by the local cache.
    pub fn used_bytes(&self) -> u64 {
        self.main_cache.used_bytes()
    }
}

/// Registry of the namespaces hosted by one node.
///
/// A registry object rather than a process-wide global, so several
/// independent fleets can coexist in one process. Reads are the RPC
/// handler's hot path and take the lock shared.
pub struct Namespaces {
    inner: RwLock<HashMap<String, Arc<Namespace>>>,
}

impl Namespaces {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(HashMap::new()),
        })
    }

    /// Creates a namespace and registers it under its name. Re-using a name
    /// replaces the previous namespace.
    pub fn create(&self, name: &str, cache_bytes: u64, loader: Arc<dyn Loader>) -> Arc<Namespace> {
        let namespace = Arc::new(Namespace::new(name, cache_bytes, loader));
        let mut inner = self.inner.write().expect("namespace registry poisoned");
        inner.insert(name.to_string(), namespace.clone());
        tracing::info!("created namespace {}", name);
        namespace
    }

    /// Resolves a namespace by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<Namespace>> {
        let inner = self.inner.read().expect("namespace registry poisoned");
        inner.get(name).cloned()
    }

    /// Unregisters a namespace. In-flight loads are not drained; callers
    /// quiesce traffic first.
    pub fn destroy(&self, name: &str) -> Option<Arc<Namespace>> {
        let mut inner = self.inner.write().expect("namespace registry poisoned");
        let removed = inner.remove(name);
        if removed.is_some() {
            tracing::info!("destroyed namespace {}", name);
        }
        removed
    }

    /// Names of all registered namespaces.
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().expect("namespace registry poisoned");
        inner.keys().cloned().collect()
    }
}
