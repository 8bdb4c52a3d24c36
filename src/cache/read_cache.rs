use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

use super::backend::{CacheBackend, CacheError};
use super::key::{CacheKey, Invalidation, LISTING_PREFIX};
use crate::config::CacheConfig;
use crate::domain::ProductId;

/// Pending exact-key invalidations beyond this collapse into their namespace.
const MAX_PENDING_KEYS: usize = 4;

/// Proof that a fill started before any invalidation that could make it stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket(u64);

/// Fail-open, invalidation-aware front of a [`CacheBackend`].
///
/// Backend failures never reach callers: reads degrade to misses and writes
/// are dropped. An invalidation that cannot be delivered is kept pending; until
/// it is delivered every key it covers bypasses the cache, so an outage costs
/// latency, never correctness.
///
/// Pending invalidations stay few: once too many exact keys pile up they are
/// widened to their namespace prefix. Redelivery is attempted by at most one
/// read per `flush_interval`.
pub struct ReadCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
    pending: Mutex<Vec<Invalidation>>,
    last_flush: Mutex<Option<Instant>>,
    generation: AtomicU64,
}

impl ReadCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self {
            backend,
            config,
            pending: Mutex::new(Vec::new()),
            last_flush: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl_for(&self, key: &CacheKey) -> Duration {
        match key {
            CacheKey::Product(_) => self.config.product_ttl,
            CacheKey::Listing(_) => self.config.listing_ttl,
        }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T, CacheError>>) -> Result<T, CacheError> {
        tokio::time::timeout(self.config.op_timeout, call)
            .await
            .unwrap_or(Err(CacheError::Timeout(self.config.op_timeout)))
    }

    /// Cached value for `key`, or `None` on miss, backend failure, or a corrupt entry.
    #[instrument(skip(self, key), fields(key = %key.encode()))]
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.flush_pending().await;

        let encoded = key.encode();
        if self.is_pending(&encoded) {
            debug!("Invalidation pending, bypassing cache");
            return None;
        }

        match self.bounded(self.backend.get(&encoded)).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!("Cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(error = %e, "Corrupt cache entry, treating as miss");
                    None
                }
            },
            Ok(None) => {
                debug!("Cache miss");
                None
            }
            Err(e) => {
                warn!(error = %e, "Cache read failed, falling through to store");
                None
            }
        }
    }

    /// Unconditional write with an explicit TTL.
    #[instrument(skip(self, key, value), fields(key = %key.encode()))]
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let encoded = key.encode();
        if self.is_pending(&encoded) {
            return;
        }
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Value not serializable, skipping cache write");
                return;
            }
        };
        if let Err(e) = self.bounded(self.backend.set(&encoded, raw, ttl)).await {
            warn!(error = %e, "Cache write failed");
        }
    }

    /// Take before reading the authoritative store for a later [`fill`](Self::fill).
    pub fn begin_fill(&self) -> FillTicket {
        FillTicket(self.generation.load(Ordering::SeqCst))
    }

    /// Writes a freshly computed value unless an invalidation happened since
    /// `ticket` was taken; the value could then predate that write.
    pub async fn fill<T: Serialize>(&self, ticket: FillTicket, key: &CacheKey, value: &T) {
        if self.generation.load(Ordering::SeqCst) != ticket.0 {
            debug!(key = %key.encode(), "Skipping fill raced by invalidation");
            return;
        }
        self.set(key, value, self.ttl_for(key)).await;

        // An invalidation may have landed between the check and the write.
        if self.generation.load(Ordering::SeqCst) != ticket.0 {
            self.invalidate(key).await;
        }
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        self.apply(Invalidation::Key(key.encode())).await;
    }

    pub async fn invalidate_by_prefix(&self, prefix: &str) {
        self.apply(Invalidation::Prefix(prefix.to_string())).await;
    }

    /// Drops the product's own entry and every listing.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.invalidate(&CacheKey::product(id)).await;
        self.invalidate_by_prefix(LISTING_PREFIX).await;
    }

    pub fn pending_invalidations(&self) -> usize {
        self.pending.lock().len()
    }

    #[instrument(skip(self))]
    async fn apply(&self, invalidation: Invalidation) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let attempts = self.config.invalidation_attempts.max(1);
        let mut delay = self.config.invalidation_backoff;
        for attempt in 1..=attempts {
            match self.deliver(&invalidation).await {
                Ok(()) => return,
                Err(e) if attempt < attempts => {
                    warn!(error = %e, attempt, "Cache invalidation failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => {
                    error!(error = %e, attempts, "Cache invalidation failed, keeping it pending");
                    self.keep_pending(invalidation);
                    return;
                }
            }
        }
    }

    async fn deliver(&self, invalidation: &Invalidation) -> Result<(), CacheError> {
        match invalidation {
            Invalidation::Key(key) => self.bounded(self.backend.delete(key)).await,
            Invalidation::Prefix(prefix) => self.bounded(self.backend.delete_prefix(prefix)).await.map(|_| ()),
        }
    }

    /// One delivery attempt for each pending invalidation, unless another
    /// read already tried within the flush interval.
    async fn flush_pending(&self) {
        if self.pending.lock().is_empty() || !self.flush_due() {
            return;
        }
        let snapshot: Vec<Invalidation> = self.pending.lock().clone();

        let mut delivered = Vec::new();
        for invalidation in snapshot {
            match self.deliver(&invalidation).await {
                Ok(()) => delivered.push(invalidation),
                // Backend still down; the rest would fail the same way.
                Err(e) => {
                    debug!(error = %e, "Pending invalidation still undeliverable");
                    break;
                }
            }
        }
        if !delivered.is_empty() {
            debug!(delivered = delivered.len(), "Delivered pending invalidations");
            self.pending.lock().retain(|p| !delivered.contains(p));
        }
    }

    fn flush_due(&self) -> bool {
        let mut last = self.last_flush.lock();
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < self.config.flush_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    fn keep_pending(&self, invalidation: Invalidation) {
        let mut pending = self.pending.lock();
        if pending.iter().any(|p| p.subsumes(&invalidation)) {
            return;
        }
        pending.retain(|p| !invalidation.subsumes(p));
        pending.push(invalidation);

        let keys = pending.iter().filter(|p| matches!(p, Invalidation::Key(_))).count();
        if keys > MAX_PENDING_KEYS {
            warn!(keys, "Too many pending key invalidations, widening to their namespaces");
            let widened: Vec<Invalidation> = pending.drain(..).map(|p| p.widened()).collect();
            for invalidation in widened {
                if !pending.iter().any(|p| p.subsumes(&invalidation)) {
                    pending.retain(|p| !invalidation.subsumes(p));
                    pending.push(invalidation);
                }
            }
        }
    }

    fn is_pending(&self, encoded_key: &str) -> bool {
        self.pending.lock().iter().any(|p| p.covers(encoded_key))
    }
}
