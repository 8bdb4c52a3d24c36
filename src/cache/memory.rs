use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument};

use super::backend::{CacheBackend, CacheError};

#[derive(Debug)]
pub enum CacheRequest {
    Get {
        key: String,
        respond_to: oneshot::Sender<Option<String>>,
    },
    Set {
        key: String,
        value: String,
        ttl: Duration,
        respond_to: oneshot::Sender<()>,
    },
    Delete {
        key: String,
        respond_to: oneshot::Sender<()>,
    },
    DeletePrefix {
        prefix: String,
        respond_to: oneshot::Sender<usize>,
    },
    Shutdown,
    #[cfg(test)]
    GetEntryCount {
        respond_to: oneshot::Sender<usize>,
    },
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-memory cache backend.
///
/// An expired entry is never returned. It is dropped when read, and a
/// periodic sweep drops the ones nobody reads again.
pub struct CacheService {
    receiver: mpsc::Receiver<CacheRequest>,
    entries: HashMap<String, CacheEntry>,
    sweep_interval: Duration,
}

impl CacheService {
    pub fn new(buffer_size: usize, sweep_interval: Duration) -> (Self, CacheHandle) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            entries: HashMap::new(),
            sweep_interval: sweep_interval.max(Duration::from_millis(1)),
        };
        (service, CacheHandle { sender })
    }

    #[instrument(name = "cache_service", skip(self))]
    pub async fn run(mut self) {
        info!(sweep_interval = ?self.sweep_interval, "CacheService starting");

        let mut sweeper = interval(self.sweep_interval);
        sweeper.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sweeper.tick().await;

        loop {
            let msg = tokio::select! {
                biased;
                _ = sweeper.tick() => {
                    self.sweep_expired();
                    continue;
                }
                msg = self.receiver.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };

            match msg {
                CacheRequest::Get { key, respond_to } => {
                    let _ = respond_to.send(self.handle_get(&key));
                }
                CacheRequest::Set { key, value, ttl, respond_to } => {
                    let expires_at = Instant::now() + ttl;
                    self.entries.insert(key, CacheEntry { value, expires_at });
                    let _ = respond_to.send(());
                }
                CacheRequest::Delete { key, respond_to } => {
                    self.entries.remove(&key);
                    let _ = respond_to.send(());
                }
                CacheRequest::DeletePrefix { prefix, respond_to } => {
                    let _ = respond_to.send(self.handle_delete_prefix(&prefix));
                }
                CacheRequest::Shutdown => {
                    info!("CacheService shutting down");
                    break;
                }
                #[cfg(test)]
                CacheRequest::GetEntryCount { respond_to } => {
                    let _ = respond_to.send(self.entries.len());
                }
            }
        }

        info!("CacheService stopped");
    }

    fn handle_get(&mut self, key: &str) -> Option<String> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                debug!(key, "Entry expired");
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn sweep_expired(&mut self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Swept expired entries");
        }
    }

    fn handle_delete_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - self.entries.len();
        debug!(prefix, removed, "Deleted by prefix");
        removed
    }
}

/// Client for [`CacheService`].
#[derive(Clone)]
pub struct CacheHandle {
    sender: mpsc::Sender<CacheRequest>,
}

impl CacheHandle {
    async fn request<R>(&self, request: CacheRequest, response: oneshot::Receiver<R>) -> Result<R, CacheError> {
        self.sender
            .send(request)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        response.await.map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    /// Stops the service even while other handles are alive.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), CacheError> {
        debug!("Sending shutdown request");
        self.sender
            .send(CacheRequest::Shutdown)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    #[cfg(test)]
    pub async fn entry_count(&self) -> Result<usize, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.request(CacheRequest::GetEntryCount { respond_to }, response).await
    }
}

#[async_trait]
impl CacheBackend for CacheHandle {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.request(CacheRequest::Get { key: key.to_string(), respond_to }, response).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.request(CacheRequest::Set { key: key.to_string(), value, ttl, respond_to }, response).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.request(CacheRequest::Delete { key: key.to_string(), respond_to }, response).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.request(CacheRequest::DeletePrefix { prefix: prefix.to_string(), respond_to }, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> CacheHandle {
        let (service, handle) = CacheService::new(8, Duration::from_secs(30));
        tokio::spawn(service.run());
        handle
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = start();
        cache.set("product:p1", "v".to_string(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("product:p1").await.unwrap(), Some("v".to_string()));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get("product:p1").await.unwrap(), None);
        assert_eq!(cache.entry_count().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unread_expired_entries_are_swept() {
        let cache = start();
        for page in 0..1000 {
            cache
                .set(&format!("products:page={}", page), "[]".to_string(), Duration::from_secs(1))
                .await
                .unwrap();
        }
        cache.set("product:p1", "v".to_string(), Duration::from_secs(3600)).await.unwrap();
        assert_eq!(cache.entry_count().await.unwrap(), 1001);

        tokio::time::advance(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        assert_eq!(cache.entry_count().await.unwrap(), 1);
        assert_eq!(cache.get("product:p1").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_delete_prefix_only_touches_namespace() {
        let cache = start();
        let ttl = Duration::from_secs(60);
        cache.set("products:page=1", "a".to_string(), ttl).await.unwrap();
        cache.set("products:page=2", "b".to_string(), ttl).await.unwrap();
        cache.set("product:p1", "c".to_string(), ttl).await.unwrap();

        assert_eq!(cache.delete_prefix("products:").await.unwrap(), 2);
        assert_eq!(cache.get("product:p1").await.unwrap(), Some("c".to_string()));

        cache.delete("product:p1").await.unwrap();
        assert_eq!(cache.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_makes_backend_unavailable() {
        let cache = start();
        cache.shutdown().await.unwrap();
        let result = cache.get("product:p1").await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }
}
