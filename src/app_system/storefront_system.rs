use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cache::{CacheBackend, CacheHandle, CacheService, ReadCache};
use crate::clients::{CartClient, CatalogClient, OrderClient, RetryPolicy, StockLedger};
use crate::config::StorefrontConfig;
use crate::{cart_actor, order_actor, product_actor};

/// How long shutdown waits for each actor to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The storefront: store actors, cache, and the clients wired over them.
///
/// Responsible for starting up actors, wiring them together, and handling shutdown.
pub struct StorefrontSystem {
    pub catalog_client: CatalogClient,
    pub cart_client: CartClient,
    pub order_client: OrderClient,
    pub stock_ledger: StockLedger,
    pub cache: Arc<ReadCache>,
    cache_handle: Option<CacheHandle>,
    handles: Vec<JoinHandle<()>>,
}

impl StorefrontSystem {
    /// Starts the system with the in-memory cache service.
    pub fn new(config: StorefrontConfig) -> Self {
        let (cache_service, cache_handle) = CacheService::new(config.actor_buffer, config.cache.sweep_interval);
        let cache_task = tokio::spawn(cache_service.run());
        let backend: Arc<dyn CacheBackend> = Arc::new(cache_handle.clone());

        let mut system = Self::with_cache_backend(config, backend);
        system.cache_handle = Some(cache_handle);
        system.handles.push(cache_task);
        system
    }

    /// Starts the system over an externally managed cache backend.
    pub fn with_cache_backend(config: StorefrontConfig, backend: Arc<dyn CacheBackend>) -> Self {
        let retry = RetryPolicy::from_config(&config);

        // 1. Setup Product Service
        let (product_actor, products) = product_actor::new(config.actor_buffer);
        let product_handle = tokio::spawn(product_actor.run());

        // 2. Setup Cart Service
        let (cart_actor, carts) = cart_actor::new(config.actor_buffer);
        let cart_handle = tokio::spawn(cart_actor.run());

        // 3. Setup Order Service
        let (order_actor, orders) = order_actor::new(config.actor_buffer);
        let order_handle = tokio::spawn(order_actor.run());

        let products = products.with_timeout(config.store_timeout);
        let carts = carts.with_timeout(config.store_timeout);
        let orders = orders.with_timeout(config.store_timeout);

        // 4. Wire the clients
        let cache = Arc::new(ReadCache::new(backend, config.cache.clone()));
        let stock_ledger = StockLedger::new(products.clone(), retry);
        let catalog_client = CatalogClient::new(products, cache.clone());
        let cart_client = CartClient::new(carts, stock_ledger.clone(), orders.clone());
        let order_client = OrderClient::new(orders, cart_client.clone(), stock_ledger.clone(), cache.clone(), retry);

        info!(actor_buffer = config.actor_buffer, store_timeout_ms = config.store_timeout.as_millis() as u64, "Storefront started");

        Self {
            catalog_client,
            cart_client,
            order_client,
            stock_ledger,
            cache,
            cache_handle: None,
            handles: vec![product_handle, cart_handle, order_handle],
        }
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        if let Some(cache_handle) = &self.cache_handle {
            if let Err(e) = cache_handle.shutdown().await {
                warn!(error = %e, "Cache service already stopped");
            }
        }

        // Store actors stop once every client clone is gone. Background
        // retries may still hold one, hence the grace period.
        drop(self.catalog_client);
        drop(self.cart_client);
        drop(self.order_client);
        drop(self.stock_ledger);
        drop(self.cache);
        drop(self.cache_handle);

        for handle in self.handles {
            let abort = handle.abort_handle();
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Actor task failed: {:?}", e);
                    return Err(format!("Actor task failed: {:?}", e));
                }
                Err(_) => {
                    warn!(grace_ms = SHUTDOWN_GRACE.as_millis() as u64, "Actor still busy, aborting");
                    abort.abort();
                }
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
