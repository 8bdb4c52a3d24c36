use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::require_admin;
use crate::actor_framework::ResourceClient;
use crate::cache::{CacheKey, ReadCache};
use crate::domain::{Caller, ListingPage, ListingQuery, Product, ProductCreate, ProductId, ProductPatch};
use crate::error::{StorefrontError, StorefrontResult};

/// Catalog reads and administration.
///
/// Reads go through the [`ReadCache`]; every write invalidates the product's
/// own entry and all listings before returning.
#[derive(Clone)]
pub struct CatalogClient {
    inner: ResourceClient<Product>,
    cache: Arc<ReadCache>,
}

impl CatalogClient {
    pub fn new(inner: ResourceClient<Product>, cache: Arc<ReadCache>) -> Self {
        Self { inner, cache }
    }

    #[instrument(skip(self, caller, params), fields(caller = %caller.user_id))]
    pub async fn create_product(&self, caller: &Caller, params: ProductCreate) -> StorefrontResult<Product> {
        require_admin(caller, "create products")?;
        params.validate().map_err(StorefrontError::Validation)?;

        let product = self.inner.create(params).await?;
        info!(product_id = %product.id, "Product created");
        self.cache.invalidate_product(&product.id).await;
        Ok(product)
    }

    /// Single product, served from cache when possible.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> StorefrontResult<Product> {
        let key = CacheKey::product(&id);
        if let Some(product) = self.cache.get::<Product>(&key).await {
            return Ok(product);
        }

        let ticket = self.cache.begin_fill();
        let product = self
            .inner
            .get(id.clone())
            .await?
            .ok_or_else(|| StorefrontError::not_found(format!("product {}", id)))?;
        self.cache.fill(ticket, &key, &product).await;
        Ok(product)
    }

    /// Filtered, sorted, paginated listing, served from cache when possible.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: ListingQuery) -> StorefrontResult<ListingPage> {
        let query = query.normalized();
        let key = CacheKey::listing(&query);
        if let Some(page) = self.cache.get::<ListingPage>(&key).await {
            return Ok(page);
        }

        let ticket = self.cache.begin_fill();
        let filter = query.clone();
        let matching = self.inner.query(move |product| filter.matches(product)).await?;
        let page = query.apply(matching);
        debug!(total = page.total, returned = page.products.len(), "Listing computed");

        // Written before returning so the next identical request can hit.
        self.cache.fill(ticket, &key, &page).await;
        Ok(page)
    }

    #[instrument(skip(self, caller, patch), fields(caller = %caller.user_id))]
    pub async fn update_product(
        &self,
        caller: &Caller,
        id: ProductId,
        patch: ProductPatch,
    ) -> StorefrontResult<Product> {
        require_admin(caller, "update products")?;

        let updated = self.inner.update(id.clone(), patch).await;
        // Invalidate even on failure: the outcome of a timed-out update is unknown.
        self.cache.invalidate_product(&id).await;
        let product = updated?;
        info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn delete_product(&self, caller: &Caller, id: ProductId) -> StorefrontResult<()> {
        require_admin(caller, "delete products")?;

        let deleted = self.inner.delete(id.clone()).await;
        self.cache.invalidate_product(&id).await;
        deleted?;
        info!(product_id = %id, "Product deleted");
        Ok(())
    }
}
