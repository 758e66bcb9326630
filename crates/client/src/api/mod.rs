//! Typed commerce API operations.
//!
//! Every call goes through the [`SessionClient`], so credential attachment
//! and renewal are handled there. Product and shop reads are cached using
//! `moka`; seller mutations invalidate the cache.

mod cache;
pub mod types;

pub use types::{
    NewProduct, NewTenant, Order, OrderItem, OrderLineRequest, PlaceOrder, Product,
    ProductUpdate, Tenant,
};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use nexus_market_core::{OrderId, OrderStatus, ProductId, TenantId};

use crate::session::{ApiRequest, SessionClient, SessionError};
use cache::{CacheKey, CacheValue};
use types::PlacedOrders;

/// Product collection endpoint.
pub const PRODUCTS_PATH: &str = "products/";

/// Shop collection endpoint.
pub const TENANTS_PATH: &str = "tenants/";

/// Order collection endpoint.
pub const ORDERS_PATH: &str = "orders/";

/// Default catalog cache lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

fn product_path(id: ProductId) -> String {
    format!("{PRODUCTS_PATH}{id}/")
}

fn tenant_path(id: TenantId) -> String {
    format!("{TENANTS_PATH}{id}/")
}

fn order_path(id: OrderId) -> String {
    format!("{ORDERS_PATH}{id}/")
}

// =============================================================================
// CommerceApi
// =============================================================================

/// Client for catalog, shop and order endpoints.
#[derive(Clone)]
pub struct CommerceApi {
    inner: Arc<CommerceApiInner>,
}

struct CommerceApiInner {
    session: SessionClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl CommerceApi {
    /// Create an API client over `session`, caching catalog reads for
    /// `cache_ttl`.
    #[must_use]
    pub fn new(session: SessionClient, cache_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(cache_ttl)
            .support_invalidation_closures()
            .build();

        Self {
            inner: Arc::new(CommerceApiInner { session, cache }),
        }
    }

    /// The session this client calls through.
    #[must_use]
    pub fn session(&self) -> &SessionClient {
        &self.inner.session
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// List products, optionally for one shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn products(&self, tenant: Option<TenantId>) -> Result<Vec<Product>, SessionError> {
        let key = CacheKey::Products { tenant };
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let mut request = ApiRequest::get(PRODUCTS_PATH);
        if let Some(tenant) = tenant {
            request = request.with_query("tenant", tenant);
        }
        let products: Vec<Product> = self.inner.session.call_json(&request).await?;

        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` with 404 if the product does not
    /// exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, SessionError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .inner
            .session
            .call_json(&ApiRequest::get(product_path(id)))
            .await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Create a product in the signed-in seller's shop.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` (403) if the account is not a
    /// seller.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, SessionError> {
        let request = ApiRequest::post(PRODUCTS_PATH, serde_json::to_value(product)?);
        let created: Product = self.inner.session.call_json(&request).await?;

        self.invalidate_catalog().await;
        tracing::info!(product_id = %created.id, "Created product");
        Ok(created)
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` if the product is not in the
    /// seller's shop.
    #[instrument(skip(self, product), fields(product_id = %id))]
    pub async fn replace_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, SessionError> {
        let request = ApiRequest::put(product_path(id), serde_json::to_value(product)?);
        let updated: Product = self.inner.session.call_json(&request).await?;

        self.invalidate_catalog().await;
        Ok(updated)
    }

    /// Change some fields of a product.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` if the product is not in the
    /// seller's shop.
    #[instrument(skip(self, update), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, SessionError> {
        let request = ApiRequest::patch(product_path(id), serde_json::to_value(update)?);
        let updated: Product = self.inner.session.call_json(&request).await?;

        self.invalidate_catalog().await;
        Ok(updated)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` if the product is not in the
    /// seller's shop.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), SessionError> {
        self.inner
            .session
            .call(&ApiRequest::delete(product_path(id)))
            .await?;

        self.invalidate_catalog().await;
        tracing::info!("Deleted product");
        Ok(())
    }

    // =========================================================================
    // Shops
    // =========================================================================

    /// List every shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn tenants(&self) -> Result<Vec<Tenant>, SessionError> {
        if let Some(CacheValue::Tenants(tenants)) = self.inner.cache.get(&CacheKey::Tenants).await
        {
            return Ok(tenants);
        }

        let tenants: Vec<Tenant> = self
            .inner
            .session
            .call_json(&ApiRequest::get(TENANTS_PATH))
            .await?;

        self.inner
            .cache
            .insert(CacheKey::Tenants, CacheValue::Tenants(tenants.clone()))
            .await;
        Ok(tenants)
    }

    /// Fetch one shop.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` with 404 if the shop does not
    /// exist.
    #[instrument(skip(self), fields(tenant_id = %id))]
    pub async fn tenant(&self, id: TenantId) -> Result<Tenant, SessionError> {
        let key = CacheKey::Tenant(id);
        if let Some(CacheValue::Tenant(tenant)) = self.inner.cache.get(&key).await {
            return Ok(*tenant);
        }

        let tenant: Tenant = self
            .inner
            .session
            .call_json(&ApiRequest::get(tenant_path(id)))
            .await?;

        self.inner
            .cache
            .insert(key, CacheValue::Tenant(Box::new(tenant.clone())))
            .await;
        Ok(tenant)
    }

    /// Open a shop; the signed-in account becomes its owner.
    ///
    /// The current access token still carries the old role and shop claims
    /// until the next sign in.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` if the subdomain is taken.
    #[instrument(skip(self, tenant), fields(subdomain = %tenant.subdomain))]
    pub async fn create_tenant(&self, tenant: &NewTenant) -> Result<Tenant, SessionError> {
        let request = ApiRequest::post(TENANTS_PATH, serde_json::to_value(tenant)?);
        let created: Tenant = self.inner.session.call_json(&request).await?;

        self.inner.cache.invalidate(&CacheKey::Tenants).await;
        tracing::info!(tenant_id = %created.id, "Created shop");
        Ok(created)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Order history: a customer's own orders, or a seller's shop orders.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when signed out.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> Result<Vec<Order>, SessionError> {
        self.inner
            .session
            .call_json(&ApiRequest::get(ORDERS_PATH))
            .await
    }

    /// Place an order. Returns one order per shop represented in `order`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` if the server rejects the order
    /// (unknown product, insufficient stock).
    #[instrument(skip(self, order), fields(lines = order.items.len()))]
    pub async fn place_order(&self, order: &PlaceOrder) -> Result<Vec<Order>, SessionError> {
        let request = ApiRequest::post(ORDERS_PATH, serde_json::to_value(order)?);
        let placed: PlacedOrders = self.inner.session.call_json(&request).await?;

        // Stock changed
        self.invalidate_catalog().await;
        Ok(placed.into())
    }

    /// Move a shop order to a new status (sellers only).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` (403) for customers or orders of
    /// another shop.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, SessionError> {
        let request = ApiRequest::patch(order_path(id), serde_json::json!({ "status": status }));
        self.inner.session.call_json(&request).await
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Drop every cached product listing and product.
    pub async fn invalidate_catalog(&self) {
        let invalidated = self.inner.cache.invalidate_entries_if(|key, _| {
            matches!(key, CacheKey::Product(_) | CacheKey::Products { .. })
        });
        if let Err(e) = invalidated {
            tracing::warn!(error = %e, "Selective invalidation failed, clearing cache");
            self.inner.cache.invalidate_all();
        }
        self.inner.cache.run_pending_tasks().await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for CommerceApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceApi")
            .field("session", &self.inner.session)
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::{Method, StatusCode};
    use rust_decimal::Decimal;

    use super::*;
    use crate::session::{ApiResponse, DEFAULT_RENEWAL_TIMEOUT};
    use crate::storage::{MemoryStorage, Storage, keys};
    use crate::testing::FakeApi;

    const PRODUCTS_JSON: &str = r#"[
        {"id": 1, "tenant": 1, "name": "Speckled Mug", "price": "18.50", "stock": 4},
        {"id": 2, "tenant": 2, "name": "Linen Apron", "price": "32.00", "stock": 0}
    ]"#;

    fn api_with_session(api: &Arc<FakeApi>) -> CommerceApi {
        api.set_valid_access("seller-token");
        let storage = MemoryStorage::new();
        storage.set(keys::ACCESS_TOKEN, "seller-token").unwrap();
        let session = SessionClient::new(api.clone(), Arc::new(storage), DEFAULT_RENEWAL_TIMEOUT);
        CommerceApi::new(session, DEFAULT_CACHE_TTL)
    }

    #[tokio::test]
    async fn test_product_listing_is_cached() {
        let api = FakeApi::new();
        api.route(
            Method::GET,
            PRODUCTS_PATH,
            ApiResponse::new(StatusCode::OK, PRODUCTS_JSON),
        );
        let client = api_with_session(&api);

        let first = client.products(None).await.unwrap();
        let second = client.products(None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(!first[1].in_stock());
        assert_eq!(api.requests_to(PRODUCTS_PATH).len(), 1);
    }

    #[tokio::test]
    async fn test_tenant_filter_is_sent_as_query() {
        let api = FakeApi::new();
        api.route(
            Method::GET,
            PRODUCTS_PATH,
            ApiResponse::new(StatusCode::OK, "[]"),
        );
        let client = api_with_session(&api);

        client.products(Some(TenantId::new(2))).await.unwrap();

        let requests = api.requests_to(PRODUCTS_PATH);
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].query,
            vec![("tenant".to_string(), "2".to_string())]
        );
        // Separate cache entry from the unfiltered listing
        client.products(None).await.unwrap();
        assert_eq!(api.requests_to(PRODUCTS_PATH).len(), 2);
    }

    #[tokio::test]
    async fn test_product_mutation_invalidates_catalog() {
        let api = FakeApi::new();
        api.route(
            Method::GET,
            PRODUCTS_PATH,
            ApiResponse::new(StatusCode::OK, PRODUCTS_JSON),
        );
        api.route(
            Method::POST,
            PRODUCTS_PATH,
            ApiResponse::new(
                StatusCode::CREATED,
                r#"{"id": 3, "tenant": 1, "name": "Bud Vase", "price": "12.00", "stock": 10}"#,
            ),
        );
        let client = api_with_session(&api);
        client.products(None).await.unwrap();

        let created = client
            .create_product(&NewProduct {
                name: "Bud Vase".to_string(),
                description: String::new(),
                price: Decimal::new(1200, 2),
                stock: 10,
            })
            .await
            .unwrap();
        assert_eq!(created.id, ProductId::new(3));

        client.products(None).await.unwrap();
        let listings = api
            .requests_to(PRODUCTS_PATH)
            .into_iter()
            .filter(|r| r.method == Method::GET)
            .count();
        assert_eq!(listings, 2);
    }

    #[tokio::test]
    async fn test_product_not_found() {
        let api = FakeApi::new();
        api.route(
            Method::GET,
            "products/99/",
            ApiResponse::new(StatusCode::NOT_FOUND, r#"{"detail": "Not found."}"#),
        );
        let client = api_with_session(&api);

        let err = client.product(ProductId::new(99)).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.to_string(), "Request failed with HTTP 404 Not Found: Not found.");
    }

    #[tokio::test]
    async fn test_partial_update_sends_only_changed_fields() {
        let api = FakeApi::new();
        api.route(
            Method::PATCH,
            "products/1/",
            ApiResponse::new(
                StatusCode::OK,
                r#"{"id": 1, "tenant": 1, "name": "Speckled Mug", "price": "20.00", "stock": 4}"#,
            ),
        );
        let client = api_with_session(&api);

        let updated = client
            .update_product(
                ProductId::new(1),
                &ProductUpdate {
                    price: Some(Decimal::new(2000, 2)),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price, Decimal::new(2000, 2));
        let sent = api.requests_to("products/1/");
        assert_eq!(sent[0].body, Some(serde_json::json!({ "price": "20.00" })));
    }

    #[tokio::test]
    async fn test_order_status_update() {
        let api = FakeApi::new();
        api.route(
            Method::PATCH,
            "orders/40/",
            ApiResponse::new(
                StatusCode::OK,
                r#"{"id": 40, "items": [], "status": "SHIPPED", "total_amount": "37.00"}"#,
            ),
        );
        let client = api_with_session(&api);

        let order = client
            .update_order_status(OrderId::new(40), OrderStatus::Shipped)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Shipped);
        let sent = api.requests_to("orders/40/");
        assert_eq!(sent[0].body, Some(serde_json::json!({ "status": "SHIPPED" })));
    }
}
