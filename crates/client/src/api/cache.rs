//! Cache types for catalog responses.

use nexus_market_core::{ProductId, TenantId};

use super::types::{Product, Tenant};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products { tenant: Option<TenantId> },
    Tenant(TenantId),
    Tenants,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Tenant(Box<Tenant>),
    Tenants(Vec<Tenant>),
}
