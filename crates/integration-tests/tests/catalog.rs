//! Catalog browsing, caching, and seller product management.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use secrecy::SecretString;
use tempfile::TempDir;

use nexus_market_client::Marketplace;
use nexus_market_client::api::{NewProduct, NewTenant, ProductUpdate};
use nexus_market_client::session::Registration;
use nexus_market_core::{ProductId, Role};
use nexus_market_integration_tests::MockMarket;

#[tokio::test]
async fn test_listing_is_served_from_cache() {
    let mock = MockMarket::start().await;
    let shop = mock.add_tenant("Mira's Ceramics");
    let _ = mock.add_product(shop, "Mug", "12.50", 10);
    let dir = TempDir::new().unwrap();
    let market = Marketplace::open(&mock.config(dir.path())).unwrap();

    let first = market.api().products(None).await.unwrap();
    let second = market.api().products(None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].tenant_name.as_deref(), Some("Mira's Ceramics"));
    assert_eq!(mock.hits("GET", "products/"), 1);
}

#[tokio::test]
async fn test_listing_filters_by_shop() {
    let mock = MockMarket::start().await;
    let ceramics = mock.add_tenant("Mira's Ceramics");
    let candles = mock.add_tenant("Wick & Co");
    let _ = mock.add_product(ceramics, "Mug", "12.50", 10);
    let candle = mock.add_product(candles, "Candle", "8.00", 5);
    let dir = TempDir::new().unwrap();
    let market = Marketplace::open(&mock.config(dir.path())).unwrap();

    let listed = market.api().products(Some(candles)).await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, candle);
    assert_eq!(market.api().products(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_product_reports_not_found() {
    let mock = MockMarket::start().await;
    let dir = TempDir::new().unwrap();
    let market = Marketplace::open(&mock.config(dir.path())).unwrap();

    let err = market.api().product(ProductId::new(404)).await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert!(err.to_string().contains("Not found."));
}

#[tokio::test]
async fn test_new_seller_opens_shop_and_lists_product() {
    let mock = MockMarket::start().await;
    let dir = TempDir::new().unwrap();
    let market = Marketplace::open(&mock.config(dir.path())).unwrap();

    market
        .session()
        .register(&Registration {
            username: "mira".to_string(),
            email: "mira@example.com".to_string(),
            password: SecretString::from("glaze-it".to_string()),
            role: Role::Owner,
        })
        .await
        .unwrap();
    market
        .session()
        .login("mira", &SecretString::from("glaze-it".to_string()))
        .await
        .unwrap();
    assert!(!market.session().current_identity().unwrap().can_manage_products());

    let shop = market
        .api()
        .create_tenant(&NewTenant {
            name: "Mira's Ceramics".to_string(),
            subdomain: "mira".to_string(),
            domain_url: None,
        })
        .await
        .unwrap();
    assert_eq!(market.api().tenants().await.unwrap().len(), 1);

    // Shop membership appears in the token after signing in again
    market
        .session()
        .login("mira", &SecretString::from("glaze-it".to_string()))
        .await
        .unwrap();
    let identity = market.session().current_identity().unwrap();
    assert_eq!(identity.tenant_id, Some(shop.id));
    assert_eq!(identity.tenant_name.as_deref(), Some("Mira's Ceramics"));
    assert!(identity.can_manage_products());

    assert!(market.api().products(Some(shop.id)).await.unwrap().is_empty());
    let created = market
        .api()
        .create_product(&NewProduct {
            name: "Teapot".to_string(),
            description: "Stoneware, 1L".to_string(),
            price: Decimal::new(4500, 2),
            stock: 3,
        })
        .await
        .unwrap();

    // The cached empty listing was dropped
    let listed = market.api().products(Some(shop.id)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[0].tenant, Some(shop.id));
}

#[tokio::test]
async fn test_seller_updates_and_deletes_product() {
    let mock = MockMarket::start().await;
    let shop = mock.add_tenant("Mira's Ceramics");
    let mug = mock.add_product(shop, "Mug", "12.50", 10);
    mock.add_user("mira", "glaze-it", Role::Owner, Some(shop));
    let dir = TempDir::new().unwrap();
    let market = Marketplace::open(&mock.config(dir.path())).unwrap();
    market
        .session()
        .login("mira", &SecretString::from("glaze-it".to_string()))
        .await
        .unwrap();

    assert_eq!(market.api().product(mug).await.unwrap().stock, 10);
    let updated = market
        .api()
        .update_product(
            mug,
            &ProductUpdate {
                stock: Some(0),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Mug");
    assert!(!updated.in_stock());
    assert!(!market.api().product(mug).await.unwrap().in_stock());

    market.api().delete_product(mug).await.unwrap();
    let err = market.api().product(mug).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
}

#[tokio::test]
async fn test_customer_cannot_manage_products() {
    let mock = MockMarket::start().await;
    let shop = mock.add_tenant("Mira's Ceramics");
    let mug = mock.add_product(shop, "Mug", "12.50", 10);
    mock.add_user("ana", "hunter22", Role::Customer, None);
    let dir = TempDir::new().unwrap();
    let market = Marketplace::open(&mock.config(dir.path())).unwrap();
    market
        .session()
        .login("ana", &SecretString::from("hunter22".to_string()))
        .await
        .unwrap();

    let err = market.api().delete_product(mug).await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(403));
    assert!(!err.requires_authentication());
    assert!(market.session().is_authenticated());
    assert_eq!(mock.stock(mug), Some(10));
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let mock = MockMarket::start().await;
    mock.add_user("ana", "hunter22", Role::Customer, None);
    let dir = TempDir::new().unwrap();
    let market = Marketplace::open(&mock.config(dir.path())).unwrap();

    let err = market
        .session()
        .register(&Registration {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password: SecretString::from("another".to_string()),
            role: Role::Customer,
        })
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(400));
    assert!(err.to_string().contains("Username already exists"));
}
