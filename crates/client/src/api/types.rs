//! Commerce API resource types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use nexus_market_core::{OrderId, OrderStatus, ProductId, TenantId, UserId};

// =============================================================================
// Catalog
// =============================================================================

/// A product listed by a shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Owning shop.
    #[serde(default)]
    pub tenant: Option<TenantId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Current list price.
    pub price: Decimal,
    #[serde(default)]
    pub stock: i64,
    /// Shop display name, when the listing includes it.
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether any units are available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Fields for creating or fully replacing a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i64,
}

/// Partial product update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

impl ProductUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
    }
}

/// A shop on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub domain_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields for opening a shop. The creating account becomes its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTenant {
    pub name: String,
    pub subdomain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_url: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// An order as returned by the order endpoints.
///
/// Checkout creates one order per shop represented in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub tenant: Option<TenantId>,
    #[serde(default)]
    pub customer: Option<UserId>,
    #[serde(default)]
    pub status: OrderStatus,
    /// Server-computed total.
    pub total_amount: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Total units across all items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

/// One line of a placed order, priced at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub product: Option<ProductId>,
    #[serde(default)]
    pub product_name: String,
    pub quantity: u32,
    /// Unit price charged.
    pub price: Decimal,
}

impl OrderItem {
    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// One requested line of a new order. Carries no price; the server prices
/// orders itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of an order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub items: Vec<OrderLineRequest>,
}

/// Order placement responds with a list (one per shop); older servers answer
/// with a single order.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum PlacedOrders {
    Many(Vec<Order>),
    One(Box<Order>),
}

impl From<PlacedOrders> for Vec<Order> {
    fn from(placed: PlacedOrders) -> Self {
        match placed {
            PlacedOrders::Many(orders) => orders,
            PlacedOrders::One(order) => vec![*order],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn test_product_from_api_json() {
        let product: Product = serde_json::from_str(
            r#"{
                "id": 12,
                "tenant": 3,
                "name": "Speckled Mug",
                "description": "Stoneware",
                "price": "18.50",
                "stock": 4,
                "created_at": "2024-03-01T12:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(product.id, ProductId::new(12));
        assert_eq!(product.tenant, Some(TenantId::new(3)));
        assert_eq!(product.price, dec("18.50"));
        assert!(product.in_stock());
        assert_eq!(product.tenant_name, None);
    }

    #[test]
    fn test_order_list_from_api_json() {
        let placed: PlacedOrders = serde_json::from_str(
            r#"[{
                "id": 40,
                "items": [
                    {"product": 12, "quantity": 2, "price": "18.50", "product_name": "Speckled Mug"}
                ],
                "tenant": 3,
                "customer": 9,
                "status": "PENDING",
                "total_amount": "37.00",
                "created_at": "2024-03-02T08:30:00Z"
            }]"#,
        )
        .unwrap();

        let orders: Vec<Order> = placed.into();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Pending);
        assert_eq!(orders[0].total_amount, dec("37.00"));
        assert_eq!(orders[0].item_count(), 2);
        assert_eq!(orders[0].items[0].line_total(), dec("37.00"));
    }

    #[test]
    fn test_single_order_response_is_accepted() {
        let placed: PlacedOrders =
            serde_json::from_str(r#"{"id": 1, "items": [], "total_amount": "0.00"}"#).unwrap();
        let orders: Vec<Order> = placed.into();
        assert_eq!(orders[0].id, OrderId::new(1));
    }

    #[test]
    fn test_place_order_carries_no_price() {
        let body = serde_json::to_value(PlaceOrder {
            items: vec![OrderLineRequest {
                product_id: ProductId::new(12),
                quantity: 2,
            }],
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({ "items": [{ "product_id": 12, "quantity": 2 }] })
        );
    }

    #[test]
    fn test_partial_update_omits_unset_fields() {
        let update = ProductUpdate {
            price: Some(dec("9.99")),
            ..ProductUpdate::default()
        };
        assert!(!update.is_empty());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "price": "9.99" })
        );
    }
}
