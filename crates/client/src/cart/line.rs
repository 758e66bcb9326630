//! Cart line and product input types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use nexus_market_core::ProductId;

use crate::api::Product;

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Price when the line was added. Advisory only; orders are priced by the
    /// server.
    #[serde(with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    /// Always at least 1.
    pub quantity: u32,
    #[serde(default)]
    pub vendor_label: Option<String>,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A product as offered to the cart.
///
/// Mirrors what a product view has on hand: the id may be missing (unsaved
/// draft) and the price is the raw decimal string from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartProduct {
    pub id: Option<ProductId>,
    pub name: String,
    pub price: String,
    pub vendor_label: Option<String>,
}

impl CartProduct {
    /// Product with an id and price.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            price: price.into(),
            vendor_label: None,
        }
    }

    /// Set the shop name shown next to the line.
    #[must_use]
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor_label = Some(vendor.into());
        self
    }
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: Some(product.id),
            name: product.name.clone(),
            price: product.price.to_string(),
            vendor_label: product.tenant_name.clone(),
        }
    }
}
