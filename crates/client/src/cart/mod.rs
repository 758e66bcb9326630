//! Persistent shopping cart.
//!
//! The in-memory cart is authoritative. Storage is a mirror: it seeds the
//! cart once on [`CartStore::load`] and again only when another handle
//! changes the record. Every mutation writes the full snapshot while the
//! cart lock is held, so the stored record always reflects the latest
//! mutation.
//!
//! Cart operations never suspend.

mod line;
pub mod snapshot;

pub use line::{CartLine, CartProduct};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use nexus_market_core::{ProductId, parse_price};

use crate::storage::{Storage, keys};

/// Client-side cart mirrored into durable storage.
///
/// Cheap to clone; clones share the same lines.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    lines: Mutex<Vec<CartLine>>,
    storage: Arc<dyn Storage>,
}

impl CartStore {
    /// Load the cart from storage.
    ///
    /// A missing record yields an empty cart. An unreadable or corrupt record
    /// is discarded and the cart starts empty.
    #[must_use]
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let lines = read_lines(storage.as_ref());
        tracing::debug!(lines = lines.len(), "Loaded cart");

        Self {
            inner: Arc::new(CartStoreInner {
                lines: Mutex::new(lines),
                storage,
            }),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of `product`.
    ///
    /// Increments an existing line or appends a new line with quantity 1,
    /// capturing the product's name, price and vendor. Returns the line's new
    /// quantity, or `None` if nothing changed: products without an id are
    /// ignored, as are products whose price is not a decimal.
    pub fn add_or_increment(&self, product: &CartProduct) -> Option<u32> {
        let product_id = product.id?;

        let mut lines = self.lock();
        let quantity = if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line.quantity.saturating_add(1);
            line.quantity
        } else {
            let unit_price = match parse_price(&product.price) {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!(
                        product_id = %product_id,
                        price = %product.price,
                        error = %e,
                        "Not adding product with unreadable price"
                    );
                    return None;
                }
            };

            lines.push(CartLine {
                product_id,
                name: product.name.clone(),
                unit_price,
                quantity: 1,
                vendor_label: product.vendor_label.clone(),
            });
            1
        };

        self.persist(&lines);
        Some(quantity)
    }

    /// Remove one unit of a product, dropping the line when it reaches zero.
    ///
    /// Returns the remaining quantity (0 when the line was removed), or `None`
    /// if the product is not in the cart.
    pub fn decrement(&self, product_id: ProductId) -> Option<u32> {
        let mut lines = self.lock();
        let index = lines.iter().position(|l| l.product_id == product_id)?;

        let line = lines.get_mut(index)?;
        line.quantity = line.quantity.saturating_sub(1);
        let remaining = line.quantity;
        if remaining == 0 {
            lines.remove(index);
        }

        self.persist(&lines);
        Some(remaining)
    }

    /// Remove a product's line entirely. Returns whether a line was removed.
    pub fn remove(&self, product_id: ProductId) -> bool {
        let mut lines = self.lock();
        let before = lines.len();
        lines.retain(|l| l.product_id != product_id);
        let removed = lines.len() != before;

        if removed {
            self.persist(&lines);
        }
        removed
    }

    /// Empty the cart.
    pub fn clear(&self) {
        let mut lines = self.lock();
        lines.clear();
        self.persist(&lines);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().clone()
    }

    /// The line for one product.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<CartLine> {
        self.lock()
            .iter()
            .find(|l| l.product_id == product_id)
            .cloned()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lock().iter().map(CartLine::line_total).sum()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock().iter().map(|l| u64::from(l.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // =========================================================================
    // Cross-handle sync
    // =========================================================================

    /// Replace the in-memory cart with the stored record if they differ.
    ///
    /// The record is read under the cart lock, so a local mutation cannot
    /// land between the read and the replace.
    ///
    /// Returns `true` if the cart changed.
    pub fn reload_from_storage(&self) -> bool {
        let mut lines = self.lock();
        let stored = read_lines(self.inner.storage.as_ref());

        if *lines == stored {
            return false;
        }
        *lines = stored;
        tracing::debug!(lines = lines.len(), "Cart reloaded after external change");
        true
    }

    /// Reload whenever another storage handle changes the cart record.
    ///
    /// The task ends when the storage channel closes or every clone of this
    /// store has been dropped.
    #[must_use]
    pub fn watch_storage(&self) -> JoinHandle<()> {
        let mut events = self.inner.storage.subscribe();
        let origin = self.inner.storage.origin();
        let weak = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.origin == origin || event.key != keys::CART => {}
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        let Some(inner) = weak.upgrade() else { break };
                        Self { inner }.reload_from_storage();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CartLine>> {
        self.inner
            .lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the snapshot. Called with the cart lock held.
    fn persist(&self, lines: &[CartLine]) {
        let result = snapshot::encode(lines)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.inner
                    .storage
                    .set(keys::CART, &raw)
                    .map_err(|e| e.to_string())
            });

        if let Err(error) = result {
            tracing::warn!(%error, "Failed to persist cart");
        }
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines = self.lock();
        f.debug_struct("CartStore")
            .field("lines", &*lines)
            .finish_non_exhaustive()
    }
}

/// Read the stored cart, discarding a corrupt record.
fn read_lines(storage: &dyn Storage) -> Vec<CartLine> {
    let decoded = storage
        .get(keys::CART)
        .and_then(|raw| raw.map_or_else(|| Ok(Vec::new()), |raw| snapshot::decode(&raw)));

    decoded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Discarding unreadable cart record");
        if let Err(e) = storage.remove(keys::CART) {
            tracing::warn!(error = %e, "Failed to discard cart record");
        }
        Vec::new()
    })
}
