//! Checkout: turn the cart into orders.

use thiserror::Error;
use tracing::instrument;

use crate::api::{CommerceApi, Order, OrderLineRequest, PlaceOrder};
use crate::cart::{CartLine, CartStore};
use crate::session::SessionError;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No one is signed in; send the user to the login flow.
    #[error("Sign in to check out")]
    AuthenticationRequired,

    /// Nothing to order.
    #[error("Cart is empty")]
    EmptyCart,

    /// The order request failed. The cart is unchanged.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CheckoutError {
    /// Whether the caller should send the user to sign in.
    #[must_use]
    pub const fn requires_authentication(&self) -> bool {
        match self {
            Self::AuthenticationRequired => true,
            Self::Session(e) => e.requires_authentication(),
            Self::EmptyCart => false,
        }
    }
}

/// Build the order request for a set of cart lines.
///
/// Only product ids and quantities are sent; the server prices the order.
#[must_use]
pub fn order_request(lines: &[CartLine]) -> PlaceOrder {
    PlaceOrder {
        items: lines
            .iter()
            .map(|line| OrderLineRequest {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect(),
    }
}

/// Submit the cart as an order.
///
/// On success the cart is cleared and the created orders (one per shop) are
/// returned. On failure the cart is left untouched.
///
/// # Errors
///
/// Returns `CheckoutError::AuthenticationRequired` without contacting the
/// server when no access token is held, `CheckoutError::EmptyCart` when the
/// cart has no lines, and `CheckoutError::Session` if the order request fails.
#[instrument(skip_all)]
pub async fn checkout(api: &CommerceApi, cart: &CartStore) -> Result<Vec<Order>, CheckoutError> {
    if !api.session().is_authenticated() {
        tracing::info!("Checkout requires sign in");
        return Err(CheckoutError::AuthenticationRequired);
    }

    let lines = cart.lines();
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let request = order_request(&lines);
    let orders = match api.place_order(&request).await {
        Ok(orders) => orders,
        Err(e) => {
            tracing::warn!(error = %e, "Checkout failed, cart kept");
            return Err(e.into());
        }
    };

    cart.clear();
    tracing::info!(
        orders = orders.len(),
        lines = request.items.len(),
        "Checkout complete"
    );
    Ok(orders)
}
