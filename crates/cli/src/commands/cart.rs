//! Cart and checkout commands.

#![allow(clippy::print_stdout)]

use nexus_market_client::{CartProduct, CheckoutError, Marketplace};
use nexus_market_core::{ProductId, format_money};

use super::CommandError;

/// Add one unit of a product, looking up its current name and price.
pub async fn add(market: &Marketplace, id: ProductId) -> Result<(), CommandError> {
    let product = market.api().product(id).await?;

    let mut offered = CartProduct::from(&product);
    if offered.vendor_label.is_none()
        && let Some(tenant) = product.tenant
    {
        // Vendor label is cosmetic; a failed shop lookup still adds the line
        offered.vendor_label = market.api().tenant(tenant).await.ok().map(|t| t.name);
    }

    match market.cart().add_or_increment(&offered) {
        Some(quantity) => println!("{} x{quantity} in cart", product.name),
        None => {
            return Err(CommandError::InvalidInput(format!(
                "product #{id} cannot be added to the cart"
            )));
        }
    }
    if !product.in_stock() {
        println!("Note: {} is currently sold out", product.name);
    }
    Ok(())
}

pub fn decrement(market: &Marketplace, id: ProductId) {
    match market.cart().decrement(id) {
        Some(0) => println!("Removed product #{id} from cart"),
        Some(quantity) => println!("Product #{id} x{quantity} in cart"),
        None => println!("Product #{id} is not in the cart"),
    }
}

pub fn remove(market: &Marketplace, id: ProductId) {
    if market.cart().remove(id) {
        println!("Removed product #{id} from cart");
    } else {
        println!("Product #{id} is not in the cart");
    }
}

pub fn clear(market: &Marketplace) {
    market.cart().clear();
    println!("Cart emptied");
}

pub fn show(market: &Marketplace) {
    let cart = market.cart();
    let lines = cart.lines();
    if lines.is_empty() {
        println!("Cart is empty");
        return;
    }

    for line in &lines {
        let vendor = line
            .vendor_label
            .as_deref()
            .map(|v| format!(" ({v})"))
            .unwrap_or_default();
        println!(
            "#{:<5} {}{vendor}  {} x{} = {}",
            line.product_id,
            line.name,
            format_money(line.unit_price),
            line.quantity,
            format_money(line.line_total()),
        );
    }
    println!();
    println!(
        "{} items, subtotal {}",
        cart.item_count(),
        format_money(cart.subtotal())
    );
    println!("Final prices are confirmed at checkout.");
}

/// Submit the cart. Prints the created orders, one per shop.
pub async fn checkout(market: &Marketplace) -> Result<(), CommandError> {
    let orders = match market.checkout().await {
        Ok(orders) => orders,
        Err(e) if e.requires_authentication() => {
            println!("Sign in with `nm-cli login` to check out. Your cart has been kept.");
            return Err(e.into());
        }
        Err(CheckoutError::EmptyCart) => {
            println!("Cart is empty");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for order in &orders {
        println!(
            "Order #{} placed: {} items, total {} ({})",
            order.id,
            order.item_count(),
            format_money(order.total_amount),
            order.status
        );
    }
    Ok(())
}
