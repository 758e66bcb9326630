//! Order history commands.

#![allow(clippy::print_stdout)]

use nexus_market_client::Marketplace;
use nexus_market_core::{OrderId, OrderStatus, format_money};

use super::CommandError;

pub async fn list(market: &Marketplace) -> Result<(), CommandError> {
    let orders = market.api().orders().await?;
    if orders.is_empty() {
        println!("No orders yet");
        return Ok(());
    }

    for order in &orders {
        let placed = order
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "Order #{}  {placed}  {}  {}",
            order.id,
            order.status,
            format_money(order.total_amount)
        );
        for item in &order.items {
            println!(
                "    {} x{} @ {}",
                item.product_name,
                item.quantity,
                format_money(item.price)
            );
        }
    }
    Ok(())
}

pub async fn set_status(
    market: &Marketplace,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), CommandError> {
    let order = market.api().update_order_status(id, status).await?;
    println!("Order #{} is now {}", order.id, order.status);
    Ok(())
}
