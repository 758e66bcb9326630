//! Catalog browsing and seller product management.

#![allow(clippy::print_stdout)]

use nexus_market_client::Marketplace;
use nexus_market_client::api::{NewProduct, NewTenant, Product, ProductUpdate};
use nexus_market_core::{ProductId, TenantId, format_money, parse_price};

use super::CommandError;

/// Optional product field changes from the command line.
#[derive(Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<String>,
    pub stock: Option<i64>,
    pub description: Option<String>,
}

pub async fn list_products(
    market: &Marketplace,
    shop: Option<TenantId>,
) -> Result<(), CommandError> {
    let products = market.api().products(shop).await?;
    if products.is_empty() {
        println!("No products");
        return Ok(());
    }

    for product in &products {
        println!("{}", product_row(product));
    }
    Ok(())
}

pub async fn show_product(market: &Marketplace, id: ProductId) -> Result<(), CommandError> {
    let product = market.api().product(id).await?;

    println!("{} (#{})", product.name, product.id);
    println!("  Price: {}", format_money(product.price));
    println!("  Stock: {}", product.stock);
    if let Some(tenant) = product.tenant {
        let shop = market
            .api()
            .tenant(tenant)
            .await
            .map_or_else(|_| format!("#{tenant}"), |t| t.name);
        println!("  Shop:  {shop}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
    Ok(())
}

pub async fn create_product(
    market: &Marketplace,
    name: String,
    price: &str,
    stock: i64,
    description: String,
) -> Result<(), CommandError> {
    require_seller(market)?;

    let product = market
        .api()
        .create_product(&NewProduct {
            name,
            description,
            price: parse_price(price)?,
            stock,
        })
        .await?;

    println!("Created {}", product_row(&product));
    Ok(())
}

pub async fn update_product(
    market: &Marketplace,
    id: ProductId,
    changes: ProductChanges,
) -> Result<(), CommandError> {
    require_seller(market)?;

    let update = ProductUpdate {
        name: changes.name,
        description: changes.description,
        price: changes.price.as_deref().map(parse_price).transpose()?,
        stock: changes.stock,
    };
    if update.is_empty() {
        return Err(CommandError::InvalidInput("nothing to update".to_string()));
    }

    let product = market.api().update_product(id, &update).await?;
    println!("Updated {}", product_row(&product));
    Ok(())
}

pub async fn delete_product(market: &Marketplace, id: ProductId) -> Result<(), CommandError> {
    require_seller(market)?;

    market.api().delete_product(id).await?;
    println!("Deleted product #{id}");
    Ok(())
}

pub async fn list_shops(market: &Marketplace) -> Result<(), CommandError> {
    let shops = market.api().tenants().await?;
    if shops.is_empty() {
        println!("No shops");
        return Ok(());
    }

    for shop in &shops {
        println!("#{:<5} {:<30} {}", shop.id, shop.name, shop.subdomain);
    }
    Ok(())
}

pub async fn show_shop(market: &Marketplace, id: TenantId) -> Result<(), CommandError> {
    let shop = market.api().tenant(id).await?;
    let products = market.api().products(Some(id)).await?;

    println!("{} (#{})", shop.name, shop.id);
    if let Some(ref url) = shop.domain_url {
        println!("  {url}");
    }
    println!();
    if products.is_empty() {
        println!("No products yet");
    }
    for product in &products {
        println!("{}", product_row(product));
    }
    Ok(())
}

pub async fn create_shop(
    market: &Marketplace,
    name: String,
    subdomain: String,
) -> Result<(), CommandError> {
    let shop = market
        .api()
        .create_tenant(&NewTenant {
            name,
            subdomain,
            domain_url: None,
        })
        .await?;

    println!("Opened shop '{}' (#{})", shop.name, shop.id);
    println!("Sign in again to manage it.");
    Ok(())
}

/// Fail early, without a network call, when the session cannot manage products.
fn require_seller(market: &Marketplace) -> Result<(), CommandError> {
    match market.session().current_identity() {
        Some(identity) if identity.can_manage_products() => Ok(()),
        Some(_) => Err(CommandError::InvalidInput(
            "only shop owners and staff can manage products".to_string(),
        )),
        None => Err(CommandError::InvalidInput(
            "sign in with a seller account first".to_string(),
        )),
    }
}

fn product_row(product: &Product) -> String {
    let stock = if product.in_stock() {
        format!("{} in stock", product.stock)
    } else {
        "sold out".to_string()
    };
    format!(
        "#{:<5} {:<30} {:>10}  {stock}",
        product.id,
        product.name,
        format_money(product.price)
    )
}
