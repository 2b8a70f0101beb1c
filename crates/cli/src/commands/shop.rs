//! Catalog, cart and order commands.

use cartify_client::api::types::{Address, CheckoutRequest, Order, ProductQuery};
use cartify_client::{Cartify, ReconcilePolicy};
use cartify_core::{Money, OrderId, ProductId};

use super::{CommandError, require_session};

pub async fn products(
    cartify: &Cartify,
    search: Option<String>,
    category: Option<String>,
    page: Option<u32>,
) -> Result<(), CommandError> {
    let query = ProductQuery {
        search,
        category,
        page,
        limit: None,
    };
    let products = cartify.api().buyer().products(&query).await?;
    if products.is_empty() {
        println!("No products found");
    }
    for product in products {
        println!(
            "{:<26} {:>14}  {}",
            product.id,
            Money::naira(product.price),
            product.name
        );
    }
    Ok(())
}

pub async fn product(cartify: &Cartify, id: &str) -> Result<(), CommandError> {
    let product = cartify.api().buyer().product(&ProductId::new(id)).await?;
    println!("{}", product.name);
    println!("  price:    {}", Money::naira(product.price));
    if let Some(seller) = &product.seller {
        println!("  seller:   {}", seller.name);
    }
    if let Some(stock) = product.stock {
        println!("  in stock: {stock}");
    }
    if let Some(image) = &product.image {
        println!("  image:    {image}");
    }
    if !product.description.is_empty() {
        println!("\n{}", product.description);
    }
    Ok(())
}

// =============================================================================
// Cart
// =============================================================================

pub fn show_cart(cartify: &Cartify) {
    let cart = cartify.cart();
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in cart.items() {
        println!(
            "{:<26} {:>3} x {:>12}  {}",
            line.id,
            line.quantity,
            Money::naira(line.price),
            line.name
        );
    }
    println!(
        "{} item(s), total {}",
        cart.cart_items_count(),
        cart.cart_total_money()
    );
}

/// Look the product up, then add it to the cart.
pub async fn add_to_cart(cartify: &Cartify, id: &str, quantity: u32) -> Result<(), CommandError> {
    let product = cartify.api().buyer().product(&ProductId::new(id)).await?;
    let item = product.to_cart_item().with_quantity(quantity);
    let result = cartify.add_to_cart(item).await;
    show_cart(cartify);
    Ok(result?)
}

pub async fn set_quantity(cartify: &Cartify, id: &str, quantity: i64) -> Result<(), CommandError> {
    let result = cartify
        .update_quantity(&ProductId::new(id), quantity)
        .await;
    show_cart(cartify);
    Ok(result?)
}

pub async fn remove_from_cart(cartify: &Cartify, id: &str) -> Result<(), CommandError> {
    let result = cartify.remove_from_cart(&ProductId::new(id)).await;
    show_cart(cartify);
    Ok(result?)
}

pub async fn clear_cart(cartify: &Cartify) -> Result<(), CommandError> {
    let result = cartify.clear_cart().await;
    println!("Cart cleared");
    Ok(result?)
}

pub async fn sync_cart(cartify: &Cartify, policy: ReconcilePolicy) -> Result<(), CommandError> {
    require_session(cartify)?;
    cartify.pull_cart(policy).await?;
    show_cart(cartify);
    Ok(())
}

// =============================================================================
// Orders
// =============================================================================

fn print_order(order: &Order) {
    let placed = order
        .created_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    println!(
        "{:<26} {:<10} {:>14}  {placed}",
        order.id,
        order.status,
        Money::naira(order.total)
    );
}

pub async fn orders(cartify: &Cartify) -> Result<(), CommandError> {
    require_session(cartify)?;
    let orders = cartify.api().buyer().orders().await?;
    if orders.is_empty() {
        println!("No orders yet");
    }
    orders.iter().for_each(print_order);
    Ok(())
}

pub async fn order(cartify: &Cartify, id: &str) -> Result<(), CommandError> {
    require_session(cartify)?;
    let order = cartify.api().buyer().order(&OrderId::new(id)).await?;
    print_order(&order);
    for line in &order.items {
        println!("  {:>3} x {}  {}", line.quantity, Money::naira(line.price), line.name);
    }
    Ok(())
}

pub async fn cancel_order(cartify: &Cartify, id: &str) -> Result<(), CommandError> {
    require_session(cartify)?;
    let order = cartify.api().buyer().cancel_order(&OrderId::new(id)).await?;
    print_order(&order);
    Ok(())
}

/// Place an order for the whole cart and empty it on success.
pub async fn checkout(
    cartify: &Cartify,
    address: Address,
    payment_method: &str,
) -> Result<(), CommandError> {
    require_session(cartify)?;
    let items = cartify.cart().items();
    let request = CheckoutRequest::from_cart(&items, address, payment_method);
    let order = cartify.api().buyer().checkout(&request).await?;
    cartify.cart().clear_cart();
    println!("Order placed");
    print_order(&order);
    Ok(())
}
