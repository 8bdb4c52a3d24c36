use tracing::{error, info, Instrument};

use storefront::domain::{Caller, ListingQuery, Money, ProductCreate, UserId};
use storefront::{setup_tracing, StorefrontConfig, StorefrontSystem};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = StorefrontConfig::from_env().map_err(|e| e.to_string())?;
    info!(?config, "Starting storefront");

    let system = StorefrontSystem::new(config);
    let admin = Caller::admin("admin");

    // Seed the catalog
    let product = async {
        info!("Creating demo product");
        system
            .catalog_client
            .create_product(
                &admin,
                ProductCreate {
                    name: "Enamel Mug".to_string(),
                    description: "Speckled enamel camping mug".to_string(),
                    price: Money::from_cents(1450),
                    category: "kitchen".to_string(),
                    stock: Some(3),
                },
            )
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(tracing::info_span!("catalog_seed"))
    .await?;
    info!(product_id = %product.id, stock = product.stock, "Product created successfully");

    let listing = system
        .catalog_client
        .list_products(ListingQuery::default())
        .await
        .map_err(|e| e.to_string())?;
    info!(total = listing.total, "Catalog listed");

    // Two shoppers compete for the last units
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    for user in [&alice, &bob] {
        let view = system
            .cart_client
            .add_to_cart(user.clone(), product.id.clone(), 2)
            .await
            .map_err(|e| e.to_string())?;
        info!(user_id = %user, items = view.total_items, total = %view.total_price, "Cart updated");
    }

    let mut tasks = Vec::new();
    for user in [alice, bob] {
        let orders = system.order_client.clone();
        let span = tracing::info_span!("order_processing", user_id = %user);
        tasks.push(tokio::spawn(async move { (user.clone(), orders.place_order(user).await) }.instrument(span)));
    }

    for task in tasks {
        match task.await.map_err(|e| e.to_string())? {
            (user, Ok(order)) => info!(user_id = %user, order_id = %order.id, total = %order.total, "Order processed successfully"),
            (user, Err(e)) => error!(user_id = %user, error = %e, "Order processing failed"),
        }
    }

    let stock = system
        .stock_ledger
        .check_stock(product.id.clone())
        .await
        .map_err(|e| e.to_string())?;
    info!(product_id = %product.id, stock, "Remaining stock");

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
