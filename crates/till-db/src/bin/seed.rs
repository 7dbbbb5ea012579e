//! # Seed Data Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Default database (TILL_DB_PATH or ./till_dev.db)
//! cargo run -p till-db --bin seed
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//!
//! # More detail
//! RUST_LOG=debug cargo run -p till-db --bin seed
//! ```
//!
//! ## Generated Data
//! - One category per entry in `CATEGORIES`, each product with a size variant
//! - Opening stock through manual adjustments (so the ledger explains it)
//! - A global 5% discount, a category discount on Snacks, a product deal
//! - Two coupon codes: `WELCOME10` (once per customer) and `SPRING25`
//!   (100 redemptions in total)

use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use till_core::{
    Clock, DiscountScope, DiscountType, NewCategory, NewCoupon, NewDiscount, NewProduct,
    SystemClock, SYSTEM_USER_ID,
};
use till_db::{CatalogService, Database, DbConfig, DiscountService, InventoryService};

/// Categories and the products in each.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Beverages",
        &["Coca-Cola", "Pepsi", "Sprite", "Orange Juice", "Iced Tea", "Sparkling Water"],
    ),
    (
        "Snacks",
        &["Lays Classic", "Doritos Nacho", "Pretzels", "Oreos", "Kit Kat", "Trail Mix"],
    ),
    (
        "Dairy",
        &["Whole Milk", "Greek Yogurt", "Cheddar Cheese", "Butter", "Eggs Dozen"],
    ),
    (
        "Grocery",
        &["Pasta Penne", "Rice White", "Canned Beans", "Peanut Butter", "Honey", "Oatmeal"],
    ),
];

/// Size variants and their price add-on in cents
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Medium", 100), ("Large", 200)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $TILL_DB_PATH or ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = match db_path {
        Some(path) => DbConfig::new(path),
        None => DbConfig::from_env()?,
    };

    println!("🌱 Till Seed Data Generator");
    println!("===========================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().count_products().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let catalog = CatalogService::new(db.clone(), clock.clone());
    let inventory = InventoryService::new(db.clone(), clock.clone());
    let discounts = DiscountService::new(db.clone(), clock);

    println!();
    println!("Generating catalog...");
    let start = std::time::Instant::now();

    let mut generated = 0usize;
    let mut snacks_id = None;
    let mut first_product_id = None;

    for (category_idx, (category_name, products)) in CATEGORIES.iter().enumerate() {
        let category = catalog
            .create_category(
                NewCategory {
                    name: category_name.to_string(),
                    parent_id: None,
                },
                SYSTEM_USER_ID,
            )
            .await?;
        if *category_name == "Snacks" {
            snacks_id = Some(category.id);
        }

        for (product_idx, product_name) in products.iter().enumerate() {
            for (size_idx, (size_name, price_addon)) in SIZES.iter().enumerate() {
                let seed = category_idx * 100 + product_idx * 10 + size_idx;

                let product = catalog
                    .create_product(
                        NewProduct {
                            category_id: category.id,
                            name: format!("{} {}", product_name, size_name),
                            description: None,
                            // $1.99 - $9.99 plus the size add-on
                            unit_price_cents: 199 + ((seed * 17) % 800) as i64 + price_addon,
                        },
                        SYSTEM_USER_ID,
                    )
                    .await?;
                first_product_id.get_or_insert(product.id);

                let opening = (seed % 50) as i64 + 5;
                inventory
                    .adjust_stock(product.id, opening, Some("Opening stock"), None)
                    .await?;

                generated += 1;
            }
        }

        info!(category = %category_name, "Category seeded");
    }

    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    println!();
    println!("Generating promotions...");

    discounts
        .create_discount(NewDiscount::simple(
            "Store-wide 5%",
            DiscountType::Percent,
            500,
            DiscountScope::Global,
        ))
        .await?;

    if let Some(category_id) = snacks_id {
        let snacks = discounts
            .create_discount(NewDiscount::simple(
                "Snack attack 15%",
                DiscountType::Percent,
                1500,
                DiscountScope::Category,
            ))
            .await?;
        discounts.link_category(snacks.id, category_id).await?;
    }

    if let Some(product_id) = first_product_id {
        let deal = discounts
            .create_discount(NewDiscount::simple(
                "Cola $1 off",
                DiscountType::Amount,
                100,
                DiscountScope::Product,
            ))
            .await?;
        discounts.link_product(deal.id, product_id).await?;
    }

    let welcome = discounts
        .create_discount(NewDiscount::simple(
            "Welcome 10%",
            DiscountType::Percent,
            1000,
            DiscountScope::Coupon,
        ))
        .await?;
    discounts
        .create_coupon(NewCoupon {
            discount_id: welcome.id,
            code: "WELCOME10".to_string(),
            usage_limit_total: None,
            usage_limit_per_customer: Some(1),
        })
        .await?;

    let spring = discounts
        .create_discount(NewDiscount::simple(
            "Spring sale 25%",
            DiscountType::Percent,
            2500,
            DiscountScope::Coupon,
        ))
        .await?;
    discounts
        .create_coupon(NewCoupon {
            discount_id: spring.id,
            code: "SPRING25".to_string(),
            usage_limit_total: Some(100),
            usage_limit_per_customer: None,
        })
        .await?;

    println!("✓ Created 5 discounts and 2 coupons");
    println!();
    println!("✓ Seed complete!");

    db.close().await;

    Ok(())
}
