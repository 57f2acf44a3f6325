//! # Seed Data Generator
//!
//! Populates the database with a development catalog.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products (default)
//! cargo run -p till-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p till-db --bin seed -- --count 2000
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//! ```
//!
//! Each product gets an EAN-13 style barcode `930{index:010}`, a
//! tax-inclusive price between $1.50 and $24.50 and a stock level of 0-60.

use chrono::Utc;
use std::env;
use till_core::Product;
use till_db::repository::product::generate_product_id;
use till_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Category name and the items sold under it.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Coffee",
        &[
            "Flat White",
            "Long Black",
            "Cappuccino",
            "Latte",
            "Mocha",
            "Piccolo",
            "Chai Latte",
            "Hot Chocolate",
        ],
    ),
    (
        "Bakery",
        &[
            "Croissant",
            "Banana Bread",
            "Blueberry Muffin",
            "Sourdough Loaf",
            "Cinnamon Scroll",
            "Lamington",
            "Meat Pie",
            "Sausage Roll",
        ],
    ),
    (
        "Dairy",
        &[
            "Full Cream Milk",
            "Skim Milk",
            "Oat Milk",
            "Almond Milk",
            "Greek Yoghurt",
            "Tasty Cheese",
            "Butter",
            "Thickened Cream",
        ],
    ),
    (
        "Pantry",
        &[
            "Vegemite",
            "Tim Tams",
            "Rolled Oats",
            "Honey",
            "Peanut Butter",
            "Jasmine Rice",
            "Penne",
            "Tinned Tomatoes",
        ],
    ),
    (
        "Drinks",
        &[
            "Sparkling Water",
            "Orange Juice",
            "Apple Juice",
            "Ginger Beer",
            "Lemon Squash",
            "Iced Coffee",
            "Kombucha",
            "Cola",
        ],
    ),
];

/// Size variants and the price they add, in cents.
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Regular", 50),
    ("Large", 100),
    ("Family", 400),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, count, "Seeding catalog");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    let variants = CATEGORIES.iter().flat_map(|(category, names)| {
        names.iter().flat_map(move |name| {
            SIZES
                .iter()
                .map(move |(size, addon)| (*category, *name, *size, *addon))
        })
    });

    for (index, (category, name, size, addon)) in variants.take(count).enumerate() {
        let product = generate_product(category, name, size, addon, index);

        if let Err(e) = db.products().insert(&product).await {
            warn!(name = %product.name, error = %e, "Failed to insert product");
            continue;
        }

        generated += 1;
    }

    info!(
        generated,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Generated products"
    );

    let milk = db.products().search("milk", 10).await?;
    info!(results = milk.len(), "Search 'milk'");

    let coffee = db.products().find_by_category("coffee").await?;
    info!(results = coffee.len(), "Category 'coffee'");

    info!("Seed complete");
    Ok(())
}

/// Generates a single product with plausible data.
fn generate_product(category: &str, name: &str, size: &str, addon: i64, index: usize) -> Product {
    let now = Utc::now();

    let base_price = 150 + ((index * 37) % 2000) as i64;
    let price_cents = base_price + addon;

    // Cost at 55-74% of price
    let cost_pct = 55 + (index % 20) as i64;

    Product {
        id: generate_product_id(),
        name: format!("{name} {size}"),
        description: None,
        barcode: Some(format!("930{index:010}")),
        category: Some(category.to_string()),
        price_cents,
        cost_cents: Some(price_cents * cost_pct / 100),
        stock: (index % 61) as i64,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
