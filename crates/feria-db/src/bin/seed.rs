//! # Seed Data Generator
//!
//! Populates a development database with one scheduled fair, a set of
//! artisans and their stocked products.
//!
//! ## Usage
//! ```bash
//! # 8 artisans (default)
//! cargo run -p feria-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p feria-db --bin seed -- --artisans 20 --db ./data/feria.db
//! ```
//!
//! The fair opens tomorrow and runs for three days, so products can still
//! be stocked. Nothing is written when the database already holds events.

use chrono::{Duration, Utc};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use feria_core::dto::{NewArtisan, NewEvent, NewProduct};
use feria_core::SystemClock;
use feria_db::{Database, DbConfig, FeriaConfig, Services};

/// Crafts per category, with a base price in cents.
const CRAFTS: &[(&str, &[(&str, i64)])] = &[
    (
        "ceramics",
        &[("Clay Mug", 1800), ("Serving Bowl", 3500), ("Flower Vase", 4200)],
    ),
    (
        "textiles",
        &[("Wool Scarf", 2900), ("Woven Bag", 5400), ("Table Runner", 3100)],
    ),
    (
        "woodwork",
        &[("Cutting Board", 2600), ("Carved Spoon", 900), ("Jewelry Box", 6500)],
    ),
    (
        "jewelry",
        &[("Silver Ring", 4800), ("Beaded Necklace", 2200), ("Copper Bracelet", 1900)],
    ),
];

const FIRST_NAMES: &[&str] = &["Ana", "Luis", "Marta", "Jorge", "Rosa", "Pablo", "Elena", "Tomás", "Inés", "Raúl"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut artisan_count: usize = 8;
    let mut db_path = String::from("./feria_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--artisans" | "-a" => {
                if i + 1 < args.len() {
                    artisan_count = args[i + 1].parse().unwrap_or(8);
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
                println!("Feria Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -a, --artisans <N>  Number of artisans to generate (default: 8)");
                println!("  -d, --db <PATH>     Database file path (default: ./feria_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Feria Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Artisans: {}", artisan_count);
    println!();

    let config = FeriaConfig::load_or_default(None);
    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.events().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} events", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let services = Services::new(db, Arc::new(SystemClock), config.fair);

    let start = Utc::now() + Duration::days(1);
    let event = services
        .create_event(NewEvent {
            name: "Winter Craft Fair".to_string(),
            location: "Town Square".to_string(),
            start_date: start,
            end_date: start + Duration::days(3),
            commission_association_bps: None,
            commission_seller_bps: None,
        })
        .await?;
    println!("✓ Created fair '{}' ({})", event.name, event.id);

    let mut products = 0;
    for n in 0..artisan_count {
        let artisan = services
            .create_artisan(NewArtisan {
                name: format!("{} {:02}", FIRST_NAMES[n % FIRST_NAMES.len()], n + 1),
                identification: format!("ART-{:05}", n + 1),
            })
            .await?;

        let (category, items) = CRAFTS[n % CRAFTS.len()];
        for (k, (name, base_price)) in items.iter().enumerate() {
            let created = services
                .create_product(NewProduct {
                    name: name.to_string(),
                    price_cents: base_price + (n as i64 % 5) * 100,
                    event_id: event.id.clone(),
                    artisan_id: artisan.id.clone(),
                    category: category.to_string(),
                    initial_stock: Some(5 + ((n + k) as i64 * 3) % 20),
                })
                .await;

            match created {
                Ok(_) => products += 1,
                Err(e) => eprintln!("Failed to create {} for {}: {}", name, artisan.name, e),
            }
        }
    }

    println!();
    println!("✓ Generated {} artisans and {} products", artisan_count, products);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
