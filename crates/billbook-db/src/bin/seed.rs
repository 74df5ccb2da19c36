//! # Seed Data Generator
//!
//! Fills the stock catalog of one account with a grocery assortment for
//! local development.
//!
//! ## Usage
//! ```bash
//! # Default database and account
//! cargo run -p billbook-db --bin seed
//!
//! # Specific file and account
//! cargo run -p billbook-db --bin seed -- --db ./data/billbook.db --account shop-1
//! ```
//!
//! Prices are fixed per item; stock levels are random in `0..=20` so some
//! entries start out unsellable.

use std::env;

use billbook_core::{NewStockItem, DEFAULT_ACCOUNT_ID};
use billbook_db::{Database, DbConfig};
use rand::Rng;

/// (name, HSN code, price in whole units)
const ASSORTMENT: &[(&str, &str, i64)] = &[
    ("Basmati Rice 1kg", "1006", 80),
    ("Sunflower Oil 1L", "1512", 120),
    ("Sugar 1kg", "1701", 60),
    ("Toor Dal 1kg", "0713", 90),
    ("Wheat Flour 5kg", "1101", 210),
    ("Tea Powder 250g", "0902", 150),
    ("Salt 1kg", "2501", 25),
    ("Turmeric 100g", "0910", 35),
    ("Chilli Powder 100g", "0904", 40),
    ("Ghee 500ml", "0405", 320),
    ("Soap Bar", "3401", 30),
    ("Detergent 1kg", "3402", 110),
    ("Biscuits Pack", "1905", 20),
    ("Milk Powder 500g", "0402", 260),
    ("Poha 500g", "1904", 45),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./billbook_dev.db");
    let mut account = String::from(DEFAULT_ACCOUNT_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--account" | "-a" => {
                if i + 1 < args.len() {
                    account = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Billbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./billbook_dev.db)");
                println!("  -a, --account <ID>     Account id (default: {DEFAULT_ACCOUNT_ID})");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Billbook Seed Data Generator");
    println!("Database: {db_path}");
    println!("Account:  {account}");
    println!();

    let db = Database::new(DbConfig::new(&db_path).account_id(&account)).await?;

    let mut rng = rand::thread_rng();
    let drafts: Vec<NewStockItem> = ASSORTMENT
        .iter()
        .map(|(name, hsn, units)| NewStockItem {
            name: name.to_string(),
            hsn_code: Some(hsn.to_string()),
            unit_price_cents: units * 100,
            available_quantity: rng.gen_range(0..=20),
        })
        .collect();

    let summary = db.stock().upsert_many(&drafts).await?;
    let sellable = db
        .stock()
        .list()
        .await?
        .iter()
        .filter(|item| item.is_sellable())
        .count();

    println!(
        "Seeded {} new, {} updated; {} of {} items in stock",
        summary.inserted,
        summary.updated,
        sellable,
        drafts.len()
    );

    Ok(())
}
