//! # Seed Data Generator
//!
//! Populates the database with a demo store and one open shift full of
//! invoiced, paid orders, so the cash audit has something to reconcile.
//!
//! ## Usage
//! ```bash
//! # Seed 12 orders (default)
//! cargo run -p comanda-db --bin seed
//!
//! # Custom amount
//! cargo run -p comanda-db --bin seed -- --count 40
//!
//! # Specify database path
//! cargo run -p comanda-db --bin seed -- --db ./data/comanda.db
//! ```
//!
//! ## Generated Data
//! - Store `store-demo` ("Comanda Centro")
//! - One open shift with a 100,000 opening balance
//! - Orders of 1-4 dishes, each invoiced at 8% inclusive tax
//! - Every second invoice carries a 10% tip
//! - One payment per invoice, cycling through cash, cards, online and bono

use chrono::{Duration, Utc};
use comanda_core::invoice::{build_invoice, invoice_from_order, set_tip_percentage};
use comanda_core::{
    Money, Order, OrderItem, OrderStatus, Payment, Shift, Store, TaxRate,
    DEFAULT_TIP_PERCENTAGE_BPS,
};
use comanda_db::{Database, DbConfig};
use std::env;
use uuid::Uuid;

const STORE_ID: &str = "store-demo";

/// Menu for realistic test data: (sku, name, price)
const MENU: &[(&str, &str, i64)] = &[
    ("BRG-CLS", "Classic Burger", 28_000),
    ("BRG-BCN", "Bacon Burger", 32_000),
    ("PZZ-MRG", "Margherita Pizza", 36_000),
    ("SLD-CSR", "Caesar Salad", 22_000),
    ("FRS-SML", "Fries", 9_000),
    ("DRK-LMN", "Lemonade", 7_500),
    ("DRK-SDA", "Soda", 5_000),
    ("DST-BRW", "Brownie", 12_000),
];

/// Payment methods, cycled per invoice
const METHODS: &[&str] = &["cash", "card_visa", "card_master", "yuno", "cash", "bono"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 12;
    let mut db_path = String::from("./comanda_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(12);
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
                println!("Comanda Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of orders to generate (default: 12)");
                println!("  -d, --db <PATH>    Database file path (default: ./comanda_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Comanda Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!("Orders:   {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Database ready (schema migrated and verified)");

    let existing = db.stores().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} stores", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        db.close().await;
        return Ok(());
    }

    db.stores()
        .insert(&Store {
            id: STORE_ID.to_string(),
            name: "Comanda Centro".to_string(),
            operations_center_code: Some("OC-001".to_string()),
            warehouse_code: Some("WH-001".to_string()),
        })
        .await?;

    let opened = Utc::now() - Duration::hours(6);
    let shift = Shift {
        id: Uuid::new_v4().to_string(),
        store_id: STORE_ID.to_string(),
        account_id: Some("cashier-demo".to_string()),
        start_time: opened,
        end_time: None,
        start_balance: Money::from_units(100_000),
        end_balance: Money::zero(),
    };
    db.shifts().insert(&shift).await?;

    println!("✓ Store {} with open shift {}", STORE_ID, shift.id);
    println!();
    println!("Generating orders...");

    let rate = TaxRate::default();
    let mut totals = Money::zero();
    let mut tips = Money::zero();

    for seed in 0..count {
        let order = generate_order(&shift, seed, opened + Duration::minutes(seed as i64 * 10));
        db.orders().insert(&order).await?;

        let params = invoice_from_order(&order, rate)?;
        let mut invoice = build_invoice(params).map_err(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        })?;

        if seed % 2 == 0 {
            set_tip_percentage(&mut invoice, DEFAULT_TIP_PERCENTAGE_BPS, rate)?;
        }

        let method = METHODS[seed % METHODS.len()];
        let mut payment = Payment::new(
            &invoice.id,
            method,
            invoice.total - invoice.tip_amount,
            invoice.tip_amount,
        );
        invoice.payments.push(payment.clone());
        db.invoices().insert(&invoice).await?;

        // the terminal confirms after the invoice is on file
        payment.mark_paid()?;
        db.invoices().update_payment_status(&payment).await?;
        db.orders().update_status(&order.id, OrderStatus::Closed).await?;

        totals += invoice.total;
        tips += invoice.tip_amount;
    }

    println!();
    println!("✓ Generated {} orders", count);
    println!("  Invoiced: {}", totals);
    println!("  Tips:     {}", tips);
    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Generates a single order with 1-4 dishes.
fn generate_order(shift: &Shift, seed: usize, created_at: chrono::DateTime<Utc>) -> Order {
    let id = Uuid::new_v4().to_string();
    let lines = 1 + seed % 4;

    let items = (0..lines)
        .map(|line| {
            let (sku, name, price) = MENU[(seed * 3 + line * 5) % MENU.len()];
            OrderItem {
                id: Uuid::new_v4().to_string(),
                product_id: Some(sku.to_lowercase()),
                name: name.to_string(),
                sku: sku.to_string(),
                price: Money::from_units(price),
                description: None,
                comments: None,
                modifiers: Vec::new(),
            }
        })
        .collect();

    Order {
        id,
        store_id: shift.store_id.clone(),
        brand_id: "brand-demo".to_string(),
        channel_id: "dine-in".to_string(),
        table_id: Some(format!("T{}", 1 + seed % 9)),
        shift_id: Some(shift.id.clone()),
        seats: 1 + (seed % 4) as u32,
        current_status: OrderStatus::Delivered,
        items,
        invoices: Vec::new(),
        created_at,
    }
}
