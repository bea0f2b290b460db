//! # Cash Audit CLI
//!
//! Reconciles a store's last shift and prints the audit as JSON.
//!
//! ## Usage
//! ```bash
//! # Compute without saving (all reported figures default to 0)
//! cargo run -p comanda-reconcile --bin cash-audit -- --store store-demo \
//!     --cash 250000 --card 120000 --online 40000 --tips 18000 --total-sell 380000
//!
//! # Save it (returns the stored audit if one exists from the last 24h)
//! cargo run -p comanda-reconcile --bin cash-audit -- --store store-demo --save
//!
//! # Print the categorised summary instead of the full audit
//! cargo run -p comanda-reconcile --bin cash-audit -- --store store-demo --save --summary
//! ```
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - Default: `info,comanda=debug,sqlx=warn`
//!
//! Logs go to stderr so stdout stays valid JSON.

use comanda_core::{CashAuditSummary, CashReport, Money};
use comanda_db::{Database, DbConfig};
use comanda_reconcile::{AuditSettings, CashAuditService, ReconcileConfig};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut store_id: Option<String> = None;
    let mut reported = CashReport::default();
    let mut save = false;
    let mut summary = false;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--config", Some(v)) => config_path = Some(PathBuf::from(v)),
            ("--db", Some(v)) => db_path = Some(PathBuf::from(v)),
            ("--store", Some(v)) => store_id = Some(v.clone()),
            ("--cash", Some(v)) => reported.cash = parse_money("--cash", v)?,
            ("--card", Some(v)) => reported.card = parse_money("--card", v)?,
            ("--online", Some(v)) => reported.online = parse_money("--online", v)?,
            ("--tips", Some(v)) => reported.tips = parse_money("--tips", v)?,
            ("--total-sell", Some(v)) => reported.total_sell = parse_money("--total-sell", v)?,
            ("--save", _) => {
                save = true;
                i += 1;
                continue;
            }
            ("--summary", _) => {
                summary = true;
                i += 1;
                continue;
            }
            ("--help" | "-h", _) => {
                print_help();
                return Ok(());
            }
            (flag, _) => return Err(format!("unknown or incomplete argument: {flag}").into()),
        }
        i += 2;
    }

    let store_id = store_id.ok_or("--store is required")?;

    let mut config = ReconcileConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    info!(
        path = %config.database.path.display(),
        tax_rate_bps = config.invoice.tax_rate_bps,
        tip_bucketing = ?config.audit.tip_bucketing,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await?;
    let service = CashAuditService::new(db.clone(), AuditSettings::from_config(&config)?);

    let audit = if save {
        service.create(&store_id, reported).await?
    } else {
        service.get(&store_id, reported).await?
    };

    let json = if summary {
        serde_json::to_string_pretty(&CashAuditSummary::from(&audit))?
    } else {
        serde_json::to_string_pretty(&audit)?
    };
    println!("{json}");

    db.close().await;
    Ok(())
}

/// Initializes tracing with an env filter, writing to stderr.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,comanda=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_money(flag: &str, value: &str) -> Result<Money, String> {
    value
        .parse::<i64>()
        .map(Money::from_units)
        .map_err(|_| format!("{flag} expects whole currency units, got '{value}'"))
}

fn print_help() {
    println!("Comanda Cash Audit");
    println!();
    println!("Usage: cash-audit --store <ID> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --store <ID>          Store to reconcile (required)");
    println!("  --db <PATH>           Database file (overrides config)");
    println!("  --config <PATH>       Config file (default: platform config dir)");
    println!("  --cash <N>            Reported cash");
    println!("  --card <N>            Reported card");
    println!("  --online <N>          Reported online");
    println!("  --tips <N>            Reported tips");
    println!("  --total-sell <N>      Reported total sell");
    println!("  --save                Persist the audit");
    println!("  --summary             Print the categorised summary");
    println!("  -h, --help            Show this help message");
}
