//! # Reconciliation Configuration
//!
//! Configuration for the reconciliation services.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     COMANDA_DATABASE_PATH=./comanda.db                                 │
//! │     COMANDA_TAX_RATE_BPS=800                                           │
//! │     COMANDA_TIP_BUCKETING=by_payment_method                            │
//! │     COMANDA_PAYMENT_TABLE=/etc/comanda/payments.json                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/comanda/comanda.toml (Linux)                             │
//! │     ~/Library/Application Support/com.comanda.comanda/comanda.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     8% tax, legacy tip bucketing, built-in payment table               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # comanda.toml
//! [database]
//! path = "./comanda.db"
//! max_connections = 4
//!
//! [invoice]
//! tax_rate_bps = 800
//!
//! [audit]
//! tip_bucketing = "cash_origin"   # cash_origin | by_payment_method
//! recent_window_hours = 24
//! payment_table_path = "payments.json"
//!
//! [audit.payment_methods]
//! cash = "cash"
//! card_visa = "card"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use comanda_core::{IncomeType, PaymentCategoryTable, TaxRate, TipBucketing};

/// Environment variable overriding the database path.
pub const ENV_DATABASE_PATH: &str = "COMANDA_DATABASE_PATH";
/// Environment variable overriding the tax rate.
pub const ENV_TAX_RATE_BPS: &str = "COMANDA_TAX_RATE_BPS";
/// Environment variable overriding tip bucketing.
pub const ENV_TIP_BUCKETING: &str = "COMANDA_TIP_BUCKETING";
/// Environment variable pointing at a JSON payment table.
pub const ENV_PAYMENT_TABLE: &str = "COMANDA_PAYMENT_TABLE";

/// Upper bound for `audit.recent_window_hours` (one year).
pub const MAX_RECENT_WINDOW_HOURS: i64 = 8_760;

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Pool size. A back office rarely needs more than a handful.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("comanda.db")
}

fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[invoice]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSection {
    /// Consumption tax included in item prices.
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,
}

fn default_tax_rate_bps() -> u32 {
    comanda_core::DEFAULT_TAX_RATE_BPS
}

impl Default for InvoiceSection {
    fn default() -> Self {
        InvoiceSection {
            tax_rate_bps: default_tax_rate_bps(),
        }
    }
}

/// `[audit]`. The runtime form is [`crate::cash_audit::AuditSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSection {
    #[serde(default)]
    pub tip_bucketing: TipBucketing,

    /// An audit created less than this long ago is returned instead of a
    /// new one.
    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: i64,

    /// JSON file with the `method → category` table. Replaces the built-in
    /// table when set.
    #[serde(default)]
    pub payment_table_path: Option<PathBuf>,

    /// Extra or overriding entries, applied after the file.
    #[serde(default)]
    pub payment_methods: BTreeMap<String, IncomeType>,
}

fn default_recent_window_hours() -> i64 {
    24
}

impl Default for AuditSection {
    fn default() -> Self {
        AuditSection {
            tip_bucketing: TipBucketing::default(),
            recent_window_hours: default_recent_window_hours(),
            payment_table_path: None,
            payment_methods: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Root Config
// =============================================================================

/// Complete configuration for the reconciliation services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub invoice: InvoiceSection,

    #[serde(default)]
    pub audit: AuditSection,
}

impl ReconcileConfig {
    /// Loads configuration from file and environment.
    ///
    /// ## Loading Order
    /// 1. Start with defaults
    /// 2. Load from TOML file if it exists (`config_path` or the platform default)
    /// 3. Override with environment variables
    /// 4. Validate
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading reconcile config from file");
                let contents = read_file(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database.path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.invoice.tax_rate_bps >= 10_000 {
            return Err(ConfigError::InvalidValue {
                key: "invoice.tax_rate_bps".to_string(),
                reason: format!("{} bps is 100% or more", self.invoice.tax_rate_bps),
            });
        }

        if !(0..=MAX_RECENT_WINDOW_HOURS).contains(&self.audit.recent_window_hours) {
            return Err(ConfigError::InvalidValue {
                key: "audit.recent_window_hours".to_string(),
                reason: format!(
                    "{} is outside 0..={MAX_RECENT_WINDOW_HOURS}",
                    self.audit.recent_window_hours
                ),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "database.max_connections".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    ///
    /// Unlike unknown TOML keys, a malformed variable is an error: it was set
    /// on purpose.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = std::env::var(ENV_DATABASE_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(bps) = std::env::var(ENV_TAX_RATE_BPS) {
            self.invoice.tax_rate_bps =
                bps.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_TAX_RATE_BPS.to_string(),
                    reason: format!("'{bps}' is not a whole number of basis points"),
                })?;
        }

        if let Ok(mode) = std::env::var(ENV_TIP_BUCKETING) {
            self.audit.tip_bucketing =
                mode.trim().parse().map_err(|err: comanda_core::ValidationError| {
                    ConfigError::InvalidValue {
                        key: ENV_TIP_BUCKETING.to_string(),
                        reason: err.to_string(),
                    }
                })?;
        }

        if let Ok(path) = std::env::var(ENV_PAYMENT_TABLE) {
            debug!(path = %path, "Overriding payment table from environment");
            self.audit.payment_table_path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    /// Returns the platform default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "comanda", "comanda")
            .map(|dirs| dirs.config_dir().join("comanda.toml"))
    }

    // =========================================================================
    // Derived Values
    // =========================================================================

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.invoice.tax_rate_bps)
    }

    /// The dedupe window, clamped to `0..=MAX_RECENT_WINDOW_HOURS` so an
    /// unvalidated config cannot overflow date arithmetic.
    pub fn recent_window(&self) -> chrono::Duration {
        let hours = self.audit.recent_window_hours.clamp(0, MAX_RECENT_WINDOW_HOURS);
        chrono::Duration::hours(hours)
    }

    /// Builds the payment category table.
    ///
    /// Starts from the JSON file when configured, the built-in table
    /// otherwise, then applies `[audit.payment_methods]`.
    pub fn payment_table(&self) -> Result<PaymentCategoryTable, ConfigError> {
        let mut table = match &self.audit.payment_table_path {
            Some(path) => {
                info!(?path, "Loading payment table");
                PaymentCategoryTable::from_json(&read_file(path)?)?
            }
            None => PaymentCategoryTable::default(),
        };

        for (method, kind) in &self.audit.payment_methods {
            table.insert(method.clone(), *kind);
        }

        if table.is_empty() {
            warn!("Payment table is empty; every payment will be untracked");
        }

        Ok(table)
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}
