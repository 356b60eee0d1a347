//! # Configuration
//!
//! Ledger configuration is managed by [`confique`], layered in priority order:
//!
//! 1. **Environment variables**: `STOCK_BUSINESS_NAME`, `STOCK_CURRENCY_SYMBOL`,
//!    `STOCK_RECENT_LIMIT`, `STOCK_DATA_DIR`.
//! 2. **Config file**: `stock.toml` inside the data directory.
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `business_name` | `Sistema de Inventario` | Title shown on the dashboard |
//! | `currency_symbol` | `$` | Prefix for formatted amounts |
//! | `recent_limit` | `5` | Entries in the dashboard activity feed |
//! | `data_dir` | OS data directory | Where `inventario.json` and `local.json` live |

use crate::error::{LedgerError, Result};
use confique::Config;
use directories::ProjectDirs;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "stock.toml";

/// Configuration for the ledger, stored in `stock.toml`.
#[derive(Config, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Title shown on the dashboard.
    #[config(env = "STOCK_BUSINESS_NAME", default = "Sistema de Inventario")]
    pub business_name: String,

    /// Symbol placed before every formatted amount.
    #[config(env = "STOCK_CURRENCY_SYMBOL", default = "$")]
    pub currency_symbol: String,

    /// How many entries the dashboard activity feed shows.
    #[config(env = "STOCK_RECENT_LIMIT", default = 5)]
    pub recent_limit: usize,

    /// Directory holding the record tree and local storage.
    /// When absent, the OS data directory is used.
    #[config(env = "STOCK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            business_name: "Sistema de Inventario".to_string(),
            currency_symbol: "$".to_string(),
            recent_limit: 5,
            data_dir: None,
        }
    }
}

fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "stockledger", "stockledger").map(|dirs| dirs.data_dir().to_path_buf())
}

impl LedgerConfig {
    /// Resolves the data directory (explicit override, then `STOCK_DATA_DIR`,
    /// then the OS default) and loads `stock.toml` from it.
    pub fn load(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let from_env = LedgerConfig::builder().env().load()?;
        let data_dir = data_dir_override
            .or(from_env.data_dir)
            .or_else(default_data_dir)
            .ok_or_else(|| {
                LedgerError::Validation("Could not determine a data directory".to_string())
            })?;
        Self::load_from(&data_dir)
    }

    /// Loads environment and `stock.toml` in `data_dir`. The directory itself
    /// is always `data_dir`.
    pub fn load_from(data_dir: &Path) -> Result<Self> {
        let mut config = LedgerConfig::builder()
            .env()
            .file(data_dir.join(CONFIG_FILENAME))
            .load()?;
        config.data_dir = Some(data_dir.to_path_buf());
        Ok(config)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Rounded to whole units with `.` thousands separators, e.g. `$1.234.567`.
    pub fn format_money(&self, amount: f64) -> String {
        format_money(&self.currency_symbol, amount)
    }
}

pub fn format_money(symbol: &str, amount: f64) -> String {
    let rounded = if amount.is_finite() { amount.round() } else { 0.0 };
    let digits = format!("{}", rounded.abs() as u64);

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{}{}{}", symbol, sign, grouped)
}
