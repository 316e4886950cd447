// ⚙️ Configuration - parse, generate and transfer-recognition options
//
// Every option set has working defaults; QifConfig bundles them and loads
// from a JSON file where any missing key falls back to its default.

use crate::codecs::{AmountCodec, DateCodec, DateFormat};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// PARSE OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub dates: DateCodec,
    pub amounts: AmountCodec,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// European producers: `DD/MM` dates first.
    pub fn day_first() -> Self {
        ParseOptions {
            dates: DateCodec::day_first(),
            amounts: AmountCodec::new(),
        }
    }

    pub fn with_dates(mut self, dates: DateCodec) -> Self {
        self.dates = dates;
        self
    }

    pub fn with_amounts(mut self, amounts: AmountCodec) -> Self {
        self.amounts = amounts;
        self
    }
}

// ============================================================================
// GENERATE OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    pub date_format: DateFormat,
    pub amounts: AmountCodec,
}

impl GenerateOptions {
    pub fn new() -> Self {
        GenerateOptions {
            date_format: DateFormat::MonthDayYear,
            amounts: AmountCodec::new(),
        }
    }

    pub fn with_date_format(mut self, date_format: DateFormat) -> Self {
        self.date_format = date_format;
        self
    }

    pub fn with_amounts(mut self, amounts: AmountCodec) -> Self {
        self.amounts = amounts;
        self
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TRANSFER OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferScope {
    /// Only transactions the calling layer flagged
    #[default]
    FlaggedOnly,
    /// Every transaction with a `[Account]` category
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    pub scope: TransferScope,

    /// Maximum date distance between the two legs (default: 0)
    pub date_tolerance_days: i64,

    /// Maximum magnitude difference between the two legs (default: 0.005)
    pub amount_epsilon: f64,
}

impl TransferOptions {
    pub fn new() -> Self {
        TransferOptions {
            scope: TransferScope::FlaggedOnly,
            date_tolerance_days: 0,
            amount_epsilon: 0.005,
        }
    }

    pub fn with_scope(mut self, scope: TransferScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_date_tolerance(mut self, days: i64) -> Self {
        self.date_tolerance_days = days.max(0);
        self
    }

    pub fn with_amount_epsilon(mut self, epsilon: f64) -> Self {
        self.amount_epsilon = epsilon.abs();
        self
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CONFIG FILE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QifConfig {
    pub parse: ParseOptions,
    pub generate: GenerateOptions,
    pub transfers: TransferOptions,

    /// Run transfer recognition after parsing (CLI `normalize`)
    pub recognize_transfers: bool,
}

impl QifConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: QifConfig = serde_json::from_str(json).context("Failed to parse QIF config JSON")?;
        log::debug!(
            "config: {} date formats, pivot {}, transfer scope {:?}",
            config.parse.dates.formats.len(),
            config.parse.dates.pivot_year,
            config.transfers.scope
        );
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Invalid config file: {}", path.display()))
    }
}
