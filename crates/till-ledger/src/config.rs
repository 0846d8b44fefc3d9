//! Ledger configuration from environment variables.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::value_objects::LockWait;

/// Default file names inside the data directory.
pub const SALES_FILE: &str = "sales.csv";
pub const CASH_FLOW_FILE: &str = "cash_flow.csv";
pub const PRODUCTS_FILE: &str = "products.csv";

/// Where the ledger lives and how long to wait for locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Directory holding the three backing files
    pub data_dir: PathBuf,

    pub sales_file: String,
    pub cash_flow_file: String,
    pub products_file: String,

    /// Lock wait policy for every file operation
    pub lock_wait: LockWait,

    /// Stock at or below this is reported as low after a sale
    pub low_stock_threshold: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            sales_file: SALES_FILE.to_string(),
            cash_flow_file: CASH_FLOW_FILE.to_string(),
            products_file: PRODUCTS_FILE.to_string(),
            lock_wait: LockWait::Block,
            low_stock_threshold: 5,
        }
    }
}

impl LedgerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TILL_DATA_DIR`: Data directory (default: .)
    /// - `TILL_LOCK_TIMEOUT_MS`: Bounded lock wait in ms (default: unset or 0, wait forever)
    /// - `TILL_LOW_STOCK`: Low-stock threshold (default: 5)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            data_dir: lookup("TILL_DATA_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),

            lock_wait: lookup("TILL_LOCK_TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .map(LockWait::from_millis)
                .unwrap_or(defaults.lock_wait),

            low_stock_threshold: lookup("TILL_LOW_STOCK")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.low_stock_threshold),

            ..defaults
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_lock_wait(mut self, lock_wait: LockWait) -> Self {
        self.lock_wait = lock_wait;
        self
    }

    pub fn with_lock_timeout(self, timeout: Duration) -> Self {
        self.with_lock_wait(LockWait::Timeout(timeout))
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn sales_path(&self) -> PathBuf {
        self.data_dir.join(&self.sales_file)
    }

    pub fn cash_flow_path(&self) -> PathBuf {
        self.data_dir.join(&self.cash_flow_file)
    }

    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join(&self.products_file)
    }
}
