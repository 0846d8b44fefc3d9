//! # Domain Errors
//!
//! Error types for the till ledger.
//!
//! ## Recovery Policy
//!
//! | Error | Handling |
//! |-------|----------|
//! | `Io`, `LockTimeout` | Surfaced, operation aborted, nothing written |
//! | `MalformedRow` | Row skipped with a warning, parse continues |
//! | `InsufficientPayment` | Transaction stays `Priced`, caller re-prompts |
//! | `InventoryUpdateFailed` | Sale is on the ledger, stock may be stale |
//! | `DuplicateKey` | Product creation rejected, table unchanged |

use std::io;
use std::path::PathBuf;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::entities::Timestamp;
use crate::domain::role::Role;
use crate::domain::sale::SaleState;
use crate::domain::value_objects::LockMode;

/// A line of a backing file that could not be turned into a typed row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed row at line {line}: {reason}")]
pub struct MalformedRow {
    /// 1-based line number in the backing file (header is line 1).
    pub line: u64,
    pub reason: String,
}

impl MalformedRow {
    pub fn new(line: u64, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by ledger, inventory and checkout operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Backing file could not be opened, locked, read or written.
    #[error("I/O failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Bounded lock wait expired.
    #[error("timed out after {waited_ms}ms waiting for {mode} lock on {}", .path.display())]
    LockTimeout {
        path: PathBuf,
        mode: LockMode,
        waited_ms: u64,
    },

    #[error(transparent)]
    MalformedRow(#[from] MalformedRow),

    /// Tendered amount does not cover the sale total.
    #[error("insufficient payment: total {total}, tendered {tendered}")]
    InsufficientPayment { total: Decimal, tendered: Decimal },

    /// The sale is recorded on the ledger but the stock decrement failed.
    #[error("sale {sale_timestamp} recorded but inventory update failed: {reason}")]
    InventoryUpdateFailed {
        sale_timestamp: Timestamp,
        reason: String,
    },

    #[error("product already exists: {product_id}")]
    DuplicateKey { product_id: String },

    #[error("unknown product: {product_id}")]
    UnknownProduct { product_id: String },

    #[error("invalid sale transition: {from} -> {to}")]
    InvalidTransition { from: SaleState, to: SaleState },

    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: Decimal },

    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("{role} is not allowed to {action}")]
    PermissionDenied { role: Role, action: &'static str },
}

impl LedgerError {
    /// Wrap an I/O error with the file it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LedgerError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the backing file does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
