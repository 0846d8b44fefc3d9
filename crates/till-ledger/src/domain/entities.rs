//! # Domain Entities
//!
//! The rows persisted by the ledger files and the product table.
//!
//! ## Invariants
//!
//! | Entity | Invariant |
//! |--------|-----------|
//! | `LedgerRecord` | `quantity > 0`, `unit_price >= 0`, `line_total == quantity * unit_price` |
//! | `CashFlowRecord` | `amount > 0`, memo is a non-empty single line |
//! | `Product` | `product_id` non-empty, `unit_price >= 0`; stock may be negative |
//!
//! Ledger records are immutable once built; their fields are only readable.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::domain::errors::{LedgerError, LedgerResult};

/// Local wall-clock instant with microsecond precision.
///
/// Written as ISO-8601 without offset (`2024-05-01T14:03:22.118204`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    const FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S%.6f";

    /// Truncates to whole microseconds so the value survives a write/read cycle.
    pub fn new(at: NaiveDateTime) -> Self {
        let micros = at.nanosecond() / 1_000 * 1_000;
        Self(at.with_nanosecond(micros).unwrap_or(at))
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Calendar date used for report ranges.
    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(at) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Self::new(at));
        }
        // Offset-qualified stamps keep their local wall-clock reading.
        if let Ok(at) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::new(at.naive_local()));
        }
        Err(LedgerError::InvalidField {
            field: "timestamp",
            reason: format!("not an ISO-8601 date-time: {s:?}"),
        })
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Reject text that would break the one-record-per-line layout.
pub(crate) fn validate_text(field: &'static str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if value.contains(['\n', '\r']) {
        return Err(LedgerError::InvalidField {
            field,
            reason: "must not contain line breaks".to_string(),
        });
    }
    Ok(())
}

/// One sold line item on the sales ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerRecord {
    timestamp: Timestamp,
    product_id: String,
    name: String,
    quantity: u32,
    unit_price: Decimal,
    line_total: Decimal,
}

impl LedgerRecord {
    /// Build a record; `line_total` is always derived.
    pub fn new(
        timestamp: Timestamp,
        product_id: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> LedgerResult<Self> {
        let product_id = product_id.into();
        let name = name.into();
        validate_text("product_id", &product_id)?;
        validate_text("name", &name)?;
        if quantity == 0 {
            return Err(LedgerError::InvalidQuantity { quantity: 0 });
        }
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(LedgerError::InvalidAmount { amount: unit_price });
        }
        let line_total = unit_price
            .checked_mul(Decimal::from(quantity))
            .ok_or(LedgerError::InvalidAmount { amount: unit_price })?;
        Ok(Self {
            timestamp,
            product_id,
            name,
            quantity,
            unit_price,
            line_total,
        })
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn line_total(&self) -> Decimal {
        self.line_total
    }
}

/// Direction of a manual cash-drawer movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CashFlowKind {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl fmt::Display for CashFlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CashFlowKind::In => write!(f, "IN"),
            CashFlowKind::Out => write!(f, "OUT"),
        }
    }
}

impl FromStr for CashFlowKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(CashFlowKind::In),
            "OUT" => Ok(CashFlowKind::Out),
            other => Err(LedgerError::InvalidField {
                field: "type",
                reason: format!("expected IN or OUT, got {other:?}"),
            }),
        }
    }
}

/// One manual cash-drawer adjustment on the cash-flow ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CashFlowRecord {
    timestamp: Timestamp,
    kind: CashFlowKind,
    amount: Decimal,
    memo: String,
}

impl CashFlowRecord {
    pub fn new(
        timestamp: Timestamp,
        kind: CashFlowKind,
        amount: Decimal,
        memo: impl Into<String>,
    ) -> LedgerResult<Self> {
        let memo = memo.into();
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount { amount });
        }
        validate_text("memo", &memo)?;
        Ok(Self {
            timestamp,
            kind,
            amount,
            memo,
        })
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn kind(&self) -> CashFlowKind {
        self.kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }
}

/// A row of the product table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    /// Negative after an oversell.
    pub stock: i64,
}

impl Product {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Decimal,
        stock: i64,
    ) -> LedgerResult<Self> {
        let product = Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            stock,
        };
        product.validate()?;
        Ok(product)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        validate_text("product_id", &self.product_id)?;
        validate_text("name", &self.name)?;
        if self.unit_price.is_sign_negative() && !self.unit_price.is_zero() {
            return Err(LedgerError::InvalidAmount {
                amount: self.unit_price,
            });
        }
        Ok(())
    }

    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock <= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_line_total_is_derived() {
        let record = LedgerRecord::new(
            ts("2024-05-01T10:00:00"),
            "P001",
            "Coffee",
            3,
            Decimal::new(250, 2),
        )
        .unwrap();
        assert_eq!(record.line_total(), Decimal::new(750, 2));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let result = LedgerRecord::new(ts("2024-05-01T10:00:00"), "P001", "Coffee", 0, Decimal::ONE);
        assert!(matches!(result, Err(LedgerError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_negative_price_rejected() {
        let result = Product::new("P001", "Coffee", Decimal::new(-1, 0), 4);
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_timestamp_formats() {
        let plain = ts("2024-05-01T10:00:00");
        assert_eq!(plain.to_string(), "2024-05-01T10:00:00.000000");

        let fractional = ts("2024-05-01T10:00:00.123456789");
        assert_eq!(fractional.to_string(), "2024-05-01T10:00:00.123456");

        let offset = ts("2024-05-01T23:30:00+02:00");
        assert_eq!(offset.date(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        assert!("yesterday".parse::<Timestamp>().is_err());
    }

    #[test]
    fn test_timestamp_survives_display_roundtrip() {
        let original = ts("2024-05-01T10:00:00.000042");
        let reparsed: Timestamp = original.to_string().parse().unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn test_cash_flow_validation() {
        let at = ts("2024-05-01T10:00:00");
        assert!(CashFlowRecord::new(at, CashFlowKind::In, Decimal::ZERO, "float").is_err());
        assert!(CashFlowRecord::new(at, CashFlowKind::In, Decimal::ONE, " ").is_err());
        assert!(CashFlowRecord::new(at, CashFlowKind::In, Decimal::ONE, "a\nb").is_err());
        assert!(CashFlowRecord::new(at, CashFlowKind::Out, Decimal::ONE, "change, coins").is_ok());
    }

    #[test]
    fn test_cash_flow_kind_parse() {
        assert_eq!("in".parse::<CashFlowKind>().unwrap(), CashFlowKind::In);
        assert_eq!("OUT".parse::<CashFlowKind>().unwrap(), CashFlowKind::Out);
        assert!("sideways".parse::<CashFlowKind>().is_err());
    }

    #[test]
    fn test_low_stock_threshold() {
        let product = Product::new("P001", "Coffee", Decimal::ONE, 5).unwrap();
        assert!(product.is_low_stock(5));
        assert!(!product.is_low_stock(4));
    }
}
