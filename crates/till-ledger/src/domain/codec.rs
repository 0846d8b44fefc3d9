//! # Row Codec
//!
//! Strict conversion between CSV fields and typed rows. Every line read from
//! a backing file passes through `CsvRow::from_fields` and comes out either as
//! a typed row or as a `MalformedRow`; nothing downstream sees raw fields.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::entities::{CashFlowKind, CashFlowRecord, LedgerRecord, Product, Timestamp};
use crate::domain::errors::MalformedRow;

/// A record type with a fixed CSV layout.
pub trait CsvRow: Sized {
    /// Header row written when the backing file is created.
    const HEADER: &'static [&'static str];

    fn to_fields(&self) -> Vec<String>;

    /// Parse one data line. `line` is only used for diagnostics.
    fn from_fields(line: u64, fields: &[&str]) -> Result<Self, MalformedRow>;
}

fn expect_len(line: u64, fields: &[&str], expected: usize) -> Result<(), MalformedRow> {
    if fields.len() != expected {
        return Err(MalformedRow::new(
            line,
            format!("expected {expected} fields, found {}", fields.len()),
        ));
    }
    Ok(())
}

fn parse_field<T: FromStr>(line: u64, name: &str, raw: &str) -> Result<T, MalformedRow> {
    raw.trim()
        .parse()
        .map_err(|_| MalformedRow::new(line, format!("invalid {name}: {raw:?}")))
}

fn parse_decimal(line: u64, name: &str, raw: &str) -> Result<Decimal, MalformedRow> {
    let raw = raw.trim();
    // Legacy files may carry float exponents.
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| MalformedRow::new(line, format!("invalid {name}: {raw:?}")))
}

fn parse_timestamp(line: u64, raw: &str) -> Result<Timestamp, MalformedRow> {
    raw.parse()
        .map_err(|_| MalformedRow::new(line, format!("invalid timestamp: {raw:?}")))
}

impl CsvRow for LedgerRecord {
    const HEADER: &'static [&'static str] = &[
        "timestamp",
        "product_id",
        "name",
        "quantity",
        "unit_price",
        "line_total",
    ];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.timestamp().to_string(),
            self.product_id().to_string(),
            self.name().to_string(),
            self.quantity().to_string(),
            self.unit_price().to_string(),
            self.line_total().to_string(),
        ]
    }

    fn from_fields(line: u64, fields: &[&str]) -> Result<Self, MalformedRow> {
        expect_len(line, fields, Self::HEADER.len())?;
        let timestamp = parse_timestamp(line, fields[0])?;
        let quantity: u32 = parse_field(line, "quantity", fields[3])?;
        let unit_price = parse_decimal(line, "unit_price", fields[4])?;
        let stored_total = parse_decimal(line, "line_total", fields[5])?;

        let record = LedgerRecord::new(timestamp, fields[1], fields[2].trim(), quantity, unit_price)
            .map_err(|e| MalformedRow::new(line, e.to_string()))?;

        // Float-written totals (0.30000000000000004) match once rounded to
        // the precision of the price, at least cents.
        let dp = unit_price.scale().max(2);
        if record.line_total().round_dp(dp) != stored_total.round_dp(dp) {
            return Err(MalformedRow::new(
                line,
                format!(
                    "line_total {stored_total} does not match {quantity} x {unit_price}"
                ),
            ));
        }
        Ok(record)
    }
}

impl CsvRow for CashFlowRecord {
    const HEADER: &'static [&'static str] = &["timestamp", "type", "amount", "memo"];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.timestamp().to_string(),
            self.kind().to_string(),
            self.amount().to_string(),
            self.memo().to_string(),
        ]
    }

    fn from_fields(line: u64, fields: &[&str]) -> Result<Self, MalformedRow> {
        expect_len(line, fields, Self::HEADER.len())?;
        let timestamp = parse_timestamp(line, fields[0])?;
        let kind = fields[1]
            .parse::<CashFlowKind>()
            .map_err(|e| MalformedRow::new(line, e.to_string()))?;
        let amount = parse_decimal(line, "amount", fields[2])?;
        CashFlowRecord::new(timestamp, kind, amount, fields[3])
            .map_err(|e| MalformedRow::new(line, e.to_string()))
    }
}

impl CsvRow for Product {
    const HEADER: &'static [&'static str] = &["product_id", "name", "unit_price", "stock"];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.product_id.clone(),
            self.name.clone(),
            self.unit_price.to_string(),
            self.stock.to_string(),
        ]
    }

    fn from_fields(line: u64, fields: &[&str]) -> Result<Self, MalformedRow> {
        // Rows written before stock tracking have no fourth column.
        let stock = match fields.len() {
            3 => 0,
            4 => parse_field(line, "stock", fields[3])?,
            n => {
                return Err(MalformedRow::new(
                    line,
                    format!("expected 3 or 4 fields, found {n}"),
                ))
            }
        };
        let unit_price = parse_decimal(line, "unit_price", fields[2])?;
        Product::new(fields[0].trim(), fields[1].trim(), unit_price, stock)
            .map_err(|e| MalformedRow::new(line, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_record_fields() {
        let fields = ["2024-05-01T10:00:00", "P001", "Coffee", "2", "2.50", "5.00"];
        let record = LedgerRecord::from_fields(2, &fields).unwrap();
        assert_eq!(record.quantity(), 2);
        assert_eq!(record.line_total(), Decimal::new(500, 2));
        assert_eq!(record.to_fields()[0], "2024-05-01T10:00:00.000000");
    }

    #[test]
    fn test_ledger_record_rejects_inconsistent_total() {
        let fields = ["2024-05-01T10:00:00", "P001", "Coffee", "2", "2.50", "9.00"];
        let err = LedgerRecord::from_fields(5, &fields).unwrap_err();
        assert_eq!(err.line, 5);
        assert!(err.reason.contains("does not match"));
    }

    #[test]
    fn test_ledger_record_accepts_float_written_values() {
        let fields = ["2024-05-01T10:00:00.5", "P001", "Coffee", "2", "12.5", "25.0"];
        assert!(LedgerRecord::from_fields(2, &fields).is_ok());
    }

    #[test]
    fn test_ledger_record_accepts_float_rounding_noise() {
        let fields = ["2024-05-01T10:00:00", "P001", "Gum", "3", "0.1", "0.30000000000000004"];
        let record = LedgerRecord::from_fields(2, &fields).unwrap();
        assert_eq!(record.line_total(), Decimal::new(3, 1));

        let off_by_a_cent = ["2024-05-01T10:00:00", "P001", "Gum", "3", "0.1", "0.31"];
        assert!(LedgerRecord::from_fields(3, &off_by_a_cent).is_err());
    }

    #[test]
    fn test_ledger_record_overflowing_total_is_malformed() {
        let fields = [
            "2024-05-01T10:00:00",
            "P001",
            "Gum",
            "2",
            "79228162514264337593543950335",
            "0",
        ];
        let err = LedgerRecord::from_fields(4, &fields).unwrap_err();
        assert_eq!(err.line, 4);
    }

    #[test]
    fn test_torn_line_is_malformed() {
        let fields = ["2024-05-01T10:00:00", "P001", "Cof"];
        assert!(LedgerRecord::from_fields(9, &fields).is_err());
    }

    #[test]
    fn test_cash_flow_fields() {
        let fields = ["2024-05-01T10:00:00", "OUT", "2.00", "coins"];
        let record = CashFlowRecord::from_fields(2, &fields).unwrap();
        assert_eq!(record.amount(), Decimal::new(200, 2));

        let bad_kind = ["2024-05-01T10:00:00", "MAYBE", "2.00", "coins"];
        assert!(CashFlowRecord::from_fields(3, &bad_kind).is_err());
    }

    #[test]
    fn test_product_legacy_three_columns() {
        let product = Product::from_fields(2, &["P009", " Tea ", "1.25"]).unwrap();
        assert_eq!(product.name, "Tea");
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn test_product_negative_stock_allowed() {
        let product = Product::from_fields(2, &["P001", "Coffee", "2.50", "-5"]).unwrap();
        assert_eq!(product.stock, -5);
    }

    #[test]
    fn test_product_bad_price() {
        let err = Product::from_fields(4, &["P001", "Coffee", "abc", "3"]).unwrap_err();
        assert!(err.reason.contains("unit_price"));
    }
}
