//! Report values handed to the rendering collaborator.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::entities::{CashFlowKind, CashFlowRecord, LedgerRecord};
use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::value_objects::DateRange;

/// Totals over a date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub sales_total: Decimal,
    pub cash_in_total: Decimal,
    pub cash_out_total: Decimal,
    /// `sales_total + cash_in_total - cash_out_total`
    pub net_total: Decimal,
}

impl Summary {
    /// Fails with `InvalidAmount` if a total would overflow; `self` is then
    /// unchanged.
    pub fn add_sale(&mut self, record: &LedgerRecord) -> LedgerResult<()> {
        let mut next = *self;
        next.sales_total = checked_add(self.sales_total, record.line_total())?;
        *self = next.with_net()?;
        Ok(())
    }

    pub fn add_cash_flow(&mut self, record: &CashFlowRecord) -> LedgerResult<()> {
        let mut next = *self;
        match record.kind() {
            CashFlowKind::In => {
                next.cash_in_total = checked_add(self.cash_in_total, record.amount())?;
            }
            CashFlowKind::Out => {
                next.cash_out_total = checked_add(self.cash_out_total, record.amount())?;
            }
        }
        *self = next.with_net()?;
        Ok(())
    }

    fn with_net(mut self) -> LedgerResult<Self> {
        self.net_total = checked_add(self.sales_total, self.cash_in_total)?
            .checked_sub(self.cash_out_total)
            .ok_or(LedgerError::InvalidAmount {
                amount: self.cash_out_total,
            })?;
        Ok(self)
    }
}

fn checked_add(total: Decimal, amount: Decimal) -> LedgerResult<Decimal> {
    total
        .checked_add(amount)
        .ok_or(LedgerError::InvalidAmount { amount })
}

/// Summary plus the matching ledger lines, in ledger order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub range: DateRange,
    pub summary: Summary,
    pub sales: Vec<LedgerRecord>,
    pub cash_flows: Vec<CashFlowRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_total() {
        let at = "2024-05-01T09:00:00".parse().unwrap();
        let mut summary = Summary::default();
        summary
            .add_sale(&LedgerRecord::new(at, "P1", "Coffee", 1, Decimal::new(1250, 2)).unwrap())
            .unwrap();
        summary
            .add_cash_flow(
                &CashFlowRecord::new(at, CashFlowKind::In, Decimal::new(500, 2), "float").unwrap(),
            )
            .unwrap();
        summary
            .add_cash_flow(
                &CashFlowRecord::new(at, CashFlowKind::Out, Decimal::new(200, 2), "milk").unwrap(),
            )
            .unwrap();

        assert_eq!(summary.net_total, Decimal::new(1550, 2));
    }

    #[test]
    fn test_overflowing_total_is_an_error() {
        let at = "2024-05-01T09:00:00".parse().unwrap();
        let big = LedgerRecord::new(at, "P1", "Gold", 1, Decimal::MAX).unwrap();
        let mut summary = Summary::default();
        summary.add_sale(&big).unwrap();

        let err = summary.add_sale(&big).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
        assert_eq!(summary.sales_total, Decimal::MAX);
    }

    #[test]
    fn test_serializes_amounts_as_strings() {
        let summary = Summary {
            sales_total: Decimal::new(1250, 2),
            ..Summary::default()
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["sales_total"], "12.50");
    }
}
