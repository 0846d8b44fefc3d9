//! Read-only summaries over the two ledgers.

use chrono::NaiveDate;
use tracing::debug;

use crate::adapters::storage::RecordStore;
use crate::domain::codec::CsvRow;
use crate::domain::entities::{CashFlowRecord, LedgerRecord, Timestamp};
use crate::domain::errors::LedgerResult;
use crate::domain::report::{Report, Summary};
use crate::domain::value_objects::DateRange;

/// Rows that carry a timestamp for range filtering.
trait Dated {
    fn timestamp(&self) -> Timestamp;
}

impl Dated for LedgerRecord {
    fn timestamp(&self) -> Timestamp {
        LedgerRecord::timestamp(self)
    }
}

impl Dated for CashFlowRecord {
    fn timestamp(&self) -> Timestamp {
        CashFlowRecord::timestamp(self)
    }
}

/// Date-range summaries over the sales and cash-flow ledgers.
///
/// Each ledger is scanned under its own shared lock, one after the other, so
/// a report is consistent per file. Nothing is ever written.
pub struct ReportAggregator<'a> {
    sales: &'a RecordStore<LedgerRecord>,
    cash_flows: &'a RecordStore<CashFlowRecord>,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(
        sales: &'a RecordStore<LedgerRecord>,
        cash_flows: &'a RecordStore<CashFlowRecord>,
    ) -> Self {
        Self { sales, cash_flows }
    }

    /// Totals for `[start, end]`, both days included.
    pub fn summarize(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Summary> {
        let range = DateRange::new(start, end)?;
        let mut summary = Summary::default();
        for_each_in_range(self.sales, range, |r| summary.add_sale(&r))?;
        for_each_in_range(self.cash_flows, range, |r| summary.add_cash_flow(&r))?;
        Ok(summary)
    }

    /// Totals plus every matching line, in ledger order.
    pub fn report(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Report> {
        let range = DateRange::new(start, end)?;
        let mut summary = Summary::default();

        let mut sales = Vec::new();
        for_each_in_range(self.sales, range, |r| {
            summary.add_sale(&r)?;
            sales.push(r);
            Ok(())
        })?;

        let mut cash_flows = Vec::new();
        for_each_in_range(self.cash_flows, range, |r| {
            summary.add_cash_flow(&r)?;
            cash_flows.push(r);
            Ok(())
        })?;

        debug!(
            %start,
            %end,
            sales = sales.len(),
            cash_flows = cash_flows.len(),
            "report built"
        );
        Ok(Report {
            range,
            summary,
            sales,
            cash_flows,
        })
    }
}

/// Feed every row dated inside `range` to `visit`. A ledger that does not
/// exist yet has no rows.
fn for_each_in_range<R: CsvRow + Dated>(
    store: &RecordStore<R>,
    range: DateRange,
    mut visit: impl FnMut(R) -> LedgerResult<()>,
) -> LedgerResult<()> {
    let scan = match store.scan(|r: &R| range.contains(r.timestamp().date())) {
        Ok(scan) => scan,
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(e),
    };
    for row in scan {
        visit(row?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::CashFlowKind;
    use crate::domain::errors::LedgerError;
    use crate::domain::value_objects::LockWait;
    use rust_decimal::Decimal;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    struct Ledgers {
        _dir: tempfile::TempDir,
        sales: RecordStore<LedgerRecord>,
        cash: RecordStore<CashFlowRecord>,
    }

    fn ledgers() -> Ledgers {
        let dir = tempfile::tempdir().unwrap();
        Ledgers {
            sales: RecordStore::new(dir.path().join("sales.csv"), LockWait::Block),
            cash: RecordStore::new(dir.path().join("cash_flow.csv"), LockWait::Block),
            _dir: dir,
        }
    }

    #[test]
    fn test_missing_ledgers_are_empty() {
        let l = ledgers();
        let summary = ReportAggregator::new(&l.sales, &l.cash)
            .summarize(date("2024-05-01"), date("2024-05-31"))
            .unwrap();
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let l = ledgers();
        for (at, cents) in [
            ("2024-04-30T23:59:59", 100),
            ("2024-05-01T00:00:00", 200),
            ("2024-05-03T23:59:59.999999", 400),
            ("2024-05-04T00:00:00", 800),
        ] {
            l.sales
                .append(&[LedgerRecord::new(ts(at), "P1", "Coffee", 1, Decimal::new(cents, 2)).unwrap()])
                .unwrap();
        }

        let summary = ReportAggregator::new(&l.sales, &l.cash)
            .summarize(date("2024-05-01"), date("2024-05-03"))
            .unwrap();
        assert_eq!(summary.sales_total, Decimal::new(600, 2));
    }

    #[test]
    fn test_report_lists_lines() {
        let l = ledgers();
        l.sales
            .append(&[LedgerRecord::new(ts("2024-05-01T10:00:00"), "P1", "Coffee", 2, Decimal::new(250, 2)).unwrap()])
            .unwrap();
        l.cash
            .append(&[
                CashFlowRecord::new(ts("2024-05-01T08:00:00"), CashFlowKind::In, Decimal::new(5000, 2), "float").unwrap(),
                CashFlowRecord::new(ts("2024-05-02T08:00:00"), CashFlowKind::Out, Decimal::new(300, 2), "bags").unwrap(),
            ])
            .unwrap();

        let report = ReportAggregator::new(&l.sales, &l.cash)
            .report(date("2024-05-01"), date("2024-05-01"))
            .unwrap();
        assert_eq!(report.sales.len(), 1);
        assert_eq!(report.cash_flows.len(), 1);
        assert_eq!(report.summary.net_total, Decimal::new(5500, 2));
    }

    #[test]
    fn test_float_written_totals_are_counted() {
        let l = ledgers();
        l.sales.ensure_initialized().unwrap();
        let mut content = std::fs::read_to_string(l.sales.path()).unwrap();
        content.push_str("2024-05-01T10:00:00,P7,Gum,3,0.1,0.30000000000000004\n");
        std::fs::write(l.sales.path(), content).unwrap();

        let summary = ReportAggregator::new(&l.sales, &l.cash)
            .summarize(date("2024-05-01"), date("2024-05-01"))
            .unwrap();
        assert_eq!(summary.sales_total, Decimal::new(3, 1));
        assert_eq!(summary.net_total, Decimal::new(3, 1));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let l = ledgers();
        let err = ReportAggregator::new(&l.sales, &l.cash)
            .summarize(date("2024-05-02"), date("2024-05-01"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRange { .. }));
    }
}
