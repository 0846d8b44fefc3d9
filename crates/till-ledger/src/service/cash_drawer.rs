//! Manual cash-drawer adjustments.

use rust_decimal::Decimal;
use tracing::info;

use crate::adapters::storage::RecordStore;
use crate::domain::entities::{CashFlowKind, CashFlowRecord};
use crate::domain::errors::LedgerResult;
use crate::ports::outbound::Clock;

pub struct CashDrawer<'a> {
    ledger: &'a RecordStore<CashFlowRecord>,
    clock: &'a dyn Clock,
}

impl<'a> CashDrawer<'a> {
    pub fn new(ledger: &'a RecordStore<CashFlowRecord>, clock: &'a dyn Clock) -> Self {
        Self { ledger, clock }
    }

    /// Stamp and append one cash movement. `amount` must be positive and
    /// `memo` a single non-empty line.
    pub fn record(
        &self,
        kind: CashFlowKind,
        amount: Decimal,
        memo: &str,
    ) -> LedgerResult<CashFlowRecord> {
        let record = CashFlowRecord::new(self.clock.now(), kind, amount, memo)?;
        self.ledger.append(std::slice::from_ref(&record))?;
        info!(%kind, %amount, memo, "Cash movement recorded");
        Ok(record)
    }
}
