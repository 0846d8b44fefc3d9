//! Re-deriving stock decrements from the sales ledger.

use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::storage::{InventoryTable, RecordStore};
use crate::domain::entities::{LedgerRecord, Timestamp};
use crate::domain::errors::LedgerResult;
use crate::domain::value_objects::{ApplyOutcome, StockDeltas};

/// What a reconciliation run found and applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub sale_timestamp: Timestamp,
    /// Ledger lines carrying the sale timestamp.
    pub records: usize,
    pub outcome: ApplyOutcome,
}

/// Replays a recorded sale against the product table.
pub struct Reconciler<'a> {
    sales: &'a RecordStore<LedgerRecord>,
    inventory: &'a InventoryTable,
}

impl<'a> Reconciler<'a> {
    pub fn new(sales: &'a RecordStore<LedgerRecord>, inventory: &'a InventoryTable) -> Self {
        Self { sales, inventory }
    }

    /// Ledger lines of the sale committed at `timestamp`.
    pub fn sale_records(&self, timestamp: Timestamp) -> LedgerResult<Vec<LedgerRecord>> {
        self.sales
            .scan(|r| r.timestamp() == timestamp)?
            .collect()
    }

    /// Apply the decrements of the sale committed at `timestamp`.
    ///
    /// Run once per sale whose commit reported `InventoryUpdateFailed`; a
    /// second run subtracts the quantities again.
    ///
    /// A sale is identified only by its timestamp. Two processes that commit
    /// within the same microsecond share one, and their lines are reconciled
    /// together.
    pub fn reconcile_sale(&self, timestamp: Timestamp) -> LedgerResult<Reconciliation> {
        let records = self.sale_records(timestamp)?;
        if records.is_empty() {
            warn!(%timestamp, "no ledger lines for sale; nothing to reconcile");
            return Ok(Reconciliation {
                sale_timestamp: timestamp,
                records: 0,
                outcome: ApplyOutcome::default(),
            });
        }

        let deltas = StockDeltas::from_records(&records);
        let outcome = self.inventory.apply(&deltas)?;
        info!(
            %timestamp,
            records = records.len(),
            adjusted = outcome.adjusted.len(),
            "sale reconciled against product table"
        );
        Ok(Reconciliation {
            sale_timestamp: timestamp,
            records: records.len(),
            outcome,
        })
    }
}
