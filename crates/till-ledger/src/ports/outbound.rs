//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the checkout protocol requires from its host.
//!
//! Production: the CSV-file stores in `adapters::storage`.
//! Testing: the in-memory stores in `adapters::storage::memory`.

use chrono::Local;

use crate::domain::entities::{LedgerRecord, Timestamp};
use crate::domain::errors::LedgerResult;
use crate::domain::sale::SaleState;
use crate::domain::value_objects::{ApplyOutcome, StockDeltas};

/// Durable, append-only destination for sold line items.
pub trait SalesJournal: Send + Sync {
    /// Append every record or none of them.
    fn append_sales(&self, records: &[LedgerRecord]) -> LedgerResult<()>;
}

/// Keyed stock counts that accept batched decrements.
pub trait StockStore: Send + Sync {
    /// Subtract each delta from the matching product's stock in one
    /// read-modify-write cycle. Unknown ids are ignored.
    fn apply_deltas(&self, deltas: &StockDeltas) -> LedgerResult<ApplyOutcome>;
}

/// Abstract interface for time operations (for testability).
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Receives sale state changes (presentation collaborator).
pub trait SaleObserver: Send + Sync {
    fn on_transition(&self, from: SaleState, to: SaleState);
}

/// Local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(Local::now().naive_local())
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

impl<T: SalesJournal + ?Sized> SalesJournal for &T {
    fn append_sales(&self, records: &[LedgerRecord]) -> LedgerResult<()> {
        (**self).append_sales(records)
    }
}

impl<T: StockStore + ?Sized> StockStore for &T {
    fn apply_deltas(&self, deltas: &StockDeltas) -> LedgerResult<ApplyOutcome> {
        (**self).apply_deltas(deltas)
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
