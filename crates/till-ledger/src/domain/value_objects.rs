//! # Value Objects
//!
//! Small immutable values shared by the stores and services.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::entities::LedgerRecord;
use crate::domain::errors::{LedgerError, LedgerResult};

/// Advisory lock flavour taken on a backing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Readers; any number may hold it at once.
    Shared,
    /// Writers; excludes every other holder.
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "shared"),
            LockMode::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// How long a caller is willing to wait for a contended lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockWait {
    /// Block until granted.
    #[default]
    Block,
    /// Give up with `LockTimeout` once the duration has elapsed.
    Timeout(Duration),
}

impl LockWait {
    /// `0` means block forever.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            LockWait::Block
        } else {
            LockWait::Timeout(Duration::from_millis(ms))
        }
    }
}

/// Per-product stock decrements, keyed by product id.
///
/// A positive delta removes units from stock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockDeltas {
    deltas: BTreeMap<String, i64>,
}

impl StockDeltas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine additively with any delta already present for `product_id`.
    pub fn add(&mut self, product_id: impl Into<String>, delta: i64) {
        *self.deltas.entry(product_id.into()).or_insert(0) += delta;
    }

    /// One decrement per sold line, summed per product.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a LedgerRecord>) -> Self {
        let mut deltas = Self::new();
        for record in records {
            deltas.add(record.product_id(), i64::from(record.quantity()));
        }
        deltas
    }

    pub fn get(&self, product_id: &str) -> Option<i64> {
        self.deltas.get(product_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.deltas.iter().map(|(id, d)| (id.as_str(), *d))
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for StockDeltas {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        let mut deltas = Self::new();
        for (id, delta) in iter {
            deltas.add(id, delta);
        }
        deltas
    }
}

/// Stock count of one product after an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub product_id: String,
    pub stock: i64,
}

/// What an `apply` call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// New stock of every product a delta touched, in delta order.
    pub adjusted: Vec<StockLevel>,
    /// Delta keys with no matching row; ignored.
    pub unknown: Vec<String>,
}

impl ApplyOutcome {
    /// Products whose stock went below zero.
    pub fn oversold(&self) -> impl Iterator<Item = &StockLevel> {
        self.adjusted.iter().filter(|level| level.stock < 0)
    }
}

/// Closed calendar-date interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> LedgerResult<Self> {
        if start > end {
            return Err(LedgerError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Both bounds inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
