//! # Till Service
//!
//! The store handle every process opens at start-up.
//!
//! ## Architecture
//!
//! `Till` owns the three file stores and the clock, and hands out the
//! role-checked services that borrow them:
//! 1. `Checkout` for ringing up sales
//! 2. `CashDrawer` for manual cash movements
//! 3. `ReportAggregator` for date-range summaries
//! 4. `Reconciler` for replaying a sale against the product table

mod cash_drawer;
mod checkout;
mod reconcile;
mod report;

pub use cash_drawer::CashDrawer;
pub use checkout::{low_stock, Checkout};
pub use reconcile::{Reconciler, Reconciliation};
pub use report::ReportAggregator;

use std::sync::Arc;

use tracing::debug;

use crate::adapters::storage::{InventoryTable, RecordStore};
use crate::config::LedgerConfig;
use crate::domain::entities::{CashFlowRecord, LedgerRecord};
use crate::domain::errors::LedgerResult;
use crate::domain::role::{Action, Role};
use crate::ports::outbound::{Clock, SystemClock};

/// Explicit handle on one data directory.
///
/// Holds no table contents; every call goes back to the files.
pub struct Till {
    config: LedgerConfig,
    sales: RecordStore<LedgerRecord>,
    cash_flows: RecordStore<CashFlowRecord>,
    inventory: InventoryTable,
    clock: Arc<dyn Clock>,
}

impl Till {
    /// Open the data directory, creating missing files with their headers.
    pub fn open(config: LedgerConfig) -> LedgerResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: LedgerConfig, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        let till = Self {
            sales: RecordStore::new(config.sales_path(), config.lock_wait),
            cash_flows: RecordStore::new(config.cash_flow_path(), config.lock_wait),
            inventory: InventoryTable::new(config.products_path(), config.lock_wait),
            config,
            clock,
        };
        till.sales.ensure_initialized()?;
        till.cash_flows.ensure_initialized()?;
        till.inventory.ensure_initialized()?;
        debug!(data_dir = %till.config.data_dir.display(), "till opened");
        Ok(till)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn sales(&self) -> &RecordStore<LedgerRecord> {
        &self.sales
    }

    pub fn cash_flows(&self) -> &RecordStore<CashFlowRecord> {
        &self.cash_flows
    }

    /// Read access for lookups; use [`Till::products`] to edit.
    pub fn inventory(&self) -> &InventoryTable {
        &self.inventory
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn checkout(&self, role: Role) -> LedgerResult<Checkout<'_>> {
        role.authorize(Action::Sell)?;
        Checkout::begin(
            &self.sales,
            &self.inventory,
            self.clock.as_ref(),
            self.config.low_stock_threshold,
        )
    }

    pub fn cash_drawer(&self, role: Role) -> LedgerResult<CashDrawer<'_>> {
        role.authorize(Action::RecordCash)?;
        Ok(CashDrawer::new(&self.cash_flows, self.clock.as_ref()))
    }

    /// Product table for create/upsert/delete.
    pub fn products(&self, role: Role) -> LedgerResult<&InventoryTable> {
        role.authorize(Action::ManageProducts)?;
        Ok(&self.inventory)
    }

    pub fn reports(&self, role: Role) -> LedgerResult<ReportAggregator<'_>> {
        role.authorize(Action::ViewReports)?;
        Ok(ReportAggregator::new(&self.sales, &self.cash_flows))
    }

    pub fn reconciler(&self, role: Role) -> LedgerResult<Reconciler<'_>> {
        role.authorize(Action::Reconcile)?;
        Ok(Reconciler::new(&self.sales, &self.inventory))
    }
}
