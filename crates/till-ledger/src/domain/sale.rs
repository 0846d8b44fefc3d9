//! # Sale Transaction
//!
//! Commit protocol for one finalized sale.
//!
//! ## State Machine
//!
//! ```text
//! [Open] ──request_payment──→ [Priced] ──tender──→ [Paid] ──finalize──→ [Committed]
//!   ↑                            │  ↺ insufficient payment
//!   └──────resume_editing────────┘
//!
//! abort: Open | Priced | Paid ──→ [Aborted]
//! ```
//!
//! ## Commit Ordering
//!
//! `finalize` appends the ledger lines first and decrements stock second. A
//! failure between the two leaves a recorded sale with stale stock, which
//! reconciliation repairs from the ledger. Ledger lines are never retracted.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::cart::{Cart, CartLine};
use crate::domain::entities::{LedgerRecord, Product, Timestamp};
use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::value_objects::{ApplyOutcome, StockDeltas};
use crate::ports::outbound::{Clock, SaleObserver, SalesJournal, StockStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SaleState {
    Open,
    Priced,
    Paid,
    Committed,
    Aborted,
}

impl SaleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleState::Committed | SaleState::Aborted)
    }
}

impl fmt::Display for SaleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaleState::Open => "OPEN",
            SaleState::Priced => "PRICED",
            SaleState::Paid => "PAID",
            SaleState::Committed => "COMMITTED",
            SaleState::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// A sale that reached the ledger; input for the receipt collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittedSale {
    /// Shared by every ledger line of the sale.
    pub timestamp: Timestamp,
    pub records: Vec<LedgerRecord>,
    pub total: Decimal,
    pub tendered: Decimal,
    pub change: Decimal,
    /// `None` when the stock decrement failed.
    pub inventory: Option<ApplyOutcome>,
}

pub struct SaleTransaction {
    state: SaleState,
    cart: Cart,
    total: Option<Decimal>,
    tendered: Option<Decimal>,
    committed: Option<CommittedSale>,
    observer: Option<Box<dyn SaleObserver>>,
}

impl fmt::Debug for SaleTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaleTransaction")
            .field("state", &self.state)
            .field("cart", &self.cart)
            .field("total", &self.total)
            .field("tendered", &self.tendered)
            .finish_non_exhaustive()
    }
}

impl Default for SaleTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl SaleTransaction {
    pub fn new() -> Self {
        Self {
            state: SaleState::Open,
            cart: Cart::new(),
            total: None,
            tendered: None,
            committed: None,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn SaleObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> SaleState {
        self.state
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Set once priced.
    pub fn total(&self) -> Option<Decimal> {
        self.total
    }

    /// Set once paid.
    pub fn change(&self) -> Option<Decimal> {
        Some(self.tendered? - self.total?)
    }

    pub fn committed(&self) -> Option<&CommittedSale> {
        self.committed.as_ref()
    }

    pub fn add_item(&mut self, product: &Product, quantity: u32) -> LedgerResult<()> {
        self.require(SaleState::Open, SaleState::Open)?;
        self.cart.add(product, quantity)
    }

    pub fn repeat_last(&mut self) -> LedgerResult<()> {
        self.require(SaleState::Open, SaleState::Open)?;
        self.cart.repeat_last()
    }

    pub fn remove_item(&mut self, product_id: &str) -> LedgerResult<Option<CartLine>> {
        self.require(SaleState::Open, SaleState::Open)?;
        Ok(self.cart.remove(product_id))
    }

    pub fn clear_cart(&mut self) -> LedgerResult<()> {
        self.require(SaleState::Open, SaleState::Open)?;
        self.cart.clear();
        Ok(())
    }

    /// `Open -> Priced`; returns the total.
    pub fn request_payment(&mut self) -> LedgerResult<Decimal> {
        self.require(SaleState::Open, SaleState::Priced)?;
        if self.cart.is_empty() {
            return Err(LedgerError::EmptyCart);
        }
        let total = self.cart.total()?;
        self.total = Some(total);
        self.transition(SaleState::Priced);
        Ok(total)
    }

    /// `Priced -> Open`, to change the cart after pricing.
    pub fn resume_editing(&mut self) -> LedgerResult<()> {
        self.require(SaleState::Priced, SaleState::Open)?;
        self.total = None;
        self.transition(SaleState::Open);
        Ok(())
    }

    /// `Priced -> Paid` when `amount >= total`; returns the change.
    ///
    /// An insufficient amount leaves the transaction `Priced` with the cart
    /// untouched, ready for another attempt.
    pub fn tender(&mut self, amount: Decimal) -> LedgerResult<Decimal> {
        self.require(SaleState::Priced, SaleState::Paid)?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(LedgerError::InvalidAmount { amount });
        }
        let total = match self.total {
            Some(total) => total,
            None => self.cart.total()?,
        };
        if amount < total {
            return Err(LedgerError::InsufficientPayment {
                total,
                tendered: amount,
            });
        }
        self.tendered = Some(amount);
        self.transition(SaleState::Paid);
        Ok(amount - total)
    }

    /// `Paid -> Committed`: ledger append, then stock decrement.
    ///
    /// # Errors
    ///
    /// - Journal failure: nothing recorded, stays `Paid`, safe to retry.
    /// - Stock failure: `InventoryUpdateFailed`; the sale is committed and
    ///   available from [`SaleTransaction::committed`].
    pub fn finalize(
        &mut self,
        journal: &dyn SalesJournal,
        stock: &dyn StockStore,
        clock: &dyn Clock,
    ) -> LedgerResult<CommittedSale> {
        self.require(SaleState::Paid, SaleState::Committed)?;
        let total = match self.total {
            Some(total) => total,
            None => self.cart.total()?,
        };
        let tendered = self.tendered.unwrap_or(total);

        let timestamp = clock.now();
        let records = self
            .cart
            .lines()
            .iter()
            .map(|line| {
                LedgerRecord::new(
                    timestamp,
                    line.product_id.as_str(),
                    line.name.as_str(),
                    line.quantity,
                    line.unit_price,
                )
            })
            .collect::<LedgerResult<Vec<_>>>()?;

        // Step 1: durability boundary.
        journal.append_sales(&records)?;

        let deltas = StockDeltas::from_records(&records);
        self.cart.clear();
        self.transition(SaleState::Committed);
        info!(%timestamp, %total, lines = deltas.len(), "Sale committed to ledger");

        let mut sale = CommittedSale {
            timestamp,
            records,
            total,
            tendered,
            change: tendered - total,
            inventory: None,
        };

        // Step 2: best-effort derived state.
        let result = match stock.apply_deltas(&deltas) {
            Ok(outcome) => {
                for level in outcome.oversold() {
                    warn!(product_id = %level.product_id, stock = level.stock, "Stock oversold");
                }
                sale.inventory = Some(outcome);
                Ok(sale.clone())
            }
            Err(e) => {
                warn!(%timestamp, error = %e, "Inventory update failed; stock needs reconciliation");
                Err(LedgerError::InventoryUpdateFailed {
                    sale_timestamp: timestamp,
                    reason: e.to_string(),
                })
            }
        };
        self.committed = Some(sale);
        result
    }

    /// Discard the cart from any pre-commit state.
    pub fn abort(&mut self) -> LedgerResult<()> {
        if self.state.is_terminal() {
            return Err(LedgerError::InvalidTransition {
                from: self.state,
                to: SaleState::Aborted,
            });
        }
        self.cart.clear();
        self.total = None;
        self.tendered = None;
        self.transition(SaleState::Aborted);
        Ok(())
    }

    fn require(&self, expected: SaleState, to: SaleState) -> LedgerResult<()> {
        if self.state != expected {
            return Err(LedgerError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: SaleState) {
        let from = std::mem::replace(&mut self.state, to);
        if let Some(observer) = &self.observer {
            observer.on_transition(from, to);
        }
    }
}
