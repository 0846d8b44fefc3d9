//! # Cart
//!
//! Line items of the sale being rung up. Owned by a single checkout session
//! and never persisted.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::entities::Product;
use crate::domain::errors::{LedgerError, LedgerResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    /// Price captured when the product was first added.
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    /// Fails with `InvalidAmount` when the product overflows.
    pub fn line_total(&self) -> LedgerResult<Decimal> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or(LedgerError::InvalidAmount {
                amount: self.unit_price,
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
    last_added: Option<String>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units; repeated products accumulate on one line.
    pub fn add(&mut self, product: &Product, quantity: u32) -> LedgerResult<()> {
        if quantity == 0 {
            return Err(LedgerError::InvalidQuantity { quantity: 0 });
        }
        match self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.product_id)
        {
            Some(line) => {
                line.quantity = line.quantity.checked_add(quantity).ok_or(
                    LedgerError::InvalidQuantity {
                        quantity: i64::from(line.quantity) + i64::from(quantity),
                    },
                )?;
            }
            None => self.lines.push(CartLine {
                product_id: product.product_id.clone(),
                name: product.name.clone(),
                unit_price: product.unit_price,
                quantity,
            }),
        }
        self.last_added = Some(product.product_id.clone());
        Ok(())
    }

    /// One more unit of the most recently added product.
    pub fn repeat_last(&mut self) -> LedgerResult<()> {
        let id = self.last_added.clone().ok_or(LedgerError::EmptyCart)?;
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == id)
            .ok_or(LedgerError::UnknownProduct { product_id: id })?;
        line.quantity = line
            .quantity
            .checked_add(1)
            .ok_or(LedgerError::InvalidQuantity {
                quantity: i64::from(line.quantity) + 1,
            })?;
        Ok(())
    }

    pub fn remove(&mut self, product_id: &str) -> Option<CartLine> {
        let pos = self
            .lines
            .iter()
            .position(|line| line.product_id == product_id)?;
        if self.last_added.as_deref() == Some(product_id) {
            self.last_added = None;
        }
        Some(self.lines.remove(pos))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.last_added = None;
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn get(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Σ(quantity × unit_price).
    pub fn total(&self) -> LedgerResult<Decimal> {
        self.lines.iter().try_fold(Decimal::ZERO, |total, line| {
            let line_total = line.line_total()?;
            total
                .checked_add(line_total)
                .ok_or(LedgerError::InvalidAmount { amount: line_total })
        })
    }
}
