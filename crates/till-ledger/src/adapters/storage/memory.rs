use std::sync::{Mutex, MutexGuard};

use crate::domain::catalog::Catalog;
use crate::domain::entities::{LedgerRecord, Product};
use crate::domain::errors::LedgerResult;
use crate::domain::value_objects::{ApplyOutcome, StockDeltas, StockLevel};
use crate::ports::outbound::{SalesJournal, StockStore};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory sales journal for unit tests.
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    records: Mutex<Vec<LedgerRecord>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LedgerRecord> {
        locked(&self.records).clone()
    }
}

impl SalesJournal for InMemoryJournal {
    fn append_sales(&self, records: &[LedgerRecord]) -> LedgerResult<()> {
        locked(&self.records).extend_from_slice(records);
        Ok(())
    }
}

/// In-memory stock counts for unit tests.
///
/// Same semantics as the file-backed table: unknown ids are reported, stock
/// may go negative.
#[derive(Debug, Default)]
pub struct InMemoryStock {
    catalog: Mutex<Catalog>,
}

impl InMemoryStock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut catalog = Catalog::new();
        for product in products {
            // Later duplicates are dropped, as when loading a table.
            let _ = catalog.insert(product);
        }
        Self {
            catalog: Mutex::new(catalog),
        }
    }

    pub fn stock_of(&self, product_id: &str) -> Option<i64> {
        locked(&self.catalog).get(product_id).map(|p| p.stock)
    }
}

impl StockStore for InMemoryStock {
    fn apply_deltas(&self, deltas: &StockDeltas) -> LedgerResult<ApplyOutcome> {
        let mut catalog = locked(&self.catalog);
        let mut products = std::mem::take(&mut *catalog).into_products();
        let mut outcome = ApplyOutcome::default();

        for product in &mut products {
            if let Some(delta) = deltas.get(&product.product_id) {
                product.stock = product.stock.saturating_sub(delta);
                outcome.adjusted.push(StockLevel {
                    product_id: product.product_id.clone(),
                    stock: product.stock,
                });
            }
        }
        for (product_id, _) in deltas.iter() {
            if !outcome.adjusted.iter().any(|l| l.product_id == product_id) {
                outcome.unknown.push(product_id.to_string());
            }
        }

        for product in products {
            let _ = catalog.insert(product);
        }
        Ok(outcome)
    }
}
