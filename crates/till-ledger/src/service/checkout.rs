//! Checkout session: product lookups, the active sale and its commit.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::adapters::storage::InventoryTable;
use crate::domain::cart::CartLine;
use crate::domain::catalog::{Catalog, EntryCode};
use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::sale::{CommittedSale, SaleTransaction};
use crate::domain::value_objects::StockLevel;
use crate::ports::outbound::{Clock, SaleObserver, SalesJournal};

/// One register session ringing up sales one after another.
///
/// Holds a catalog snapshot for lookups and prices. Stock decrements never
/// use the snapshot; they re-read the table under its lock.
pub struct Checkout<'a> {
    journal: &'a dyn SalesJournal,
    inventory: &'a InventoryTable,
    clock: &'a dyn Clock,
    low_stock_threshold: i64,
    catalog: Catalog,
    transaction: SaleTransaction,
}

impl<'a> Checkout<'a> {
    pub fn begin(
        journal: &'a dyn SalesJournal,
        inventory: &'a InventoryTable,
        clock: &'a dyn Clock,
        low_stock_threshold: i64,
    ) -> LedgerResult<Self> {
        let catalog = inventory.load()?;
        debug!(products = catalog.len(), "checkout session started");
        Ok(Self {
            journal,
            inventory,
            clock,
            low_stock_threshold,
            catalog,
            transaction: SaleTransaction::new(),
        })
    }

    /// Attach a presentation observer to the current sale.
    pub fn with_observer(mut self, observer: Box<dyn SaleObserver>) -> Self {
        self.transaction = self.transaction.with_observer(observer);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Reload the catalog snapshot (after the product editor changed it).
    pub fn refresh_catalog(&mut self) -> LedgerResult<()> {
        self.catalog = self.inventory.load()?;
        Ok(())
    }

    pub fn transaction(&self) -> &SaleTransaction {
        &self.transaction
    }

    pub fn transaction_mut(&mut self) -> &mut SaleTransaction {
        &mut self.transaction
    }

    /// Add a cashier entry such as `P001*3` or `coffee`.
    pub fn enter(&mut self, input: &str) -> LedgerResult<&CartLine> {
        let code = EntryCode::parse(input).ok_or_else(|| LedgerError::InvalidField {
            field: "entry",
            reason: format!("nothing to look up in {input:?}"),
        })?;
        self.add(&code.term, code.quantity)
    }

    /// Add `quantity` of the product found by id or name.
    pub fn add(&mut self, term: &str, quantity: u32) -> LedgerResult<&CartLine> {
        let product = self
            .catalog
            .resolve(term)
            .ok_or_else(|| LedgerError::UnknownProduct {
                product_id: term.to_string(),
            })?;
        let product_id = product.product_id.clone();
        self.transaction.add_item(product, quantity)?;

        self.transaction
            .cart()
            .get(&product_id)
            .ok_or(LedgerError::UnknownProduct { product_id })
    }

    pub fn request_payment(&mut self) -> LedgerResult<Decimal> {
        self.transaction.request_payment()
    }

    pub fn tender(&mut self, amount: Decimal) -> LedgerResult<Decimal> {
        self.transaction.tender(amount)
    }

    /// Finalize the paid sale: ledger first, then stock.
    ///
    /// Products that end at or below the low-stock threshold are logged.
    pub fn commit(&mut self) -> LedgerResult<CommittedSale> {
        let sale = self
            .transaction
            .finalize(self.journal, self.inventory, self.clock)?;

        if let Some(outcome) = &sale.inventory {
            for level in low_stock(&outcome.adjusted, self.low_stock_threshold) {
                warn!(
                    product_id = %level.product_id,
                    stock = level.stock,
                    threshold = self.low_stock_threshold,
                    "Low stock"
                );
            }
        }
        Ok(sale)
    }

    /// Discard the current sale.
    pub fn abort(&mut self) -> LedgerResult<()> {
        self.transaction.abort()
    }

    /// Start the next sale, dropping the finished (or aborted) one.
    pub fn next_sale(&mut self) -> SaleTransaction {
        std::mem::take(&mut self.transaction)
    }
}

/// Levels at or below `threshold`.
pub fn low_stock(levels: &[StockLevel], threshold: i64) -> impl Iterator<Item = &StockLevel> {
    levels.iter().filter(move |l| l.stock <= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::{InMemoryJournal, RecordStore};
    use crate::domain::entities::{LedgerRecord, Product, Timestamp};
    use crate::domain::sale::SaleState;
    use crate::domain::value_objects::LockWait;
    use crate::ports::outbound::FixedClock;

    fn clock() -> FixedClock {
        FixedClock("2024-05-01T12:00:00".parse::<Timestamp>().unwrap())
    }

    fn seeded_table(dir: &tempfile::TempDir) -> InventoryTable {
        let table = InventoryTable::new(dir.path().join("products.csv"), LockWait::Block);
        table.ensure_initialized().unwrap();
        table
            .create(Product::new("P001", "Coffee", Decimal::new(250, 2), 10).unwrap())
            .unwrap();
        table
            .create(Product::new("P002", "Tea", Decimal::new(180, 2), 6).unwrap())
            .unwrap();
        table
    }

    #[test]
    fn test_entry_codes_and_commit() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded_table(&dir);
        let journal = InMemoryJournal::new();
        let clock = clock();

        let mut checkout = Checkout::begin(&journal, &table, &clock, 5).unwrap();
        assert_eq!(checkout.enter("P001*3").unwrap().quantity, 3);
        assert_eq!(checkout.enter("tea").unwrap().quantity, 1);
        assert_eq!(checkout.enter("TEA*2").unwrap().quantity, 3);

        assert_eq!(checkout.request_payment().unwrap(), Decimal::new(1290, 2));
        assert_eq!(checkout.tender(Decimal::new(2000, 2)).unwrap(), Decimal::new(710, 2));

        let sale = checkout.commit().unwrap();
        assert_eq!(sale.records.len(), 2);
        assert_eq!(journal.records(), sale.records);
        assert_eq!(table.get("P001").unwrap().unwrap().stock, 7);
        assert_eq!(table.get("P002").unwrap().unwrap().stock, 3);

        let finished = checkout.next_sale();
        assert_eq!(finished.state(), SaleState::Committed);
        assert_eq!(checkout.transaction().state(), SaleState::Open);
    }

    #[test]
    fn test_unknown_product() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded_table(&dir);
        let journal = InMemoryJournal::new();
        let clock = clock();

        let mut checkout = Checkout::begin(&journal, &table, &clock, 5).unwrap();
        let err = checkout.enter("P999*2").unwrap_err();
        assert!(matches!(err, LedgerError::UnknownProduct { .. }));
        assert!(checkout.enter("  ").is_err());
        assert!(checkout.transaction().cart().is_empty());
    }

    #[test]
    fn test_commit_to_file_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded_table(&dir);
        let sales: RecordStore<LedgerRecord> =
            RecordStore::new(dir.path().join("sales.csv"), LockWait::Block);
        let clock = clock();

        let mut checkout = Checkout::begin(&sales, &table, &clock, 5).unwrap();
        checkout.add("P002", 1).unwrap();
        checkout.request_payment().unwrap();
        checkout.tender(Decimal::new(180, 2)).unwrap();
        let sale = checkout.commit().unwrap();

        assert_eq!(sale.change, Decimal::ZERO);
        assert_eq!(sales.read_all().unwrap(), sale.records);
    }

    #[test]
    fn test_refresh_catalog_sees_new_products() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded_table(&dir);
        let journal = InMemoryJournal::new();
        let clock = clock();

        let mut checkout = Checkout::begin(&journal, &table, &clock, 5).unwrap();
        table
            .create(Product::new("P003", "Cake", Decimal::new(320, 2), 2).unwrap())
            .unwrap();
        assert!(checkout.add("P003", 1).is_err());

        checkout.refresh_catalog().unwrap();
        assert!(checkout.add("P003", 1).is_ok());
    }

    #[test]
    fn test_low_stock_filter() {
        let levels = vec![
            StockLevel {
                product_id: "P1".into(),
                stock: 6,
            },
            StockLevel {
                product_id: "P2".into(),
                stock: 5,
            },
            StockLevel {
                product_id: "P3".into(),
                stock: -1,
            },
        ];
        let low: Vec<_> = low_stock(&levels, 5).map(|l| l.product_id.as_str()).collect();
        assert_eq!(low, ["P2", "P3"]);
    }
}
