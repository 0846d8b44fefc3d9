//! Product table with locked read-modify-write cycles.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::csv_file::{csv_error, encode_lines, ensure_parent, initialize, open_locked};
use crate::adapters::lock::FileLock;
use crate::domain::catalog::Catalog;
use crate::domain::codec::CsvRow;
use crate::domain::entities::Product;
use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::value_objects::{ApplyOutcome, LockMode, LockWait, StockDeltas, StockLevel};
use crate::ports::outbound::StockStore;

/// One data line of the table as last read.
#[derive(Debug, Clone)]
enum Row {
    Product(Product),
    /// Kept byte-for-byte so a rewrite never loses what it could not parse.
    Unparsed(Vec<u8>),
}

/// Mutable keyed product rows in one CSV file.
///
/// Every mutation locks the file exclusively, re-reads it, edits the rows
/// and rewrites the whole file before releasing the lock. Nothing is cached
/// between calls.
#[derive(Debug, Clone)]
pub struct InventoryTable {
    path: PathBuf,
    wait: LockWait,
}

impl InventoryTable {
    pub fn new(path: impl Into<PathBuf>, wait: LockWait) -> Self {
        Self {
            path: path.into(),
            wait,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the table with its header row if absent.
    pub fn ensure_initialized(&self) -> LedgerResult<bool> {
        initialize(&self.path, Product::HEADER, self.wait)
    }

    /// Read the full table under a shared lock.
    ///
    /// Malformed rows are skipped with a warning. When an id repeats, the
    /// first row wins and later ones are ignored.
    pub fn load(&self) -> LedgerResult<Catalog> {
        let lock = open_locked(
            &self.path,
            OpenOptions::new().read(true),
            LockMode::Shared,
            self.wait,
        )?;
        let rows = read_rows(&lock)?;
        drop(lock);

        let mut catalog = Catalog::new();
        for row in rows {
            if let Row::Product(product) = row {
                if let Err(dup) = catalog.insert(product) {
                    warn!(
                        path = %self.path.display(),
                        product_id = %dup.product_id,
                        "duplicate product row ignored"
                    );
                }
            }
        }
        Ok(catalog)
    }

    /// Same as [`load`](Self::load); named for the product editor.
    pub fn list(&self) -> LedgerResult<Catalog> {
        self.load()
    }

    pub fn get(&self, product_id: &str) -> LedgerResult<Option<Product>> {
        Ok(self
            .load()?
            .into_iter()
            .find(|p| p.product_id == product_id))
    }

    /// Subtract each delta from the matching product's stock.
    ///
    /// Deltas for ids not in the table are ignored with a warning. Stock may
    /// go negative. Applying the same deltas twice subtracts twice.
    pub fn apply(&self, deltas: &StockDeltas) -> LedgerResult<ApplyOutcome> {
        if deltas.is_empty() {
            return Ok(ApplyOutcome::default());
        }

        self.modify(|rows| {
            let mut outcome = ApplyOutcome::default();
            let mut seen = HashSet::new();

            for row in rows.iter_mut() {
                let Row::Product(product) = row else { continue };
                let Some(delta) = deltas.get(&product.product_id) else {
                    continue;
                };
                if !seen.insert(product.product_id.clone()) {
                    continue;
                }
                product.stock = product.stock.saturating_sub(delta);
                outcome.adjusted.push(StockLevel {
                    product_id: product.product_id.clone(),
                    stock: product.stock,
                });
            }

            for (product_id, _) in deltas.iter() {
                if !seen.contains(product_id) {
                    warn!(path = %self.path.display(), product_id, "stock delta for unknown product ignored");
                    outcome.unknown.push(product_id.to_string());
                }
            }

            let changed = !outcome.adjusted.is_empty();
            Ok((outcome, changed))
        })
    }

    /// Insert a new product, rejecting an id that is already present.
    pub fn create(&self, product: Product) -> LedgerResult<()> {
        product.validate()?;
        self.modify(|rows| {
            if find(rows, &product.product_id).is_some() {
                return Err(LedgerError::DuplicateKey {
                    product_id: product.product_id.clone(),
                });
            }
            rows.push(Row::Product(product.clone()));
            Ok(((), true))
        })?;
        info!(path = %self.path.display(), product_id = %product.product_id, "product created");
        Ok(())
    }

    /// Replace the product with the same id in place, or append it.
    ///
    /// Returns `true` when an existing row was replaced.
    pub fn upsert(&self, product: Product) -> LedgerResult<bool> {
        product.validate()?;
        self.modify(|rows| match find(rows, &product.product_id) {
            Some(index) => {
                let changed = !matches!(&rows[index], Row::Product(p) if *p == product);
                rows[index] = Row::Product(product.clone());
                Ok((true, changed))
            }
            None => {
                rows.push(Row::Product(product.clone()));
                Ok((false, true))
            }
        })
    }

    /// Remove every row with `product_id`. Returns whether any was removed.
    pub fn delete(&self, product_id: &str) -> LedgerResult<bool> {
        let removed = self.modify(|rows| {
            let before = rows.len();
            rows.retain(|row| !matches!(row, Row::Product(p) if p.product_id == product_id));
            let removed = rows.len() != before;
            Ok((removed, removed))
        })?;
        if removed {
            info!(path = %self.path.display(), product_id, "product deleted");
        }
        Ok(removed)
    }

    /// One locked read-modify-write cycle.
    ///
    /// `edit` returns its result and whether the rows changed. The new file
    /// image is encoded in full before the file is touched; the file is only
    /// rewritten when something changed.
    fn modify<T>(
        &self,
        edit: impl FnOnce(&mut Vec<Row>) -> LedgerResult<(T, bool)>,
    ) -> LedgerResult<T> {
        ensure_parent(&self.path)?;
        let lock = open_locked(
            &self.path,
            OpenOptions::new().read(true).write(true).create(true),
            LockMode::Exclusive,
            self.wait,
        )?;

        let mut rows = read_rows(&lock)?;
        let (result, changed) = edit(&mut rows)?;

        if changed {
            let image = render(&self.path, &rows)?;
            overwrite(&lock, &image)?;
            info!(path = %self.path.display(), rows = rows.len(), "product table rewritten");
        }
        Ok(result)
    }
}

impl StockStore for InventoryTable {
    fn apply_deltas(&self, deltas: &StockDeltas) -> LedgerResult<ApplyOutcome> {
        self.apply(deltas)
    }
}

fn find(rows: &[Row], product_id: &str) -> Option<usize> {
    rows.iter()
        .position(|row| matches!(row, Row::Product(p) if p.product_id == product_id))
}

/// Read every data row from the top of the locked file. The first line is
/// the header and is not returned.
fn read_rows(lock: &FileLock) -> LedgerResult<Vec<Row>> {
    let path = lock.path();
    let mut bytes = Vec::new();
    let mut file = lock.file();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut bytes))
        .map_err(|e| LedgerError::io(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes.as_slice());
    let mut record = csv::ByteRecord::new();
    let mut rows = Vec::new();
    let mut start = 0usize;
    let mut is_header = true;

    loop {
        let more = reader
            .read_byte_record(&mut record)
            .map_err(|e| csv_error(path, e))?;
        if !more {
            break;
        }
        let end = reader.position().byte() as usize;
        let line = record.position().map_or(0, |p| p.line());
        let raw = trim_line(bytes.get(start..end).unwrap_or_default());
        start = end;

        if is_header {
            is_header = false;
            continue;
        }
        rows.push(parse_row(path, line, &record, raw));
    }
    Ok(rows)
}

fn parse_row(path: &Path, line: u64, record: &csv::ByteRecord, raw: &[u8]) -> Row {
    let parsed = csv::StringRecord::from_byte_record(record.clone())
        .map_err(|_| "row is not valid UTF-8".to_string())
        .and_then(|record| {
            let fields: Vec<&str> = record.iter().collect();
            Product::from_fields(line, &fields).map_err(|e| e.reason)
        });

    match parsed {
        Ok(product) => Row::Product(product),
        Err(reason) => {
            warn!(path = %path.display(), line, %reason, "skipping malformed product row");
            Row::Unparsed(raw.to_vec())
        }
    }
}

fn trim_line(raw: &[u8]) -> &[u8] {
    let is_newline = |b: &u8| *b == b'\n' || *b == b'\r';
    let start = raw.iter().position(|b| !is_newline(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !is_newline(b)).map_or(start, |i| i + 1);
    &raw[start..end]
}

/// Full file image: canonical header, then every row in order.
fn render(path: &Path, rows: &[Row]) -> LedgerResult<Vec<u8>> {
    let mut image = encode_lines(path, [Product::HEADER])?;
    for row in rows {
        match row {
            Row::Product(product) => image.extend(encode_lines(path, [product.to_fields()])?),
            Row::Unparsed(raw) => {
                image.extend_from_slice(raw);
                image.push(b'\n');
            }
        }
    }
    Ok(image)
}

fn overwrite(lock: &FileLock, image: &[u8]) -> LedgerResult<()> {
    let mut file = lock.file();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.write_all(image))
        .and_then(|_| file.set_len(image.len() as u64))
        .and_then(|_| file.flush())
        .and_then(|_| file.sync_all())
        .map_err(|e| LedgerError::io(lock.path(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::fs;

    fn product(id: &str, name: &str, cents: i64, stock: i64) -> Product {
        Product::new(id, name, Decimal::new(cents, 2), stock).unwrap()
    }

    fn table(dir: &tempfile::TempDir) -> InventoryTable {
        let table = InventoryTable::new(dir.path().join("products.csv"), LockWait::Block);
        table.ensure_initialized().unwrap();
        table
    }

    fn seeded(dir: &tempfile::TempDir) -> InventoryTable {
        let table = table(dir);
        table.create(product("P001", "Coffee", 250, 10)).unwrap();
        table.create(product("P002", "Tea", 180, 4)).unwrap();
        table.create(product("P003", "Cake", 320, 0)).unwrap();
        table
    }

    #[test]
    fn test_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = table(&dir);
        assert!(table.load().unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(table.path()).unwrap(),
            "product_id,name,unit_price,stock\n"
        );
    }

    #[test]
    fn test_create_rejects_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded(&dir);
        let before = fs::read(table.path()).unwrap();

        let err = table.create(product("P002", "Green Tea", 200, 1)).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateKey { product_id } if product_id == "P002"));
        assert_eq!(fs::read(table.path()).unwrap(), before);
    }

    #[test]
    fn test_apply_keeps_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded(&dir);

        let deltas: StockDeltas = [("P003", 2), ("P001", 3)].into_iter().collect();
        let outcome = table.apply(&deltas).unwrap();

        let ids: Vec<_> = outcome.adjusted.iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, ["P001", "P003"]);

        assert_eq!(
            fs::read_to_string(table.path()).unwrap(),
            "product_id,name,unit_price,stock\n\
             P001,Coffee,2.50,7\n\
             P002,Tea,1.80,4\n\
             P003,Cake,3.20,-2\n"
        );
    }

    #[test]
    fn test_apply_ignores_unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded(&dir);

        let deltas: StockDeltas = [("P001", 1), ("GONE", 5)].into_iter().collect();
        let outcome = table.apply(&deltas).unwrap();

        assert_eq!(outcome.unknown, vec!["GONE".to_string()]);
        assert_eq!(table.get("P001").unwrap().unwrap().stock, 9);
    }

    #[test]
    fn test_apply_unknown_only_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded(&dir);
        let before = fs::read(table.path()).unwrap();

        let deltas: StockDeltas = [("GONE", 5)].into_iter().collect();
        table.apply(&deltas).unwrap();
        assert_eq!(fs::read(table.path()).unwrap(), before);
    }

    #[test]
    fn test_upsert_in_place_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded(&dir);

        assert!(table.upsert(product("P002", "Chai", 210, 12)).unwrap());
        assert!(!table.upsert(product("P004", "Juice", 300, 6)).unwrap());

        let ids: Vec<_> = table
            .list()
            .unwrap()
            .iter()
            .map(|p| p.product_id.clone())
            .collect();
        assert_eq!(ids, ["P001", "P002", "P003", "P004"]);
        assert_eq!(table.get("P002").unwrap().unwrap().name, "Chai");
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded(&dir);

        assert!(table.delete("P002").unwrap());
        assert!(!table.delete("P002").unwrap());
        assert_eq!(table.load().unwrap().len(), 2);
    }

    #[test]
    fn test_unparsed_rows_survive_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let table = InventoryTable::new(dir.path().join("products.csv"), LockWait::Block);
        fs::write(
            table.path(),
            "product_id,name,unit_price\n\
             P001,Coffee,2.50\n\
             P002,\"Tea, green\",oops\n\
             P003,Cake,3.20,5\n",
        )
        .unwrap();

        let catalog = table.load().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("P001").unwrap().stock, 0);

        let deltas: StockDeltas = [("P003", 1)].into_iter().collect();
        table.apply(&deltas).unwrap();

        assert_eq!(
            fs::read_to_string(table.path()).unwrap(),
            "product_id,name,unit_price,stock\n\
             P001,Coffee,2.50,0\n\
             P002,\"Tea, green\",oops\n\
             P003,Cake,3.20,4\n"
        );
    }

    #[test]
    fn test_round_trip_through_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let table = seeded(&dir);
        let before = table.load().unwrap();

        for product in before.iter() {
            table.upsert(product.clone()).unwrap();
        }
        assert_eq!(table.load().unwrap(), before);
    }

    #[test]
    fn test_missing_table_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let table = InventoryTable::new(dir.path().join("products.csv"), LockWait::Block);
        assert!(table.load().unwrap_err().is_not_found());
    }
}
