//! # Product Catalog
//!
//! In-memory view of the product table: rows in file order plus an id index.
//! Produced by `InventoryTable::load`; never cached across operations.

use std::collections::HashMap;

use crate::domain::entities::Product;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product; returns it back if the id is already taken.
    pub fn insert(&mut self, product: Product) -> Result<(), Product> {
        if self.index.contains_key(&product.product_id) {
            return Err(product);
        }
        self.index
            .insert(product.product_id.clone(), self.products.len());
        self.products.push(product);
        Ok(())
    }

    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.index.get(product_id).map(|&i| &self.products[i])
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.index.contains_key(product_id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Exact id first, then a case-insensitive exact name.
    pub fn resolve(&self, term: &str) -> Option<&Product> {
        let term = term.trim();
        self.get(term).or_else(|| {
            let wanted = term.to_lowercase();
            self.products
                .iter()
                .find(|p| p.name.to_lowercase() == wanted)
        })
    }

    pub fn into_products(self) -> Vec<Product> {
        self.products
    }
}

impl IntoIterator for Catalog {
    type Item = Product;
    type IntoIter = std::vec::IntoIter<Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.into_iter()
    }
}

/// Cashier entry `TERM*QTY`, e.g. `P001*3` or `coffee*2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCode {
    pub term: String,
    pub quantity: u32,
}

impl EntryCode {
    /// A missing, zero or non-numeric quantity means one unit.
    pub fn parse(input: &str) -> Option<Self> {
        let (term, quantity) = match input.split_once('*') {
            Some((term, qty)) => (term, qty.trim().parse().ok().filter(|&q| q > 0)),
            None => (input, None),
        };
        let term = term.trim();
        if term.is_empty() {
            return None;
        }
        Some(Self {
            term: term.to_string(),
            quantity: quantity.unwrap_or(1),
        })
    }
}
