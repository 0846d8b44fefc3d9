//! # Ports Layer
//!
//! - `outbound.rs` - Driven ports (journal, stock, clock, observer) the
//!   checkout protocol depends on.

pub mod outbound;

pub use outbound::{Clock, FixedClock, SaleObserver, SalesJournal, StockStore, SystemClock};
