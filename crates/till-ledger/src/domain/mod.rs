//! # Domain Layer
//!
//! Pure business logic: rows, their CSV codec, the cart and the sale commit
//! protocol.
//!
//! ## Components
//!
//! - `entities`: LedgerRecord, CashFlowRecord, Product, Timestamp
//! - `codec`: strict CSV row parsing (`CsvRow`)
//! - `catalog`: product lookups over a loaded table
//! - `cart`: in-memory line items of the sale being rung up
//! - `sale`: SaleTransaction state machine and commit ordering
//! - `report`: Summary and Report values
//! - `role`: admin / cashier permissions
//! - `value_objects`: StockDeltas, DateRange, lock modes
//! - `errors`: LedgerError enumeration

pub mod cart;
pub mod catalog;
pub mod codec;
pub mod entities;
pub mod errors;
pub mod report;
pub mod role;
pub mod sale;
pub mod value_objects;

pub use cart::*;
pub use catalog::*;
pub use codec::*;
pub use entities::*;
pub use errors::*;
pub use report::*;
pub use role::*;
pub use sale::*;
pub use value_objects::*;
