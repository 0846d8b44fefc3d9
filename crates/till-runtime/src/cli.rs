//! Command-line interface.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use till_ledger::{CashFlowKind, Role, Timestamp};

/// till: single-register checkout ledger
#[derive(Parser, Debug)]
#[command(name = "till")]
#[command(about = "Record sales, cash movements and stock in a shared CSV data directory")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Role supplied by the login screen
    #[arg(long, global = true, default_value = "cashier")]
    pub role: Role,

    /// Data directory (overrides TILL_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Give up on a file lock after this many ms; 0 waits forever
    /// (overrides TILL_LOCK_TIMEOUT_MS)
    #[arg(long, global = true)]
    pub lock_timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create missing ledger and product files
    Init,

    /// Product table maintenance (admin)
    #[command(subcommand)]
    Product(ProductCommand),

    /// Ring up one sale
    Sell {
        /// Entries such as `P001*2` or `coffee`
        #[arg(required = true)]
        entries: Vec<String>,

        /// Amount handed over by the customer
        #[arg(long)]
        tendered: Decimal,

        /// Print the committed sale as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a manual cash-drawer movement
    Cash {
        direction: Direction,
        amount: Decimal,
        memo: String,
    },

    /// Summarize a date range (admin)
    Report {
        /// First day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        #[arg(long)]
        json: bool,
    },

    /// Re-apply the stock decrements of one recorded sale (admin)
    Reconcile {
        /// Sale timestamp as printed by `sell`
        timestamp: Timestamp,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProductCommand {
    /// Create a product; fails if the id exists
    Add {
        id: String,
        name: String,
        price: Decimal,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        stock: i64,
    },

    /// Update fields of a product, or create it when name and price are given
    Set {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long, allow_negative_numbers = true)]
        stock: Option<i64>,
    },

    /// Remove a product
    Delete { id: String },

    /// List products in table order
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl From<Direction> for CashFlowKind {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::In => CashFlowKind::In,
            Direction::Out => CashFlowKind::Out,
        }
    }
}
