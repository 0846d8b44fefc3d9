//! Subcommand handlers. Each writes its result to `out` and returns how the
//! process should exit.

use std::io::Write;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use till_ledger::{CommittedSale, LedgerError, Product, Report, Role, Till};

use crate::cli::{Cli, Command, ProductCommand};

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The sale is on the ledger but stock was not decremented.
    InventoryStale,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Done => 0,
            Outcome::InventoryStale => 2,
        }
    }
}

pub fn run(cli: &Cli, till: &Till, out: &mut impl Write) -> Result<Outcome> {
    let role = cli.global.role;
    match &cli.command {
        Command::Init => {
            writeln!(out, "initialized {}", till.config().data_dir().display())?;
        }
        Command::Product(command) => product(command, role, till, out)?,
        Command::Sell {
            entries,
            tendered,
            json,
        } => return sell(entries, *tendered, *json, role, till, out),
        Command::Cash {
            direction,
            amount,
            memo,
        } => {
            let record = till
                .cash_drawer(role)?
                .record((*direction).into(), *amount, memo)?;
            writeln!(
                out,
                "{} {} {} {}",
                record.timestamp(),
                record.kind(),
                record.amount(),
                record.memo()
            )?;
        }
        Command::Report { from, to, json } => {
            let report = till.reports(role)?.report(*from, *to)?;
            if *json {
                serde_json::to_writer_pretty(&mut *out, &report)?;
                writeln!(out)?;
            } else {
                write_report(out, &report)?;
            }
        }
        Command::Reconcile { timestamp } => {
            let run = till.reconciler(role)?.reconcile_sale(*timestamp)?;
            if run.records == 0 {
                bail!("no sale recorded at {timestamp}");
            }
            for level in &run.outcome.adjusted {
                writeln!(out, "{}\t{}", level.product_id, level.stock)?;
            }
            for id in &run.outcome.unknown {
                writeln!(out, "{id}\tnot in product table")?;
            }
        }
    }
    Ok(Outcome::Done)
}

#[derive(Serialize)]
struct ProductRow<'a> {
    #[serde(flatten)]
    product: &'a Product,
    low_stock: bool,
}

fn product(command: &ProductCommand, role: Role, till: &Till, out: &mut impl Write) -> Result<()> {
    let table = till.products(role)?;
    match command {
        ProductCommand::Add {
            id,
            name,
            price,
            stock,
        } => {
            table.create(Product::new(id.as_str(), name.as_str(), *price, *stock)?)?;
            writeln!(out, "added {id}")?;
        }
        ProductCommand::Set {
            id,
            name,
            price,
            stock,
        } => {
            let updated = match table.get(id)? {
                Some(mut product) => {
                    if let Some(name) = name {
                        product.name = name.clone();
                    }
                    if let Some(price) = price {
                        product.unit_price = *price;
                    }
                    if let Some(stock) = stock {
                        product.stock = *stock;
                    }
                    product
                }
                None => {
                    let (Some(name), Some(price)) = (name, price) else {
                        bail!("{id} does not exist; --name and --price are required to create it");
                    };
                    Product::new(id.as_str(), name.as_str(), *price, stock.unwrap_or(0))?
                }
            };
            let replaced = table.upsert(updated)?;
            writeln!(out, "{} {id}", if replaced { "updated" } else { "added" })?;
        }
        ProductCommand::Delete { id } => {
            if !table.delete(id)? {
                bail!("{id} does not exist");
            }
            writeln!(out, "deleted {id}")?;
        }
        ProductCommand::List { json } => {
            let catalog = table.list()?;
            let threshold = till.config().low_stock_threshold;
            if *json {
                let rows: Vec<_> = catalog
                    .iter()
                    .map(|product| ProductRow {
                        product,
                        low_stock: product.is_low_stock(threshold),
                    })
                    .collect();
                serde_json::to_writer_pretty(&mut *out, &rows)?;
                writeln!(out)?;
            } else {
                for p in catalog.iter() {
                    let flag = if p.is_low_stock(threshold) { "\tLOW" } else { "" };
                    writeln!(out, "{}\t{}\t{}\t{}{flag}", p.product_id, p.name, p.unit_price, p.stock)?;
                }
            }
        }
    }
    Ok(())
}

fn sell(
    entries: &[String],
    tendered: rust_decimal::Decimal,
    json: bool,
    role: Role,
    till: &Till,
    out: &mut impl Write,
) -> Result<Outcome> {
    let mut checkout = till.checkout(role)?;
    for entry in entries {
        checkout
            .enter(entry)
            .with_context(|| format!("cannot add {entry:?}"))?;
    }
    checkout.request_payment()?;
    checkout.tender(tendered)?;

    let (sale, outcome) = match checkout.commit() {
        Ok(sale) => (sale, Outcome::Done),
        Err(LedgerError::InventoryUpdateFailed {
            sale_timestamp,
            reason,
        }) => {
            let Some(sale) = checkout.transaction().committed().cloned() else {
                bail!("sale {sale_timestamp} committed but not available: {reason}");
            };
            (sale, Outcome::InventoryStale)
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        serde_json::to_writer_pretty(&mut *out, &sale)?;
        writeln!(out)?;
    } else {
        write_receipt(out, &sale)?;
    }
    if outcome == Outcome::InventoryStale {
        eprintln!(
            "warning: sale recorded but stock not updated; run `till reconcile {}`",
            sale.timestamp
        );
    }
    Ok(outcome)
}

fn write_receipt(out: &mut impl Write, sale: &CommittedSale) -> Result<()> {
    writeln!(out, "sale {}", sale.timestamp)?;
    for record in &sale.records {
        writeln!(
            out,
            "  {:<24} {:>4} x {:>8} = {:>9}",
            record.name(),
            record.quantity(),
            record.unit_price(),
            record.line_total()
        )?;
    }
    writeln!(out, "  {:<40} {:>9}", "TOTAL", sale.total)?;
    writeln!(out, "  {:<40} {:>9}", "TENDERED", sale.tendered)?;
    writeln!(out, "  {:<40} {:>9}", "CHANGE", sale.change)?;
    Ok(())
}

fn write_report(out: &mut impl Write, report: &Report) -> Result<()> {
    writeln!(out, "report {} .. {}", report.range.start(), report.range.end())?;
    for record in &report.sales {
        writeln!(
            out,
            "  {}  {:<10} {:<24} {:>4} {:>9}",
            record.timestamp(),
            record.product_id(),
            record.name(),
            record.quantity(),
            record.line_total()
        )?;
    }
    for record in &report.cash_flows {
        writeln!(
            out,
            "  {}  {:<10} {:<24} {:>9}",
            record.timestamp(),
            record.kind(),
            record.memo(),
            record.amount()
        )?;
    }
    let s = &report.summary;
    writeln!(out, "sales_total    {:>12}", s.sales_total)?;
    writeln!(out, "cash_in_total  {:>12}", s.cash_in_total)?;
    writeln!(out, "cash_out_total {:>12}", s.cash_out_total)?;
    writeln!(out, "net_total      {:>12}", s.net_total)?;
    Ok(())
}
