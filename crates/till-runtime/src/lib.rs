//! # Till Runtime
//!
//! The `till` process: one invocation per checkout, product edit or report.
//!
//! ## Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration (environment, then CLI overrides)
//! 3. Initialize logging to stderr
//! 4. Open the data directory (missing files are created)
//! 5. Run the subcommand
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Error, nothing recorded by the failing step |
//! | 2 | Sale recorded, stock not updated (run `till reconcile`) |

pub mod cli;
pub mod commands;
pub mod config;
pub mod telemetry;

pub use cli::Cli;
pub use commands::{run, Outcome};
pub use config::RuntimeConfig;
