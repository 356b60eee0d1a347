//! # CLI Behavior
//!
//! This is **one possible UI client** for the ledger, not the application
//! itself. It is the only place that knows about terminal I/O, exit codes and
//! output formatting.
//!
//! For the overall architecture, see the crate-level documentation of the
//! `stockledger` library.
//!
//! ## Naked Execution (`stock`)
//!
//! Running `stock` with no arguments shows the dashboard for the last seven
//! days.
//!
//! ## Product Selectors
//!
//! Commands that act on a product take a selector: the store id, an exact
//! SKU, or any text that matches exactly one product's name or SKU.
//!
//! ## Destructive Commands
//!
//! `stock service rm` and `stock clear` print today's date and a random word
//! and read both back from stdin before doing anything.
//!
//! The other `rm` commands ask `[y/N]` first; `--yes` skips the question.
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. `RUST_LOG` wins when set;
//! otherwise only warnings are shown, or debug output with `--verbose`.

mod commands;
mod render;
mod setup;
mod styles;

pub use commands::run;
