//! # Stock CLI
//!
//! The binary is intentionally thin: the CLI lives in `src/stockledger/cli/`,
//! and this file only invokes `cli::run()` and handles process termination.
//! Everything the CLI calls goes through `stockledger::api::LedgerApi`.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
