//! # Stockledger Architecture
//!
//! Stockledger is a **UI-agnostic inventory ledger library** for a small
//! business: products, stock movements, shrinkage, cash flow and recurring
//! bills. The `stock` binary is one client of it, not the application itself.
//!
//! ## The Four-Layer Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, renders views, prompts for confirmation│
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Owns the application state (view, busy flag, config)     │
//! │  - Resolves product selectors, gates writes                 │
//! │  - Re-derives the view after every write                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Stock mutation policy, CRUD, reports, file exchange      │
//! │  - Operates on Rust types, returns Rust types               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - DataStore trait over a hierarchical record tree          │
//! │  - FileStore (production), InMemoryStore (testing)          │
//! │  - LocalStorage for the service list and view-only flag     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! Reads: the store emits a full [`store::Snapshot`] on every change, the
//! [`normalize`] step flattens it into tagged records, and [`view`] reduces
//! those into typed collections and aggregates from scratch.
//!
//! Writes: API → command → store, which publishes a new snapshot that the API
//! picks up before returning.
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes plain arguments, returns
//! `Result<...>` and never touches the terminal. Dates that matter ("today")
//! are passed in so every view is reproducible in tests.
//!
//! ## Module Overview
//!
//! - [`api`]: the facade, entry point for all operations
//! - [`commands`]: business logic for each command
//! - [`view`]: the derived view engine (filters, aggregates, activity feed)
//! - [`normalize`]: snapshot flattening
//! - [`services`]: the locally kept service ledger
//! - [`confirm`]: the date-and-word challenge for destructive actions
//! - [`store`]: storage abstraction and implementations
//! - [`model`]: record types
//! - [`config`]: configuration management
//! - [`error`]: error types
//! - `cli`: argument parsing and rendering for the binary (not part of the lib API)

pub mod api;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod error;
pub mod model;
pub mod normalize;
pub mod services;
pub mod store;
pub mod view;
