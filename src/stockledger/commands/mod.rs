//! # Command Layer
//!
//! The business logic of the ledger. Each command lives in its own submodule
//! and is a plain function over a [`DataStore`](crate::store::DataStore), the
//! current [`LedgerView`](crate::view::LedgerView) and typed inputs.
//!
//! ## What Commands Do NOT Do
//!
//! - **Any terminal I/O**: no stdout, stderr or prompts
//! - **Gating**: busy and view-only checks belong to the API facade
//! - **Retries**: a failed write is reported, never repeated
//!
//! ## Structured Returns
//!
//! Mutating commands return [`CmdResult`]: the ids of the records they wrote
//! plus leveled messages. Read-only views (dashboard, reports, listings) return
//! their own typed structs.
//!
//! ## Multi-Step Writes
//!
//! The store has no transactions. Commands that write more than once
//! (movements, shrinkages, paying a service) run their steps in order and
//! stop at the first failure. If nothing was written the store error comes
//! back untouched; otherwise the command returns
//! [`LedgerError::PartialWrite`](crate::error::LedgerError::PartialWrite)
//! naming the steps that did land. `doctor` reports what such a gap leaves
//! behind.
//!
//! ## Command Modules
//!
//! - [`products`]: create, update, delete products
//! - [`movement`]: stock movements and the sale they imply
//! - [`shrinkage`]: recorded losses
//! - [`money`]: cash ledger entries
//! - [`dashboard`]: the landing summary
//! - [`report`]: period reports and filtered listings
//! - [`export`]: transposed workbook sheets
//! - [`backup`]: delimited-text backup and restore
//! - [`doctor`]: reconciliation report
//! - [`clear`]: wipe everything
//! - [`helpers`]: product selectors and payload encoding

use serde::Serialize;
use std::path::PathBuf;

pub mod backup;
pub mod clear;
pub mod dashboard;
pub mod doctor;
pub mod export;
pub mod helpers;
pub mod money;
pub mod movement;
pub mod products;
pub mod report;
pub mod shrinkage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    /// Store keys of the records written, in write order.
    pub affected_ids: Vec<String>,
    /// Files produced by export and backup.
    pub written_paths: Vec<PathBuf>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_affected_ids(mut self, ids: Vec<String>) -> Self {
        self.affected_ids = ids;
        self
    }

    pub fn with_written_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.written_paths = paths;
        self
    }
}
