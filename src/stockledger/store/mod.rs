//! # Storage Layer
//!
//! The ledger reads and writes a hierarchical key-value tree shaped like a
//! real-time database:
//!
//! ```text
//! inventario/
//! ├── products/{id}     # field bag per product
//! ├── movements/{id}
//! ├── shrinkages/{id}
//! └── money/{id}
//! ```
//!
//! The tree has no query engine. Every change produces a full [`Snapshot`],
//! pushed to every live [`Subscription`]; the derived views are recomputed from
//! scratch on each one.
//!
//! ## Split Design
//!
//! - [`backend::TreeBackend`] handles raw I/O: load and save the whole tree.
//! - [`record_store::RecordStore`] implements [`DataStore`] on top of any
//!   backend: generated keys, full-record overwrites, deletes, snapshot fan-out.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: a JSON file with atomic writes, used by the CLI.
//! - [`mem_backend::MemBackend`]: in memory, with switches that simulate write
//!   failures (immediately or after N successful writes) for testing.
//!
//! Writes are never partial-field updates: `set` always replaces the entire
//! record payload. Nothing here is transactional; see the stock commands for
//! how multi-step effects report a half-applied write.
//!
//! [`local`] holds the separate local key-value storage used for the service
//! list and the view-only flag.

use crate::error::Result;
use crate::model::{Collection, Fields};
use serde_json::Value;
use std::sync::mpsc::{Receiver, TryRecvError};

pub mod backend;
pub mod fs_backend;
pub mod local;
pub mod mem_backend;
pub mod memory;
pub mod record_store;

/// Root namespace under which the four collections live.
pub const ROOT_NAMESPACE: &str = "inventario";

/// A full read of the tree at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    tree: Fields,
}

impl Snapshot {
    pub fn new(tree: Fields) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &Fields {
        &self.tree
    }

    /// Records of one collection keyed by id, in insertion order.
    /// Returns `None` when the collection is absent or not an object.
    pub fn collection(&self, collection: Collection) -> Option<&Fields> {
        self.tree
            .get(collection.path())
            .and_then(Value::as_object)
    }

    pub fn is_empty(&self) -> bool {
        Collection::ALL
            .iter()
            .all(|c| self.collection(*c).map(|m| m.is_empty()).unwrap_or(true))
    }
}

/// A live feed of snapshots. The first snapshot is delivered on attach.
///
/// Dropping the subscription cancels it; the store prunes it on its next
/// publish.
pub struct Subscription {
    rx: Receiver<Snapshot>,
}

impl Subscription {
    pub(crate) fn new(rx: Receiver<Snapshot>) -> Self {
        Self { rx }
    }

    /// Next pending snapshot, without blocking.
    pub fn try_next(&self) -> Option<Snapshot> {
        match self.rx.try_recv() {
            Ok(snapshot) => Some(snapshot),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drains every pending snapshot and returns only the newest.
    pub fn latest(&self) -> Option<Snapshot> {
        let mut newest = None;
        while let Some(snapshot) = self.try_next() {
            newest = Some(snapshot);
        }
        newest
    }
}

/// The Record Store Client contract consumed by the commands.
///
/// All methods take `&self`; implementations rely on interior mutability since
/// the ledger is single-threaded.
pub trait DataStore {
    /// Read the whole tree once.
    fn snapshot(&self) -> Result<Snapshot>;

    /// Attach to the snapshot feed. The current snapshot is queued immediately.
    fn subscribe(&self) -> Result<Subscription>;

    /// Append a record under a freshly generated key and return the key.
    fn push(&self, collection: Collection, payload: &Fields) -> Result<String>;

    /// Overwrite the record at `collection/id` with `payload`.
    fn set(&self, collection: Collection, id: &str, payload: &Fields) -> Result<()>;

    /// Delete the record at `collection/id`. Deleting a missing record is a no-op.
    fn remove(&self, collection: Collection, id: &str) -> Result<()>;

    /// Delete the whole root namespace.
    fn remove_all(&self) -> Result<()>;
}
