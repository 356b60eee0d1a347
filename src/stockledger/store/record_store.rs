use super::backend::TreeBackend;
use super::{DataStore, Snapshot, Subscription};
use crate::error::{LedgerError, Result};
use crate::model::{Collection, Fields};
use serde_json::Value;
use std::cell::RefCell;
use std::sync::mpsc::{self, Sender};
use tracing::debug;
use uuid::Uuid;

pub struct RecordStore<B: TreeBackend> {
    /// The underlying tree backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
    pub(crate) subscribers: RefCell<Vec<Sender<Snapshot>>>,
}

impl<B: TreeBackend> RecordStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load, edit and save the tree, then notify subscribers.
    /// Backend failures surface as `RemoteWrite`.
    fn commit<T>(&self, edit: impl FnOnce(&mut Fields) -> T) -> Result<T> {
        let mut tree = self.backend.load_tree().map_err(as_remote_failure)?;
        let out = edit(&mut tree);
        self.backend.save_tree(&tree).map_err(as_remote_failure)?;
        self.publish(Snapshot::new(tree));
        Ok(out)
    }

    fn publish(&self, snapshot: Snapshot) {
        let mut subscribers = self.subscribers.borrow_mut();
        // Cancelled subscriptions have dropped their receiver
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        debug!(subscribers = subscribers.len(), "published snapshot");
    }
}

fn as_remote_failure(err: LedgerError) -> LedgerError {
    match err {
        LedgerError::RemoteWrite(_) => err,
        other => LedgerError::RemoteWrite(other.to_string()),
    }
}

fn collection_mut<'a>(tree: &'a mut Fields, collection: Collection) -> &'a mut Fields {
    let slot = tree
        .entry(collection.path().to_string())
        .or_insert_with(|| Value::Object(Fields::new()));
    if !slot.is_object() {
        *slot = Value::Object(Fields::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("collection slot was just replaced by an object"),
    }
}

/// Generated keys are unique per store; ordering comes from insertion.
fn generate_key() -> String {
    Uuid::new_v4().simple().to_string()
}

impl<B: TreeBackend> DataStore for RecordStore<B> {
    fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::new(self.backend.load_tree()?))
    }

    fn subscribe(&self) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel();
        let initial = self.snapshot()?;
        // The receiver is alive, so this cannot fail
        let _ = tx.send(initial);
        self.subscribers.borrow_mut().push(tx);
        Ok(Subscription::new(rx))
    }

    fn push(&self, collection: Collection, payload: &Fields) -> Result<String> {
        let key = generate_key();
        self.commit(|tree| {
            collection_mut(tree, collection).insert(key.clone(), Value::Object(payload.clone()));
        })?;
        debug!(%collection, id = %key, "pushed record");
        Ok(key)
    }

    fn set(&self, collection: Collection, id: &str, payload: &Fields) -> Result<()> {
        self.commit(|tree| {
            collection_mut(tree, collection).insert(id.to_string(), Value::Object(payload.clone()));
        })?;
        debug!(%collection, id, "set record");
        Ok(())
    }

    fn remove(&self, collection: Collection, id: &str) -> Result<()> {
        self.commit(|tree| {
            if let Some(Value::Object(records)) = tree.get_mut(collection.path()) {
                records.shift_remove(id);
            }
        })?;
        debug!(%collection, id, "removed record");
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        self.commit(|tree| tree.clear())?;
        debug!("removed all records");
        Ok(())
    }
}
