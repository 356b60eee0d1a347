use super::backend::TreeBackend;
use crate::error::{LedgerError, Result};
use crate::model::Fields;
use std::cell::{Cell, RefCell};

/// In-memory tree backend for testing.
///
/// Uses `RefCell`/`Cell` for interior mutability since the ledger is
/// single-threaded, so `TreeBackend` can take `&self` everywhere.
#[derive(Default)]
pub struct MemBackend {
    tree: RefCell<Fields>,
    simulate_write_error: Cell<bool>,
    fail_after: Cell<Option<usize>>,
    saves: Cell<usize>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing tree, e.g. one parsed from a JSON fixture.
    pub fn with_tree(tree: Fields) -> Self {
        Self {
            tree: RefCell::new(tree),
            ..Default::default()
        }
    }

    /// Make every subsequent save fail.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.set(simulate);
    }

    /// Allow `successes` more saves, then fail every save after that.
    pub fn fail_after(&self, successes: usize) {
        self.fail_after.set(Some(self.saves.get() + successes));
    }

    /// Number of saves that went through.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl TreeBackend for MemBackend {
    fn load_tree(&self) -> Result<Fields> {
        Ok(self.tree.borrow().clone())
    }

    fn save_tree(&self, tree: &Fields) -> Result<()> {
        if self.simulate_write_error.get() {
            return Err(LedgerError::RemoteWrite("Simulated write error".to_string()));
        }
        if let Some(limit) = self.fail_after.get() {
            if self.saves.get() >= limit {
                return Err(LedgerError::RemoteWrite("Simulated write error".to_string()));
            }
        }
        *self.tree.borrow_mut() = tree.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
