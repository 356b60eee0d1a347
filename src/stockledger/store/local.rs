//! Local key-value storage for data that never reaches the remote tree: the
//! recurring-service list and the view-only flag. Values are strings, read at
//! startup and rewritten after every mutation.

use crate::error::{LedgerError, Result};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

pub const SERVICES_KEY: &str = "inventario_services";
pub const VIEW_ONLY_KEY: &str = "isTestUser";
pub const LOCAL_FILENAME: &str = "local.json";

pub trait LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemLocal {
    items: RefCell<BTreeMap<String, String>>,
    simulate_write_error: Cell<bool>,
}

impl MemLocal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.set(simulate);
    }
}

impl LocalStorage for MemLocal {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error.get() {
            return Err(LedgerError::Io(std::io::Error::other(
                "Simulated local write error",
            )));
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// All items in one JSON object on disk (`local.json`).
pub struct FileLocal {
    root: PathBuf,
}

impl FileLocal {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path(&self) -> PathBuf {
        self.root.join(LOCAL_FILENAME)
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let path = self.path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        let content = serde_json::to_string_pretty(items)?;
        let tmp_path = self.root.join(format!(".local-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, self.path())?;
        Ok(())
    }
}

impl LocalStorage for FileLocal {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.save(&items)?;
        }
        Ok(())
    }
}

/// Reads the view-only flag; anything but `"true"` means editable.
pub fn is_view_only<L: LocalStorage>(local: &L) -> Result<bool> {
    Ok(local.get_item(VIEW_ONLY_KEY)?.as_deref() == Some("true"))
}

pub fn set_view_only<L: LocalStorage>(local: &L, view_only: bool) -> Result<()> {
    if view_only {
        local.set_item(VIEW_ONLY_KEY, "true")
    } else {
        local.remove_item(VIEW_ONLY_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_local_round_trips_items() {
        let dir = tempfile::tempdir().unwrap();
        let local = FileLocal::new(dir.path().to_path_buf());
        assert_eq!(local.get_item("k").unwrap(), None);

        local.set_item("k", "v").unwrap();
        let reopened = FileLocal::new(dir.path().to_path_buf());
        assert_eq!(reopened.get_item("k").unwrap().as_deref(), Some("v"));

        reopened.remove_item("k").unwrap();
        assert_eq!(local.get_item("k").unwrap(), None);
    }

    #[test]
    fn view_only_flag_defaults_to_editable() {
        let local = MemLocal::new();
        assert!(!is_view_only(&local).unwrap());

        set_view_only(&local, true).unwrap();
        assert!(is_view_only(&local).unwrap());

        set_view_only(&local, false).unwrap();
        assert!(!is_view_only(&local).unwrap());
    }

    #[test]
    fn view_only_flag_requires_exact_true() {
        let local = MemLocal::new();
        local.set_item(VIEW_ONLY_KEY, "yes").unwrap();
        assert!(!is_view_only(&local).unwrap());
    }
}
