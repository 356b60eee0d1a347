use super::backend::TreeBackend;
use super::record_store::RecordStore;
use super::ROOT_NAMESPACE;
use crate::error::Result;
use crate::model::Fields;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const TREE_FILENAME: &str = "inventario.json";

/// The store the CLI runs against.
pub type FileStore = RecordStore<FsBackend>;

impl FileStore {
    pub fn open(root: PathBuf) -> Self {
        RecordStore::with_backend(FsBackend::new(root))
    }
}

/// Keeps the tree in a single JSON document, `{ "inventario": { ... } }`.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn tree_path(&self) -> PathBuf {
        self.root.join(TREE_FILENAME)
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }
}

impl TreeBackend for FsBackend {
    fn load_tree(&self) -> Result<Fields> {
        let path = self.tree_path();
        if !path.exists() {
            return Ok(Fields::new());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Fields::new());
        }
        let document: Value = serde_json::from_str(&content)?;
        Ok(document
            .get(ROOT_NAMESPACE)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default())
    }

    fn save_tree(&self, tree: &Fields) -> Result<()> {
        self.ensure_dir(&self.root)?;

        let mut document = Fields::new();
        document.insert(ROOT_NAMESPACE.to_string(), Value::Object(tree.clone()));
        let content = serde_json::to_string_pretty(&document)?;

        // Atomic write
        let tmp_path = self.root.join(format!(".inventario-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, self.tree_path())?;
        Ok(())
    }
}
