use crate::error::Result;
use crate::model::Fields;

/// Raw tree I/O.
/// This trait handles the "how" of storage (file vs memory), while
/// `RecordStore` handles the "what" (keys, record paths, snapshot fan-out).
pub trait TreeBackend {
    /// Load the tree below the root namespace. A missing tree is empty.
    fn load_tree(&self) -> Result<Fields>;

    /// Replace the tree below the root namespace.
    /// MUST be atomic (e.g. write to tmp then rename) to avoid partial writes.
    fn save_tree(&self, tree: &Fields) -> Result<()>;
}
