use crate::model::Collection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    #[error("{0}")]
    Validation(String),

    #[error("Verification failed: date or word does not match")]
    VerificationMismatch,

    /// A multi-step write stopped half way. Steps listed in `completed` are
    /// persisted and were not rolled back.
    #[error("Partial write: {failed_step} failed after [{}] ({reason})", completed.join(", "))]
    PartialWrite {
        completed: Vec<String>,
        failed_step: String,
        reason: String,
    },

    #[error("Ledger is in view-only mode")]
    ReadOnly,

    #[error("Another write is still in progress")]
    Busy,

    #[error("No record {id} in {collection}")]
    NotFound { collection: Collection, id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
