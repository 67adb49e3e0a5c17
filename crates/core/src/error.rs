//! Error types for the export stream
//!
//! Errors fall into two classes:
//!
//! | Class | Variants | Stream state afterwards |
//! |-------|----------|-------------------------|
//! | Caller | InvalidCapacity, RowTooLarge, SchemaMismatch, InvalidRollbackMark, ReleaseBeyondCommitted, TxnRegression, EpochRegression, Config | Unchanged |
//! | Fatal | Fatal | Poisoned, every later call fails |
//!
//! `Io` only surfaces while loading configuration files.

use crate::types::{Epoch, TxnId, Uso};
use thiserror::Error;

/// All export stream errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Block capacity of zero bytes
    #[error("invalid block capacity: {0} bytes")]
    InvalidCapacity(usize),

    /// A single serialized row does not fit in an empty block
    #[error("row of {row_len} bytes exceeds block capacity of {capacity} bytes")]
    RowTooLarge {
        /// Serialized row length
        row_len: usize,
        /// Configured block capacity
        capacity: usize,
    },

    /// Row column count differs from the stream's column names
    #[error("row has {actual} columns, stream schema has {expected}")]
    SchemaMismatch {
        /// Column count of the stream
        expected: usize,
        /// Column count of the rejected row
        actual: usize,
    },

    /// Rollback target not reachable from the retained undo history
    #[error("invalid rollback mark {mark}: retained history covers {floor}..={current}")]
    InvalidRollbackMark {
        /// Requested mark
        mark: Uso,
        /// Oldest reachable offset
        floor: Uso,
        /// Current offset
        current: Uso,
    },

    /// Acknowledgement beyond the data handed to the sink
    #[error("cannot release through {offset}: only {committed} bytes have been handed off")]
    ReleaseBeyondCommitted {
        /// Requested release offset
        offset: Uso,
        /// End of handed-off data
        committed: Uso,
    },

    /// Transaction id moved backwards
    #[error("transaction id {txn_id} precedes open transaction {open_txn_id}")]
    TxnRegression {
        /// Supplied transaction id
        txn_id: TxnId,
        /// Currently open transaction id
        open_txn_id: TxnId,
    },

    /// Epoch moved backwards on an explicit change
    #[error("epoch {requested} precedes active epoch {active}")]
    EpochRegression {
        /// Requested epoch
        requested: Epoch,
        /// Active epoch
        active: Epoch,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Broken internal invariant; the stream is no longer usable
    #[error("fatal export stream error: {0}")]
    Fatal(String),
}

/// Result type for export stream operations.
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Check if this error poisons the stream.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExportError::Fatal(_))
    }

    /// Check if this error was caused by invalid caller input.
    ///
    /// Caller errors never modify stream state.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, ExportError::Fatal(_) | ExportError::Io(_))
    }
}

impl From<toml::de::Error> for ExportError {
    fn from(e: toml::de::Error) -> Self {
        ExportError::Config(e.to_string())
    }
}
