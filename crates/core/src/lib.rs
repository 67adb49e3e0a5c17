//! Core types for the export stream
//!
//! This crate defines the foundational pieces shared by every layer:
//! - Identifier types: TxnId, Epoch, Uso, PartitionId, SiteId
//! - ExportError: the error type returned by all stream operations
//! - Row codec: the bit-exact export row wire format
//! - StreamConfig: per-partition stream configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod row;
pub mod types;

pub use config::StreamConfig;
pub use error::{ExportError, Result};
pub use row::{
    encode_row, encoded_len, null_mask_len, ColumnValue, MutationKind, RowHeader, RowReader,
    RowView, METADATA_COLUMN_COUNT, ROW_HEADER_SIZE,
};
pub use types::{Epoch, EpochEnd, PartitionId, SiteId, TxnId, Uso};
