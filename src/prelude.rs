//! Convenient imports for Exportstream.
//!
//! ```ignore
//! use exportstream::prelude::*;
//!
//! let mut stream = ExportStream::new(config, RecordingSink::new())?;
//! ```

// Main entry point
pub use exportstream_engine::ExportStream;

// Sink contract
pub use exportstream_engine::{BlockPush, ExportSink, RecordingSink};

// Error handling
pub use exportstream_core::{ExportError, Result};

// Rows and configuration
pub use exportstream_core::{ColumnValue, MutationKind, RowHeader, StreamConfig};

// Identifiers
pub use exportstream_core::{Epoch, PartitionId, SiteId, TxnId, Uso};

// Blocks
pub use exportstream_storage::SealedBlock;
