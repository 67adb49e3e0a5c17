//! # Exportstream
//!
//! Transactional export-stream buffer manager.
//!
//! Rows appended by a partition's execution thread are serialized into
//! fixed-capacity blocks addressed by a cumulative stream offset (USO).
//! Blocks are handed to a downstream sink only once every row in them
//! belongs to a committed transaction, and anything not yet handed off can
//! be rolled back exactly.
//!
//! ## Quick Start
//!
//! ```ignore
//! use exportstream::prelude::*;
//!
//! let names = vec!["ID".to_string(), "AMOUNT".to_string()];
//! let config = StreamConfig::new(3, 1, "orders", names);
//! let mut stream = ExportStream::new(config, RecordingSink::new())?;
//!
//! let row = [ColumnValue::Integer(1), ColumnValue::Integer(250)];
//! let mark = stream.mark();
//! stream.append(RowHeader::insert(0, 1, 3, 1, 0), &row)?;
//! stream.rollback_to(mark)?;
//!
//! stream.append(RowHeader::insert(0, 2, 3, 1, 0), &row)?;
//! stream.flush(-1, 2, 2)?;
//! ```
//!
//! ## Crates
//!
//! - `exportstream-core` - identifiers, errors, row codec, configuration
//! - `exportstream-storage` - open and sealed blocks
//! - `exportstream-durability` - undo log
//! - `exportstream-engine` - the stream, sink contract, hand-off ledger

#![warn(missing_docs)]

pub mod prelude;

pub use exportstream_core::*;
pub use exportstream_durability::{BoundaryCause, UndoLog, UndoRecord};
pub use exportstream_engine::{
    BlockPush, ExportSink, ExportStream, HandoffLedger, ReceivedPush, RecordingSink,
};
pub use exportstream_storage::{SealedBlock, StreamBlock};
