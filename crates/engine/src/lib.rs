//! Export stream engine
//!
//! This crate ties the block and undo layers into the per-partition
//! export stream:
//! - ExportStream: append, flush, rollback and epoch changes
//! - ExportSink: the downstream consumer contract
//! - HandoffLedger: bytes handed off but not yet acknowledged
//! - RecordingSink: in-memory sink for embedding and tests
//!
//! # Architecture
//!
//! ```text
//! append() ──► open StreamBlock ──(capacity / epoch)──► pending queue
//!                                                          │
//! flush(watermark) ── finalize committed open block ───────┤
//!                                                          ▼
//!                                   drain committed prefix ──► ExportSink
//! ```
//!
//! One `ExportStream` exists per partition and is driven by a single
//! thread; it holds no locks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ledger;
pub mod sink;
pub mod stream;

pub use ledger::HandoffLedger;
pub use sink::{BlockPush, ExportSink, ReceivedPush, RecordingSink};
pub use stream::ExportStream;
