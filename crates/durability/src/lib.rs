//! Undo layer for the export stream
//!
//! This crate implements the undo log that makes appends reversible:
//! - UndoRecord types: Write (row bytes) and Boundary (block roll-over)
//! - Reachability checks for rollback marks
//! - Trimming once data has been handed to the sink
//!
//! Rolling back is a pop loop over the log; each popped record carries
//! enough state to restore the stream exactly as it was before the
//! corresponding mutation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod undo;

pub use undo::{BoundaryCause, EpochEndPlacement, EpochEndUndo, UndoLog, UndoRecord};
