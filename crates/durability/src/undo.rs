//! Undo log records
//!
//! This module defines the reversible mutations the stream performs:
//! - Write: serialized row bytes appended to the open block
//! - Boundary: the open block was sealed (or discarded when empty) and a
//!   fresh block allocated, possibly materializing an end-of-epoch
//!
//! Records are stacked in the order the mutations happened, so their
//! stream offsets are non-decreasing from bottom to top. A boundary and
//! the write that triggered it share the same offset, boundary first.
//!
//! ## Rollback
//!
//! ```text
//! rollback_to(mark):
//!   1. can_reach(mark)      - reject without touching anything
//!   2. while pop_past(mark) - undo the record on top
//!   3. bytes_used == mark
//! ```
//!
//! ## Trimming
//!
//! Once bytes up to some offset have been handed to the sink they can no
//! longer be rolled back, so `trim_through` drops the records that cover
//! them.

use exportstream_core::{Epoch, EpochEnd, TxnId, Uso};

/// Why the open block was rolled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryCause {
    /// The next row did not fit
    Capacity,
    /// A row carried a newer epoch than the active one
    EpochDrift,
    /// An explicit epoch change materialized on append
    EpochChange,
    /// An explicit epoch change materialized on flush
    Flush,
}

impl BoundaryCause {
    /// Check if the boundary was scheduled by an explicit epoch change.
    ///
    /// Undoing such a boundary re-arms the pending epoch change.
    pub fn is_explicit(self) -> bool {
        matches!(self, BoundaryCause::EpochChange | BoundaryCause::Flush)
    }
}

/// Where an end-of-epoch notification was attached when it materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochEndPlacement {
    /// On the block sealed by this boundary
    SealedBlock,
    /// On the newest block already waiting in the pending queue
    PendingBlock,
    /// As a block-less notification at the back of the pending queue
    Standalone,
}

/// End-of-epoch state needed to undo a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochEndUndo {
    /// The epoch that ended
    pub marker: EpochEnd,
    /// Where the notification was attached
    pub placement: EpochEndPlacement,
}

/// One reversible stream mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoRecord {
    /// Row bytes appended to the open block
    Write {
        /// Stream offset of the row's first byte
        uso: Uso,
        /// Serialized row length
        len: usize,
        /// Open transaction before the append
        prev_open_txn_id: Option<TxnId>,
        /// Block transaction high-water mark before the append
        prev_block_max_txn_id: Option<TxnId>,
    },

    /// Open block rolled over
    Boundary {
        /// Stream offset where the new block starts
        uso: Uso,
        /// What triggered the roll-over
        cause: BoundaryCause,
        /// True if the old block was moved to the pending queue, false if
        /// it was empty and discarded
        sealed: bool,
        /// Capacity of the block open before the boundary, `None` if there
        /// was none
        prev_capacity: Option<usize>,
        /// Active epoch before the boundary
        prev_epoch: Epoch,
        /// Active epoch after the boundary
        next_epoch: Epoch,
        /// End-of-epoch materialized by the boundary
        epoch_end: Option<EpochEndUndo>,
    },
}

impl UndoRecord {
    /// Stream offset of the record
    pub fn uso(&self) -> Uso {
        match self {
            UndoRecord::Write { uso, .. } | UndoRecord::Boundary { uso, .. } => *uso,
        }
    }

    /// Check if this record is a block boundary
    pub fn is_boundary(&self) -> bool {
        matches!(self, UndoRecord::Boundary { .. })
    }

    /// Check if undoing to `mark` must pop this record.
    ///
    /// Anything recorded past the mark goes. At the mark itself, writes and
    /// append-time boundaries were necessarily recorded after the mark was
    /// taken; a flush-time boundary may predate it and is kept.
    fn lies_past(&self, mark: Uso) -> bool {
        match self {
            UndoRecord::Boundary {
                uso,
                cause: BoundaryCause::Flush,
                ..
            } => *uso > mark,
            other => other.uso() >= mark,
        }
    }
}

/// Stack of undo records.
#[derive(Debug, Default)]
pub struct UndoLog {
    records: Vec<UndoRecord>,
}

impl UndoLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no records are retained
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Retained records, oldest first
    pub fn records(&self) -> &[UndoRecord] {
        &self.records
    }

    /// Push a record
    pub fn push(&mut self, record: UndoRecord) {
        debug_assert!(self
            .records
            .last()
            .map_or(true, |top| top.uso() <= record.uso()));
        self.records.push(record);
    }

    /// Oldest offset reachable by rollback when the stream is at `current`
    pub fn floor(&self, current: Uso) -> Uso {
        self.records.first().map_or(current, UndoRecord::uso)
    }

    /// Check if `mark` is a row boundary inside the retained history.
    ///
    /// The current offset is always reachable.
    pub fn can_reach(&self, mark: Uso, current: Uso) -> bool {
        if mark == current {
            return true;
        }
        mark < current
            && self
                .records
                .iter()
                .any(|r| matches!(r, UndoRecord::Write { uso, .. } if *uso == mark))
    }

    /// Pop the top record if it must be undone to reach `mark`
    pub fn pop_past(&mut self, mark: Uso) -> Option<UndoRecord> {
        if self.records.last()?.lies_past(mark) {
            let record = self.records.pop();
            if let Some(r) = &record {
                tracing::trace!(uso = r.uso(), boundary = r.is_boundary(), "undo record popped");
            }
            record
        } else {
            None
        }
    }

    /// Drop records covering bytes before `handed_off`, plus boundaries
    /// sealing a block that ends exactly there.
    ///
    /// Returns the number of records dropped.
    pub fn trim_through(&mut self, handed_off: Uso) -> usize {
        let keep_from = self
            .records
            .iter()
            .position(|r| match r {
                UndoRecord::Write { uso, .. } => *uso >= handed_off,
                UndoRecord::Boundary { uso, .. } => *uso > handed_off,
            })
            .unwrap_or(self.records.len());
        self.records.drain(..keep_from);
        keep_from
    }
}
