//! Open stream block
//!
//! A `StreamBlock` is exclusively owned by the stream while it accepts
//! rows. Its write cursor only grows through `append` and only shrinks
//! through `truncate` during rollback.
//!
//! # Invariants
//!
//! - `offset() <= capacity()`
//! - every byte belongs to the same epoch
//! - `uso()` never changes after allocation

use crate::sealed::SealedBlock;
use exportstream_core::{Epoch, ExportError, Result, TxnId, Uso};

/// Fixed-capacity block accepting serialized rows.
#[derive(Debug)]
pub struct StreamBlock {
    /// Serialized rows
    data: Vec<u8>,
    /// Maximum bytes the block may hold
    capacity: usize,
    /// Stream offset of the first byte
    uso: Uso,
    /// Epoch of the rows, unset while empty
    epoch: Option<Epoch>,
    /// Highest transaction that wrote into the block
    max_txn_id: Option<TxnId>,
}

impl StreamBlock {
    /// Allocate an empty block starting at stream offset `uso`
    pub fn new(uso: Uso, capacity: usize) -> Self {
        StreamBlock {
            data: Vec::with_capacity(capacity),
            capacity,
            uso,
            epoch: None,
            max_txn_id: None,
        }
    }

    /// Stream offset of the first byte
    pub fn uso(&self) -> Uso {
        self.uso
    }

    /// Bytes written so far (the write cursor)
    pub fn offset(&self) -> usize {
        self.data.len()
    }

    /// Stream offset one past the last written byte
    pub fn end_uso(&self) -> Uso {
        self.uso + self.data.len() as Uso
    }

    /// Fixed capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes still available
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Check if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Epoch the block's rows belong to
    pub fn epoch(&self) -> Option<Epoch> {
        self.epoch
    }

    /// Highest transaction that wrote into the block
    pub fn max_txn_id(&self) -> Option<TxnId> {
        self.max_txn_id
    }

    /// Written bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Check if every byte belongs to a transaction at or below `watermark`
    pub fn is_committed(&self, watermark: Option<TxnId>) -> bool {
        match (self.max_txn_id, watermark) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(txn), Some(committed)) => txn <= committed,
        }
    }

    /// Append one serialized row.
    ///
    /// The first row fixes the block's epoch. Overflowing the capacity or
    /// mixing epochs means the caller broke an invariant and is fatal.
    pub fn append(&mut self, bytes: &[u8], epoch: Epoch, txn_id: TxnId) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(ExportError::Fatal(format!(
                "block at uso {} overflow: {} bytes into {} remaining",
                self.uso,
                bytes.len(),
                self.remaining()
            )));
        }
        match self.epoch {
            Some(current) if current != epoch => {
                return Err(ExportError::Fatal(format!(
                    "block at uso {} holds epoch {}, cannot append epoch {}",
                    self.uso, current, epoch
                )));
            }
            Some(_) => {}
            None => self.epoch = Some(epoch),
        }
        self.data.extend_from_slice(bytes);
        self.max_txn_id = Some(self.max_txn_id.map_or(txn_id, |t| t.max(txn_id)));
        Ok(())
    }

    /// Shrink the write cursor to `len`, restoring the transaction high-water
    /// mark the block had at that length.
    ///
    /// An emptied block forgets its epoch.
    pub fn truncate(&mut self, len: usize, max_txn_id: Option<TxnId>) -> Result<()> {
        if len > self.data.len() {
            return Err(ExportError::Fatal(format!(
                "cannot truncate block at uso {} to {} bytes, only {} written",
                self.uso,
                len,
                self.data.len()
            )));
        }
        self.data.truncate(len);
        self.max_txn_id = max_txn_id;
        if self.data.is_empty() {
            self.epoch = None;
            self.max_txn_id = None;
        }
        Ok(())
    }

    /// Finish the block, giving up mutable access to its rows
    pub fn seal(self) -> SealedBlock {
        SealedBlock::new(self.data, self.capacity, self.uso, self.epoch)
    }
}
