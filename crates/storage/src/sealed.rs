//! Sealed blocks handed to the sink
//!
//! Sealing moves a block's bytes out of the stream. The stream keeps no
//! handle to a sealed block; the sink owns it and is the only party that
//! advances its release cursor.

use exportstream_core::{Epoch, ExportError, Result, RowReader, Uso};

/// A finished, read-only block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlock {
    data: Vec<u8>,
    capacity: usize,
    uso: Uso,
    epoch: Option<Epoch>,
    release_offset: usize,
}

impl SealedBlock {
    pub(crate) fn new(data: Vec<u8>, capacity: usize, uso: Uso, epoch: Option<Epoch>) -> Self {
        SealedBlock {
            data,
            capacity,
            uso,
            epoch,
            release_offset: 0,
        }
    }

    /// Stream offset of the first byte
    pub fn uso(&self) -> Uso {
        self.uso
    }

    /// Bytes written into the block
    pub fn offset(&self) -> usize {
        self.data.len()
    }

    /// Stream offset one past the last byte
    pub fn end_uso(&self) -> Uso {
        self.uso + self.data.len() as Uso
    }

    /// Capacity the block was allocated with
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Epoch of the block's rows
    pub fn epoch(&self) -> Option<Epoch> {
        self.epoch
    }

    /// Serialized rows
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Iterate the block's rows
    pub fn rows(&self, column_count: usize) -> RowReader<'_> {
        RowReader::new(&self.data, column_count)
    }

    /// Bytes the sink has consumed
    pub fn release_offset(&self) -> usize {
        self.release_offset
    }

    /// Bytes not yet consumed
    pub fn unreleased(&self) -> &[u8] {
        &self.data[self.release_offset..]
    }

    /// Advance the release cursor to `offset` bytes into the block.
    ///
    /// Offsets at or before the current cursor are ignored.
    pub fn release(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(ExportError::ReleaseBeyondCommitted {
                offset: self.uso + offset as Uso,
                committed: self.end_uso(),
            });
        }
        self.release_offset = self.release_offset.max(offset);
        Ok(())
    }
}
