//! Hand-off ledger
//!
//! Tracks blocks that were handed to the sink but not yet acknowledged.
//! The sink acknowledges by stream offset; a block's bytes stop counting
//! as outstanding once the acknowledged offset reaches the block's end.

use exportstream_core::{ExportError, Result, Uso};
use std::collections::VecDeque;

/// Accounting of handed-off, unacknowledged bytes.
#[derive(Debug, Default)]
pub struct HandoffLedger {
    /// (uso, len) of each unacknowledged block
    extents: VecDeque<(Uso, usize)>,
    /// Stream offset one past the last handed-off byte
    handed_end: Uso,
    /// Highest acknowledged stream offset
    released: Uso,
}

impl HandoffLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream offset one past the last handed-off byte
    pub fn handed_end(&self) -> Uso {
        self.handed_end
    }

    /// Highest acknowledged stream offset
    pub fn released(&self) -> Uso {
        self.released
    }

    /// Bytes handed off and not yet acknowledged
    pub fn outstanding(&self) -> usize {
        self.extents.iter().map(|(_, len)| len).sum()
    }

    /// Number of unacknowledged blocks
    pub fn unacked_blocks(&self) -> usize {
        self.extents.len()
    }

    /// Record a hand-off.
    ///
    /// Blocks must be handed off contiguously; a gap or overlap is an offset
    /// arithmetic bug and fatal.
    pub fn record(&mut self, uso: Uso, len: usize) -> Result<()> {
        if uso != self.handed_end {
            return Err(ExportError::Fatal(format!(
                "non-contiguous hand-off: block at uso {} follows data ending at {}",
                uso, self.handed_end
            )));
        }
        self.extents.push_back((uso, len));
        self.handed_end = uso + len as Uso;
        Ok(())
    }

    /// Acknowledge consumption through stream offset `offset`.
    ///
    /// Returns the bytes freed. Offsets at or before the previous release are
    /// ignored.
    pub fn release(&mut self, offset: Uso) -> Result<usize> {
        if offset > self.handed_end {
            return Err(ExportError::ReleaseBeyondCommitted {
                offset,
                committed: self.handed_end,
            });
        }
        if offset <= self.released {
            return Ok(0);
        }
        self.released = offset;

        let mut freed = 0;
        while let Some(&(uso, len)) = self.extents.front() {
            if uso + len as Uso > offset {
                break;
            }
            self.extents.pop_front();
            freed += len;
        }
        Ok(freed)
    }
}
