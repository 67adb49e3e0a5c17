//! Per-partition export stream
//!
//! `ExportStream` turns appended rows into a totally ordered sequence of
//! blocks and hands each block to the sink once every byte in it belongs
//! to a committed transaction.
//!
//! ## Block boundaries
//!
//! The open block is rolled over (sealed into the pending queue, or
//! discarded when empty) when:
//!
//! | Trigger | Where | End-of-epoch reported |
//! |---------|-------|-----------------------|
//! | Next row does not fit | append | No |
//! | Row carries a newer epoch than the active one | append | Yes, for the active epoch |
//! | Explicit `set_epoch` pending | next append or flush | Yes, for the epoch being replaced |
//! | Open block fully committed | flush | No |
//!
//! An explicit `set_epoch` always wins over a same-turn row epoch. Row
//! epochs at or below the active epoch are attributed to the active epoch.
//!
//! ## Commit gating
//!
//! Only `flush` advances the commit watermark and hands blocks to the sink.
//! Pending blocks drain strictly in stream offset order; the first block
//! holding an uncommitted transaction stops the drain.
//!
//! ## Rollback
//!
//! Every append pushes undo records (see `exportstream_durability`).
//! `rollback_to(mark)` pops them until `bytes_used() == mark`, re-opening
//! sealed blocks and re-arming epoch changes as needed. Records covering
//! handed-off bytes are trimmed after each flush.

use crate::ledger::HandoffLedger;
use crate::sink::{BlockPush, ExportSink};
use exportstream_core::{
    encode_row, encoded_len, ColumnValue, Epoch, EpochEnd, ExportError, PartitionId, Result,
    RowHeader, StreamConfig, TxnId, Uso,
};
use exportstream_durability::{BoundaryCause, EpochEndPlacement, EpochEndUndo, UndoLog, UndoRecord};
use exportstream_storage::StreamBlock;
use std::collections::VecDeque;
use tracing::{debug, error, trace, warn};

/// Entry in the pending queue.
#[derive(Debug)]
enum Pending {
    /// Finalized block waiting for its transactions to commit
    Block {
        block: StreamBlock,
        signature: String,
        end_of_epoch: bool,
    },
    /// Epoch that ended with no block left to carry the notification
    EpochEnd(EpochEnd),
}

/// Export stream of one partition.
///
/// # Example
///
/// ```ignore
/// let config = StreamConfig::new(1, 1, "orders", names).with_block_capacity(1024);
/// let mut stream = ExportStream::new(config, RecordingSink::new())?;
///
/// let mark = stream.mark();
/// stream.append(RowHeader::insert(0, 1, 1, 1, 0), &row)?;
/// stream.rollback_to(mark)?;
///
/// stream.append(RowHeader::insert(0, 2, 1, 1, 0), &row)?;
/// stream.flush(-1, 2, 2)?;
/// ```
pub struct ExportStream<S: ExportSink> {
    config: StreamConfig,
    sink: S,

    /// Capacity of blocks allocated from now on
    capacity: usize,
    /// Block accepting appends
    open: Option<StreamBlock>,
    /// Finalized entries not yet handed off, in stream offset order
    pending: VecDeque<Pending>,
    /// Handed-off, unacknowledged bytes
    ledger: HandoffLedger,
    /// Cumulative bytes appended
    bytes_used: Uso,

    /// Authoritative commit watermark, advanced by flush
    last_committed_txn_id: Option<TxnId>,
    /// Highest prior-committed id seen on append
    committed_hint: Option<TxnId>,
    /// Last transaction that appended or was reported open
    open_txn_id: Option<TxnId>,

    active_epoch: Epoch,
    active_signature: String,
    /// Epoch change waiting for the next append or flush
    pending_epoch_end: Option<EpochEnd>,

    undo: UndoLog,
    /// Time hint of the last timed flush
    last_flush_ms: i64,
    /// Reused row serialization buffer
    scratch: Vec<u8>,
    poisoned: bool,
}

impl<S: ExportSink> ExportStream<S> {
    /// Create the stream of one partition.
    ///
    /// # Arguments
    /// * `config` - Partition, schema, initial epoch/signature and capacity
    /// * `sink` - Consumer of finalized blocks
    pub fn new(config: StreamConfig, sink: S) -> Result<Self> {
        config.validate()?;
        debug!(
            partition_id = config.partition_id,
            signature = %config.signature,
            epoch = config.initial_epoch,
            capacity = config.block_capacity,
            "export stream created"
        );
        Ok(ExportStream {
            capacity: config.block_capacity,
            active_epoch: config.initial_epoch,
            active_signature: config.signature.clone(),
            config,
            sink,
            open: None,
            pending: VecDeque::new(),
            ledger: HandoffLedger::new(),
            bytes_used: 0,
            last_committed_txn_id: None,
            committed_hint: None,
            open_txn_id: None,
            pending_epoch_end: None,
            undo: UndoLog::new(),
            last_flush_ms: 0,
            scratch: Vec::new(),
            poisoned: false,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Cumulative stream offset; usable as a rollback mark
    pub fn bytes_used(&self) -> Uso {
        self.bytes_used
    }

    /// Snapshot the current offset for a later `rollback_to`
    pub fn mark(&self) -> Uso {
        self.bytes_used
    }

    /// Bytes held in the open block, the pending queue and handed-off blocks
    /// the sink has not acknowledged
    pub fn outstanding_bytes(&self) -> usize {
        let open = self.open.as_ref().map_or(0, StreamBlock::offset);
        let pending: usize = self
            .pending
            .iter()
            .map(|p| match p {
                Pending::Block { block, .. } => block.offset(),
                Pending::EpochEnd(_) => 0,
            })
            .sum();
        open + pending + self.ledger.outstanding()
    }

    /// Capacity of blocks allocated from now on
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Partition of the stream
    pub fn partition_id(&self) -> PartitionId {
        self.config.partition_id
    }

    /// Column names of the stream
    pub fn column_names(&self) -> &[String] {
        &self.config.column_names
    }

    /// Active epoch
    pub fn active_epoch(&self) -> Epoch {
        self.active_epoch
    }

    /// Active signature
    pub fn active_signature(&self) -> &str {
        &self.active_signature
    }

    /// Commit watermark established by flush
    pub fn last_committed_txn_id(&self) -> Option<TxnId> {
        self.last_committed_txn_id
    }

    /// Highest prior-committed id observed on append
    pub fn committed_hint(&self) -> Option<TxnId> {
        self.committed_hint
    }

    /// Open transaction
    pub fn open_txn_id(&self) -> Option<TxnId> {
        self.open_txn_id
    }

    /// Block currently accepting appends
    pub fn open_block(&self) -> Option<&StreamBlock> {
        self.open.as_ref()
    }

    /// Number of finalized blocks waiting for hand-off
    pub fn pending_blocks(&self) -> usize {
        self.pending
            .iter()
            .filter(|p| matches!(p, Pending::Block { .. }))
            .count()
    }

    /// Check if an explicit epoch change has not materialized yet
    pub fn has_pending_epoch_change(&self) -> bool {
        self.pending_epoch_end.is_some()
    }

    /// Stream offset one past the last handed-off byte
    pub fn handed_off_uso(&self) -> Uso {
        self.ledger.handed_end()
    }

    /// Highest acknowledged stream offset
    pub fn released_uso(&self) -> Uso {
        self.ledger.released()
    }

    /// Retained undo records
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Check if the stream hit a fatal error
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// The sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The sink, mutably
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the stream, returning the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Set the capacity of blocks allocated after this call.
    ///
    /// The open block keeps its capacity.
    pub fn configure_capacity(&mut self, bytes: usize) -> Result<()> {
        self.check_poisoned()?;
        if bytes == 0 {
            return Err(ExportError::InvalidCapacity(bytes));
        }
        debug!(partition_id = self.config.partition_id, capacity = bytes, "block capacity changed");
        self.capacity = bytes;
        Ok(())
    }

    /// Append one row.
    ///
    /// Returns the stream offset of the row's first byte. Never calls the
    /// sink; blocks finalized here wait in the pending queue for `flush`.
    ///
    /// # Errors
    /// - `SchemaMismatch` if the row's column count differs from the stream's
    /// - `TxnRegression` if `header.txn_id` precedes the open transaction
    /// - `RowTooLarge` if the row cannot fit in an empty block
    ///
    /// None of these modify the stream.
    pub fn append(&mut self, header: RowHeader, row: &[ColumnValue]) -> Result<Uso> {
        self.check_poisoned()?;

        if row.len() != self.config.column_names.len() {
            return Err(ExportError::SchemaMismatch {
                expected: self.config.column_names.len(),
                actual: row.len(),
            });
        }
        if let Some(open_txn_id) = self.open_txn_id {
            if header.txn_id < open_txn_id {
                return Err(ExportError::TxnRegression {
                    txn_id: header.txn_id,
                    open_txn_id,
                });
            }
        }
        let row_len = encoded_len(row);
        if row_len > self.capacity {
            return Err(ExportError::RowTooLarge {
                row_len,
                capacity: self.capacity,
            });
        }

        self.scratch.clear();
        let written = encode_row(&header, row, &mut self.scratch)?;
        if written != row_len {
            return Err(self.fail(format!(
                "row serialized to {} bytes, expected {}",
                written, row_len
            )));
        }

        // Explicit change first, then drift, then capacity
        let cause = if self.pending_epoch_end.is_some() {
            Some(BoundaryCause::EpochChange)
        } else if header.epoch > self.active_epoch {
            Some(BoundaryCause::EpochDrift)
        } else {
            match &self.open {
                Some(block) if block.remaining() < row_len => Some(BoundaryCause::Capacity),
                _ => None,
            }
        };
        match cause {
            Some(cause) => {
                let record = self.roll_block(cause, header.epoch)?;
                self.undo.push(record);
            }
            None if self.open.is_none() => {
                self.open = Some(StreamBlock::new(self.bytes_used, self.capacity));
            }
            None => {}
        }

        let uso = self.bytes_used;
        let epoch = self.active_epoch;
        let prev_open_txn_id = self.open_txn_id;
        let (end_uso, prev_block_max_txn_id, appended) = match self.open.as_mut() {
            Some(block) => {
                let end_uso = block.end_uso();
                let prev = block.max_txn_id();
                let appended = if end_uso == uso {
                    block.append(&self.scratch, epoch, header.txn_id)
                } else {
                    Ok(())
                };
                (Some(end_uso), prev, appended)
            }
            None => (None, None, Ok(())),
        };
        match end_uso {
            None => return Err(self.fail("no open block after allocation")),
            Some(end) if end != uso => {
                return Err(self.fail(format!(
                    "open block ends at uso {} but stream is at {}",
                    end, uso
                )));
            }
            Some(_) => {}
        }
        if let Err(e) = appended {
            return Err(self.fail(fatal_message(e)));
        }

        self.undo.push(UndoRecord::Write {
            uso,
            len: row_len,
            prev_open_txn_id,
            prev_block_max_txn_id,
        });
        self.bytes_used += row_len as Uso;
        self.open_txn_id = Some(header.txn_id);
        self.committed_hint = self.committed_hint.max(Some(header.prior_committed_txn_id));

        trace!(
            partition_id = self.config.partition_id,
            uso,
            len = row_len,
            txn_id = header.txn_id,
            epoch,
            "row appended"
        );
        Ok(uso)
    }

    /// Change the stream's epoch and signature.
    ///
    /// The change takes effect immediately for new rows. The boundary it
    /// forces materializes on the next append or flush, which ends the
    /// current block under the old epoch and reports end-of-epoch to the
    /// sink. With nothing buffered at all the sink is notified right away.
    ///
    /// Re-applying the active epoch and signature is a no-op.
    pub fn set_epoch(&mut self, signature: impl Into<String>, epoch: Epoch) -> Result<()> {
        self.check_poisoned()?;
        let signature = signature.into();

        if epoch < self.active_epoch {
            return Err(ExportError::EpochRegression {
                requested: epoch,
                active: self.active_epoch,
            });
        }
        if epoch == self.active_epoch && signature == self.active_signature {
            return Ok(());
        }

        let ending = EpochEnd::new(
            self.active_epoch,
            std::mem::replace(&mut self.active_signature, signature),
        );
        self.active_epoch = epoch;
        debug!(
            partition_id = self.config.partition_id,
            from = ending.epoch,
            to = epoch,
            signature = %self.active_signature,
            "epoch change requested"
        );

        if self.pending_epoch_end.is_some() {
            // The earlier change has not materialized; no rows were written
            // under the intermediate epoch.
            return Ok(());
        }

        let buffered =
            self.open.as_ref().map_or(false, |b| !b.is_empty()) || !self.pending.is_empty();
        if buffered {
            self.pending_epoch_end = Some(ending);
        } else {
            debug!(
                partition_id = self.config.partition_id,
                epoch = ending.epoch,
                "empty epoch ended"
            );
            self.sink.push_block(BlockPush {
                epoch: ending.epoch,
                partition_id: self.config.partition_id,
                signature: &ending.signature,
                column_names: &self.config.column_names,
                block: None,
                sync: false,
                end_of_epoch: true,
            });
        }
        Ok(())
    }

    /// Roll back to an offset previously returned by `mark`/`bytes_used`.
    ///
    /// Fails without modifying anything if the mark is not a row boundary
    /// inside the retained undo history. No data reaches the sink.
    pub fn rollback_to(&mut self, mark: Uso) -> Result<()> {
        self.check_poisoned()?;

        if !self.undo.can_reach(mark, self.bytes_used) {
            let floor = self.undo.floor(self.bytes_used);
            warn!(
                partition_id = self.config.partition_id,
                mark,
                floor,
                current = self.bytes_used,
                "rollback mark not reachable"
            );
            return Err(ExportError::InvalidRollbackMark {
                mark,
                floor,
                current: self.bytes_used,
            });
        }

        let from = self.bytes_used;
        while let Some(record) = self.undo.pop_past(mark) {
            self.undo_record(record)?;
        }
        if self.bytes_used != mark {
            return Err(self.fail(format!(
                "rollback to {} stopped at {}",
                mark, self.bytes_used
            )));
        }

        debug!(
            partition_id = self.config.partition_id,
            from,
            to = mark,
            "rolled back"
        );
        Ok(())
    }

    /// Advance the commit watermark and hand committed blocks to the sink.
    ///
    /// # Arguments
    /// * `time_hint` - Milliseconds; negative forces the flush and marks the
    ///   hand-offs `sync`
    /// * `last_committed_txn_id` - Highest committed transaction
    /// * `current_open_txn_id` - Transaction currently open
    ///
    /// The open block is finalized when every byte in it is committed. A
    /// block still holding an open transaction is left untouched.
    pub fn flush(
        &mut self,
        time_hint: i64,
        last_committed_txn_id: TxnId,
        current_open_txn_id: TxnId,
    ) -> Result<()> {
        self.check_poisoned()?;

        if self
            .last_committed_txn_id
            .map_or(false, |c| last_committed_txn_id < c)
        {
            warn!(
                partition_id = self.config.partition_id,
                supplied = last_committed_txn_id,
                watermark = ?self.last_committed_txn_id,
                "commit watermark moved backwards, ignoring"
            );
        }
        self.last_committed_txn_id = self.last_committed_txn_id.max(Some(last_committed_txn_id));
        self.open_txn_id = self.open_txn_id.max(Some(current_open_txn_id));

        let sync = time_hint < 0;
        let due = sync
            || self.config.max_buffer_age_ms == 0
            || time_hint - self.last_flush_ms >= self.config.max_buffer_age_ms;
        if !sync && due {
            self.last_flush_ms = time_hint;
        }

        // An armed epoch change materializes on every flush
        if self.pending_epoch_end.is_some() {
            let record = self.roll_block(BoundaryCause::Flush, self.active_epoch)?;
            self.undo.push(record);
        }
        if due {
            let committed = self
                .open
                .as_ref()
                .map_or(false, |b| !b.is_empty() && b.is_committed(self.last_committed_txn_id));
            if committed {
                let record = self.roll_block(BoundaryCause::Flush, self.active_epoch)?;
                self.undo.push(record);
            }
        }

        self.drain(sync)?;
        let trimmed = self.undo.trim_through(self.ledger.handed_end());
        trace!(
            partition_id = self.config.partition_id,
            trimmed,
            retained = self.undo.len(),
            "undo log trimmed"
        );
        Ok(())
    }

    /// Timed flush driven by wall-clock time.
    pub fn tick(&mut self, last_committed_txn_id: TxnId, current_open_txn_id: TxnId) -> Result<()> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.flush(now_ms, last_committed_txn_id, current_open_txn_id)
    }

    /// Acknowledge sink consumption through stream offset `uso`.
    ///
    /// Whole blocks ending at or before `uso` stop counting towards
    /// `outstanding_bytes`. Offsets at or before an earlier acknowledgement
    /// are ignored.
    pub fn acknowledge(&mut self, uso: Uso) -> Result<()> {
        self.check_poisoned()?;
        match self.ledger.release(uso) {
            Ok(freed) => {
                debug!(
                    partition_id = self.config.partition_id,
                    uso,
                    freed,
                    "hand-off acknowledged"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    partition_id = self.config.partition_id,
                    uso,
                    handed_off = self.ledger.handed_end(),
                    "acknowledgement beyond handed-off data"
                );
                Err(e)
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Seal (or discard, if empty) the open block and open a fresh one at
    /// the current offset.
    fn roll_block(&mut self, cause: BoundaryCause, row_epoch: Epoch) -> Result<UndoRecord> {
        let uso = self.bytes_used;
        let prev_epoch = self.active_epoch;

        let marker = match cause {
            BoundaryCause::EpochChange | BoundaryCause::Flush => self.pending_epoch_end.take(),
            BoundaryCause::EpochDrift => {
                Some(EpochEnd::new(prev_epoch, self.active_signature.clone()))
            }
            BoundaryCause::Capacity => None,
        };
        let signature = marker
            .as_ref()
            .map_or_else(|| self.active_signature.clone(), |m| m.signature.clone());

        let prev_capacity = self.open.as_ref().map(StreamBlock::capacity);
        let sealed = match self.open.take() {
            Some(block) if !block.is_empty() => {
                if block.end_uso() != uso {
                    return Err(self.fail(format!(
                        "sealing block ending at uso {} while stream is at {}",
                        block.end_uso(),
                        uso
                    )));
                }
                self.pending.push_back(Pending::Block {
                    block,
                    signature,
                    end_of_epoch: false,
                });
                true
            }
            _ => false,
        };

        let epoch_end = marker.map(|marker| {
            let placement = match self.pending.back_mut() {
                Some(Pending::Block { end_of_epoch, .. }) if sealed || !*end_of_epoch => {
                    *end_of_epoch = true;
                    if sealed {
                        EpochEndPlacement::SealedBlock
                    } else {
                        EpochEndPlacement::PendingBlock
                    }
                }
                _ => {
                    self.pending.push_back(Pending::EpochEnd(marker.clone()));
                    EpochEndPlacement::Standalone
                }
            };
            EpochEndUndo { marker, placement }
        });

        if cause == BoundaryCause::EpochDrift {
            self.active_epoch = row_epoch;
        }
        self.open = Some(StreamBlock::new(uso, self.capacity));

        debug!(
            partition_id = self.config.partition_id,
            uso,
            ?cause,
            sealed,
            end_of_epoch = epoch_end.as_ref().map(|e| e.marker.epoch),
            epoch = self.active_epoch,
            "block boundary"
        );
        Ok(UndoRecord::Boundary {
            uso,
            cause,
            sealed,
            prev_capacity,
            prev_epoch,
            next_epoch: self.active_epoch,
            epoch_end,
        })
    }

    /// Reverse one undo record.
    fn undo_record(&mut self, record: UndoRecord) -> Result<()> {
        match record {
            UndoRecord::Write {
                uso,
                len,
                prev_open_txn_id,
                prev_block_max_txn_id,
            } => {
                let truncated = match self.open.as_mut() {
                    Some(block) if block.uso() <= uso && block.end_uso() == uso + len as Uso => {
                        let keep = (uso - block.uso()) as usize;
                        block.truncate(keep, prev_block_max_txn_id)
                    }
                    Some(block) => Err(ExportError::Fatal(format!(
                        "undoing write at uso {} of {} bytes, open block ends at {}",
                        uso,
                        len,
                        block.end_uso()
                    ))),
                    None => Err(ExportError::Fatal(format!(
                        "undoing write at uso {} with no open block",
                        uso
                    ))),
                };
                if let Err(e) = truncated {
                    return Err(self.fail(fatal_message(e)));
                }
                self.bytes_used = uso;
                self.open_txn_id = prev_open_txn_id;
            }

            UndoRecord::Boundary {
                uso,
                cause,
                sealed,
                prev_capacity,
                prev_epoch,
                next_epoch,
                epoch_end,
            } => {
                match self.open.take() {
                    Some(block) if !block.is_empty() || block.uso() != uso => {
                        return Err(self.fail(format!(
                            "undoing boundary at uso {} but open block at {} holds {} bytes",
                            uso,
                            block.uso(),
                            block.offset()
                        )));
                    }
                    _ => {}
                }

                if let Some(EpochEndUndo { marker, placement }) = epoch_end {
                    let detached = match placement {
                        EpochEndPlacement::SealedBlock => true,
                        EpochEndPlacement::PendingBlock => match self.pending.back_mut() {
                            Some(Pending::Block { end_of_epoch, .. }) if *end_of_epoch => {
                                *end_of_epoch = false;
                                true
                            }
                            _ => false,
                        },
                        EpochEndPlacement::Standalone => {
                            matches!(self.pending.pop_back(), Some(Pending::EpochEnd(_)))
                        }
                    };
                    if !detached {
                        return Err(self.fail(format!(
                            "end-of-epoch {} missing from pending queue at uso {}",
                            marker.epoch, uso
                        )));
                    }
                    if cause.is_explicit() {
                        self.pending_epoch_end = Some(marker);
                    }
                }

                // A discarded empty block comes back with its own capacity
                self.open = if sealed {
                    match self.pending.pop_back() {
                        Some(Pending::Block { block, .. }) if block.end_uso() == uso => Some(block),
                        _ => {
                            return Err(self.fail(format!(
                                "no pending block ending at uso {} to reopen",
                                uso
                            )));
                        }
                    }
                } else {
                    prev_capacity.map(|capacity| StreamBlock::new(uso, capacity))
                };

                if cause == BoundaryCause::EpochDrift {
                    if self.active_epoch == next_epoch {
                        self.active_epoch = prev_epoch;
                    } else if let Some(pending) = self.pending_epoch_end.as_mut() {
                        // An explicit change superseded the drift; the epoch
                        // it ends is now the one before the drift.
                        if pending.epoch == next_epoch {
                            pending.epoch = prev_epoch;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Hand the committed prefix of the pending queue to the sink.
    fn drain(&mut self, sync: bool) -> Result<()> {
        loop {
            let ready = match self.pending.front() {
                Some(Pending::Block { block, .. }) => block.is_committed(self.last_committed_txn_id),
                Some(Pending::EpochEnd(_)) => true,
                None => false,
            };
            if !ready {
                return Ok(());
            }

            match self.pending.pop_front() {
                Some(Pending::Block {
                    block,
                    signature,
                    end_of_epoch,
                }) => {
                    if let Err(e) = self.ledger.record(block.uso(), block.offset()) {
                        return Err(self.fail(fatal_message(e)));
                    }
                    let epoch = block.epoch().unwrap_or(self.active_epoch);
                    debug!(
                        partition_id = self.config.partition_id,
                        uso = block.uso(),
                        len = block.offset(),
                        epoch,
                        end_of_epoch,
                        sync,
                        "block handed off"
                    );
                    self.sink.push_block(BlockPush {
                        epoch,
                        partition_id: self.config.partition_id,
                        signature: &signature,
                        column_names: &self.config.column_names,
                        block: Some(block.seal()),
                        sync,
                        end_of_epoch,
                    });
                }
                Some(Pending::EpochEnd(marker)) => {
                    debug!(
                        partition_id = self.config.partition_id,
                        epoch = marker.epoch,
                        "empty epoch ended"
                    );
                    self.sink.push_block(BlockPush {
                        epoch: marker.epoch,
                        partition_id: self.config.partition_id,
                        signature: &marker.signature,
                        column_names: &self.config.column_names,
                        block: None,
                        sync,
                        end_of_epoch: true,
                    });
                }
                None => return Ok(()),
            }
        }
    }

    fn check_poisoned(&self) -> Result<()> {
        if self.poisoned {
            return Err(ExportError::Fatal(format!(
                "export stream for partition {} is poisoned",
                self.config.partition_id
            )));
        }
        Ok(())
    }

    /// Poison the stream and report the broken invariant to the host.
    fn fail(&mut self, message: impl Into<String>) -> ExportError {
        let message = message.into();
        error!(
            partition_id = self.config.partition_id,
            reason = %message,
            "export stream invariant violated"
        );
        self.poisoned = true;
        let err = ExportError::Fatal(message);
        self.sink.on_fatal(&err);
        err
    }
}

fn fatal_message(e: ExportError) -> String {
    match e {
        ExportError::Fatal(message) => message,
        other => other.to_string(),
    }
}
