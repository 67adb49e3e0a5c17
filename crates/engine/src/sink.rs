//! Downstream sink contract
//!
//! The stream hands every finalized block to an [`ExportSink`] in stream
//! offset order. Ownership of the block moves with the call; the stream
//! only keeps the byte count until the sink acknowledges consumption via
//! [`ExportStream::acknowledge`](crate::ExportStream::acknowledge).
//!
//! A push without a block and with `end_of_epoch` set reports an epoch
//! that ended with nothing left to hand off.

use exportstream_core::{Epoch, ExportError, PartitionId};
use exportstream_storage::SealedBlock;
use parking_lot::Mutex;
use std::sync::Arc;

/// One hand-off from the stream to the sink.
#[derive(Debug)]
pub struct BlockPush<'a> {
    /// Epoch of the block, or of the epoch that ended
    pub epoch: Epoch,
    /// Partition of the stream
    pub partition_id: PartitionId,
    /// Stream signature the block was written under
    pub signature: &'a str,
    /// Column names, ordinal-stable for the signature
    pub column_names: &'a [String],
    /// Finalized block, absent for a bare end-of-epoch notification
    pub block: Option<SealedBlock>,
    /// Hand-off was forced rather than timed
    pub sync: bool,
    /// Last hand-off of the epoch
    pub end_of_epoch: bool,
}

/// Consumer of finalized blocks.
pub trait ExportSink {
    /// Take ownership of a finalized block or an end-of-epoch notification
    fn push_block(&mut self, push: BlockPush<'_>);

    /// Called once when the stream hits a broken invariant.
    ///
    /// The stream is poisoned afterwards. Hosts typically terminate here.
    fn on_fatal(&mut self, error: &ExportError) {
        let _ = error;
    }
}

impl<S: ExportSink + ?Sized> ExportSink for Box<S> {
    fn push_block(&mut self, push: BlockPush<'_>) {
        (**self).push_block(push)
    }

    fn on_fatal(&mut self, error: &ExportError) {
        (**self).on_fatal(error)
    }
}

impl<S: ExportSink + ?Sized> ExportSink for &mut S {
    fn push_block(&mut self, push: BlockPush<'_>) {
        (**self).push_block(push)
    }

    fn on_fatal(&mut self, error: &ExportError) {
        (**self).on_fatal(error)
    }
}

/// Owned copy of a [`BlockPush`] kept by [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct ReceivedPush {
    /// Epoch of the push
    pub epoch: Epoch,
    /// Partition of the push
    pub partition_id: PartitionId,
    /// Signature of the push
    pub signature: String,
    /// Column names of the push
    pub column_names: Vec<String>,
    /// Block, if any
    pub block: Option<SealedBlock>,
    /// Forced hand-off
    pub sync: bool,
    /// End-of-epoch flag
    pub end_of_epoch: bool,
}

#[derive(Debug, Default)]
struct Recorded {
    pushes: Vec<ReceivedPush>,
    fatal: Option<String>,
}

/// In-memory sink that records every push.
///
/// Clones share the same record, so a handle kept outside the stream sees
/// everything the stream pushed.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All pushes received so far
    pub fn pushes(&self) -> Vec<ReceivedPush> {
        self.inner.lock().pushes.clone()
    }

    /// Remove and return all pushes received so far
    pub fn take_pushes(&self) -> Vec<ReceivedPush> {
        std::mem::take(&mut self.inner.lock().pushes)
    }

    /// Blocks received so far, in hand-off order
    pub fn blocks(&self) -> Vec<SealedBlock> {
        self.inner
            .lock()
            .pushes
            .iter()
            .filter_map(|p| p.block.clone())
            .collect()
    }

    /// Number of pushes received
    pub fn push_count(&self) -> usize {
        self.inner.lock().pushes.len()
    }

    /// Check if any push carried an end-of-epoch flag
    pub fn received_end_of_epoch(&self) -> bool {
        self.inner.lock().pushes.iter().any(|p| p.end_of_epoch)
    }

    /// Bytes held in received blocks
    pub fn queued_bytes(&self) -> usize {
        self.inner
            .lock()
            .pushes
            .iter()
            .filter_map(|p| p.block.as_ref())
            .map(SealedBlock::offset)
            .sum()
    }

    /// Fatal error reported by the stream, if any
    pub fn fatal_error(&self) -> Option<String> {
        self.inner.lock().fatal.clone()
    }
}

impl ExportSink for RecordingSink {
    fn push_block(&mut self, push: BlockPush<'_>) {
        self.inner.lock().pushes.push(ReceivedPush {
            epoch: push.epoch,
            partition_id: push.partition_id,
            signature: push.signature.to_string(),
            column_names: push.column_names.to_vec(),
            block: push.block,
            sync: push.sync,
            end_of_epoch: push.end_of_epoch,
        });
    }

    fn on_fatal(&mut self, error: &ExportError) {
        self.inner.lock().fatal = Some(error.to_string());
    }
}
