//! Identifier types shared across the export stream layers.

use serde::{Deserialize, Serialize};

/// Transaction identifier supplied by the storage engine.
///
/// Transaction ids are monotonically non-decreasing within one partition.
pub type TxnId = i64;

/// Generation / epoch identifier issued by the catalog.
pub type Epoch = i64;

/// Universal stream offset: cumulative logical byte position in a
/// partition's export stream.
pub type Uso = u64;

/// Partition identifier.
pub type PartitionId = i32;

/// Site (host-local executor) identifier.
pub type SiteId = i32;

/// An epoch that has ended and must be reported to the sink.
///
/// Carries the epoch and the stream signature that were active while the
/// epoch's rows were written, since both may have changed by the time the
/// notification is handed off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochEnd {
    /// The epoch that ended
    pub epoch: Epoch,
    /// Stream signature in effect during that epoch
    pub signature: String,
}

impl EpochEnd {
    /// Create a new end-of-epoch marker
    pub fn new(epoch: Epoch, signature: impl Into<String>) -> Self {
        Self {
            epoch,
            signature: signature.into(),
        }
    }
}
