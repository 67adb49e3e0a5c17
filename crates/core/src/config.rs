//! Per-partition stream configuration
//!
//! A `StreamConfig` is built in code or loaded from TOML:
//!
//! ```toml
//! partition_id = 3
//! site_id = 1
//! block_capacity = 1048576
//! max_buffer_age_ms = 4000
//! signature = "orders"
//! initial_epoch = 0
//! column_names = ["ID", "AMOUNT"]
//! ```
//!
//! Missing keys take their defaults.

use crate::error::{ExportError, Result};
use crate::types::{Epoch, PartitionId, SiteId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default block capacity (2 MiB).
pub const DEFAULT_BLOCK_CAPACITY: usize = 2 * 1024 * 1024;

/// Configuration of one partition's export stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Partition the stream belongs to
    pub partition_id: PartitionId,
    /// Site hosting the partition
    pub site_id: SiteId,
    /// Capacity in bytes of newly allocated blocks
    pub block_capacity: usize,
    /// Minimum age before a timed flush finalizes the open block.
    ///
    /// Zero makes every flush eligible.
    pub max_buffer_age_ms: i64,
    /// Initial stream signature
    pub signature: String,
    /// Initial epoch
    pub initial_epoch: Epoch,
    /// Column names, ordinal-stable for a signature
    pub column_names: Vec<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            partition_id: 0,
            site_id: 0,
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            max_buffer_age_ms: 0,
            signature: String::new(),
            initial_epoch: 0,
            column_names: Vec::new(),
        }
    }
}

impl StreamConfig {
    /// Create a configuration for a partition with the given schema
    pub fn new(
        partition_id: PartitionId,
        site_id: SiteId,
        signature: impl Into<String>,
        column_names: Vec<String>,
    ) -> Self {
        StreamConfig {
            partition_id,
            site_id,
            signature: signature.into(),
            column_names,
            ..Default::default()
        }
    }

    /// Set the block capacity
    pub fn with_block_capacity(mut self, bytes: usize) -> Self {
        self.block_capacity = bytes;
        self
    }

    /// Set the initial epoch
    pub fn with_initial_epoch(mut self, epoch: Epoch) -> Self {
        self.initial_epoch = epoch;
        self
    }

    /// Set the timed flush age
    pub fn with_max_buffer_age_ms(mut self, age_ms: i64) -> Self {
        self.max_buffer_age_ms = age_ms;
        self
    }

    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: StreamConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject configurations the stream cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.block_capacity == 0 {
            return Err(ExportError::InvalidCapacity(self.block_capacity));
        }
        if self.max_buffer_age_ms < 0 {
            return Err(ExportError::Config(format!(
                "max_buffer_age_ms must not be negative, got {}",
                self.max_buffer_age_ms
            )));
        }
        Ok(())
    }
}
