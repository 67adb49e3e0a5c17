//! Export Stream Integration Tests
//!
//! Drives `ExportStream` through the public facade with a recording sink:
//! block boundaries, commit gating, rollback, epoch changes,
//! acknowledgement, configuration loading.


mod acknowledge;
mod config;
mod epochs;
mod properties;
