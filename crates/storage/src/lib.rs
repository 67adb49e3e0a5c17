//! Block storage for the export stream
//!
//! This crate implements the fixed-capacity memory regions rows are
//! serialized into:
//! - StreamBlock: the open block owned by the stream, accepting appends
//! - SealedBlock: a finished block after ownership moved to the sink
//!
//! A block records the stream offset (USO) of its first byte, the epoch
//! its rows belong to, and the highest transaction that wrote into it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod sealed;

pub use block::StreamBlock;
pub use sealed::SealedBlock;
