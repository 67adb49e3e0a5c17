//! Export row wire format
//!
//! Every row appended to an export stream is serialized as:
//!
//! ```text
//! +------------------------------------------------------------+
//! | prior committed txn id (i64) | txn id (i64)                 |
//! | partition id (i64)           | site id (i64)                |
//! | epoch id (i64)               | mutation kind (i64)          |  48 bytes
//! +------------------------------------------------------------+
//! | null mask: (6 + column_count) bits, rounded up to bytes     |
//! +------------------------------------------------------------+
//! | value section length (i32)                                  |
//! +------------------------------------------------------------+
//! | values in declared column order                             |
//! +------------------------------------------------------------+
//! ```
//!
//! All integers are big-endian. Integer and timestamp values occupy 8 bytes,
//! floats 8 bytes, strings and varbinary a 4-byte length plus the bytes.
//! Null values set their mask bit and contribute no value bytes. The six
//! metadata columns come first in the mask and are never null.
//!
//! The stream never interprets row contents; [`RowReader`] exists so
//! consumers can walk a block's rows.

use crate::error::{ExportError, Result};
use crate::types::{Epoch, PartitionId, SiteId, TxnId};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use smallvec::SmallVec;
use std::io;

/// Number of metadata columns preceding the row's own columns.
pub const METADATA_COLUMN_COUNT: usize = 6;

/// Size in bytes of the fixed metadata header.
pub const ROW_HEADER_SIZE: usize = METADATA_COLUMN_COUNT * 8;

const ROW_LENGTH_SIZE: usize = 4;

/// Kind of mutation a row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Row inserted
    Insert,
    /// Row deleted
    Delete,
}

impl MutationKind {
    /// Wire code for this kind
    pub fn code(self) -> i64 {
        match self {
            MutationKind::Insert => 1,
            MutationKind::Delete => 0,
        }
    }

    /// Parse a wire code
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(MutationKind::Insert),
            0 => Some(MutationKind::Delete),
            _ => None,
        }
    }
}

/// Commit-tracking metadata written in front of every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHeader {
    /// Caller's view of the last committed transaction
    pub prior_committed_txn_id: TxnId,
    /// Transaction that produced the row
    pub txn_id: TxnId,
    /// Partition the row belongs to
    pub partition_id: PartitionId,
    /// Site that produced the row
    pub site_id: SiteId,
    /// Epoch the caller attributes the row to
    pub epoch: Epoch,
    /// Insert or delete
    pub kind: MutationKind,
}

impl RowHeader {
    /// Create an insert header
    pub fn insert(
        prior_committed_txn_id: TxnId,
        txn_id: TxnId,
        partition_id: PartitionId,
        site_id: SiteId,
        epoch: Epoch,
    ) -> Self {
        Self {
            prior_committed_txn_id,
            txn_id,
            partition_id,
            site_id,
            epoch,
            kind: MutationKind::Insert,
        }
    }

    /// Same header with a different mutation kind
    pub fn with_kind(mut self, kind: MutationKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A single column value of an exported row.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// SQL NULL
    Null,
    /// Any integer width, widened to 64 bits
    Integer(i64),
    /// Floating point
    Float(f64),
    /// Microseconds since the epoch
    Timestamp(i64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Varbinary(Vec<u8>),
}

impl ColumnValue {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Bytes this value occupies in the value section
    pub fn encoded_len(&self) -> usize {
        match self {
            ColumnValue::Null => 0,
            ColumnValue::Integer(_) | ColumnValue::Float(_) | ColumnValue::Timestamp(_) => 8,
            ColumnValue::String(s) => 4 + s.len(),
            ColumnValue::Varbinary(b) => 4 + b.len(),
        }
    }
}

/// Null mask length in bytes for a row with `column_count` columns.
pub fn null_mask_len(column_count: usize) -> usize {
    (column_count + METADATA_COLUMN_COUNT + 7) / 8
}

/// Serialized length of a row.
pub fn encoded_len(values: &[ColumnValue]) -> usize {
    ROW_HEADER_SIZE
        + null_mask_len(values.len())
        + ROW_LENGTH_SIZE
        + values.iter().map(ColumnValue::encoded_len).sum::<usize>()
}

fn length_prefix(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| ExportError::RowTooLarge {
        row_len: len,
        capacity: i32::MAX as usize,
    })
}

/// Append the serialized row to `out`.
///
/// Returns the number of bytes written.
pub fn encode_row(header: &RowHeader, values: &[ColumnValue], out: &mut Vec<u8>) -> Result<usize> {
    let start = out.len();
    out.reserve(encoded_len(values));

    out.write_i64::<BigEndian>(header.prior_committed_txn_id)?;
    out.write_i64::<BigEndian>(header.txn_id)?;
    out.write_i64::<BigEndian>(i64::from(header.partition_id))?;
    out.write_i64::<BigEndian>(i64::from(header.site_id))?;
    out.write_i64::<BigEndian>(header.epoch)?;
    out.write_i64::<BigEndian>(header.kind.code())?;

    let mut mask: SmallVec<[u8; 8]> = SmallVec::from_elem(0, null_mask_len(values.len()));
    for (i, value) in values.iter().enumerate() {
        if value.is_null() {
            let bit = METADATA_COLUMN_COUNT + i;
            mask[bit / 8] |= 0x80 >> (bit % 8);
        }
    }
    out.extend_from_slice(&mask);

    let value_len: usize = values.iter().map(ColumnValue::encoded_len).sum();
    out.write_i32::<BigEndian>(length_prefix(value_len)?)?;

    for value in values {
        match value {
            ColumnValue::Null => {}
            ColumnValue::Integer(v) | ColumnValue::Timestamp(v) => {
                out.write_i64::<BigEndian>(*v)?;
            }
            ColumnValue::Float(v) => out.write_f64::<BigEndian>(*v)?,
            ColumnValue::String(s) => {
                out.write_i32::<BigEndian>(length_prefix(s.len())?)?;
                out.extend_from_slice(s.as_bytes());
            }
            ColumnValue::Varbinary(b) => {
                out.write_i32::<BigEndian>(length_prefix(b.len())?)?;
                out.extend_from_slice(b);
            }
        }
    }

    Ok(out.len() - start)
}

/// A row located inside a serialized byte region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowView<'a> {
    /// Decoded metadata header
    pub header: RowHeader,
    /// Raw null mask, metadata columns included
    pub null_mask: &'a [u8],
    /// Raw value section
    pub values: &'a [u8],
    /// Offset of the row inside the region
    pub offset: usize,
    /// Total serialized length of the row
    pub len: usize,
}

impl RowView<'_> {
    /// Check whether the row's own column `column` is NULL
    pub fn is_null(&self, column: usize) -> bool {
        let bit = METADATA_COLUMN_COUNT + column;
        self.null_mask
            .get(bit / 8)
            .map_or(false, |byte| byte & (0x80 >> (bit % 8)) != 0)
    }
}

/// Iterator over the rows of a serialized region.
///
/// Rows are delimited with the value-section length field, so only the
/// column count (for the null mask width) is needed.
pub struct RowReader<'a> {
    data: &'a [u8],
    column_count: usize,
    pos: usize,
}

impl<'a> RowReader<'a> {
    /// Create a reader over `data` for rows with `column_count` columns
    pub fn new(data: &'a [u8], column_count: usize) -> Self {
        Self {
            data,
            column_count,
            pos: 0,
        }
    }

    fn read_row(&mut self) -> Result<RowView<'a>> {
        let offset = self.pos;
        let mut cursor = &self.data[offset..];

        let prior_committed_txn_id = cursor.read_i64::<BigEndian>()?;
        let txn_id = cursor.read_i64::<BigEndian>()?;
        let partition_id = cursor.read_i64::<BigEndian>()?;
        let site_id = cursor.read_i64::<BigEndian>()?;
        let epoch = cursor.read_i64::<BigEndian>()?;
        let kind_code = cursor.read_i64::<BigEndian>()?;
        let kind = MutationKind::from_code(kind_code).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown mutation kind {} at offset {}", kind_code, offset),
            )
        })?;

        let mask_len = null_mask_len(self.column_count);
        if cursor.len() < mask_len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        let (null_mask, mut rest) = cursor.split_at(mask_len);

        let value_len = rest.read_i32::<BigEndian>()?;
        let value_len = usize::try_from(value_len).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("negative row length at offset {}", offset),
            )
        })?;
        if rest.len() < value_len {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        let values = &rest[..value_len];

        let partition_id = PartitionId::try_from(partition_id).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("partition id {} out of range at offset {}", partition_id, offset),
            )
        })?;
        let site_id = SiteId::try_from(site_id).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("site id {} out of range at offset {}", site_id, offset),
            )
        })?;

        let len = ROW_HEADER_SIZE + mask_len + ROW_LENGTH_SIZE + value_len;
        self.pos += len;

        Ok(RowView {
            header: RowHeader {
                prior_committed_txn_id,
                txn_id,
                partition_id,
                site_id,
                epoch,
                kind,
            },
            null_mask,
            values,
            offset,
            len,
        })
    }
}

impl<'a> Iterator for RowReader<'a> {
    type Item = Result<RowView<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let row = self.read_row();
        if row.is_err() {
            // Stop after the first malformed row
            self.pos = self.data.len();
        }
        Some(row)
    }
}
