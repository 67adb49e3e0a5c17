//! Stream configuration loading

use crate::common::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn stream_from_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
partition_id = 7
site_id = 2
block_capacity = 188
signature = "orders"
initial_epoch = 3
column_names = ["A", "B", "C", "D", "E"]
"#
    )
    .unwrap();

    let config = StreamConfig::load(file.path()).unwrap();
    let mut t = TestStream::with_config(config);
    assert_eq!(t.stream.partition_id(), 7);
    assert_eq!(t.stream.active_epoch(), 3);
    assert_eq!(t.stream.capacity(), 188);

    for txn in 1..=3 {
        t.stream
            .append(RowHeader::insert(0, txn, 7, 2, 3), &int_row(txn))
            .unwrap();
    }
    t.stream.flush(-1, 3, 3).unwrap();

    let pushes = t.pushes();
    assert_eq!(pushes.len(), 2);
    assert!(pushes.iter().all(|p| p.partition_id == 7 && p.signature == "orders"));
    assert!(pushes.iter().all(|p| p.epoch == 3));
}

#[test]
fn zero_capacity_file_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "block_capacity = 0").unwrap();
    assert!(matches!(
        StreamConfig::load(file.path()),
        Err(ExportError::InvalidCapacity(0))
    ));
}

#[test]
fn zero_capacity_stream_is_rejected() {
    let config = StreamConfig::new(1, 1, "dude", columns()).with_block_capacity(0);
    assert!(ExportStream::new(config, RecordingSink::new()).is_err());
}

#[test]
fn malformed_file_is_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "block_capacity = \"big\"").unwrap();
    assert!(matches!(
        StreamConfig::load(file.path()),
        Err(ExportError::Config(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("stream.toml");
    assert!(matches!(StreamConfig::load(&missing), Err(ExportError::Io(_))));
}
