//! Sink acknowledgement and outstanding byte accounting

use crate::common::*;

#[test]
fn outstanding_counts_every_stage() {
    let mut t = TestStream::new();
    t.append_rows(1..=12, 0);
    // Open block: 2 rows, pending: 10 rows
    assert_eq!(t.stream.outstanding_bytes(), ROW * 12);

    t.stream.flush(-1, 10, 12).unwrap();
    // Handed off but unacknowledged still counts
    assert_eq!(t.stream.outstanding_bytes(), ROW * 12);
    assert_eq!(t.stream.handed_off_uso(), 940);
}

#[test]
fn acknowledge_releases_whole_blocks_only() {
    let mut t = TestStream::with_capacity(ROW * 2);
    t.append_rows(1..=6, 0);
    t.stream.flush(-1, 6, 6).unwrap();
    assert_eq!(t.blocks().len(), 3);

    t.stream.acknowledge(ROW as Uso * 3).unwrap();
    assert_eq!(t.stream.outstanding_bytes(), ROW * 4);
    assert_eq!(t.stream.released_uso(), ROW as Uso * 3);

    t.stream.acknowledge(ROW as Uso * 6).unwrap();
    assert_eq!(t.stream.outstanding_bytes(), 0);
}

#[test]
fn stale_acknowledgement_is_ignored() {
    let mut t = TestStream::new();
    t.append_rows(1..=3, 0);
    t.stream.flush(-1, 3, 3).unwrap();
    t.stream.acknowledge(ROW as Uso * 3).unwrap();
    t.stream.acknowledge(ROW as Uso).unwrap();
    assert_eq!(t.stream.released_uso(), ROW as Uso * 3);
}

#[test]
fn acknowledge_beyond_handoff_is_rejected() {
    let mut t = TestStream::new();
    t.append_rows(1..=3, 0);
    t.stream.flush(-1, 2, 3).unwrap();

    let err = t.stream.acknowledge(ROW as Uso).unwrap_err();
    assert!(matches!(
        err,
        ExportError::ReleaseBeyondCommitted { offset: 94, committed: 0 }
    ));
    assert!(!t.stream.is_poisoned());
}

#[test]
fn sink_side_release_cursor() {
    let mut t = TestStream::new();
    t.append_rows(1..=2, 0);
    t.stream.flush(-1, 2, 2).unwrap();

    let mut block = t.blocks().remove(0);
    assert_eq!(block.release_offset(), 0);
    block.release(ROW).unwrap();
    assert_eq!(block.unreleased().len(), ROW);
    assert!(block.release(ROW * 3).is_err());
}
