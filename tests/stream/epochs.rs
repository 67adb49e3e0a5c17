//! Epoch and signature changes

use crate::common::*;

// ============================================================================
// Explicit changes
// ============================================================================

#[test]
fn catalog_update_splits_block() {
    let mut t = TestStream::new();
    t.append_rows(1..=3, 0);
    t.stream.set_epoch("dude2", 1).unwrap();
    t.append_rows(4..=5, 0);
    t.stream.flush(-1, 5, 5).unwrap();

    let pushes = t.pushes();
    assert_eq!(pushes.len(), 2);

    assert_eq!(pushes[0].epoch, 0);
    assert_eq!(pushes[0].signature, "dude");
    assert!(pushes[0].end_of_epoch);
    assert_eq!(pushes[0].block.as_ref().map(|b| b.offset()), Some(ROW * 3));

    assert_eq!(pushes[1].epoch, 1);
    assert_eq!(pushes[1].signature, "dude2");
    assert!(!pushes[1].end_of_epoch);
    let rows = pushes[1].block.as_ref().unwrap();
    assert_eq!(rows.uso(), (ROW * 3) as Uso);
    assert_eq!(rows.epoch(), Some(1));
}

#[test]
fn catalog_update_after_flush() {
    let mut t = TestStream::new();
    t.append_rows(1..=3, 0);
    t.stream.flush(-1, 3, 3).unwrap();
    assert_eq!(t.sink.push_count(), 1);

    // Nothing buffered: the sink hears about the end right away
    t.stream.set_epoch("dude2", 1).unwrap();
    let pushes = t.pushes();
    assert_eq!(pushes.len(), 2);
    assert!(pushes[1].block.is_none());
    assert!(pushes[1].end_of_epoch);
    assert_eq!(pushes[1].epoch, 0);
    assert_eq!(pushes[1].signature, "dude");

    t.append(4, 0);
    t.stream.flush(-1, 4, 4).unwrap();
    let last = t.pushes().pop().unwrap();
    assert_eq!(last.epoch, 1);
    assert_eq!(last.signature, "dude2");
    assert!(!last.end_of_epoch);
}

#[test]
fn catalog_update_after_rollback() {
    let mut t = TestStream::new();
    t.append_rows(1..=3, 0);
    let mark = t.stream.mark();
    t.stream.set_epoch("dude2", 1).unwrap();
    t.append_rows(4..=5, 0);
    t.stream.rollback_to(mark).unwrap();

    // The change itself survives the rollback
    assert!(t.stream.has_pending_epoch_change());
    assert_eq!(t.stream.active_epoch(), 1);

    t.append(4, 0);
    t.stream.flush(-1, 4, 4).unwrap();
    let pushes = t.pushes();
    assert_eq!(pushes.len(), 2);
    assert!(pushes[0].end_of_epoch);
    assert_eq!(pushes[0].block.as_ref().map(|b| b.offset()), Some(ROW * 3));
    assert_eq!(pushes[1].block.as_ref().map(|b| b.offset()), Some(ROW));
    assert_contiguous(&t.blocks());
}

#[test]
fn end_of_stream_on_periodic_flush() {
    let mut t = TestStream::new();
    t.append_rows(1..=2, 0);
    t.stream.set_epoch("dude", 1).unwrap();
    t.stream.flush(-1, 2, 2).unwrap();

    let pushes = t.pushes();
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].end_of_epoch);
    assert!(!t.stream.has_pending_epoch_change());

    t.stream.flush(-1, 2, 2).unwrap();
    assert_eq!(t.sink.push_count(), 1);
}

#[test]
fn epoch_change_on_timed_flush_before_age() {
    let config = StreamConfig::new(1, 1, "dude", columns()).with_max_buffer_age_ms(100);
    let mut t = TestStream::with_config(config);

    t.append_rows(1..=2, 0);
    t.stream.set_epoch("dude2", 1).unwrap();
    t.stream.flush(50, 2, 2).unwrap();

    let pushes = t.pushes();
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].end_of_epoch);
    assert!(!pushes[0].sync);
    assert_eq!(pushes[0].epoch, 0);
    assert_eq!(pushes[0].block.as_ref().map(|b| b.offset()), Some(ROW * 2));
    assert!(!t.stream.has_pending_epoch_change());

    // Rows of the new epoch still wait for the buffer age
    t.append(3, 1);
    t.stream.flush(60, 3, 3).unwrap();
    assert_eq!(t.sink.push_count(), 1);
    t.stream.flush(100, 3, 3).unwrap();
    assert_eq!(t.sink.push_count(), 2);
}

#[test]
fn repeated_changes_before_any_row() {
    let mut t = TestStream::new();
    t.append(1, 0);
    t.stream.set_epoch("dude2", 1).unwrap();
    t.stream.set_epoch("dude3", 2).unwrap();
    t.append(2, 0);
    t.stream.flush(-1, 2, 2).unwrap();

    let pushes = t.pushes();
    assert_eq!(pushes.len(), 2);
    assert_eq!((pushes[0].epoch, pushes[0].end_of_epoch), (0, true));
    assert_eq!(pushes[1].epoch, 2);
    assert_eq!(pushes[1].signature, "dude3");
}

#[test]
fn same_epoch_and_signature_is_noop() {
    let mut t = TestStream::new();
    t.append(1, 0);
    t.stream.set_epoch("dude", 0).unwrap();
    assert!(!t.stream.has_pending_epoch_change());
}

#[test]
fn older_epoch_is_rejected() {
    let mut t = TestStream::new();
    t.stream.set_epoch("dude", 4).unwrap();
    assert!(matches!(
        t.stream.set_epoch("dude", 3),
        Err(ExportError::EpochRegression { requested: 3, active: 4 })
    ));
    assert_eq!(t.stream.active_epoch(), 4);
}

// ============================================================================
// Implicit drift
// ============================================================================

#[test]
fn just_generation_change() {
    let mut t = TestStream::new();
    t.append_rows(1..=3, 0);
    t.append_rows(4..=5, 1);
    t.stream.flush(-1, 5, 5).unwrap();

    let blocks = t.blocks();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].epoch(), Some(0));
    assert_eq!(blocks[0].offset(), ROW * 3);
    assert_eq!(blocks[1].epoch(), Some(1));
    assert!(t.pushes()[0].end_of_epoch);
}

#[test]
fn explicit_change_wins_over_row_epoch() {
    let mut t = TestStream::new();
    t.append(1, 0);
    t.stream.set_epoch("dude2", 2).unwrap();
    t.append(2, 7);
    t.stream.flush(-1, 2, 2).unwrap();

    let blocks = t.blocks();
    assert_eq!(blocks[1].epoch(), Some(2));
    assert_eq!(t.stream.active_epoch(), 2);
}

#[test]
fn blocks_never_mix_epochs() {
    let mut t = TestStream::new();
    let mut txn = 0;
    for epoch in 0..6 {
        for _ in 0..(epoch * 3 + 1) {
            txn += 1;
            t.append(txn, epoch);
        }
    }
    t.stream.flush(-1, txn, txn).unwrap();

    for block in t.blocks() {
        for row in block.rows(5) {
            assert_eq!(Some(row.unwrap().header.epoch), block.epoch());
        }
    }
    assert_contiguous(&t.blocks());
}
