//! Property tests: contiguity, commit gating, rollback exactness

use crate::common::*;
use proptest::prelude::*;

const CAPACITY: usize = 300;

/// One generated row: string payload length and whether it opens a new epoch
type RowSpec = (usize, bool);

fn row_of(len: usize, seed: i64) -> Vec<ColumnValue> {
    vec![
        ColumnValue::Integer(seed),
        ColumnValue::Integer(seed * 2),
        ColumnValue::String("x".repeat(len)),
        ColumnValue::Null,
        ColumnValue::Timestamp(seed * 1_000),
    ]
}

fn new_stream() -> TestStream {
    TestStream::with_capacity(CAPACITY)
}

/// Append `rows` as consecutive transactions starting after `txn`.
fn append_all(t: &mut TestStream, rows: &[RowSpec], txn: &mut TxnId, epoch: &mut Epoch) {
    for &(len, bump) in rows {
        *txn += 1;
        if bump {
            *epoch += 1;
        }
        t.stream
            .append(RowHeader::insert(0, *txn, 1, 1, *epoch), &row_of(len, *txn))
            .unwrap();
    }
}

fn rows_strategy(max: usize) -> impl Strategy<Value = Vec<RowSpec>> {
    prop::collection::vec((0usize..60, prop::bool::weighted(0.1)), 0..max)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn handoff_is_contiguous_and_committed(
        rows in rows_strategy(80),
        flush_every in 1usize..10,
        lag in 0i64..3,
    ) {
        let mut t = new_stream();
        let mut txn = 0;
        let mut epoch = 0;

        for (i, chunk) in rows.chunks(flush_every).enumerate() {
            append_all(&mut t, chunk, &mut txn, &mut epoch);
            let committed = (txn - lag).max(0);
            t.stream.flush(if i % 2 == 0 { -1 } else { i as i64 }, committed, txn).unwrap();

            for block in t.blocks() {
                for row in block.rows(5) {
                    let row = row.unwrap();
                    prop_assert!(row.header.txn_id <= committed);
                    prop_assert_eq!(Some(row.header.epoch), block.epoch());
                }
            }
        }
        t.stream.flush(-1, txn, txn).unwrap();

        let blocks = t.blocks();
        assert_contiguous(&blocks);
        let handed: usize = blocks.iter().map(|b| b.offset()).sum();
        prop_assert_eq!(handed as Uso, t.stream.bytes_used());
        prop_assert!(blocks.iter().all(|b| b.offset() <= CAPACITY));
    }

    #[test]
    fn rollback_is_exact(
        prefix in rows_strategy(20),
        discarded in rows_strategy(20),
        suffix in rows_strategy(20),
        change_epoch in any::<bool>(),
    ) {
        let mut with_rollback = new_stream();
        let mut without = new_stream();
        let (mut txn_a, mut epoch_a) = (0, 0);
        let (mut txn_b, mut epoch_b) = (0, 0);

        append_all(&mut with_rollback, &prefix, &mut txn_a, &mut epoch_a);
        append_all(&mut without, &prefix, &mut txn_b, &mut epoch_b);

        let mark = with_rollback.stream.mark();
        let (saved_txn, saved_epoch) = (txn_a, epoch_a);
        if change_epoch {
            with_rollback.stream.set_epoch("dude2", epoch_a + 10).unwrap();
            without.stream.set_epoch("dude2", epoch_b + 10).unwrap();
            epoch_a += 10;
            epoch_b += 10;
        }
        append_all(&mut with_rollback, &discarded, &mut txn_a, &mut epoch_a);
        with_rollback.stream.rollback_to(mark).unwrap();
        prop_assert_eq!(with_rollback.stream.bytes_used(), mark);

        txn_a = saved_txn;
        epoch_a = saved_epoch + if change_epoch { 10 } else { 0 };
        append_all(&mut with_rollback, &suffix, &mut txn_a, &mut epoch_a);
        append_all(&mut without, &suffix, &mut txn_b, &mut epoch_b);

        with_rollback.stream.flush(-1, txn_a, txn_a).unwrap();
        without.stream.flush(-1, txn_b, txn_b).unwrap();

        let a = with_rollback.pushes();
        let b = without.pushes();
        prop_assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(b.iter()) {
            prop_assert_eq!(pa.epoch, pb.epoch);
            prop_assert_eq!(&pa.signature, &pb.signature);
            prop_assert_eq!(pa.end_of_epoch, pb.end_of_epoch);
            prop_assert_eq!(&pa.block, &pb.block);
        }
    }
}
