//! Property checks for `StreamBuffer`.
//!
//! A shadow model (`VecDeque<u8>` of pending bytes) is driven alongside the
//! real buffer with random append/consume sequences. After every step the
//! offset invariants must hold and the pending window must equal the model,
//! which also proves compaction never drops or reorders data.

use std::collections::VecDeque;

use dsp_shim_core::{DspError, StreamBuffer};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Append(Vec<u8>),
    /// Fraction of the pending bytes to consume, in 1/256 steps; 256 means "one more than pending".
    Consume(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..96).prop_map(Op::Append),
        (0u16..=256).prop_map(Op::Consume),
    ]
}

fn check_invariants(buf: &StreamBuffer) {
    assert!(buf.consumed_offset() <= buf.filled());
    assert!(buf.filled() <= buf.capacity());
    assert_eq!(buf.pending_len(), buf.filled() - buf.consumed_offset());
}

proptest! {
    #[test]
    fn prop_offsets_stay_ordered_and_data_survives(
        capacity in 1usize..256,
        threshold in 1usize..64,
        ops in prop::collection::vec(op(), 1..64),
    ) {
        let mut buf = StreamBuffer::new(capacity, threshold);
        let mut model: VecDeque<u8> = VecDeque::new();

        for op in ops {
            match op {
                Op::Append(chunk) => match buf.append(&chunk) {
                    Ok(()) => model.extend(chunk.iter().copied()),
                    Err(DspError::BufferOverflow { requested, available }) => {
                        prop_assert_eq!(requested, chunk.len());
                        prop_assert!(model.len() + chunk.len() > capacity);
                        prop_assert_eq!(available, capacity - model.len());
                    }
                    Err(other) => prop_assert!(false, "unexpected append error: {other}"),
                },
                Op::Consume(step) => {
                    let pending = model.len();
                    let n = if step == 256 { pending + 1 } else { pending * step as usize / 256 };
                    match buf.consume(n) {
                        Ok(()) => {
                            prop_assert!(n <= pending);
                            model.drain(..n);
                        }
                        Err(DspError::Underflow { requested, available }) => {
                            prop_assert_eq!(requested, n);
                            prop_assert_eq!(available, pending);
                        }
                        Err(other) => prop_assert!(false, "unexpected consume error: {other}"),
                    }
                }
            }

            check_invariants(&buf);
            let expected: Vec<u8> = model.iter().copied().collect();
            prop_assert_eq!(buf.pending(), expected.as_slice());
            prop_assert_eq!(buf.ready_for_decode(), model.len() >= threshold);
        }
    }

    #[test]
    fn prop_drain_mode_ready_iff_non_empty(
        fill in 0usize..128,
        threshold in 1usize..256,
    ) {
        let mut buf = StreamBuffer::new(256, threshold);
        buf.append(&vec![0u8; fill]).unwrap();
        buf.mark_end_of_stream();
        prop_assert_eq!(buf.ready_for_decode(), fill > 0);
    }
}
