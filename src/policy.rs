//! Rules that keep the command buffer small.
//!
//! Both functions are pure: they take the current queue and the incoming
//! command and hand back the queue that should replace it. Surviving entries
//! always keep their relative order.

use alloc::vec::Vec;

use log::trace;

use crate::command::{chunks, Command};

/// Drop or shrink buffered commands made redundant by `incoming`.
///
/// A write removes earlier writes to the same block and trims an erase whose
/// first or last block it lands on. A write strictly inside an erase leaves
/// that erase alone; queue order still makes the write win on flush.
///
/// An erase removes buffered writes inside its range and buffered erases it
/// fully contains.
pub fn coalesce(queue: &[Command], incoming: &Command) -> Vec<Command> {
    match *incoming {
        Command::Write { lba, .. } => queue
            .iter()
            .filter_map(|cmd| coalesce_under_write(cmd, lba))
            .collect(),
        Command::Erase { lba, size } => {
            let end = lba + size;
            queue
                .iter()
                .filter(|cmd| match **cmd {
                    Command::Write { lba: w, .. } if lba <= w && w < end => {
                        trace!("erase [{}, {}) drops write to {}", lba, end, w);
                        false
                    }
                    Command::Erase { lba: s, size: n } if lba <= s && s + n <= end => {
                        trace!("erase [{}, {}) drops erase [{}, {})", lba, end, s, s + n);
                        false
                    }
                    _ => true,
                })
                .copied()
                .collect()
        }
        Command::Read { .. } => queue.to_vec(),
    }
}

fn coalesce_under_write(cmd: &Command, w: usize) -> Option<Command> {
    match *cmd {
        Command::Write { lba, .. } if lba == w => {
            trace!("write to {} supersedes buffered write", w);
            None
        }
        Command::Erase { lba, size } if cmd.covers(w) => {
            let end = lba + size;
            if w == lba {
                trace!("write to {} trims head of erase [{}, {})", w, lba, end);
                shrunk_erase(lba + 1, end)
            } else if w == end - 1 {
                trace!("write to {} trims tail of erase [{}, {})", w, lba, end);
                shrunk_erase(lba, end - 1)
            } else {
                Some(*cmd)
            }
        }
        _ => Some(*cmd),
    }
}

fn shrunk_erase(start: usize, end: usize) -> Option<Command> {
    if start < end {
        Some(Command::Erase {
            lba: start,
            size: end - start,
        })
    } else {
        None
    }
}

/// Fold buffered erases that overlap or touch `[lba, lba + size)` into one
/// range, then append that range re-split into `chunk_size` erases.
///
/// The queue is walked once, front to back. An erase only joins if it touches
/// the range as grown so far; entries already passed are not revisited.
pub fn merge_erase(queue: &[Command], lba: usize, size: usize, chunk_size: usize) -> Vec<Command> {
    let mut start = lba;
    let mut end = lba + size;
    let mut survivors = Vec::with_capacity(queue.len() + 1);

    for cmd in queue {
        match *cmd {
            Command::Erase { lba: s, size: n } if touches(start, end, s, s + n) => {
                trace!("merging erase [{}, {}) into [{}, {})", s, s + n, start, end);
                start = start.min(s);
                end = end.max(s + n);
            }
            _ => survivors.push(*cmd),
        }
    }

    survivors.extend(chunks(start, end, chunk_size));
    survivors
}

/// Half-open ranges that overlap or sit directly next to each other.
fn touches(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    a_start <= b_end && b_start <= a_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MAX_ERASE_LBA, NUM_LBA};
    use crate::value::Value;

    fn w(lba: usize, v: u32) -> Command {
        Command::Write { lba, value: Value(v) }
    }

    fn e(lba: usize, size: usize) -> Command {
        Command::Erase { lba, size }
    }

    #[test]
    fn test_write_supersedes_write() {
        let queue = [w(1, 1), w(2, 2), w(1, 3)];
        assert_eq!(coalesce(&queue, &w(1, 4)), vec![w(2, 2)]);
    }

    #[test]
    fn test_write_trims_erase_head() {
        assert_eq!(coalesce(&[e(10, 5)], &w(10, 1)), vec![e(11, 4)]);
    }

    #[test]
    fn test_write_trims_erase_tail() {
        assert_eq!(coalesce(&[e(10, 5)], &w(14, 1)), vec![e(10, 4)]);
    }

    #[test]
    fn test_write_removes_single_block_erase() {
        assert_eq!(coalesce(&[w(0, 0), e(10, 1)], &w(10, 1)), vec![w(0, 0)]);
    }

    #[test]
    fn test_write_inside_erase_leaves_it() {
        assert_eq!(coalesce(&[e(10, 5)], &w(12, 1)), vec![e(10, 5)]);
    }

    #[test]
    fn test_write_outside_erase_leaves_it() {
        assert_eq!(coalesce(&[e(10, 5)], &w(15, 1)), vec![e(10, 5)]);
        assert_eq!(coalesce(&[e(10, 5)], &w(9, 1)), vec![e(10, 5)]);
    }

    #[test]
    fn test_erase_drops_covered_writes() {
        let queue = [w(4, 1), w(5, 2), w(9, 3), w(10, 4)];
        assert_eq!(coalesce(&queue, &e(5, 5)), vec![w(4, 1), w(10, 4)]);
    }

    #[test]
    fn test_erase_drops_contained_erases_only() {
        let queue = [e(0, 3), e(2, 2), e(5, 4), e(8, 4)];
        assert_eq!(coalesce(&queue, &e(2, 8)), vec![e(0, 3), e(8, 4)]);
    }

    #[test]
    fn test_coalesce_keeps_order() {
        let queue = [w(1, 1), e(20, 2), w(2, 2), w(3, 3), e(30, 1)];
        assert_eq!(
            coalesce(&queue, &w(2, 9)),
            vec![w(1, 1), e(20, 2), w(3, 3), e(30, 1)]
        );
    }

    #[test]
    fn test_read_changes_nothing() {
        let queue = [w(1, 1), e(1, 3)];
        assert_eq!(coalesce(&queue, &Command::Read { lba: 1 }), queue.to_vec());
    }

    #[test]
    fn test_merge_adjacent() {
        assert_eq!(merge_erase(&[e(0, 4)], 4, 3, MAX_ERASE_LBA), vec![e(0, 7)]);
        assert_eq!(merge_erase(&[e(4, 3)], 0, 4, MAX_ERASE_LBA), vec![e(0, 7)]);
    }

    #[test]
    fn test_merge_overlapping_resplits() {
        assert_eq!(
            merge_erase(&[e(0, 10)], 7, 10, MAX_ERASE_LBA),
            vec![e(0, 10), e(10, 7)]
        );
    }

    #[test]
    fn test_merge_leaves_distant_erase_and_writes() {
        let queue = [w(3, 1), e(20, 2), e(5, 2)];
        assert_eq!(
            merge_erase(&queue, 7, 2, MAX_ERASE_LBA),
            vec![w(3, 1), e(20, 2), e(5, 4)]
        );
    }

    #[test]
    fn test_merge_single_pass() {
        // [12, 14) does not touch [8, 10) until [10, 12) joins, which comes later.
        let queue = [e(12, 2), e(10, 2)];
        assert_eq!(
            merge_erase(&queue, 8, 2, MAX_ERASE_LBA),
            vec![e(12, 2), e(8, 4)]
        );
    }

    #[test]
    fn test_merge_chains_forward() {
        let queue = [e(10, 2), e(12, 2)];
        assert_eq!(merge_erase(&queue, 8, 2, MAX_ERASE_LBA), vec![e(8, 6)]);
    }

    use proptest::prelude::*;

    fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            (0..NUM_LBA, any::<u32>()).prop_map(|(lba, v)| w(lba, v)),
            (0..NUM_LBA)
                .prop_flat_map(|lba| (Just(lba), 1..=MAX_ERASE_LBA.min(NUM_LBA - lba)))
                .prop_map(|(lba, size)| e(lba, size)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(5))]
        #[test]
        fn test_coalesce_is_order_preserving_subset(
            queue in proptest::collection::vec(arb_command(), 0..8),
            incoming in arb_command(),
        ) {
            let out = coalesce(&queue, &incoming);
            prop_assert!(out.len() <= queue.len());
            // Every survivor maps to a distinct queue entry at a later index.
            let mut idx = 0;
            for cmd in &out {
                let lba = cmd.lba();
                let found = queue[idx..].iter().position(|orig| match (orig, cmd) {
                    (Command::Write { .. }, Command::Write { .. }) => orig == cmd,
                    (Command::Erase { lba: s, size }, Command::Erase { .. }) => {
                        lba >= *s && cmd_end(cmd) <= s + size
                    }
                    _ => false,
                });
                prop_assert!(found.is_some());
                idx += found.unwrap() + 1;
            }
        }

        #[test]
        fn test_merge_chunks_are_bounded(
            queue in proptest::collection::vec(arb_command(), 0..8),
            incoming in arb_command(),
        ) {
            if let Command::Erase { lba, size } = incoming {
                let out = merge_erase(&queue, lba, size, MAX_ERASE_LBA);
                for cmd in &out {
                    if let Command::Erase { lba, size } = *cmd {
                        prop_assert!(size >= 1 && size <= MAX_ERASE_LBA);
                        prop_assert!(lba + size <= NUM_LBA);
                    }
                }
                let covered = (lba..lba + size).all(|i| {
                    out.iter()
                        .any(|c| matches!(c, Command::Erase { .. }) && c.covers(i))
                });
                prop_assert!(covered);
            }
        }
    }

    fn cmd_end(cmd: &Command) -> usize {
        match *cmd {
            Command::Erase { lba, size } => lba + size,
            _ => cmd.lba() + 1,
        }
    }
}
