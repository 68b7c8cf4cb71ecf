//! Property tests: the piece table against a plain `Vec<u8>` replay.

use core_text::alloc::system;
use core_text::{Capacities, PieceTable};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Insert { at: usize, bytes: Vec<u8> },
    Delete { at: usize, len: usize },
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (any::<usize>(), prop::collection::vec(any::<u8>(), 1..12))
            .prop_map(|(at, bytes)| Edit::Insert { at, bytes }),
        (any::<usize>(), 0usize..20).prop_map(|(at, len)| Edit::Delete { at, len }),
    ]
}

fn apply(table: &mut PieceTable, model: &mut Vec<u8>, edit: &Edit) {
    match edit {
        Edit::Insert { at, bytes } => {
            let at = at % (model.len() + 1);
            table.insert(at, bytes).unwrap();
            model.splice(at..at, bytes.iter().copied());
        }
        Edit::Delete { at, len } => {
            let at = at % (model.len() + 1);
            let end = (at + len).min(model.len());
            table.remove_range(at..end).unwrap();
            model.drain(at..end);
        }
    }
}

fn seeded(initial: &[u8]) -> PieceTable {
    let alloc = system();
    let mut table = PieceTable::new(&alloc, Capacities { spans: 2, scratch: 4 });
    table.insert(0, initial).unwrap();
    table
}

proptest! {
    #[test]
    fn matches_linear_replay(initial in prop::collection::vec(any::<u8>(), 0..64),
                             edits in prop::collection::vec(edit(), 0..40)) {
        let mut table = seeded(&initial);
        let mut model = initial.clone();
        for e in &edits {
            apply(&mut table, &mut model, e);
            let walked: usize = table.spans().iter().map(|s| s.len).sum();
            prop_assert_eq!(walked, table.len());
            prop_assert_eq!(table.len(), model.len());
            prop_assert!(table.spans().iter().all(|s| s.len > 0));
        }
        prop_assert_eq!(table.to_vec(), model);
    }

    #[test]
    fn find_agrees_with_prefix_sums(initial in prop::collection::vec(any::<u8>(), 1..48),
                                    edits in prop::collection::vec(edit(), 0..24)) {
        let mut table = seeded(&initial);
        let mut model = initial.clone();
        for e in &edits {
            apply(&mut table, &mut model, e);
        }
        let mut prefix = Vec::with_capacity(table.span_count());
        let mut sum = 0;
        for span in table.spans() {
            prefix.push(sum);
            sum += span.len;
        }
        for at in 0..table.len() {
            let loc = table.find(at).unwrap();
            prop_assert_eq!(loc.start, prefix[loc.index]);
            prop_assert_eq!(loc.start + loc.offset, at);
            prop_assert!(loc.offset < table.spans()[loc.index].len);
            prop_assert_eq!(table.byte(at), Some(model[at]));
        }
        prop_assert!(table.find(table.len()).is_none());
        prop_assert!(table.find(table.len() + 7).is_none());
    }

    #[test]
    fn insert_shifts_suffix(initial in prop::collection::vec(any::<u8>(), 0..48),
                            at in any::<usize>(),
                            text in prop::collection::vec(any::<u8>(), 1..16)) {
        let mut table = seeded(&initial);
        let at = at % (initial.len() + 1);
        let before = table.to_vec();
        table.insert(at, &text).unwrap();
        let after = table.to_vec();
        prop_assert_eq!(after.len(), before.len() + text.len());
        prop_assert_eq!(&after[..at], &before[..at]);
        prop_assert_eq!(&after[at..at + text.len()], &text[..]);
        prop_assert_eq!(&after[at + text.len()..], &before[at..]);
    }

    #[test]
    fn delete_closes_gap(initial in prop::collection::vec(any::<u8>(), 1..48),
                         a in any::<usize>(), b in any::<usize>()) {
        let mut table = seeded(&initial);
        let (mut a, mut b) = (a % (initial.len() + 1), b % (initial.len() + 1));
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        let before = table.to_vec();
        table.remove_range(a..b).unwrap();
        let after = table.to_vec();
        prop_assert_eq!(after.len(), before.len() - (b - a));
        prop_assert_eq!(&after[..a], &before[..a]);
        prop_assert_eq!(&after[a..], &before[b..]);
    }

    #[test]
    fn coalesce_preserves_content(initial in prop::collection::vec(any::<u8>(), 0..32),
                                  edits in prop::collection::vec(edit(), 0..24)) {
        let mut table = seeded(&initial);
        let mut model = initial.clone();
        for e in &edits {
            apply(&mut table, &mut model, e);
        }
        let count = table.span_count();
        table.coalesce();
        prop_assert!(table.span_count() <= count);
        prop_assert_eq!(table.to_vec(), model);
    }
}
