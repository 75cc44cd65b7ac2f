//! Property tests: random splice sequences are mirrored against a flat
//! vector model, then every query is checked against the model.

use std::cmp::Ordering;

use proptest::prelude::*;

use cord::{Cord, Removed};

// =============================================================================
// Operations and the reference model
// =============================================================================

/// The model is the live sequence as a flat list of (id, len), root excluded.
type Model = Vec<(u64, i64)>;

#[derive(Clone, Debug)]
enum Op {
    /// Insert after the entry at `anchor % (len + 1)` (0 = root).
    Insert { anchor: usize, len: usize },
    /// Delete from after `anchor` through the entry picked by `until`;
    /// picking the root id (or an anchor-preceding id) exercises the
    /// permissive delete-to-end path.
    Delete { anchor: usize, until: usize },
    /// Delete then insert in a single splice.
    Replace { anchor: usize, until: usize, len: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), 0usize..5).prop_map(|(anchor, len)| Op::Insert { anchor, len }),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(anchor, until)| Op::Delete { anchor, until }),
        1 => (any::<usize>(), any::<usize>(), 0usize..5)
            .prop_map(|(anchor, until, len)| Op::Replace { anchor, until, len }),
    ]
}

fn pick_anchor(model: &Model, raw: usize) -> (usize, u64) {
    let slot = raw % (model.len() + 1);
    let id = if slot == 0 { 0 } else { model[slot - 1].0 };
    (slot, id)
}

/// Mirrors the deletion walk: drop entries starting at `slot` until the
/// until-id is dropped, or the end is reached.
fn model_delete(model: &mut Model, slot: usize, until_id: u64) -> Model {
    let mut removed = Vec::new();
    while slot < model.len() {
        let entry = model.remove(slot);
        removed.push(entry);
        if entry.0 == until_id {
            break;
        }
    }
    removed
}

fn apply(cord: &mut Cord<u64, String>, model: &mut Model, next_id: &mut u64, op: &Op) {
    match *op {
        Op::Insert { anchor, len } => {
            let (slot, after) = pick_anchor(model, anchor);
            *next_id += 1;
            let id = *next_id;
            cord.insert(&after, id, "x".repeat(len)).unwrap();
            model.insert(slot, (id, len as i64));
        }
        Op::Delete { anchor, until } => {
            let (slot, after) = pick_anchor(model, anchor);
            let (_, until_id) = pick_anchor(model, until);
            let removed = cord.delete(&after, &until_id).unwrap();
            if until_id == after {
                assert!(removed.is_empty(), "same-anchor delete must be a no-op");
                return;
            }
            let expected = model_delete(model, slot, until_id);
            let got: Model = removed.iter().map(|r| (r.id, r.len)).collect();
            assert_eq!(got, expected, "removed run disagrees with the model");
        }
        Op::Replace { anchor, until, len } => {
            let (slot, after) = pick_anchor(model, anchor);
            let (_, until_id) = pick_anchor(model, until);
            *next_id += 1;
            let id = *next_id;
            let removed = cord
                .splice(&after, Some(&until_id), Some((id, "y".repeat(len))))
                .unwrap();
            if until_id != after {
                let expected = model_delete(model, slot, until_id);
                let got: Model = removed.iter().map(|r| (r.id, r.len)).collect();
                assert_eq!(got, expected);
            } else {
                assert!(removed.is_empty());
            }
            model.insert(slot, (id, len as i64));
        }
    }
}

/// What `by_position` must return, computed from the flat model.
fn model_by_position(model: &Model, total: i64, last: u64, p: i64, bias: bool) -> (u64, i64) {
    if p < 0 || (!bias && p == 0) {
        return (0, 0);
    }
    if p > total || (bias && p == total) {
        return (last, 0);
    }
    let mut start = 0;
    for &(id, len) in model {
        let end = start + len;
        let hit = if bias { start <= p && p < end } else { start < p && p <= end };
        if hit {
            return (id, end - p);
        }
        start = end;
    }
    unreachable!("position {p} not covered by the model");
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn queries_agree_with_the_model(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut cord: Cord<u64, String> = Cord::new();
        let mut model: Model = Vec::new();
        let mut next_id = 0;

        for op in &ops {
            apply(&mut cord, &mut model, &mut next_id, op);
        }

        let total: i64 = model.iter().map(|&(_, len)| len).sum();
        let last = model.last().map(|&(id, _)| id).unwrap_or(0);

        // Bookkeeping.
        prop_assert_eq!(cord.len(), total);
        prop_assert_eq!(cord.count(), model.len());
        prop_assert_eq!(cord.is_empty(), model.is_empty());
        prop_assert_eq!(cord.last_id(), last);

        // Iteration matches the model exactly.
        let walked: Model = cord.iter(&0).map(|(id, item)| (*id, item.len)).collect();
        prop_assert_eq!(&walked, &model);

        // Positions, neighbourhood info, and distances per entry.
        let mut pos = 0;
        for (i, &(id, len)) in model.iter().enumerate() {
            pos += len;
            prop_assert_eq!(cord.find(&id), pos, "find({})", id);
            prop_assert_eq!(cord.between(&0, &id), Some(pos));

            let info = cord.info(&id).unwrap();
            prop_assert_eq!(info.len, len);
            let expect_prev = if i == 0 { 0 } else { model[i - 1].0 };
            let expect_next = model.get(i + 1).map(|&(next_id, _)| next_id);
            prop_assert_eq!(info.prev, expect_prev);
            prop_assert_eq!(info.next, expect_next);
        }

        // Every position, both biases.
        for p in -1..=total + 1 {
            for bias in [false, true] {
                let expected = model_by_position(&model, total, last, p, bias);
                prop_assert_eq!(
                    cord.by_position(p, bias),
                    expected,
                    "by_position({}, {})", p, bias
                );
            }
        }

        // Pairwise order agrees with model order; antisymmetric; reflexive.
        for (i, &(a, _)) in model.iter().enumerate().step_by(3) {
            prop_assert_eq!(cord.compare(&a, &a), Some(Ordering::Equal));
            prop_assert_eq!(cord.compare(&0, &a), Some(Ordering::Less));
            for (j, &(b, _)) in model.iter().enumerate().step_by(5) {
                let expected = i.cmp(&j);
                prop_assert_eq!(cord.compare(&a, &b), Some(expected), "compare({}, {})", a, b);
                prop_assert_eq!(
                    cord.compare(&b, &a),
                    Some(expected.reverse()),
                    "antisymmetry({}, {})", a, b
                );
                prop_assert_eq!(cord.less(&a, &b), i < j);
                prop_assert_eq!(cord.between(&a, &b), Some(cord.find(&b) - cord.find(&a)));
            }
        }

        // Deleted ids are really gone.
        for dead in 1..=next_id {
            if model.iter().all(|&(id, _)| id != dead) {
                prop_assert_eq!(cord.find(&dead), -1);
                prop_assert_eq!(cord.info(&dead), None);
                prop_assert_eq!(cord.compare(&dead, &0), None);
            }
        }
    }

    #[test]
    fn insert_then_delete_is_identity(
        ops in prop::collection::vec(arb_op(), 0..30),
        anchor in any::<usize>(),
        len in 0usize..6,
    ) {
        let mut cord: Cord<u64, String> = Cord::new();
        let mut model: Model = Vec::new();
        let mut next_id = 0;

        for op in &ops {
            apply(&mut cord, &mut model, &mut next_id, op);
        }

        let before: Model = cord.iter(&0).map(|(id, item)| (*id, item.len)).collect();
        let (total, count, last) = (cord.len(), cord.count(), cord.last_id());

        let (_, after) = pick_anchor(&model, anchor);
        let id = next_id + 1;
        cord.insert(&after, id, "z".repeat(len)).unwrap();
        let removed = cord.delete(&after, &id).unwrap();

        prop_assert_eq!(
            removed,
            vec![Removed { id, len: len as i64, data: "z".repeat(len) }]
        );
        let restored: Model = cord.iter(&0).map(|(id, item)| (*id, item.len)).collect();
        prop_assert_eq!(restored, before);
        prop_assert_eq!((cord.len(), cord.count(), cord.last_id()), (total, count, last));
    }
}
