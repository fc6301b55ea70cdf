use std::collections::BTreeMap;
use std::mem;

use proptest::strategy::{Just, Strategy};

use crate::{FingerTree, TreeError};

const KEY_RANGE: u16 = 512;

#[derive(Copy, Clone, Debug)]
pub enum Op {
    Insert(u16),
    FingerInsert(u16),
    Delete(u16),
    Search(u16),
    FingerSearch(u16),
    DeleteMax,
    SplitJoin(u16),
}

proptest::prop_compose! {
    fn key_strategy()(
        key in 0u16..KEY_RANGE,
    ) -> u16 {
        key
    }
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        3 => key_strategy().prop_map(Op::Insert),
        3 => key_strategy().prop_map(Op::FingerInsert),
        2 => key_strategy().prop_map(Op::Delete),
        1 => key_strategy().prop_map(Op::Search),
        1 => key_strategy().prop_map(Op::FingerSearch),
        1 => Just(Op::DeleteMax),
        1 => key_strategy().prop_map(Op::SplitJoin),
    ]
}

fn value_of(key: u16) -> u32 {
    u32::from(key) * 7 + 1
}

pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut btree = BTreeMap::new();
    let mut tree = FingerTree::new();

    for (op_id, op) in ops.into_iter().enumerate() {
        match op {
            Op::Insert(key) | Op::FingerInsert(key) => {
                let from_tree = if let Op::Insert(_) = op {
                    tree.insert(key, value_of(key))
                } else {
                    tree.finger_insert(key, value_of(key))
                };
                if btree.insert(key, value_of(key)).is_some() {
                    assert_eq!(
                        from_tree.err(),
                        Some(TreeError::DuplicateKey),
                        "Op #{op_id}: {op:?}"
                    );
                } else {
                    let inserted = from_tree.expect("fresh key rejected");
                    assert_eq!(*inserted.node.key(), key, "Op #{op_id}: {op:?}");
                }
            }

            Op::Delete(key) => {
                let handle = tree.search(&key).node.map(|node| node.handle());
                let from_tree = handle.map(|handle| tree.delete(handle));
                let from_btree = btree.remove(&key).map(|value| Ok((key, value)));
                assert_eq!(from_btree, from_tree, "Op #{op_id}: {op:?}");
            }

            Op::Search(key) | Op::FingerSearch(key) => {
                let found = if let Op::Search(_) = op {
                    tree.search(&key)
                } else {
                    tree.finger_search(&key)
                };
                let from_tree = found.node.map(|node| *node.value());
                assert_eq!(btree.get(&key).copied(), from_tree, "Op #{op_id}: {op:?}");
                if from_tree.is_some() {
                    assert!(found.cost >= 1);
                }
            }

            Op::DeleteMax => {
                let handle = tree.max().map(|node| node.handle());
                let from_tree = handle.map(|handle| tree.delete(handle));
                let from_btree = btree.pop_last().map(Ok);
                assert_eq!(from_btree, from_tree, "Op #{op_id}: {op:?}");
            }

            Op::SplitJoin(key) => {
                let handle = match tree.search(&key).node {
                    Some(node) => node.handle(),
                    None => continue,
                };
                let split = mem::take(&mut tree).split(handle).expect("split failed");
                split.left.check_consistency();
                split.right.check_consistency();
                assert!(split.left.iter().map(|(k, _)| k).eq(btree.range(..key).map(|(k, _)| k)));
                assert!(split
                    .right
                    .iter()
                    .map(|(k, _)| k)
                    .eq(btree.range(key + 1..).map(|(k, _)| k)));

                // Alternate which half the join is called on
                tree = if key % 2 == 0 {
                    let mut joined = split.left;
                    joined.join(split.right, split.key, split.value).expect("join failed");
                    joined
                } else {
                    let mut joined = split.right;
                    joined.join(split.left, split.key, split.value).expect("join failed");
                    joined
                };
            }
        }

        tree.check_consistency();
        assert_eq!(btree.len(), tree.len());
        assert!(btree.iter().eq(tree.iter()));
        assert_eq!(
            btree.last_key_value(),
            tree.max().map(|node| (node.key(), node.value()))
        );
    }
}
