//! Model-based testing against `std::collections::BTreeMap`, following
//! `halo`'s own `tests/bplus_tree_proptest.rs` pattern of comparing a
//! sequence of operations against the standard library's tree.

use ordinal_gc::collections::BPlusTree;
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, i32),
    Remove(u8),
    Get(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u8>(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        any::<u8>().prop_map(Op::Remove),
        any::<u8>().prop_map(Op::Get),
    ]
}

proptest! {
    #[test]
    fn matches_std_btreemap_behavior(ops in prop::collection::vec(op_strategy(), 0..400)) {
        let mut model: BTreeMap<u8, i32> = BTreeMap::new();
        let mut tree: BPlusTree<u8, i32> = BPlusTree::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let expected = model.insert(k, v);
                    let actual = tree.insert(k, v);
                    prop_assert_eq!(expected, actual);
                }
                Op::Remove(k) => {
                    let expected = model.remove(&k);
                    let actual = tree.remove(&k);
                    prop_assert_eq!(expected, actual);
                }
                Op::Get(k) => {
                    prop_assert_eq!(model.get(&k), tree.get(&k));
                }
            }
        }

        prop_assert_eq!(model.len(), tree.len());
        let model_entries: Vec<(u8, i32)> = model.iter().map(|(&k, &v)| (k, v)).collect();
        let tree_entries: Vec<(u8, i32)> = tree.iter().map(|(&k, &v)| (k, v)).collect();
        prop_assert_eq!(model_entries, tree_entries);
        prop_assert!(tree.verify_ok().is_ok());
    }
}
