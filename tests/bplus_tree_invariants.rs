//! Integration coverage for spec.md §8 scenario 2 (B+-tree growth/shrink)
//! and the ordinal round-trip law.

use ordinal_gc::collections::BPlusTree;

fn lcg(seed: &mut u64) -> u64 {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    *seed
}

fn shuffled(n: usize, seed: u64) -> Vec<i64> {
    let mut v: Vec<i64> = (0..n as i64).collect();
    let mut s = seed;
    for i in (1..v.len()).rev() {
        let j = (lcg(&mut s) as usize) % (i + 1);
        v.swap(i, j);
    }
    v
}

#[test]
fn empty_tree_iterates_as_empty() {
    let t: BPlusTree<i64, i64> = BPlusTree::new();
    assert_eq!(t.iter().count(), 0);
    assert!(t.is_empty());
    t.verify_ok().unwrap();
}

#[test]
fn growth_and_shrink_with_random_permutations_stays_valid() {
    let mut t = BPlusTree::new();
    for key in shuffled(1023, 1) {
        t.insert(key, key * 2);
        t.verify_ok().expect("tree must be valid after every insert");
    }
    assert_eq!(t.len(), 1023);

    for key in shuffled(1023, 2) {
        t.remove(&key);
        t.verify_ok().expect("tree must be valid after every removal");
    }
    assert_eq!(t.len(), 0);
    assert!(t.iter().next().is_none());
}

#[test]
fn ordinal_round_trip_survives_erase_and_reinsert() {
    let mut t = BPlusTree::new();
    for key in shuffled(200, 3) {
        t.insert(key, key);
    }
    let before: Vec<(i64, i64)> = (0..200).map(|i| {
        let (k, v) = t.find_ith(i).unwrap();
        (*k, *v)
    }).collect();

    t.remove(&50);
    t.insert(50, 50);

    for i in 0..200usize {
        let (k, v) = t.find_ith(i).unwrap();
        assert_eq!((*k, *v), before[i]);
    }
}

#[test]
fn insert_is_idempotent_on_value_replace() {
    let mut t = BPlusTree::new();
    assert_eq!(t.insert(1, "a"), None);
    assert_eq!(t.insert(1, "b"), Some("a"));
    assert_eq!(t.get(&1), Some(&"b"));
    assert_eq!(t.len(), 1);
}
