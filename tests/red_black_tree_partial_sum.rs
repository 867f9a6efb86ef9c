//! Integration coverage for spec.md §8 scenario 3 and the monotone
//! reduction inverse law.

use ordinal_gc::collections::reduction::SumReduce;
use ordinal_gc::collections::RedBlackTree;

const DVALUE: i64 = 10_000;

#[test]
fn reduce_lub_and_find_sum_glb_match_closed_form() {
    let mut t = RedBlackTree::with_reduce(SumReduce::new(|v: &i64| *v as u64));
    for k in 0..7i64 {
        t.insert(k, 10 * k);
    }
    t.verify_ok().unwrap();

    for k in 0..7i64 {
        let expected = (k + 1) as u64 * 5 * k as u64;
        assert_eq!(t.reduce_lub(&k, true), expected, "reduce_lub({k}, true)");
    }

    // k = 0's own contribution is 0 (value 10*0), so y = 0 there — the
    // inverse is only well-defined once the threshold exceeds the
    // smallest key's own value, so this starts at k = 1.
    for k in 1..7i64 {
        let y = (k + 1) as u64 * 5 * k as u64;
        assert_eq!(t.find_sum_glb(&y), Some((&k, &(10 * k))), "find_sum_glb({y})");
    }
}

#[test]
fn reduction_inverse_law_holds_after_random_order_overwrite() {
    let mut t = RedBlackTree::with_reduce(SumReduce::new(|v: &i64| *v as u64));
    for k in 0..7i64 {
        t.insert(k, DVALUE + 10 * k);
    }
    t.verify_ok().unwrap();

    for k in 0..7i64 {
        let expected = (k + 1) as u64 * (5 * k as u64 + DVALUE as u64);
        assert_eq!(t.reduce_lub(&k, true), expected);
    }

    for k in 0..7i64 {
        let y = (k + 1) as u64 * (5 * k as u64 + DVALUE as u64);
        assert_eq!(t.find_sum_glb(&y), Some((&k, &(DVALUE + 10 * k))));
    }
}

#[test]
fn value_guard_keeps_ancestor_sums_consistent_after_overwrite() {
    let mut t = RedBlackTree::with_reduce(SumReduce::new(|v: &i64| *v as u64));
    let order = [3, 1, 5, 0, 6, 2, 4];
    for &k in &order {
        t.insert(k, 10 * k);
    }
    for &k in &order {
        let mut g = t.get_mut_tracked(&k).unwrap();
        *g = DVALUE + 10 * k;
    }
    t.verify_ok().unwrap();
    for k in 0..7i64 {
        let expected = (k + 1) as u64 * (5 * k as u64 + DVALUE as u64);
        assert_eq!(t.reduce_lub(&k, true), expected);
    }
}
