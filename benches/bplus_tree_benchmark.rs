use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ordinal_gc::collections::BPlusTree;

fn insert_sequential(c: &mut Criterion) {
    c.bench_function("bplus_tree_insert_sequential_10k", |b| {
        b.iter(|| {
            let mut t = BPlusTree::new();
            for i in 0..10_000i64 {
                t.insert(black_box(i), i);
            }
            black_box(t.len())
        });
    });
}

fn lookup_random(c: &mut Criterion) {
    let mut t = BPlusTree::new();
    for i in 0..10_000i64 {
        t.insert(i, i);
    }
    c.bench_function("bplus_tree_lookup_10k", |b| {
        b.iter(|| {
            for i in (0..10_000i64).step_by(7) {
                black_box(t.get(&i));
            }
        });
    });
}

fn find_ith(c: &mut Criterion) {
    let mut t = BPlusTree::new();
    for i in 0..10_000i64 {
        t.insert(i, i);
    }
    c.bench_function("bplus_tree_find_ith_10k", |b| {
        b.iter(|| {
            for i in (0..10_000usize).step_by(13) {
                black_box(t.find_ith(i));
            }
        });
    });
}

criterion_group!(benches, insert_sequential, lookup_random, find_ith);
criterion_main!(benches);
