use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ordinal_gc::collections::reduction::SumReduce;
use ordinal_gc::collections::RedBlackTree;

fn insert_sequential(c: &mut Criterion) {
    c.bench_function("red_black_tree_insert_sequential_10k", |b| {
        b.iter(|| {
            let mut t = RedBlackTree::new();
            for i in 0..10_000i64 {
                t.insert(black_box(i), i);
            }
            black_box(t.len())
        });
    });
}

fn reduce_lub_with_sum(c: &mut Criterion) {
    let mut t = RedBlackTree::with_reduce(SumReduce::new(|v: &i64| *v as u64));
    for i in 0..10_000i64 {
        t.insert(i, i);
    }
    c.bench_function("red_black_tree_reduce_lub_10k", |b| {
        b.iter(|| {
            for i in (0..10_000i64).step_by(11) {
                black_box(t.reduce_lub(&i, true));
            }
        });
    });
}

fn remove_every_third(c: &mut Criterion) {
    c.bench_function("red_black_tree_remove_every_third_10k", |b| {
        b.iter_batched(
            || {
                let mut t = RedBlackTree::new();
                for i in 0..10_000i64 {
                    t.insert(i, i);
                }
                t
            },
            |mut t| {
                for i in (0..10_000i64).step_by(3) {
                    black_box(t.remove(&i));
                }
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, insert_sequential, reduce_lub_with_sum, remove_every_third);
criterion_main!(benches);
