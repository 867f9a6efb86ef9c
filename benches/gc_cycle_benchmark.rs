use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ordinal_gc::gc::types::GcString;
use ordinal_gc::gc::{GcAllocator, GcConfig, GenerationalGc};

fn minor_gc_half_rooted(c: &mut Criterion) {
    c.bench_function("minor_gc_2000_strings_half_rooted", |b| {
        b.iter_batched(
            || {
                let mut gc = GenerationalGc::new("bench", GcConfig::default());
                let mut roots = Vec::new();
                for i in 0..2000 {
                    let addr = GcString::new(&mut gc, "payload").unwrap();
                    if i % 2 == 0 {
                        roots.push(addr);
                    }
                }
                (gc, roots)
            },
            |(mut gc, mut roots)| {
                for r in roots.iter_mut() {
                    unsafe {
                        gc.add_root(r as *mut usize);
                    }
                }
                gc.request_minor_gc().unwrap();
                black_box(gc.statistics());
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

fn raw_allocation_throughput(c: &mut Criterion) {
    c.bench_function("gc_raw_alloc_throughput", |b| {
        b.iter(|| {
            let mut gc = GenerationalGc::new("bench", GcConfig::default());
            for _ in 0..4000 {
                black_box(gc.alloc(32).unwrap());
            }
        });
    });
}

criterion_group!(benches, minor_gc_half_rooted, raw_allocation_throughput);
criterion_main!(benches);
