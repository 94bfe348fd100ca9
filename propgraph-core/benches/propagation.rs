use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use propgraph_core::{DerivedOptions, PropertySchema, SchemaBuilder, Value};

/// One leaf feeding a chain of `depth` derived nodes, each also reading the
/// leaf directly.
fn chain_schema(depth: usize, pushable: bool) -> Arc<PropertySchema<()>> {
    let mut builder = SchemaBuilder::<()>::new("bench");
    builder.declare_leaf("root", &[]).unwrap();
    let mut prev = "root".to_string();
    for i in 0..depth {
        let name = format!("d{i}");
        let mut options = DerivedOptions::default();
        if pushable {
            options = options.pushable();
        }
        builder
            .declare_derived(
                &name,
                &[prev.as_str(), "root"],
                |_, args| Value::Int(args[0].as_int().unwrap_or(0) + args[1].as_int().unwrap_or(0)),
                options,
            )
            .unwrap();
        prev = name;
    }
    Arc::new(builder.finalize().unwrap())
}

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaf_update_push");
    for depth in [8usize, 64, 256] {
        let schema = chain_schema(depth, true);
        let mut inst = schema.instantiate(());
        let mut v = 0i64;
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                v += 1;
                inst.write("root", black_box(v)).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_pull(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaf_update_pull");
    for depth in [8usize, 64, 256] {
        let schema = chain_schema(depth, false);
        let mut inst = schema.instantiate(());
        let tail = format!("d{}", depth - 1);
        let mut v = 0i64;
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                v += 1;
                inst.write("root", black_box(v)).unwrap();
                black_box(inst.read(&tail).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_memoized_read(c: &mut Criterion) {
    let schema = chain_schema(64, false);
    let mut inst = schema.instantiate(());
    inst.write("root", 1).unwrap();
    inst.read("d63").unwrap();

    c.bench_function("memoized_read", |b| {
        b.iter(|| black_box(inst.read("d63").unwrap()))
    });
}

criterion_group!(benches, bench_push, bench_pull, bench_memoized_read);
criterion_main!(benches);
