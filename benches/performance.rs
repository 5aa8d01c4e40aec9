#![allow(missing_docs)]

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use mapcode::{Mapcode, MapcodeObject, Serializer, Type};
use std::hint::black_box;
use std::io::Cursor;

#[derive(Clone, Debug, Default, MapcodeObject)]
struct BenchItem {
    id: u64,
    label: String,
    payload: Vec<u64>,
}

#[derive(Clone, Debug, Default, MapcodeObject)]
struct BenchCollection {
    #[mapcode(elements = "compiled")]
    data: Vec<BenchItem>,
}

#[derive(Clone, Debug, Default, MapcodeObject)]
struct BenchCollectionDyn {
    #[mapcode(elements = "dynamic")]
    data: Vec<BenchItem>,
}

fn generate_items(count: usize) -> Vec<BenchItem> {
    (0..count)
        .map(|i| BenchItem {
            id: i as u64,
            label: format!("item_{i}"),
            payload: vec![i as u64; 128], // ~1KB
        })
        .collect()
}

// --- BENCHMARKS ---

fn bench_writers(c: &mut Criterion) {
    let item_count = 10_000;
    let items = generate_items(item_count);
    let compiled = BenchCollection {
        data: items.clone(),
    };
    let dynamic = BenchCollectionDyn { data: items };
    // Same payload as plain tuples, for the bincode baseline.
    let raw_data: Vec<(u64, String, Vec<u64>)> = compiled
        .data
        .iter()
        .map(|item| (item.id, item.label.clone(), item.payload.clone()))
        .collect();

    println!("Writers Item count: {}", item_count);

    let mut group = c.benchmark_group("Serialization Write");
    group.throughput(Throughput::Bytes((item_count * 1040) as u64));

    // 1. Baseline: Bincode
    group.bench_function("bincode_serialize", |b| {
        let mut buffer = Vec::new();
        b.iter(|| {
            buffer.clear();
            bincode::serde::encode_into_std_write(
                black_box(&raw_data),
                &mut Cursor::new(&mut buffer),
                bincode::config::legacy(),
            )
            .expect("Bincode serialization failed");
        });
    });

    // 2. Mapcode: compiled engine
    group.bench_function("mapcode_compiled", |b| {
        let mut buffer = Vec::new();
        b.iter(|| {
            buffer.clear();
            Mapcode::write(&mut buffer, black_box(&compiled)).expect("Failed to write");
        });
    });

    // 3. Mapcode: dynamic engine for the elements
    group.bench_function("mapcode_dynamic_elements", |b| {
        let mut buffer = Vec::new();
        b.iter(|| {
            buffer.clear();
            Mapcode::write(&mut buffer, black_box(&dynamic)).expect("Failed to write");
        });
    });

    // 4. Mapcode: dynamic engine end to end
    group.bench_function("mapcode_dynamic_root", |b| {
        let serializer = Mapcode::default_serializer();
        b.iter(|| {
            serializer
                .serialize_dyn(black_box(&dynamic), Type::of::<BenchCollectionDyn>())
                .expect("Failed to write");
        });
    });

    group.finish();
}

fn bench_readers(c: &mut Criterion) {
    let item_count = 10_000;
    let items = generate_items(item_count);

    println!("Readers Item count: {}", item_count);

    let compiled_buffer =
        Mapcode::serialize(&BenchCollection { data: items.clone() }).expect("Failed to write");
    let dynamic_buffer =
        Mapcode::serialize(&BenchCollectionDyn { data: items }).expect("Failed to write");
    assert_eq!(compiled_buffer, dynamic_buffer);

    let mut group = c.benchmark_group("Deserialization Read");

    group.bench_function("mapcode_compiled", |b| {
        b.iter(|| {
            let _res: BenchCollection =
                Mapcode::deserialize(black_box(&compiled_buffer)).expect("Failed to read");
        });
    });

    group.bench_function("mapcode_dynamic_elements", |b| {
        b.iter(|| {
            let _res: BenchCollectionDyn =
                Mapcode::deserialize(black_box(&dynamic_buffer)).expect("Failed to read");
        });
    });

    group.finish();
}

fn bench_cold_start(c: &mut Criterion) {
    let item = generate_items(1).remove(0);

    let mut group = c.benchmark_group("Mapping Build");

    // Measures list construction plus closure compilation on an empty cache.
    group.bench_function("cold_serializer", |b| {
        b.iter(|| {
            let serializer = Serializer::default();
            serializer.serialize(black_box(&item)).expect("Failed to write");
        });
    });

    group.finish();
}

criterion_group!(benches, bench_writers, bench_readers, bench_cold_start);
criterion_main!(benches);
