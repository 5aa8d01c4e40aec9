#![allow(missing_docs)]
use criterion::{Criterion, criterion_group, criterion_main};
use mapcode::{Mapcode, MapcodeObject};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, MapcodeObject)]
struct MapContainer {
    hashed: HashMap<u64, u64>,
    ordered: BTreeMap<u64, String>,
}

fn bench_map(c: &mut Criterion) {
    let count = 100_000;
    let mut data = MapContainer::default();
    for i in 0..count {
        data.hashed.insert(i, i);
        data.ordered.insert(i, i.to_string());
    }

    let buffer = Mapcode::serialize(&data).expect("Failed to write mapcode data");

    let mut group = c.benchmark_group("Dictionary Codec");

    group.bench_function("encode", |b| {
        b.iter(|| {
            let bytes = Mapcode::serialize(std::hint::black_box(&data)).expect("Failed to write");
            std::hint::black_box(bytes);
        });
    });

    group.bench_function("decode", |b| {
        b.iter(|| {
            let back: MapContainer =
                Mapcode::deserialize(std::hint::black_box(&buffer)).expect("Failed to read");
            std::hint::black_box(back.hashed.get(&50_000).copied());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_map);
criterion_main!(benches);
