//! Benchmarks pour l'inspection GeoJSON

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn synthetic_collection(n: usize) -> String {
    let features: Vec<String> = (0..n)
        .map(|i| {
            let x = -111.0 + (i % 1000) as f64 * 0.001;
            let y = 40.0 + (i / 1000) as f64 * 0.001;
            format!(
                r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[{x},{y}]}},"properties":{{"NAME":"plant {i}","SUMMER_CAP":{cap},"NUCLEAR":{nuclear}}}}}"#,
                cap = i as f64 * 1.5,
                nuclear = i % 7 == 0
            )
        })
        .collect();
    format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    )
}

fn bench_inspect(c: &mut Criterion) {
    let mut group = c.benchmark_group("inspect");

    for n in [1_000usize, 10_000] {
        let doc = synthetic_collection(n);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), doc.as_bytes(), |b, bytes| {
            b.iter(|| {
                let inspection = geoschema::inspect_bytes(black_box(bytes)).unwrap();
                black_box(inspection.geometry_type)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_inspect);
criterion_main!(benches);
