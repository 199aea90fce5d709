use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use h5_ingest::container::{LeafNode, RawArray};
use h5_ingest::processing::{impute_missing, normalize};
use h5_ingest::types::Datum;
use std::hint::black_box;

/// `rows x cols` float matrix with every seventh cell missing.
fn make_leaf(rows: usize, cols: usize) -> LeafNode {
    let elements = (0..rows * cols)
        .map(|i| if i % 7 == 3 { Datum::Missing } else { Datum::Float(i as f64 * 0.5) })
        .collect();
    LeafNode {
        path: "bench/run7/matrix".to_string(),
        array: RawArray::new(vec![rows, cols], elements),
    }
}

fn bench_normalize_impute(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_impute");

    for rows in [100usize, 1_000, 10_000] {
        let leaf = make_leaf(rows, 8);
        group.bench_with_input(BenchmarkId::new("rank2_x8", rows), &leaf, |b, leaf| {
            b.iter(|| {
                let mut frame = normalize(leaf.clone()).unwrap();
                let filled = impute_missing(&mut frame);
                black_box((frame.row_count(), filled))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize_impute);
criterion_main!(benches);
