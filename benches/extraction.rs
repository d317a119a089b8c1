//! Extraction benchmarks: statistical, lexical and syntactic passes over a synthetic batch.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jsguard_features::config::{LexicalConfig, SyntacticConfig};
use jsguard_features::features::{LexicalExtractor, StatisticalExtractor, SyntacticExtractor};
use jsguard_features::table::FeatureTable;

fn make_batch(n: usize) -> FeatureTable {
    FeatureTable::from_sources((0..n).map(|i| {
        if i % 2 == 0 {
            format!(
                "var el{} = document.createElement('script'); el{}.src = '/s/' + {}; document.body.appendChild(el{});",
                i, i, i, i
            )
        } else {
            format!("eval(unescape('%61%6c%65%72%74%28{}%29'));", i)
        }
    }))
}

fn bench_statistical(c: &mut Criterion) {
    let table = make_batch(200);
    let extractor = StatisticalExtractor::new();
    c.bench_function("statistical_200_rows", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&table))).unwrap())
    });
}

fn bench_lexical(c: &mut Criterion) {
    let table = make_batch(200);
    let extractor = LexicalExtractor::new(LexicalConfig::default());
    c.bench_function("lexical_fit_transform_200_rows", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&table))).unwrap())
    });
}

fn bench_syntactic(c: &mut Criterion) {
    let table = make_batch(200);
    let mut g = c.benchmark_group("syntactic_200_rows");
    for workers in [1, 4] {
        let extractor = SyntacticExtractor::new(&SyntacticConfig {
            workers,
            ..SyntacticConfig::default()
        });
        g.bench_function(format!("workers_{}", workers).as_str(), |b| {
            b.iter(|| black_box(extractor.extract(black_box(&table))).unwrap())
        });
    }
    g.finish();
}

criterion_group!(benches, bench_statistical, bench_lexical, bench_syntactic);
criterion_main!(benches);
