use criterion::{criterion_group, criterion_main, Criterion};
use search_core::catalog::Document;
use search_core::tokenizer::normalize;
use search_core::{InvertedIndex, RetrievalEngine, SynonymTable};

const SAMPLE: &str = "Solid Men Multicolor Track Pants. Yorker trackpants made from 100% rich \
    combed cotton giving it a rich look. Designed for comfort, it is skin friendly, light weight \
    and super soft, perfect for running, gym and casual everyday wear.";

fn synthetic_catalog(n: usize) -> Vec<Document> {
    let colours = ["red", "blue", "black", "white", "green", "navy", "olive"];
    let items = ["shoes", "jeans", "shirt", "dress", "jacket", "bag", "trousers"];
    (0..n)
        .map(|i| Document {
            id: format!("P{i:06}"),
            title: format!("{} {} {}", colours[i % colours.len()], items[(i / 7) % items.len()], i % 13),
            description: SAMPLE.to_string(),
            brand: format!("brand{}", i % 50),
            category: "Clothing and Accessories".into(),
            sub_category: items[i % items.len()].into(),
            price: Some((i % 500) as f64),
            rating: None,
            url: None,
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize_description", |b| b.iter(|| normalize(SAMPLE)));
}

fn bench_search(c: &mut Criterion) {
    let engine = RetrievalEngine::new(InvertedIndex::build(synthetic_catalog(5_000)), SynonymTable::builtin());
    c.bench_function("search_red_shoes", |b| b.iter(|| engine.search("cheap red shoes")));
}

criterion_group!(benches, bench_normalize, bench_search);
criterion_main!(benches);
