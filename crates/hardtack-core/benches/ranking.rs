//! Ranking and retrieval benchmarks
//!
//! Measures performance of:
//! - Re-ranking candidate sets of increasing size
//! - Cosine search over the SQLite store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hardtack_core::recipe::Recipe;
use hardtack_core::search::Candidate;
use hardtack_core::{HashingEmbedder, Ranker, RankingWeights, RecipeStore};
use serde_json::json;
use std::collections::BTreeMap;

const TAGS: &[&str] = &[
    "dessert", "vegan", "dinner", "soup", "spicy", "baked", "quick", "winter", "citrus", "grill",
];

fn candidates(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| {
            let tags: Vec<&str> = (0..3).map(|t| TAGS[(i + t * 3) % TAGS.len()]).collect();
            let mut metadata = BTreeMap::new();
            metadata.insert("dish_name".to_string(), json!(format!("Dish {}", i % (n / 2 + 1))));
            metadata.insert("tags".to_string(), json!(tags));
            metadata.insert(
                "date_added".to_string(),
                json!(format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1)),
            );
            Candidate {
                recipe_id: format!("r{:05}", i),
                raw_score: ((i * 7919) % 1000) as f64 / 1000.0,
                metadata,
            }
        })
        .collect()
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    let ranker = Ranker::new(RankingWeights::default())
        .with_preferences([("tags".to_string(), json!("vegan"))]);

    for size in [10, 50, 200] {
        let input = candidates(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| ranker.rank(black_box(input)));
        });
    }

    group.finish();
}

fn bench_store_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_search");
    let embedder = HashingEmbedder::default();
    let store = RecipeStore::open_in_memory().unwrap();

    for i in 0..500 {
        let recipe = Recipe {
            id: format!("r{:05}", i),
            dish_name: format!("Dish {}", i),
            tags: (0..3).map(|t| TAGS[(i + t) % TAGS.len()].to_string()).collect(),
            ..Default::default()
        };
        let embedding = embedder.embed_text(&recipe.embedding_text());
        store
            .insert_recipe(&recipe, "feature-hashing", &embedding)
            .unwrap();
    }

    let query = embedder.embed_text("spicy vegan soup");
    let filters = BTreeMap::new();
    for top_k in [5, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(top_k), &top_k, |b, &top_k| {
            b.iter(|| {
                store
                    .search_similar(black_box(&query), &filters, top_k)
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_rank, bench_store_search);
criterion_main!(benches);
