#![allow(dead_code)]

use std::sync::Arc;

use imago::{Feature, FeatureKind, FieldSpec, HashFamily, Indexer, MemoryStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn doubles(values: &[f64]) -> Feature {
    Feature::from_doubles(FeatureKind::DoubleHistogram, values.to_vec()).unwrap()
}

pub fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.random_range(0.0..1.0)).collect())
        .collect()
}

/// Index `vectors` as `DoubleHistogram` features, hashed when a family is given.
pub fn build_store(vectors: &[Vec<f64>], family: Option<Arc<dyn HashFamily>>) -> MemoryStore {
    let mut spec = FieldSpec::new(FeatureKind::DoubleHistogram);
    if let Some(f) = family {
        spec = spec.hashed(f);
    }
    let indexer = Indexer::new(vec![spec]);
    let store = MemoryStore::new();
    for (i, v) in vectors.iter().enumerate() {
        indexer
            .index(&store, &format!("img_{i:04}.jpg"), &[doubles(v)])
            .unwrap();
    }
    store
}
