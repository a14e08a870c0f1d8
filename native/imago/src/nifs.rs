use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustler::{Env, ResourceArc, Term};

use crate::db::MemoryStore;
use crate::duplicates::{self, DuplicateConfig};
use crate::error::ImagoError;
use crate::hashing::{BitSampling, BitSamplingConfig, HashFamily, Lsh, LshConfig};
use crate::indexer::{FieldSpec, Indexer};
use crate::searcher::{ImageSearcher, SearchMode, SearcherConfig};
use crate::types::{DocId, Feature, FeatureKind, Storage};

// Shareable across NIF boundary; the store synchronises itself.
pub struct IndexResource {
    store: MemoryStore,
    kind: FeatureKind,
    family: Option<Arc<dyn HashFamily>>,
    indexer: Indexer,
}
impl rustler::Resource for IndexResource {}

fn err(e: ImagoError) -> String {
    e.to_string()
}

fn to_feature(kind: FeatureKind, vector: Vec<f64>) -> Result<Feature, String> {
    match kind.storage() {
        Storage::Doubles => Feature::from_doubles(kind, vector).map_err(err),
        Storage::Bytes => {
            let bytes = vector
                .iter()
                .map(|&v| {
                    if (0.0..=255.0).contains(&v) && v.fract() == 0.0 {
                        Ok(v as u8)
                    } else {
                        Err(format!("{kind} components must be integers in 0..=255, got {v}"))
                    }
                })
                .collect::<Result<Vec<u8>, String>>()?;
            Feature::from_bytes(kind, bytes).map_err(err)
        }
    }
}

#[rustler::nif(schedule = "DirtyCpu")]
pub fn new_index(
    kind: String,
    hashing: String,
    dimensions: usize,
    seed: u64,
) -> Result<ResourceArc<IndexResource>, String> {
    let kind: FeatureKind = kind.parse().map_err(err)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let family: Option<Arc<dyn HashFamily>> = match hashing.to_lowercase().as_str() {
        "none" => None,
        "bit_sampling" => {
            let config = BitSamplingConfig {
                dimensions,
                ..Default::default()
            };
            Some(Arc::new(BitSampling::generate(&config, &mut rng).map_err(err)?))
        }
        "lsh" => {
            let config = LshConfig {
                dimensions,
                ..Default::default()
            };
            Some(Arc::new(Lsh::generate(&config, &mut rng).map_err(err)?))
        }
        other => {
            return Err(format!(
                "Unknown hashing '{}'. Expected none | bit_sampling | lsh",
                other
            ))
        }
    };
    let mut spec = FieldSpec::new(kind);
    if let Some(f) = &family {
        spec = spec.hashed(Arc::clone(f));
    }
    Ok(ResourceArc::new(IndexResource {
        store: MemoryStore::new(),
        kind,
        family,
        indexer: Indexer::new(vec![spec]),
    }))
}

#[rustler::nif(schedule = "DirtyCpu")]
pub fn add_image(
    index: ResourceArc<IndexResource>,
    identifier: String,
    vector: Vec<f64>,
) -> Result<DocId, String> {
    let feature = to_feature(index.kind, vector)?;
    index
        .indexer
        .index(&index.store, &identifier, &[feature])
        .map_err(err)
}

#[rustler::nif(schedule = "DirtyCpu")]
pub fn delete_image(index: ResourceArc<IndexResource>, doc: DocId) -> Result<DocId, String> {
    index.store.delete(doc).map_err(err)?;
    Ok(doc)
}

#[rustler::nif(schedule = "DirtyCpu")]
pub fn search(
    index: ResourceArc<IndexResource>,
    query: Vec<f64>,
    k: usize,
    candidate_limit: usize,
) -> Result<Vec<(DocId, String, f64)>, String> {
    let query = to_feature(index.kind, query)?;
    let mode = match index.family {
        Some(_) => SearchMode::Hashed {
            candidate_limit,
            partial_hashes: false,
        },
        None => SearchMode::Linear,
    };
    let mut searcher = ImageSearcher::new(SearcherConfig {
        max_hits: k,
        mode,
        ..SearcherConfig::new(index.kind)
    });
    if let Some(f) = &index.family {
        searcher = searcher.with_family(Arc::clone(f));
    }
    let hits = searcher.search(&query, &index.store).map_err(err)?;
    Ok(hits
        .hits
        .into_iter()
        .map(|h| (h.doc, h.identifier.unwrap_or_default(), h.distance))
        .collect())
}

#[rustler::nif(schedule = "DirtyCpu")]
pub fn find_duplicates(
    index: ResourceArc<IndexResource>,
    anchor: DocId,
) -> Result<Vec<Vec<DocId>>, String> {
    let config = DuplicateConfig::new(index.kind);
    let groups = duplicates::find_duplicates(&index.store, &config, anchor).map_err(err)?;
    Ok(groups.into_iter().map(|g| g.docs).collect())
}

// Register resource on load.
fn on_load(env: Env, _info: Term) -> bool {
    env.register::<IndexResource>().is_ok()
}

rustler::init!("Elixir.Imago", load = on_load);
