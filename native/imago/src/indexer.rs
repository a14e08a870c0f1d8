//! Write path: turns extracted features into stored documents.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::codec;
use crate::db::{MemoryStore, StoredDocument};
use crate::error::Result;
use crate::hashing::HashFamily;
use crate::types::{DocId, Feature, FeatureKind};

/// Name of the postings field that carries hash terms for `field`.
pub fn hash_field_name(field: &str) -> String {
    format!("{field}_hash")
}

/// One feature field of the index.
#[derive(Clone)]
pub struct FieldSpec {
    pub field: String,
    pub kind: FeatureKind,
    /// Family used to post hash terms; `None` stores the vector only.
    pub family: Option<Arc<dyn HashFamily>>,
}

impl FieldSpec {
    /// A field named after its kind, e.g. `"CEDD"`.
    pub fn new(kind: FeatureKind) -> Self {
        Self {
            field: kind.name().to_string(),
            kind,
            family: None,
        }
    }

    pub fn named(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn hashed(mut self, family: Arc<dyn HashFamily>) -> Self {
        self.family = Some(family);
        self
    }
}

#[derive(Clone, Default)]
pub struct Indexer {
    fields: Vec<FieldSpec>,
}

impl Indexer {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Encode features and hash terms for one image.
    ///
    /// Each configured field takes the first feature of its kind; a field
    /// without a matching feature is left out of the document.
    pub fn build(&self, identifier: &str, features: &[Feature]) -> Result<StoredDocument> {
        let mut fields = HashMap::with_capacity(self.fields.len());
        let mut terms = Vec::new();
        for spec in &self.fields {
            let Some(feature) = features.iter().find(|f| f.kind() == spec.kind) else {
                warn!(identifier, field = %spec.field, "no {} feature supplied", spec.kind);
                continue;
            };
            if let Some(family) = &spec.family {
                let hash_field = hash_field_name(&spec.field);
                terms.extend(
                    family
                        .hash_feature(feature)?
                        .into_iter()
                        .map(|t| (hash_field.clone(), t)),
                );
            }
            fields.insert(spec.field.clone(), codec::encode(feature));
        }
        Ok(StoredDocument {
            identifier: identifier.to_string(),
            fields,
            terms,
        })
    }

    pub fn index(&self, store: &MemoryStore, identifier: &str, features: &[Feature]) -> Result<DocId> {
        let doc = self.build(identifier, features)?;
        store.add(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DocumentStore;
    use crate::hashing::{BitSampling, BitSamplingConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn stores_vectors_and_terms() {
        let family = BitSampling::generate(
            &BitSamplingConfig {
                bits: 4,
                dimensions: 3,
                bundles: 6,
                ..Default::default()
            },
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        let indexer = Indexer::new(vec![
            FieldSpec::new(FeatureKind::DoubleHistogram).hashed(Arc::new(family))
        ]);
        let f = Feature::from_doubles(FeatureKind::DoubleHistogram, vec![1.0, 2.0, 3.0]).unwrap();

        let doc = indexer.build("a.jpg", std::slice::from_ref(&f)).unwrap();
        assert_eq!(doc.terms.len(), 6);
        assert!(doc.terms.iter().all(|(field, _)| field == "DoubleHistogram_hash"));

        let store = MemoryStore::new();
        let id = store.add(doc).unwrap();
        let bytes = store.stored_field(id, "DoubleHistogram").unwrap();
        assert_eq!(codec::decode(FeatureKind::DoubleHistogram, &bytes).unwrap(), f);
    }

    #[test]
    fn missing_kind_leaves_field_out() {
        let indexer = Indexer::new(vec![FieldSpec::new(FeatureKind::Cedd)]);
        let f = Feature::from_doubles(FeatureKind::DoubleHistogram, vec![1.0]).unwrap();
        let doc = indexer.build("b.jpg", &[f]).unwrap();
        assert!(doc.fields.is_empty());
    }

    #[test]
    fn dimension_mismatch_surfaces() {
        let family = BitSampling::generate(
            &BitSamplingConfig {
                bits: 4,
                dimensions: 8,
                bundles: 2,
                ..Default::default()
            },
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        let indexer = Indexer::new(vec![
            FieldSpec::new(FeatureKind::DoubleHistogram).hashed(Arc::new(family))
        ]);
        let f = Feature::from_doubles(FeatureKind::DoubleHistogram, vec![1.0, 2.0]).unwrap();
        assert!(indexer.build("c.jpg", &[f]).is_err());
    }
}
