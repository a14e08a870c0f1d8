use tracing::{debug, warn};

use crate::codec;
use crate::db::DocumentStore;
use crate::types::{DocId, Feature, FeatureKind};

/// Decoded vectors of one field, indexed by ordinal.
///
/// Built once before searching and read-only afterwards, so it can be shared
/// across threads behind an `Arc` without locking. Deleted documents and
/// documents whose field is missing or undecodable hold `None`.
#[derive(Clone, Debug)]
pub struct FeatureCache {
    field: String,
    kind: FeatureKind,
    features: Vec<Option<Feature>>,
}

impl FeatureCache {
    pub fn build<S: DocumentStore + ?Sized>(store: &S, field: &str, kind: FeatureKind) -> Self {
        let n = store.num_documents();
        let mut features = Vec::with_capacity(n);
        let mut missing = 0usize;
        for doc in 0..n as DocId {
            if !store.is_live(doc) {
                features.push(None);
                continue;
            }
            let decoded = store
                .stored_field(doc, field)
                .map(|bytes| codec::decode(kind, &bytes));
            match decoded {
                Some(Ok(f)) => features.push(Some(f)),
                Some(Err(e)) => {
                    warn!(doc, field, error = %e, "skipping undecodable feature");
                    missing += 1;
                    features.push(None);
                }
                None => {
                    missing += 1;
                    features.push(None);
                }
            }
        }
        debug!(field, documents = n, missing, "feature cache built");
        Self {
            field: field.to_string(),
            kind,
            features,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, doc: DocId) -> Option<&Feature> {
        self.features.get(doc as usize).and_then(Option::as_ref)
    }
}
