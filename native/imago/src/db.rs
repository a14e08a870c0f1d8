use std::collections::HashMap;

use bitvec::vec::BitVec;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{ImagoError, Result};
use crate::types::{DocId, HashTerm};

/// Read side of a document store, as the retrieval core sees it.
///
/// Implementations must not change while a search is running.
pub trait DocumentStore {
    /// Number of ordinals ever assigned, deleted ones included.
    fn num_documents(&self) -> usize;

    /// Whether `doc` exists and has not been deleted.
    fn is_live(&self, doc: DocId) -> bool;

    /// Encoded bytes of a stored field.
    fn stored_field(&self, doc: DocId, field: &str) -> Option<Vec<u8>>;

    /// Path or URI the document was indexed from.
    fn identifier(&self, doc: DocId) -> Option<String>;

    /// Postings of one hash term, in indexing order.
    fn candidates_for_term(&self, field: &str, term: HashTerm) -> Vec<DocId>;
}

/// A document ready to be written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoredDocument {
    pub identifier: String,
    pub fields: HashMap<String, Vec<u8>>,
    /// `(field, term)` pairs to post.
    pub terms: Vec<(String, HashTerm)>,
}

/// In-memory store: documents behind a lock, a liveness bitmap and
/// concurrent postings.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<Vec<StoredDocument>>,
    live: RwLock<BitVec>,
    postings: DashMap<(String, HashTerm), Vec<DocId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a document and post its terms; returns its ordinal.
    pub fn add(&self, doc: StoredDocument) -> Result<DocId> {
        let mut docs = self.docs.write();
        let id = DocId::try_from(docs.len()).map_err(|_| {
            ImagoError::InvalidParameter("store is full".to_string())
        })?;
        for (field, term) in &doc.terms {
            let mut posting = self.postings.entry((field.clone(), *term)).or_default();
            if posting.last() != Some(&id) {
                posting.push(id);
            }
        }
        docs.push(doc);
        self.live.write().push(true);
        Ok(id)
    }

    /// Mark a document deleted; its ordinal is never reused.
    pub fn delete(&self, doc: DocId) -> Result<()> {
        let mut live = self.live.write();
        let idx = doc as usize;
        if idx >= live.len() {
            return Err(ImagoError::DocumentNotFound(doc));
        }
        live.set(idx, false);
        Ok(())
    }

    pub fn live_count(&self) -> usize {
        self.live.read().count_ones()
    }
}

impl DocumentStore for MemoryStore {
    fn num_documents(&self) -> usize {
        self.docs.read().len()
    }

    fn is_live(&self, doc: DocId) -> bool {
        self.live
            .read()
            .get(doc as usize)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    fn stored_field(&self, doc: DocId, field: &str) -> Option<Vec<u8>> {
        self.docs
            .read()
            .get(doc as usize)
            .and_then(|d| d.fields.get(field).cloned())
    }

    fn identifier(&self, doc: DocId) -> Option<String> {
        self.docs
            .read()
            .get(doc as usize)
            .map(|d| d.identifier.clone())
    }

    fn candidates_for_term(&self, field: &str, term: HashTerm) -> Vec<DocId> {
        self.postings
            .get(&(field.to_string(), term))
            .map(|p| p.value().clone())
            .unwrap_or_default()
    }
}
