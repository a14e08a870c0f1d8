//! Duplicate detection against a single anchor document.
//!
//! Every live document is bucketed by its exact distance to the anchor. The
//! bucket at distance zero holds the anchor's duplicates; other buckets only
//! say their members are equally far from the anchor, which does not make
//! them equal to each other. [`GroupingMode::Verified`] splits buckets into
//! true equality classes when that distinction matters.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::codec;
use crate::db::DocumentStore;
use crate::distances::distance;
use crate::error::{ImagoError, Result};
use crate::types::{DocId, Feature, FeatureKind};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GroupingMode {
    /// Group by distance to the anchor alone.
    #[default]
    AnchorDistance,
    /// Additionally require members of a group to be at distance zero from each other.
    Verified,
}

#[derive(Clone, Debug)]
pub struct DuplicateConfig {
    pub field: String,
    pub kind: FeatureKind,
    pub mode: GroupingMode,
}

impl DuplicateConfig {
    pub fn new(kind: FeatureKind) -> Self {
        Self {
            field: kind.name().to_string(),
            kind,
            mode: GroupingMode::AnchorDistance,
        }
    }
}

/// Documents sharing one distance to the anchor.
#[derive(Clone, Debug, PartialEq)]
pub struct DuplicateGroup {
    pub distance: f64,
    /// Ordinals in ascending order.
    pub docs: Vec<DocId>,
}

/// Group live documents by their exact distance to `anchor`, nearest first.
///
/// In [`GroupingMode::AnchorDistance`] only the zero-distance group is known
/// to be duplicates; members of any other group share a distance to the
/// anchor and may differ from each other.
pub fn find_duplicates<S: DocumentStore + ?Sized>(
    store: &S,
    config: &DuplicateConfig,
    anchor: DocId,
) -> Result<Vec<DuplicateGroup>> {
    if !store.is_live(anchor) {
        return Err(ImagoError::DocumentNotFound(anchor));
    }
    let load = |doc: DocId| -> Option<Feature> {
        let bytes = store.stored_field(doc, &config.field)?;
        codec::decode(config.kind, &bytes)
            .map_err(|e| warn!(doc, error = %e, "skipping undecodable feature"))
            .ok()
    };
    let anchor_feature = load(anchor).ok_or_else(|| ImagoError::MissingFeature {
        doc: anchor,
        field: config.field.clone(),
    })?;

    // Keyed by bit pattern: distances are non-negative, so bit order is numeric order.
    let mut buckets: BTreeMap<u64, Vec<(DocId, Feature)>> = BTreeMap::new();
    for doc in 0..store.num_documents() as DocId {
        if !store.is_live(doc) {
            continue;
        }
        let Some(feature) = load(doc) else {
            continue;
        };
        let d = distance(&anchor_feature, &feature)?;
        if d.is_nan() || d < 0.0 {
            return Err(ImagoError::CorruptVector { doc, distance: d });
        }
        buckets.entry((d + 0.0).to_bits()).or_default().push((doc, feature));
    }

    let mut groups = Vec::new();
    for (bits, members) in buckets {
        let d = f64::from_bits(bits);
        match config.mode {
            GroupingMode::AnchorDistance => {
                if members.len() > 1 {
                    groups.push(DuplicateGroup {
                        distance: d,
                        docs: members.into_iter().map(|(doc, _)| doc).collect(),
                    });
                }
            }
            GroupingMode::Verified => {
                for docs in equality_classes(members)? {
                    if docs.len() > 1 {
                        groups.push(DuplicateGroup { distance: d, docs });
                    }
                }
            }
        }
    }
    debug!(anchor, groups = groups.len(), "duplicate scan finished");
    Ok(groups)
}

fn equality_classes(members: Vec<(DocId, Feature)>) -> Result<Vec<Vec<DocId>>> {
    let mut classes: Vec<(Feature, Vec<DocId>)> = Vec::new();
    for (doc, feature) in members {
        let mut placed = false;
        for (representative, docs) in classes.iter_mut() {
            if distance(representative, &feature)? == 0.0 {
                docs.push(doc);
                placed = true;
                break;
            }
        }
        if !placed {
            classes.push((feature, vec![doc]));
        }
    }
    Ok(classes.into_iter().map(|(_, docs)| docs).collect())
}
