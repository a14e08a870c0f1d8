mod common;

use common::build_store;
use imago::{find_duplicates, DuplicateConfig, FeatureKind, GroupingMode, ImagoError};

fn config(mode: GroupingMode) -> DuplicateConfig {
    DuplicateConfig {
        mode,
        ..DuplicateConfig::new(FeatureKind::DoubleHistogram)
    }
}

#[test]
fn finds_the_bit_identical_pair() {
    let vectors = vec![
        vec![0.1, 0.2, 0.3, 0.4],
        vec![0.9, 0.1, 0.0, 0.0],
        vec![0.1, 0.2, 0.3, 0.4],
        vec![0.0, 0.0, 0.5, 0.5],
    ];
    let store = build_store(&vectors, None);

    let groups = find_duplicates(&store, &config(GroupingMode::AnchorDistance), 0).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].docs, vec![0, 2]);
    assert_eq!(groups[0].distance, 0.0);
}

#[test]
fn anchor_grouping_merges_equidistant_documents() {
    // 1 and 3 are both at distance 1 from the anchor but differ from each other.
    let vectors = vec![
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![0.0, 0.0],
        vec![0.0, 1.0],
    ];
    let store = build_store(&vectors, None);

    let legacy = find_duplicates(&store, &config(GroupingMode::AnchorDistance), 0).unwrap();
    assert_eq!(legacy.len(), 2);
    assert_eq!(legacy[0].docs, vec![0, 2]);
    assert_eq!(legacy[1].docs, vec![1, 3]);

    let verified = find_duplicates(&store, &config(GroupingMode::Verified), 0).unwrap();
    assert_eq!(verified.len(), 1);
    assert_eq!(verified[0].docs, vec![0, 2]);
}

#[test]
fn deleted_documents_are_ignored() {
    let vectors = vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0, 1.0]];
    let store = build_store(&vectors, None);
    store.delete(1).unwrap();
    let groups = find_duplicates(&store, &config(GroupingMode::AnchorDistance), 0).unwrap();
    assert_eq!(groups[0].docs, vec![0, 2]);
}

#[test]
fn deleted_anchor_is_an_error() {
    let store = build_store(&[vec![1.0], vec![1.0]], None);
    store.delete(0).unwrap();
    assert_eq!(
        find_duplicates(&store, &config(GroupingMode::AnchorDistance), 0).unwrap_err(),
        ImagoError::DocumentNotFound(0)
    );
}
