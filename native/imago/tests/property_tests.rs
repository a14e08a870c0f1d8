//! Property-based tests for the retrieval core.
//!
//! - Every feature kind's distance is a premetric (zero on self, symmetric, non-negative)
//! - The bounded ranking set keeps exactly the k smallest, in any insertion order
//! - Merging shards equals ranking everything at once
//! - The vector codec round-trips every kind on every case

use proptest::prelude::*;

use imago::codec::{decode, encode};
use imago::distances::distance;
use imago::{BoundedRankingSet, Feature, FeatureKind};

fn arb_feature(kind: FeatureKind, len: usize) -> BoxedStrategy<Feature> {
    match kind {
        FeatureKind::ColorHistogram | FeatureKind::DoubleHistogram => {
            prop::collection::vec(0.0f64..1000.0, len)
                .prop_map(move |v| Feature::from_doubles(kind, v).unwrap())
                .boxed()
        }
        _ => prop::collection::vec(any::<u8>(), kind.fixed_len().unwrap_or(len))
            .prop_map(move |v| Feature::from_bytes(kind, v).unwrap())
            .boxed(),
    }
}

fn arb_pair() -> impl Strategy<Value = (Feature, Feature)> {
    (prop::sample::select(FeatureKind::ALL.to_vec()), 1usize..40).prop_flat_map(|(kind, len)| {
        (arb_feature(kind, len), arb_feature(kind, len))
    })
}

/// One feature of every kind per case.
fn arb_every_kind() -> impl Strategy<Value = Vec<Feature>> {
    (1usize..40).prop_flat_map(|len| {
        FeatureKind::ALL
            .iter()
            .map(|&kind| arb_feature(kind, len))
            .collect::<Vec<_>>()
    })
}

/// Distinct documents with arbitrary (often repeated) distances.
fn arb_offers() -> impl Strategy<Value = Vec<(f64, u32)>> {
    prop::collection::vec(prop::sample::select(vec![0.0, 0.5, 1.0, 2.0, 3.5, 7.0, 100.0]), 0..60)
        .prop_map(|ds| ds.into_iter().zip(0u32..).collect())
}

fn k_smallest(offers: &[(f64, u32)], k: usize) -> Vec<(f64, u32)> {
    let mut sorted = offers.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    sorted.truncate(k);
    sorted
}

fn ranked(set: &BoundedRankingSet) -> Vec<(f64, u32)> {
    set.iter().map(|r| (r.distance, r.doc)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn distance_to_self_is_zero((a, _) in arb_pair()) {
        prop_assert_eq!(distance(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn distance_is_symmetric_and_non_negative((a, b) in arb_pair()) {
        let d_ab = distance(&a, &b).unwrap();
        let d_ba = distance(&b, &a).unwrap();
        prop_assert_eq!(d_ab, d_ba);
        prop_assert!(d_ab >= 0.0, "negative distance {}", d_ab);
    }

    #[test]
    fn codec_round_trips_every_kind(features in arb_every_kind()) {
        prop_assert_eq!(features.len(), FeatureKind::ALL.len());
        for a in features {
            let back = decode(a.kind(), &encode(&a)).unwrap();
            prop_assert_eq!(back, a);
        }
    }

    #[test]
    fn ranking_keeps_the_k_smallest(offers in arb_offers(), k in 0usize..20) {
        let mut set = BoundedRankingSet::new(k);
        for &(d, doc) in &offers {
            set.offer(d, doc).unwrap();
        }
        prop_assert!(set.len() <= k);
        prop_assert_eq!(set.len(), offers.len().min(k));
        prop_assert_eq!(ranked(&set), k_smallest(&offers, k));
        if let Some(worst) = k_smallest(&offers, k).last() {
            prop_assert_eq!(set.max_distance(), Some(worst.0));
        }
    }

    #[test]
    fn ranking_ignores_insertion_order(
        (offers, shuffled) in arb_offers().prop_flat_map(|o| {
            let s = Just(o.clone()).prop_shuffle();
            (Just(o), s)
        }),
        k in 1usize..20,
    ) {
        let mut a = BoundedRankingSet::new(k);
        let mut b = BoundedRankingSet::new(k);
        for &(d, doc) in &offers {
            a.offer(d, doc).unwrap();
        }
        for &(d, doc) in &shuffled {
            b.offer(d, doc).unwrap();
        }
        prop_assert_eq!(ranked(&a), ranked(&b));
    }

    #[test]
    fn merged_shards_equal_a_single_pass(offers in arb_offers(), k in 1usize..20, shards in 1usize..9) {
        let mut single = BoundedRankingSet::new(k);
        let mut parts: Vec<BoundedRankingSet> = (0..shards).map(|_| BoundedRankingSet::new(k)).collect();
        for (i, &(d, doc)) in offers.iter().enumerate() {
            single.offer(d, doc).unwrap();
            parts[i % shards].offer(d, doc).unwrap();
        }
        let merged = BoundedRankingSet::merge(parts, k);
        prop_assert_eq!(ranked(&merged), ranked(&single));
    }
}
