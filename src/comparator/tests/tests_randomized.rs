//! Seeded randomized checks of the internal-key ordering.

use std::cmp::Ordering;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::comparator::*;
use crate::format::{self, MAX_SEQUENCE_NUMBER, ValueType};
use crate::key::{InternalKey, parse_internal_key};

const TYPES: [ValueType; 5] = [
    ValueType::DELETION,
    ValueType::VALUE,
    ValueType::MERGE,
    ValueType::SINGLE_DELETION,
    ValueType::RANGE_DELETION,
];

fn random_key(rng: &mut StdRng) -> InternalKey {
    let len = rng.random_range(0..6);
    let user_key: Vec<u8> = (0..len).map(|_| rng.random_range(b'a'..=b'd')).collect();
    let seq = if rng.random_bool(0.1) {
        MAX_SEQUENCE_NUMBER
    } else {
        rng.random_range(0..20)
    };
    let t = TYPES[rng.random_range(0..TYPES.len())];
    InternalKey::new(&user_key, seq, t)
}

/// The ordering written out field by field.
fn reference_order(a: &[u8], b: &[u8]) -> Ordering {
    let pa = parse_internal_key(a, false).unwrap();
    let pb = parse_internal_key(b, false).unwrap();
    pa.user_key
        .cmp(pb.user_key)
        .then(pb.sequence.cmp(&pa.sequence))
        .then(pb.value_type.cmp(&pa.value_type))
}

#[test]
fn matches_field_order() {
    let cmp = InternalKeyComparator::new(Arc::new(BytewiseComparator));
    let mut rng = StdRng::seed_from_u64(0x5EED);

    for _ in 0..2000 {
        let a = random_key(&mut rng);
        let b = random_key(&mut rng);
        assert_eq!(
            cmp.compare(a.encode(), b.encode()),
            reference_order(a.encode(), b.encode()),
            "{a:?} vs {b:?}"
        );
        assert_eq!(
            cmp.compare(a.encode(), b.encode()),
            cmp.compare(b.encode(), a.encode()).reverse()
        );
    }
}

#[test]
fn sorted_run_groups_versions_newest_first() {
    let cmp = InternalKeyComparator::new(Arc::new(BytewiseComparator));
    let mut rng = StdRng::seed_from_u64(42);

    let mut keys: Vec<InternalKey> = (0..500).map(|_| random_key(&mut rng)).collect();
    keys.sort_by(|a, b| cmp.compare(a.encode(), b.encode()));

    for pair in keys.windows(2) {
        let (a, b) = (pair[0].encode(), pair[1].encode());
        let ua = format::extract_user_key(a);
        let ub = format::extract_user_key(b);
        assert!(ua <= ub);
        if ua == ub {
            assert!(format::extract_internal_key_footer(a) >= format::extract_internal_key_footer(b));
        }
    }
}
