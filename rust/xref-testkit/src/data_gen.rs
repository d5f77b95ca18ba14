//! Seeded random data for property tests.
//!
//! Every generator takes a `fastrand::Rng` so that a failing case can be
//! replayed from its seed.

use std::collections::BTreeMap;

use xref_terms::{DocId, TermEntry, VecTermEnumerator};

const VERBS: &[&str] = &["get", "set", "is", "has", "to", "on", "handle", "create"];
const NOUNS: &[&str] = &[
    "Name", "Value", "Index", "Item", "Items", "Count", "Node", "Nodes", "Type", "Path",
];

/// Fragments mixing ASCII with multi-byte UTF-8 (including a supplementary
/// plane character) so that generated terms exercise unsigned byte order.
const FRAGMENTS: &[&str] = &["a", "ab", "b", "z", "é", "ü", "日本", "\u{1F600}", "_", "9"];

/// Seed used by property tests unless overridden.
pub const DEFAULT_TEST_SEED: u64 = 0x5eed_1dea_0f1e_2024;

/// Environment variable that overrides [`DEFAULT_TEST_SEED`].
pub const TEST_SEED_VAR: &str = "XREF_TEST_SEED";

/// Returns the seed for a property test: [`DEFAULT_TEST_SEED`], or the value
/// of `XREF_TEST_SEED` when it is set to a decimal or `0x`-prefixed number.
pub fn test_seed() -> u64 {
    parse_seed(std::env::var(TEST_SEED_VAR).ok().as_deref())
}

fn parse_seed(value: Option<&str>) -> u64 {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_TEST_SEED;
    };
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    match parsed {
        Ok(seed) => {
            eprintln!("{TEST_SEED_VAR}: using seed {seed}");
            seed
        }
        Err(e) => panic!("{TEST_SEED_VAR}: invalid seed '{value}': {e}"),
    }
}

/// A code identifier such as `getNodeCount` or `onItems3`.
pub fn identifier(rng: &mut fastrand::Rng) -> String {
    let mut term = String::from(VERBS[rng.usize(..VERBS.len())]);
    for _ in 0..rng.usize(1..=2) {
        term.push_str(NOUNS[rng.usize(..NOUNS.len())]);
    }
    if rng.u8(..4) == 0 {
        term.push_str(&rng.u32(..10).to_string());
    }
    term
}

/// A short term built from a small set of ASCII and non-ASCII fragments.
pub fn unicode_term(rng: &mut fastrand::Rng) -> String {
    (0..rng.usize(1..=4))
        .map(|_| FRAGMENTS[rng.usize(..FRAGMENTS.len())])
        .collect()
}

/// `count` distinct terms produced by `generate`, in ascending byte order.
pub fn distinct_terms(
    rng: &mut fastrand::Rng,
    count: usize,
    mut generate: impl FnMut(&mut fastrand::Rng) -> String,
) -> Vec<Vec<u8>> {
    let mut terms: Vec<Vec<u8>> = (0..count * 2)
        .map(|_| generate(rng).into_bytes())
        .collect();
    terms.sort();
    terms.dedup();
    rng.shuffle(&mut terms);
    terms.truncate(count);
    terms.sort();
    terms
}

/// An ascending, deduplicated, non-empty document set below `max_doc`.
pub fn doc_set(rng: &mut fastrand::Rng, max_doc: DocId, max_len: usize) -> Vec<DocId> {
    let len = rng.usize(1..=max_len.max(1));
    let mut docs: Vec<DocId> = (0..len).map(|_| rng.u32(..max_doc.max(1))).collect();
    docs.sort_unstable();
    docs.dedup();
    docs
}

/// Generates `slice_count` term slices over `vocabulary`. Each slice holds a
/// random subset of the vocabulary with documents below `max_doc`.
pub fn term_slices(
    rng: &mut fastrand::Rng,
    vocabulary: &[Vec<u8>],
    slice_count: usize,
    max_doc: DocId,
) -> Vec<Vec<TermEntry>> {
    let mut slices = Vec::with_capacity(slice_count);
    for _ in 0..slice_count {
        let density = rng.u8(1..=100);
        let mut slice = Vec::new();
        for term in vocabulary {
            if rng.u8(..100) < density {
                slice.push(TermEntry::new(term.clone(), doc_set(rng, max_doc, 4)));
            }
        }
        slices.push(slice);
    }
    slices
}

/// Wraps generated slices into enumerators.
pub fn slice_enumerators(slices: &[Vec<TermEntry>]) -> Vec<VecTermEnumerator> {
    slices
        .iter()
        .map(|slice| VecTermEnumerator::new_unchecked(slice.clone()))
        .collect()
}

/// The expected merged view of `slices`: every distinct term with the
/// ascending indices of the slices containing it.
pub fn expected_slice_sets(slices: &[Vec<TermEntry>]) -> BTreeMap<Vec<u8>, Vec<DocId>> {
    let mut expected = BTreeMap::<Vec<u8>, Vec<DocId>>::new();
    for (slice, entries) in slices.iter().enumerate() {
        for entry in entries {
            expected
                .entry(entry.term.clone())
                .or_default()
                .push(slice as DocId);
        }
    }
    expected
}

/// Segment sizes in bytes, log-uniformly distributed up to `max_bytes`.
pub fn segment_sizes(rng: &mut fastrand::Rng, count: usize, max_bytes: u64) -> Vec<u64> {
    let max_bits = 64 - max_bytes.max(2).leading_zeros();
    (0..count)
        .map(|_| {
            let bits = rng.u32(1..=max_bits);
            let upper = if bits >= 64 { u64::MAX } else { 1u64 << bits };
            rng.u64(1..upper).min(max_bytes)
        })
        .collect()
}
