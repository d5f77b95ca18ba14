//! Term-level building blocks for merging inverted-index segments.
//!
//! A segment's term dictionary is exposed as a [`TermEnumerator`]: a forward
//! cursor over terms in ascending unsigned byte order, each with its ascending
//! set of documents. This crate provides:
//!
//! - [`merge_term_enumerators`]: a k-way merge of per-segment enumerators into
//!   one ordered stream of distinct terms, reporting the contributing segments
//!   for every term.
//! - [`wrap_with_auto_prefix`]: a wrapper that adds synthesized prefix marker
//!   terms to an ordered stream, so that a prefix query resolves with a single
//!   lookup.
//! - [`AutoPrefixValidator`]: a checker that replays an auto-prefix stream
//!   against a reference stream and reports every discrepancy.
//!
//! # Example
//!
//! ```rust
//! use xref_terms::{
//!     AutoPrefixOptions, TermEntry, TermEnumerator, VecTermEnumerator,
//!     merge_term_enumerators, wrap_with_auto_prefix,
//! };
//!
//! let first = VecTermEnumerator::new(vec![TermEntry::new("getName", vec![0])]).unwrap();
//! let second = VecTermEnumerator::new(vec![TermEntry::new("getValue", vec![4])]).unwrap();
//!
//! let merged = merge_term_enumerators(vec![first, second]).unwrap();
//! let mut terms = wrap_with_auto_prefix(merged, AutoPrefixOptions::new()).unwrap();
//!
//! let mut markers = 0;
//! while terms.next_term().unwrap() {
//!     if terms.is_prefix_marker() {
//!         // "g", "ge" and "get" are each shared by both terms.
//!         assert_eq!(terms.documents(), &[0, 1]);
//!         markers += 1;
//!     }
//! }
//! assert_eq!(markers, 3);
//! ```

pub mod auto_prefix;
pub mod doc_set;
pub mod enumerator;
pub mod multi_term;
pub mod term;
pub mod validate;

pub use auto_prefix::{
    AutoPrefixEnumerator, AutoPrefixOptions, DEFAULT_PREFIX_SENTINEL, wrap_with_auto_prefix,
};
pub use enumerator::{
    TermEntries, TermEnumerator, TermEnumeratorExt, TermSink, VecTermEnumerator, copy_terms,
};
pub use multi_term::{MultiTermEnumerator, SlicePosting, merge_term_enumerators};
pub use term::{DocId, TermEntry, compare_terms, common_prefix_len};
pub use validate::{
    AutoPrefixValidator, ValidationIssue, ValidationReport, expected_auto_prefix_count,
    validate_auto_prefix,
};
