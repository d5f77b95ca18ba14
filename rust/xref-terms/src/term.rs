//! Term representation and the byte ordering shared by every term stream.
//!
//! Terms are arbitrary byte strings ordered by unsigned lexicographic byte
//! comparison. For UTF-8 input this is the "UTF-8 bytes sorted as unsigned"
//! order, which equals code point order and differs from UTF-16 code unit order
//! for supplementary characters. Consumers that rely on the sort order of a
//! merged segment must use [`compare_terms`] (or plain `[u8]::cmp`) and nothing
//! culture-aware.

use std::cmp::Ordering;

/// Segment-local document identifier.
pub type DocId = u32;

/// Compares two terms as unsigned byte strings.
#[inline]
pub fn compare_terms(left: &[u8], right: &[u8]) -> Ordering {
    left.cmp(right)
}

/// Returns the length of the longest common prefix of `left` and `right`.
#[inline]
pub fn common_prefix_len(left: &[u8], right: &[u8]) -> usize {
    left.iter()
        .zip(right.iter())
        .take_while(|(l, r)| l == r)
        .count()
}

/// An owned term together with its ascending document set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TermEntry {
    pub term: Vec<u8>,
    pub documents: Vec<DocId>,
}

impl TermEntry {
    pub fn new(term: impl Into<Vec<u8>>, documents: impl Into<Vec<DocId>>) -> TermEntry {
        TermEntry {
            term: term.into(),
            documents: documents.into(),
        }
    }

    /// Returns the term as UTF-8, replacing invalid sequences.
    pub fn term_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.term)
    }
}
