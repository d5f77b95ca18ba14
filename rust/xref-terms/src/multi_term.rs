//! K-way merge of per-segment term enumerators.
//!
//! Each input enumerator is tagged with a slice index (its position in the
//! input list). The merged stream presents every distinct term once, in
//! ascending unsigned byte order. For each term it exposes the ascending set
//! of slice indices whose enumerator contains the term (returned as the
//! term's documents, since consumers route by segment), and the union of the
//! underlying postings as global `(slice, doc)` pairs.

use std::{cmp::Ordering, collections::BinaryHeap};

use xref_common::{Result, error::Error};

use crate::{enumerator::TermEnumerator, term::DocId};

/// A document addressed globally by the slice that contains it and its
/// slice-local id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlicePosting {
    pub slice: u32,
    pub doc: DocId,
}

/// Heap entry wrapping one input enumerator positioned at a valid term.
struct MergeCursor<E> {
    slice: u32,
    enumerator: E,
}

impl<E: TermEnumerator> PartialEq for MergeCursor<E> {
    fn eq(&self, other: &MergeCursor<E>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<E: TermEnumerator> Eq for MergeCursor<E> {}

impl<E: TermEnumerator> Ord for MergeCursor<E> {
    #[inline]
    fn cmp(&self, other: &MergeCursor<E>) -> Ordering {
        // `BinaryHeap` is a max-heap; reverse so that the lesser term (and for
        // equal terms, the lower slice) is on top.
        let term_ord = self.enumerator.term().cmp(other.enumerator.term());
        if term_ord != Ordering::Equal {
            term_ord.reverse()
        } else {
            self.slice.cmp(&other.slice).reverse()
        }
    }
}

impl<E: TermEnumerator> PartialOrd for MergeCursor<E> {
    fn partial_cmp(&self, other: &MergeCursor<E>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Merged view over several term enumerators. See the module docs.
///
/// An error from an input or from the order checks leaves the merge in a
/// failed state: the inputs positioned at the failing term are dropped and
/// every later `next_term` returns an `InvalidOperation` error.
pub struct MultiTermEnumerator<E> {
    heap: BinaryHeap<MergeCursor<E>>,
    /// Cursors positioned at the current term, in ascending slice order.
    current: Vec<MergeCursor<E>>,
    term: Vec<u8>,
    slices: Vec<DocId>,
    postings: Vec<SlicePosting>,
    slice_count: usize,
    check_order: bool,
    term_count: usize,
    failed: bool,
}

/// Merges `inputs` into a single ordered, de-duplicated term stream.
///
/// The slice index of each input is its position in `inputs`. An empty list
/// yields an empty stream; a single input is passed through one-to-one.
pub fn merge_term_enumerators<E: TermEnumerator>(inputs: Vec<E>) -> Result<MultiTermEnumerator<E>> {
    MultiTermEnumerator::new(inputs)
}

impl<E: TermEnumerator> MultiTermEnumerator<E> {
    /// Creates the merged enumerator and positions every input at its first term.
    pub fn new(inputs: Vec<E>) -> Result<MultiTermEnumerator<E>> {
        let slice_count = inputs.len();
        let mut heap = BinaryHeap::with_capacity(slice_count);
        for (slice, mut enumerator) in inputs.into_iter().enumerate() {
            if enumerator.next_term()? {
                heap.push(MergeCursor {
                    slice: slice as u32,
                    enumerator,
                });
            }
        }
        Ok(MultiTermEnumerator {
            heap,
            current: Vec::with_capacity(slice_count),
            term: Vec::new(),
            slices: Vec::with_capacity(slice_count),
            postings: Vec::new(),
            slice_count,
            check_order: false,
            term_count: 0,
            failed: false,
        })
    }

    /// Enables verification that every input advances to a strictly greater
    /// term. Off by default; a violation is reported as a `TermOrder` error.
    pub fn with_order_checks(mut self, enabled: bool) -> Self {
        self.check_order = enabled;
        self
    }

    /// Number of input enumerators (including exhausted or empty ones).
    pub fn slice_count(&self) -> usize {
        self.slice_count
    }

    /// Number of merged terms produced so far.
    pub fn term_count(&self) -> usize {
        self.term_count
    }

    /// Ascending slice indices that contain the current term.
    pub fn slices(&self) -> &[DocId] {
        &self.slices
    }

    /// Union of the current term's postings, ordered by slice then document.
    pub fn postings(&self) -> &[SlicePosting] {
        &self.postings
    }

    /// Moves every cursor of the current term forward and returns the ones
    /// that still have terms to the heap.
    fn advance_current(&mut self) -> Result<()> {
        for mut cursor in self.current.drain(..) {
            if !cursor.enumerator.next_term()? {
                continue;
            }
            if self.check_order && cursor.enumerator.term() <= self.term.as_slice() {
                return Err(Error::term_order(
                    format!("slice {}", cursor.slice),
                    &self.term,
                    cursor.enumerator.term(),
                ));
            }
            self.heap.push(cursor);
        }
        Ok(())
    }
}

impl<E: TermEnumerator> TermEnumerator for MultiTermEnumerator<E> {
    fn next_term(&mut self) -> Result<bool> {
        if self.failed {
            return Err(Error::invalid_operation(
                "next_term on a term merge that already failed",
            ));
        }
        let advanced = self.advance_current();

        self.slices.clear();
        self.postings.clear();
        self.term.clear();
        if let Err(e) = advanced {
            self.failed = true;
            self.current.clear();
            self.heap.clear();
            return Err(e);
        }

        let Some(top) = self.heap.pop() else {
            return Ok(false);
        };
        self.term.extend_from_slice(top.enumerator.term());
        self.current.push(top);

        // Pop every other cursor positioned at the same term. Equal terms come
        // off the heap in ascending slice order.
        while self
            .heap
            .peek()
            .is_some_and(|next| next.enumerator.term() == self.term.as_slice())
        {
            if let Some(cursor) = self.heap.pop() {
                self.current.push(cursor);
            }
        }

        for cursor in &self.current {
            self.slices.push(cursor.slice);
            self.postings
                .extend(cursor.enumerator.documents().iter().map(|&doc| SlicePosting {
                    slice: cursor.slice,
                    doc,
                }));
        }
        self.term_count += 1;

        log::trace!(
            "merged term '{}' present in slices {:?}",
            self.term.escape_ascii(),
            self.slices
        );
        Ok(true)
    }

    fn term(&self) -> &[u8] {
        &self.term
    }

    /// The slice indices containing the current term.
    fn documents(&self) -> &[DocId] {
        &self.slices
    }
}

#[cfg(test)]
mod tests {
    use xref_common::error::ErrorKind;

    use super::*;
    use crate::{
        enumerator::{TermEnumeratorExt, VecTermEnumerator},
        term::TermEntry,
    };

    fn slice(terms: &[(&str, &[DocId])]) -> VecTermEnumerator {
        VecTermEnumerator::new(
            terms
                .iter()
                .map(|(t, d)| TermEntry::new(*t, *d))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_merge_empty_input_list() {
        let mut merged = merge_term_enumerators(Vec::<VecTermEnumerator>::new()).unwrap();
        assert_eq!(merged.slice_count(), 0);
        assert!(!merged.next_term().unwrap());
        assert!(merged.term().is_empty());
    }

    #[test]
    fn test_merge_single_input_passthrough() {
        let input = slice(&[("a", &[4]), ("b", &[1, 2]), ("c", &[0])]);
        let expected = input.entries_slice().to_vec();
        let mut merged = merge_term_enumerators(vec![input]).unwrap();
        for entry in expected {
            assert!(merged.next_term().unwrap());
            assert_eq!(merged.term(), entry.term.as_slice());
            assert_eq!(merged.slices(), &[0]);
            let docs: Vec<DocId> = merged.postings().iter().map(|p| p.doc).collect();
            assert_eq!(docs, entry.documents);
        }
        assert!(!merged.next_term().unwrap());
    }

    #[test]
    fn test_merge_unions_slices_and_postings() {
        let s0 = slice(&[("apple", &[1]), ("cherry", &[2, 3])]);
        let s1 = slice(&[]);
        let s2 = slice(&[("apple", &[0, 5]), ("banana", &[1]), ("cherry", &[9])]);
        let mut merged = merge_term_enumerators(vec![s0, s1, s2]).unwrap();
        assert_eq!(merged.slice_count(), 3);

        assert!(merged.next_term().unwrap());
        assert_eq!(merged.term(), b"apple");
        assert_eq!(merged.documents(), &[0, 2]);
        assert_eq!(
            merged.postings(),
            &[
                SlicePosting { slice: 0, doc: 1 },
                SlicePosting { slice: 2, doc: 0 },
                SlicePosting { slice: 2, doc: 5 },
            ]
        );

        assert!(merged.next_term().unwrap());
        assert_eq!(merged.term(), b"banana");
        assert_eq!(merged.documents(), &[2]);

        assert!(merged.next_term().unwrap());
        assert_eq!(merged.term(), b"cherry");
        assert_eq!(merged.documents(), &[0, 2]);

        assert!(!merged.next_term().unwrap());
        assert_eq!(merged.term_count(), 3);
    }

    #[test]
    fn test_merge_uses_unsigned_byte_order() {
        let s0 = VecTermEnumerator::new(vec![
            TermEntry::new(b"a".to_vec(), vec![0]),
            TermEntry::new(b"\xc3\xa9".to_vec(), vec![0]),
        ])
        .unwrap();
        let s1 = VecTermEnumerator::new(vec![TermEntry::new(b"z".to_vec(), vec![0])]).unwrap();
        let terms: Vec<Vec<u8>> = merge_term_enumerators(vec![s0, s1])
            .unwrap()
            .collect_terms()
            .unwrap()
            .into_iter()
            .map(|e| e.term)
            .collect();
        assert_eq!(terms, vec![b"a".to_vec(), b"z".to_vec(), b"\xc3\xa9".to_vec()]);
    }

    #[test]
    fn test_order_checks_detect_faulty_input() {
        let faulty = VecTermEnumerator::new_unchecked(vec![
            TermEntry::new("b", vec![0]),
            TermEntry::new("a", vec![0]),
        ]);
        let good = slice(&[("c", &[0])]);
        let mut merged = merge_term_enumerators(vec![faulty, good])
            .unwrap()
            .with_order_checks(true);
        assert!(merged.next_term().unwrap());
        let err = merged.next_term().unwrap_err();
        assert!(err.to_string().contains("slice 0"), "{err}");
    }

    #[test]
    fn test_merge_stays_failed_after_order_error() {
        let faulty = VecTermEnumerator::new_unchecked(vec![
            TermEntry::new("b", vec![0]),
            TermEntry::new("a", vec![0]),
        ]);
        let good = slice(&[("b", &[1]), ("c", &[0])]);
        let mut merged = merge_term_enumerators(vec![faulty, good])
            .unwrap()
            .with_order_checks(true);
        assert!(merged.next_term().unwrap());
        assert_eq!(merged.slices(), [0, 1]);

        assert!(matches!(
            merged.next_term().unwrap_err().kind(),
            ErrorKind::TermOrder { .. }
        ));
        assert!(merged.term().is_empty());
        assert!(merged.slices().is_empty());
        assert!(merged.postings().is_empty());

        // The surviving slice is not silently resumed.
        for _ in 0..2 {
            assert!(matches!(
                merged.next_term().unwrap_err().kind(),
                ErrorKind::InvalidOperation { .. }
            ));
        }
        assert_eq!(merged.term_count(), 1);
    }

    #[test]
    fn test_without_order_checks_faulty_input_is_not_rejected() {
        let faulty = VecTermEnumerator::new_unchecked(vec![
            TermEntry::new("b", vec![0]),
            TermEntry::new("a", vec![0]),
        ]);
        let merged = merge_term_enumerators(vec![faulty]).unwrap();
        assert_eq!(merged.collect_terms().unwrap().len(), 2);
    }
}
