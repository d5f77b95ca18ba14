//! Auto-prefix marker synthesis over a sorted term stream.
//!
//! Given the real terms of a (possibly merged) term stream, the synthesizer
//! adds a marker term `prefix ++ [sentinel]` for every prefix of length
//! `min_prefix_len..=max_prefix_len` that is shared by at least two distinct
//! real terms. A marker's documents are the union of the documents of all
//! real terms starting with the prefix, so a prefix query becomes a single
//! point lookup.
//!
//! Markers are always recomputed from the real terms. Marker terms already
//! present in the input (for example, carried by segments that were
//! synthesized earlier) are discarded: after a merge a prefix may become
//! shared only globally, or a locally shared prefix may no longer qualify,
//! and unioning per-segment markers would get both cases wrong.
//!
//! # Ordering
//!
//! With the default sentinel `0xFF` (a byte that never occurs in UTF-8) a
//! marker sorts after every term extending its prefix and before the next
//! term outside of it, so markers are emitted as soon as their prefix closes.
//! Any other sentinel is supported: finished entries wait in a small min-heap
//! until no still-open prefix could produce a smaller marker.
//!
//! # Algorithm
//!
//! The synthesizer keeps one frame per byte of the previous real term. A frame
//! counts the real terms seen under its prefix and accumulates their
//! documents. When the next term arrives, frames deeper than the common prefix
//! with the previous term are closed: each one folds its count and documents
//! into its parent and yields a marker when it saw two or more terms. Frames
//! and their document buffers are reused across terms.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    iter,
};

use xref_common::{Result, error::Error, verify_arg};

use crate::{
    doc_set::union_into,
    enumerator::TermEnumerator,
    term::{DocId, common_prefix_len},
};

/// Default marker sentinel. `0xFF` is not valid anywhere in UTF-8.
pub const DEFAULT_PREFIX_SENTINEL: u8 = 0xFF;

/// Parameters of auto-prefix synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoPrefixOptions {
    sentinel: u8,
    min_prefix_len: usize,
    max_prefix_len: Option<usize>,
}

impl Default for AutoPrefixOptions {
    fn default() -> Self {
        AutoPrefixOptions {
            sentinel: DEFAULT_PREFIX_SENTINEL,
            min_prefix_len: 1,
            max_prefix_len: None,
        }
    }
}

impl AutoPrefixOptions {
    pub fn new() -> AutoPrefixOptions {
        Self::default()
    }

    /// Sets the byte appended to a prefix to form its marker term. The byte
    /// must not otherwise occur at the end of real terms.
    pub fn with_sentinel(mut self, sentinel: u8) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Shortest prefix (in bytes) that gets a marker. Must be at least 1.
    pub fn with_min_prefix_len(mut self, len: usize) -> Self {
        self.min_prefix_len = len;
        self
    }

    /// Longest prefix (in bytes) that gets a marker, or `None` for no limit.
    pub fn with_max_prefix_len(mut self, len: Option<usize>) -> Self {
        self.max_prefix_len = len;
        self
    }

    pub fn sentinel(&self) -> u8 {
        self.sentinel
    }

    pub fn min_prefix_len(&self) -> usize {
        self.min_prefix_len
    }

    pub fn max_prefix_len(&self) -> Option<usize> {
        self.max_prefix_len
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(min_prefix_len, self.min_prefix_len >= 1);
        if let Some(max_prefix_len) = self.max_prefix_len {
            verify_arg!(max_prefix_len, max_prefix_len >= self.min_prefix_len);
        }
        Ok(())
    }

    /// Returns `true` if a shared prefix of `len` bytes gets a marker.
    #[inline]
    pub fn is_marker_len(&self, len: usize) -> bool {
        len >= self.min_prefix_len && self.max_prefix_len.is_none_or(|max| len <= max)
    }

    /// Returns `true` if `term` is a prefix marker.
    #[inline]
    pub fn is_marker(&self, term: &[u8]) -> bool {
        term.last() == Some(&self.sentinel)
    }

    /// Returns the prefix encoded by a marker term, or `None` for real terms.
    pub fn marker_prefix<'a>(&self, term: &'a [u8]) -> Option<&'a [u8]> {
        match term.split_last() {
            Some((&last, prefix)) if last == self.sentinel => Some(prefix),
            _ => None,
        }
    }

    /// Builds the marker term for `prefix`, e.g. to look up a prefix query.
    pub fn marker_for(&self, prefix: &[u8]) -> Vec<u8> {
        let mut marker = Vec::with_capacity(prefix.len() + 1);
        marker.extend_from_slice(prefix);
        marker.push(self.sentinel);
        marker
    }
}

/// Compares `term` with the marker of `prefix` without materializing it.
#[inline]
fn cmp_to_marker(term: &[u8], prefix: &[u8], sentinel: u8) -> Ordering {
    term.iter().cmp(prefix.iter().chain(iter::once(&sentinel)))
}

/// A finished output entry waiting for emission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
struct OutputTerm {
    term: Vec<u8>,
    documents: Vec<DocId>,
    is_marker: bool,
}

#[derive(Debug, Default)]
struct PrefixFrame {
    leaf_count: usize,
    documents: Vec<DocId>,
}

/// Push-based marker synthesizer.
///
/// Feed real terms in ascending order with [`push`](Self::push), call
/// [`finish`](Self::finish) after the last one, and drain the combined,
/// ascending output with [`pop_ready`](Self::pop_ready) at any point.
#[derive(Debug)]
pub(crate) struct PrefixSynthesizer {
    options: AutoPrefixOptions,
    /// `frames[i]` tracks the prefix `last_term[..i + 1]`; only the first
    /// `depth` frames are open.
    frames: Vec<PrefixFrame>,
    depth: usize,
    last_term: Vec<u8>,
    /// Documents of `last_term`, held back until the next distinct term so
    /// that duplicates can still be folded in.
    held: Option<Vec<DocId>>,
    pending: BinaryHeap<Reverse<OutputTerm>>,
    /// Length of the open prefix whose marker would sort lowest.
    watermark: Option<usize>,
    finished: bool,
    scratch: Vec<DocId>,
    real_terms: usize,
    markers: usize,
}

impl PrefixSynthesizer {
    pub fn new(options: AutoPrefixOptions) -> Result<PrefixSynthesizer> {
        options.validate()?;
        Ok(PrefixSynthesizer {
            options,
            frames: Vec::new(),
            depth: 0,
            last_term: Vec::new(),
            held: None,
            pending: BinaryHeap::new(),
            watermark: None,
            finished: false,
            scratch: Vec::new(),
            real_terms: 0,
            markers: 0,
        })
    }

    pub fn options(&self) -> &AutoPrefixOptions {
        &self.options
    }

    /// Number of distinct real terms pushed so far.
    pub fn real_term_count(&self) -> usize {
        self.real_terms
    }

    /// Number of markers synthesized so far.
    pub fn marker_count(&self) -> usize {
        self.markers
    }

    /// Adds the next real term.
    ///
    /// A term equal to the previous one is folded into it. A term smaller than
    /// the previous one is a `TermOrder` error.
    pub fn push(&mut self, term: &[u8], documents: &[DocId]) -> Result<()> {
        if self.finished {
            return Err(Error::invalid_operation("push after finish"));
        }
        if let Some(held) = self.held.as_mut() {
            match term.cmp(self.last_term.as_slice()) {
                Ordering::Less => {
                    return Err(Error::term_order("auto-prefix input", &self.last_term, term));
                }
                Ordering::Equal => {
                    log::warn!(
                        "duplicate term '{}' in auto-prefix input, merging documents",
                        term.escape_ascii()
                    );
                    union_into(held, documents, &mut self.scratch);
                    if self.depth > 0 {
                        union_into(
                            &mut self.frames[self.depth - 1].documents,
                            documents,
                            &mut self.scratch,
                        );
                    }
                    return Ok(());
                }
                Ordering::Greater => {}
            }
        }

        self.release_held();
        let shared = common_prefix_len(&self.last_term, term);
        while self.depth > shared {
            self.close_top_frame();
        }

        self.last_term.clear();
        self.last_term.extend_from_slice(term);
        while self.depth < term.len() {
            self.open_frame();
        }
        if self.depth > 0 {
            let leaf = &mut self.frames[self.depth - 1];
            leaf.leaf_count += 1;
            union_into(&mut leaf.documents, documents, &mut self.scratch);
        }
        self.held = Some(documents.to_vec());
        self.real_terms += 1;
        self.update_watermark();
        Ok(())
    }

    /// Closes every open prefix. No more terms may be pushed afterwards.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.release_held();
        while self.depth > 0 {
            self.close_top_frame();
        }
        self.finished = true;
        self.watermark = None;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the next output entry if it can no longer be preceded by
    /// anything still to come.
    fn pop_ready(&mut self) -> Option<OutputTerm> {
        let Reverse(top) = self.pending.peek()?;
        if let Some(len) = self.watermark {
            let prefix = &self.last_term[..len];
            if cmp_to_marker(&top.term, prefix, self.options.sentinel) != Ordering::Less {
                return None;
            }
        }
        self.pending.pop().map(|Reverse(entry)| entry)
    }

    fn release_held(&mut self) {
        if let Some(documents) = self.held.take() {
            self.pending.push(Reverse(OutputTerm {
                term: self.last_term.clone(),
                documents,
                is_marker: false,
            }));
        }
    }

    fn open_frame(&mut self) {
        if self.depth < self.frames.len() {
            let frame = &mut self.frames[self.depth];
            frame.leaf_count = 0;
            frame.documents.clear();
        } else {
            self.frames.push(PrefixFrame::default());
        }
        self.depth += 1;
    }

    fn close_top_frame(&mut self) {
        let len = self.depth;
        let idx = len - 1;

        // Fold the closing frame into its parent before its buffer is reused.
        if idx > 0 {
            let (parents, rest) = self.frames.split_at_mut(idx);
            let parent = &mut parents[idx - 1];
            let child = &rest[0];
            parent.leaf_count += child.leaf_count;
            union_into(&mut parent.documents, &child.documents, &mut self.scratch);
        }

        let frame = &mut self.frames[idx];
        if frame.leaf_count >= 2 && self.options.is_marker_len(len) {
            let term = self.options.marker_for(&self.last_term[..len]);
            log::trace!(
                "prefix marker '{}' shared by {} terms",
                term.escape_ascii(),
                frame.leaf_count
            );
            self.pending.push(Reverse(OutputTerm {
                term,
                documents: std::mem::take(&mut frame.documents),
                is_marker: true,
            }));
            self.markers += 1;
        }
        self.depth -= 1;
    }

    fn update_watermark(&mut self) {
        let sentinel = self.options.sentinel;
        let mut lowest: Option<usize> = None;
        for len in 1..=self.depth {
            if !self.options.is_marker_len(len) {
                continue;
            }
            lowest = match lowest {
                Some(best) => {
                    let candidate = self.last_term[..len].iter().chain(iter::once(&sentinel));
                    let current = self.last_term[..best].iter().chain(iter::once(&sentinel));
                    if candidate.cmp(current) == Ordering::Less {
                        Some(len)
                    } else {
                        Some(best)
                    }
                }
                None => Some(len),
            };
        }
        self.watermark = lowest;
    }
}

/// Term enumerator that interleaves synthesized prefix markers with the real
/// terms of its input. See the module docs.
pub struct AutoPrefixEnumerator<E> {
    input: E,
    synthesizer: PrefixSynthesizer,
    current: OutputTerm,
    discarded_markers: usize,
    emitted: usize,
}

/// Wraps `input` so that its output includes auto-prefix markers.
///
/// `input` is typically the output of
/// [`merge_term_enumerators`](crate::merge_term_enumerators); marker terms it
/// contains are dropped and recomputed.
pub fn wrap_with_auto_prefix<E: TermEnumerator>(
    input: E,
    options: AutoPrefixOptions,
) -> Result<AutoPrefixEnumerator<E>> {
    AutoPrefixEnumerator::new(input, options)
}

impl<E: TermEnumerator> AutoPrefixEnumerator<E> {
    pub fn new(input: E, options: AutoPrefixOptions) -> Result<AutoPrefixEnumerator<E>> {
        Ok(AutoPrefixEnumerator {
            input,
            synthesizer: PrefixSynthesizer::new(options)?,
            current: OutputTerm::default(),
            discarded_markers: 0,
            emitted: 0,
        })
    }

    pub fn options(&self) -> &AutoPrefixOptions {
        self.synthesizer.options()
    }

    /// Returns `true` if the current term is a synthesized prefix marker.
    pub fn is_prefix_marker(&self) -> bool {
        self.current.is_marker
    }

    /// Number of markers synthesized so far.
    pub fn synthesized_count(&self) -> usize {
        self.synthesizer.marker_count()
    }

    /// Number of distinct real terms consumed so far.
    pub fn real_term_count(&self) -> usize {
        self.synthesizer.real_term_count()
    }

    /// Number of marker terms found in the input and dropped.
    pub fn discarded_marker_count(&self) -> usize {
        self.discarded_markers
    }

    /// Number of terms (real and synthesized) produced so far.
    pub fn emitted_count(&self) -> usize {
        self.emitted
    }

    pub fn into_inner(self) -> E {
        self.input
    }
}

impl<E: TermEnumerator> TermEnumerator for AutoPrefixEnumerator<E> {
    fn next_term(&mut self) -> Result<bool> {
        loop {
            if let Some(entry) = self.synthesizer.pop_ready() {
                self.current = entry;
                self.emitted += 1;
                return Ok(true);
            }
            if self.synthesizer.is_finished() {
                self.current = OutputTerm::default();
                return Ok(false);
            }
            if self.input.next_term()? {
                let term = self.input.term();
                if self.synthesizer.options().is_marker(term) {
                    self.discarded_markers += 1;
                    continue;
                }
                self.synthesizer.push(term, self.input.documents())?;
            } else {
                self.synthesizer.finish();
                log::debug!(
                    "auto-prefix: {} real terms, {} markers synthesized, {} input markers dropped",
                    self.synthesizer.real_term_count(),
                    self.synthesizer.marker_count(),
                    self.discarded_markers
                );
            }
        }
    }

    fn term(&self) -> &[u8] {
        &self.current.term
    }

    fn documents(&self) -> &[DocId] {
        &self.current.documents
    }
}
