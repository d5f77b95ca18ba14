//! Term enumerator abstraction.
//!
//! A term enumerator is a forward-only, single-pass cursor over a sorted term
//! sequence. Each position exposes the current term and its ascending document
//! set. Producers are responsible for presenting terms in strictly ascending
//! unsigned byte order without duplicates; consumers such as the multi-term
//! merge do not re-validate this on every step.
//!
//! The module also provides the push-side counterpart, [`TermSink`], which
//! mirrors how a segment writer consumes a term stream, and [`copy_terms`] to
//! drive a sink from an enumerator.

use xref_common::{Result, error::Error, try_or_ret_some_err};

use crate::{
    doc_set::is_strictly_ascending,
    term::{DocId, TermEntry},
};

/// Cursor over a sorted sequence of terms and their document sets.
pub trait TermEnumerator {
    /// Advances to the next term. Returns `false` once the sequence is exhausted.
    fn next_term(&mut self) -> Result<bool>;

    /// The current term.
    ///
    /// Only meaningful after the last call to [`next_term`](Self::next_term)
    /// returned `true`.
    fn term(&self) -> &[u8];

    /// Ascending, de-duplicated document ids of the current term.
    fn documents(&self) -> &[DocId];
}

impl<T: TermEnumerator + ?Sized> TermEnumerator for Box<T> {
    fn next_term(&mut self) -> Result<bool> {
        (**self).next_term()
    }

    fn term(&self) -> &[u8] {
        (**self).term()
    }

    fn documents(&self) -> &[DocId] {
        (**self).documents()
    }
}

impl<T: TermEnumerator + ?Sized> TermEnumerator for &mut T {
    fn next_term(&mut self) -> Result<bool> {
        (**self).next_term()
    }

    fn term(&self) -> &[u8] {
        (**self).term()
    }

    fn documents(&self) -> &[DocId] {
        (**self).documents()
    }
}

/// Extension methods available on every [`TermEnumerator`].
pub trait TermEnumeratorExt: TermEnumerator + Sized {
    /// Converts the enumerator into an iterator of owned entries.
    fn entries(self) -> TermEntries<Self> {
        TermEntries { inner: self }
    }

    /// Drains the remaining terms into a vector.
    fn collect_terms(self) -> Result<Vec<TermEntry>> {
        self.entries().collect()
    }
}

impl<T: TermEnumerator> TermEnumeratorExt for T {}

/// Iterator over the owned entries of a term enumerator.
pub struct TermEntries<E> {
    inner: E,
}

impl<E: TermEnumerator> Iterator for TermEntries<E> {
    type Item = Result<TermEntry>;

    fn next(&mut self) -> Option<Result<TermEntry>> {
        if !try_or_ret_some_err!(self.inner.next_term()) {
            return None;
        }
        Some(Ok(TermEntry::new(
            self.inner.term(),
            self.inner.documents(),
        )))
    }
}

/// In-memory term enumerator over pre-built entries.
#[derive(Debug, Clone, Default)]
pub struct VecTermEnumerator {
    entries: Vec<TermEntry>,
    pos: Option<usize>,
}

impl VecTermEnumerator {
    /// Creates an enumerator over `entries`.
    ///
    /// Document sets are sorted and de-duplicated. Terms must already be in
    /// strictly ascending order, otherwise an `InvalidArgument` error is
    /// returned.
    pub fn new(mut entries: Vec<TermEntry>) -> Result<VecTermEnumerator> {
        for entry in entries.iter_mut() {
            if !is_strictly_ascending(&entry.documents) {
                entry.documents.sort_unstable();
                entry.documents.dedup();
            }
        }
        if let Some(pos) = entries.windows(2).position(|w| w[0].term >= w[1].term) {
            return Err(Error::invalid_arg(
                "entries",
                format!(
                    "terms must be strictly ascending: '{}' followed by '{}'",
                    entries[pos].term_lossy(),
                    entries[pos + 1].term_lossy()
                ),
            ));
        }
        Ok(VecTermEnumerator { entries, pos: None })
    }

    /// Creates an enumerator from `(term, documents)` pairs in arbitrary order.
    ///
    /// Entries are sorted by term; documents of repeated terms are unioned.
    pub fn from_unsorted<T, D>(pairs: impl IntoIterator<Item = (T, D)>) -> VecTermEnumerator
    where
        T: Into<Vec<u8>>,
        D: IntoIterator<Item = DocId>,
    {
        let mut map = std::collections::BTreeMap::<Vec<u8>, Vec<DocId>>::new();
        for (term, docs) in pairs {
            map.entry(term.into()).or_default().extend(docs);
        }
        let entries = map
            .into_iter()
            .map(|(term, mut documents)| {
                documents.sort_unstable();
                documents.dedup();
                TermEntry { term, documents }
            })
            .collect();
        VecTermEnumerator { entries, pos: None }
    }

    /// Creates an enumerator that replays `entries` exactly as given.
    ///
    /// No ordering or document checks are performed. Used to simulate faulty
    /// producers.
    pub fn new_unchecked(entries: Vec<TermEntry>) -> VecTermEnumerator {
        VecTermEnumerator { entries, pos: None }
    }

    /// Total number of entries, regardless of the cursor position.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_slice(&self) -> &[TermEntry] {
        &self.entries
    }

    fn current(&self) -> Option<&TermEntry> {
        self.pos.and_then(|pos| self.entries.get(pos))
    }
}

impl TermEnumerator for VecTermEnumerator {
    fn next_term(&mut self) -> Result<bool> {
        let next = self.pos.map_or(0, |pos| pos + 1);
        self.pos = Some(next.min(self.entries.len()));
        Ok(next < self.entries.len())
    }

    fn term(&self) -> &[u8] {
        match self.current() {
            Some(entry) => &entry.term,
            None => &[],
        }
    }

    fn documents(&self) -> &[DocId] {
        match self.current() {
            Some(entry) => &entry.documents,
            None => &[],
        }
    }
}

/// A streaming interface for consuming a term stream, e.g. by a segment writer.
///
/// For each term the sink sees `start_term`, one `push_document` per document
/// in ascending order, then `end_term`. Terms arrive in ascending order.
pub trait TermSink {
    /// Begins a new term. `term_ordinal` increases by one for every term.
    fn start_term(&mut self, term_ordinal: usize, term: &[u8]) -> Result<()>;

    /// Adds a document to the current term.
    fn push_document(&mut self, doc: DocId) -> Result<()>;

    /// Finalizes the current term.
    fn end_term(&mut self) -> Result<()>;
}

/// Streams every remaining term of `enumerator` into `sink`.
///
/// Returns the number of terms written.
pub fn copy_terms<E, S>(enumerator: &mut E, sink: &mut S) -> Result<usize>
where
    E: TermEnumerator + ?Sized,
    S: TermSink + ?Sized,
{
    let mut term_ordinal = 0;
    while enumerator.next_term()? {
        sink.start_term(term_ordinal, enumerator.term())?;
        for &doc in enumerator.documents() {
            sink.push_document(doc)?;
        }
        sink.end_term()?;
        term_ordinal += 1;
    }
    Ok(term_ordinal)
}
