//! Verification of auto-prefix term streams.
//!
//! [`AutoPrefixValidator`] replays a candidate stream (real terms plus
//! synthesized markers) against a reference stream of real terms. It checks
//! ordering, the total term count and the document set of every candidate
//! term: a real term must carry exactly the documents of the equal reference
//! term, a marker `p ++ [sentinel]` exactly the union of the documents of all
//! reference terms starting with `p`.
//!
//! Mismatches are expected outcomes of a validation run, so they are reported
//! as [`ValidationIssue`] values through a callback instead of errors. The
//! `Err` channel is reserved for failures of the enumerators themselves.

use std::fmt;

use ahash::AHashMap;
use xref_common::{Result, error::display_term};

use crate::{
    auto_prefix::AutoPrefixOptions,
    doc_set::union_into,
    enumerator::{TermEnumerator, TermEnumeratorExt},
    term::{DocId, TermEntry},
};

/// A single discrepancy found by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// The candidate produced a term not strictly greater than its predecessor.
    OutOfOrder {
        position: usize,
        previous: Vec<u8>,
        current: Vec<u8>,
    },
    /// The candidate produced a different number of terms than expected.
    CountMismatch { expected: usize, actual: usize },
    /// A candidate term carries the wrong documents.
    DocumentsMismatch {
        term: Vec<u8>,
        expected: Vec<DocId>,
        actual: Vec<DocId>,
    },
    /// A reference term is absent from the candidate.
    MissingTerm { term: Vec<u8> },
    /// A real candidate term is absent from the reference.
    UnexpectedTerm { term: Vec<u8> },
    /// A marker whose prefix is shared by fewer than two reference terms.
    SpuriousPrefix { term: Vec<u8>, sharing_terms: usize },
    /// A document id at or above the validator's `max_doc` bound.
    DocumentOutOfRange {
        term: Vec<u8>,
        document: DocId,
        max_doc: DocId,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::OutOfOrder {
                position,
                previous,
                current,
            } => write!(
                f,
                "term #{position} '{}' is not greater than previous term '{}'",
                display_term(current),
                display_term(previous)
            ),
            ValidationIssue::CountMismatch { expected, actual } => {
                write!(f, "expected {expected} terms, candidate produced {actual}")
            }
            ValidationIssue::DocumentsMismatch {
                term,
                expected,
                actual,
            } => write!(
                f,
                "term '{}': expected documents {expected:?}, actual {actual:?}",
                display_term(term)
            ),
            ValidationIssue::MissingTerm { term } => {
                write!(f, "term '{}' missing from candidate", display_term(term))
            }
            ValidationIssue::UnexpectedTerm { term } => {
                write!(f, "term '{}' not present in reference", display_term(term))
            }
            ValidationIssue::SpuriousPrefix {
                term,
                sharing_terms,
            } => write!(
                f,
                "prefix marker '{}' shared by {sharing_terms} reference terms, at least 2 required",
                display_term(term)
            ),
            ValidationIssue::DocumentOutOfRange {
                term,
                document,
                max_doc,
            } => write!(
                f,
                "term '{}': document {document} is out of range (max_doc {max_doc})",
                display_term(term)
            ),
        }
    }
}

type IssueCallback<'a> = Box<dyn FnMut(&ValidationIssue) + 'a>;

/// Checks a candidate auto-prefix stream against a reference stream.
pub struct AutoPrefixValidator<'a, R, C> {
    reference: R,
    candidate: C,
    expected_count: usize,
    max_doc: DocId,
    options: AutoPrefixOptions,
    on_issue: Option<IssueCallback<'a>>,
}

impl<'a, R, C> AutoPrefixValidator<'a, R, C>
where
    R: TermEnumerator,
    C: TermEnumerator,
{
    /// `expected_count` is the exact number of terms the candidate must
    /// produce; every document id must be below `max_doc`.
    pub fn new(reference: R, candidate: C, expected_count: usize, max_doc: DocId) -> Self {
        AutoPrefixValidator {
            reference,
            candidate,
            expected_count,
            max_doc,
            options: AutoPrefixOptions::default(),
            on_issue: None,
        }
    }

    /// Options used to recognize markers in the candidate.
    pub fn with_options(mut self, options: AutoPrefixOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers the callback that receives every issue.
    pub fn on_issue(mut self, callback: impl FnMut(&ValidationIssue) + 'a) -> Self {
        self.on_issue = Some(Box::new(callback));
        self
    }

    /// Runs the validation. Returns `Ok(true)` if no issue was raised.
    pub fn run(mut self) -> Result<bool> {
        let reference = load_reference(&mut self.reference, &self.options)?;
        let mut seen = vec![false; reference.len()];
        let mut issues = 0usize;
        let mut report = |issue: ValidationIssue| {
            issues += 1;
            if let Some(callback) = self.on_issue.as_mut() {
                callback(&issue);
            }
        };

        let mut previous: Option<Vec<u8>> = None;
        let mut count = 0usize;
        let mut expected_docs = Vec::new();
        let mut scratch = Vec::new();

        while self.candidate.next_term()? {
            count += 1;
            let term = self.candidate.term();
            let documents = self.candidate.documents();

            if let Some(prev) = previous.as_deref() {
                if term <= prev {
                    report(ValidationIssue::OutOfOrder {
                        position: count - 1,
                        previous: prev.to_vec(),
                        current: term.to_vec(),
                    });
                }
            }

            if let Some(&document) = documents.iter().find(|&&doc| doc >= self.max_doc) {
                report(ValidationIssue::DocumentOutOfRange {
                    term: term.to_vec(),
                    document,
                    max_doc: self.max_doc,
                });
            }

            if let Some(prefix) = self.options.marker_prefix(term) {
                let start = reference.partition_point(|e| e.term.as_slice() < prefix);
                let sharing = reference[start..]
                    .iter()
                    .take_while(|e| e.term.starts_with(prefix))
                    .count();
                if sharing < 2 {
                    report(ValidationIssue::SpuriousPrefix {
                        term: term.to_vec(),
                        sharing_terms: sharing,
                    });
                }
                expected_docs.clear();
                for entry in &reference[start..start + sharing] {
                    union_into(&mut expected_docs, &entry.documents, &mut scratch);
                }
                if expected_docs.as_slice() != documents {
                    report(ValidationIssue::DocumentsMismatch {
                        term: term.to_vec(),
                        expected: expected_docs.clone(),
                        actual: documents.to_vec(),
                    });
                }
            } else {
                match reference.binary_search_by(|e| e.term.as_slice().cmp(term)) {
                    Ok(idx) => {
                        seen[idx] = true;
                        if reference[idx].documents.as_slice() != documents {
                            report(ValidationIssue::DocumentsMismatch {
                                term: term.to_vec(),
                                expected: reference[idx].documents.clone(),
                                actual: documents.to_vec(),
                            });
                        }
                    }
                    Err(_) => report(ValidationIssue::UnexpectedTerm {
                        term: term.to_vec(),
                    }),
                }
            }

            match previous.as_mut() {
                Some(prev) => {
                    prev.clear();
                    prev.extend_from_slice(term);
                }
                None => previous = Some(term.to_vec()),
            }
        }

        for (entry, _) in reference.iter().zip(&seen).filter(|(_, seen)| !**seen) {
            report(ValidationIssue::MissingTerm {
                term: entry.term.clone(),
            });
        }

        if count != self.expected_count {
            report(ValidationIssue::CountMismatch {
                expected: self.expected_count,
                actual: count,
            });
        }

        if issues > 0 {
            log::debug!("auto-prefix validation failed with {issues} issues over {count} terms");
        }
        Ok(issues == 0)
    }
}

/// Reads the reference stream, ignoring markers and tolerating unsorted or
/// repeated terms.
fn load_reference<R: TermEnumerator>(
    reference: &mut R,
    options: &AutoPrefixOptions,
) -> Result<Vec<TermEntry>> {
    let mut entries: Vec<TermEntry> = reference
        .entries()
        .filter(|e| !matches!(e, Ok(entry) if options.is_marker(&entry.term)))
        .collect::<Result<_>>()?;
    if entries.windows(2).all(|w| w[0].term < w[1].term) {
        return Ok(entries);
    }

    entries.sort_by(|a, b| a.term.cmp(&b.term));
    let mut scratch = Vec::new();
    let mut merged: Vec<TermEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match merged.last_mut() {
            Some(last) if last.term == entry.term => {
                union_into(&mut last.documents, &entry.documents, &mut scratch);
            }
            _ => merged.push(entry),
        }
    }
    Ok(merged)
}

/// Outcome of [`validate_auto_prefix`].
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    passed: bool,
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }
}

/// Validates `candidate` against `reference` and collects every issue.
pub fn validate_auto_prefix<R, C>(
    reference: R,
    candidate: C,
    expected_count: usize,
    max_doc: DocId,
    options: AutoPrefixOptions,
) -> Result<ValidationReport>
where
    R: TermEnumerator,
    C: TermEnumerator,
{
    let mut issues = Vec::new();
    let passed = AutoPrefixValidator::new(reference, candidate, expected_count, max_doc)
        .with_options(options)
        .on_issue(|issue| issues.push(issue.clone()))
        .run()?;
    Ok(ValidationReport { passed, issues })
}

/// Computes the number of terms an auto-prefix stream over `terms` must
/// contain: distinct real terms plus distinct prefixes (within the configured
/// length bounds) shared by at least two of them. Marker terms in the input
/// are ignored.
pub fn expected_auto_prefix_count<I, T>(terms: I, options: &AutoPrefixOptions) -> usize
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut real: Vec<Vec<u8>> = terms
        .into_iter()
        .map(|t| t.as_ref().to_vec())
        .filter(|t| !options.is_marker(t))
        .collect();
    real.sort();
    real.dedup();

    let mut prefix_counts = AHashMap::<&[u8], usize>::new();
    for term in &real {
        for len in 1..=term.len() {
            if options.is_marker_len(len) {
                *prefix_counts.entry(&term[..len]).or_default() += 1;
            }
        }
    }
    real.len() + prefix_counts.values().filter(|&&count| count >= 2).count()
}
