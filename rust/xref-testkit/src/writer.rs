//! In-memory storage layer for merge tests.

use xref_common::{Result, error::Error};
use xref_segments::{CombineHandle, IndexId, SegmentInfo, SegmentSet};

/// Keeps the segment list of a target index in memory and applies
/// `add_indexes` calls to it.
///
/// A call with one input adds a copy of that segment; a call with several
/// inputs replaces the consumed target segments with one segment whose size
/// is the sum of the inputs. Failures can be injected on a given call.
#[derive(Debug, Clone)]
pub struct InMemoryIndexWriter {
    index: IndexId,
    segments: Vec<SegmentInfo>,
    calls: Vec<Vec<SegmentInfo>>,
    fail_on_call: Option<usize>,
    created: usize,
}

impl InMemoryIndexWriter {
    pub fn new(target: &SegmentSet) -> InMemoryIndexWriter {
        InMemoryIndexWriter {
            index: target.index.clone(),
            segments: target.segments.clone(),
            calls: Vec::new(),
            fail_on_call: None,
            created: 0,
        }
    }

    /// Makes the call with the given zero-based ordinal fail.
    pub fn with_failure_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Current segments of the target index.
    pub fn segments(&self) -> &[SegmentInfo] {
        &self.segments
    }

    /// Inputs of every successful call, in order.
    pub fn calls(&self) -> &[Vec<SegmentInfo>] {
        &self.calls
    }

    /// The target index as it stands now.
    pub fn snapshot(&self) -> SegmentSet {
        SegmentSet {
            index: self.index.clone(),
            segments: self.segments.clone(),
        }
    }

    pub fn total_size(&self) -> u64 {
        self.segments.iter().map(|s| s.size_bytes).sum()
    }
}

impl CombineHandle for InMemoryIndexWriter {
    fn add_indexes(&mut self, segments: &[SegmentInfo]) -> Result<SegmentInfo> {
        if self.fail_on_call == Some(self.calls.len()) {
            return Err(Error::io(
                self.index.as_str(),
                std::io::Error::other("injected failure"),
            ));
        }

        for input in segments.iter().filter(|s| s.origin == self.index) {
            let position = self
                .segments
                .iter()
                .position(|s| s.name == input.name)
                .ok_or_else(|| {
                    Error::invalid_arg(
                        "segments",
                        format!("'{}' is not a segment of '{}'", input.name, self.index),
                    )
                })?;
            self.segments.remove(position);
        }

        self.created += 1;
        let segment = SegmentInfo {
            name: format!("{}_new{}", self.index, self.created),
            size_bytes: segments.iter().map(|s| s.size_bytes).sum(),
            file_count: segments.iter().map(|s| s.file_count).max().unwrap_or(0),
            origin: self.index.clone(),
        };
        log::trace!(
            "'{}': created '{}' from {} segments",
            self.index,
            segment.name,
            segments.len()
        );
        self.segments.push(segment.clone());
        self.calls.push(segments.to_vec());
        Ok(segment)
    }
}
