//! Segment metadata as seen by the merge policy.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Identifier of an index. Segments carry the id of the index that produced
/// them as a provenance tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexId(Arc<str>);

impl IndexId {
    pub fn new(id: impl AsRef<str>) -> IndexId {
        IndexId(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IndexId {
    fn from(id: &str) -> Self {
        IndexId::new(id)
    }
}

impl From<String> for IndexId {
    fn from(id: String) -> Self {
        IndexId(Arc::from(id))
    }
}

/// Descriptor of one immutable segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentInfo {
    /// Segment name, unique within its index.
    pub name: String,
    pub size_bytes: u64,
    pub file_count: u32,
    /// The index that produced the segment. Not an ownership link.
    pub origin: IndexId,
}

impl SegmentInfo {
    pub fn new(name: impl Into<String>, size_bytes: u64, origin: impl Into<IndexId>) -> Self {
        SegmentInfo {
            name: name.into(),
            size_bytes,
            file_count: 1,
            origin: origin.into(),
        }
    }

    pub fn with_file_count(mut self, file_count: u32) -> Self {
        self.file_count = file_count;
        self
    }
}

/// The segments of one index, in the order the index lists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSet {
    pub index: IndexId,
    pub segments: Vec<SegmentInfo>,
}

impl SegmentSet {
    pub fn new(index: impl Into<IndexId>) -> SegmentSet {
        SegmentSet {
            index: index.into(),
            segments: Vec::new(),
        }
    }

    /// Builds a set whose segments are named `{index}_{ordinal}` and sized as
    /// given.
    pub fn with_sizes(index: impl Into<IndexId>, sizes: impl IntoIterator<Item = u64>) -> Self {
        let index = index.into();
        let segments = sizes
            .into_iter()
            .enumerate()
            .map(|(i, size)| SegmentInfo::new(format!("{index}_{i}"), size, index.clone()))
            .collect();
        SegmentSet { index, segments }
    }

    /// Adds a segment produced by this index.
    pub fn push(&mut self, name: impl Into<String>, size_bytes: u64) -> &mut Self {
        self.segments
            .push(SegmentInfo::new(name, size_bytes, self.index.clone()));
        self
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.segments.iter().map(|s| s.size_bytes).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SegmentInfo> {
        self.segments.iter()
    }
}
