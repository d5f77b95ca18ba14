//! Merge plans: the ordered list of physical operations for one merge call.

use crate::segment::SegmentInfo;

/// A single call into the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOp {
    /// Adds a source segment to the target as is.
    AddUnmerged(SegmentInfo),
    /// Physically merges target segments with one source segment into a new
    /// target segment. `targets` is never empty.
    Combine {
        targets: Vec<SegmentInfo>,
        source: SegmentInfo,
    },
}

impl MergeOp {
    /// The source segment this operation brings into the target.
    pub fn source(&self) -> &SegmentInfo {
        match self {
            MergeOp::AddUnmerged(source) => source,
            MergeOp::Combine { source, .. } => source,
        }
    }

    /// Target segments consumed by this operation.
    pub fn targets(&self) -> &[SegmentInfo] {
        match self {
            MergeOp::AddUnmerged(_) => &[],
            MergeOp::Combine { targets, .. } => targets,
        }
    }

    /// Number of segments passed to the storage layer.
    pub fn width(&self) -> usize {
        self.targets().len() + 1
    }

    /// The inputs of the storage call: consumed targets followed by the
    /// source segment.
    pub fn inputs(&self) -> Vec<SegmentInfo> {
        let mut inputs = Vec::with_capacity(self.width());
        inputs.extend_from_slice(self.targets());
        inputs.push(self.source().clone());
        inputs
    }

    pub fn is_merge(&self) -> bool {
        matches!(self, MergeOp::Combine { .. })
    }
}

/// Output of [`SegmentMergePolicy::plan`](crate::SegmentMergePolicy::plan).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// Operations in execution order: one per source segment, by ascending
    /// source size.
    pub ops: Vec<MergeOp>,
    /// Target segments left untouched, in target order.
    pub carried_over: Vec<SegmentInfo>,
}

impl MergePlan {
    pub fn merge_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_merge()).count()
    }

    /// Widest operation in the plan, or `0` for an empty plan.
    pub fn max_width(&self) -> usize {
        self.ops.iter().map(MergeOp::width).max().unwrap_or(0)
    }

    /// Number of segments in the target index after the plan is executed.
    pub fn resulting_segment_count(&self) -> usize {
        self.ops.len() + self.carried_over.len()
    }
}
