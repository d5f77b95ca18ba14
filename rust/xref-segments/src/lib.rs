//! Segment merge scheduling.
//!
//! When the segments of a source index are brought into a target index, each
//! source segment is either added as is or physically merged with target
//! segments of similar size. Sizes are grouped into logarithmic buckets (see
//! [`bucket`]); the policy (see [`policy`]) keeps each bucket from filling up
//! with many small merges while never combining more than
//! `max_mergeable_bucket` segments at once.
//!
//! The physical work is delegated to a [`CombineHandle`] supplied by the
//! storage layer. The returned [`MergeResult`] lists every segment of the
//! target after the call, tagged with the original segments that contributed
//! to it.

pub mod bucket;
pub mod config;
pub mod plan;
pub mod policy;
pub mod result;
pub mod segment;

pub use bucket::BucketFunction;
pub use config::{MIB, MergePolicyConfig};
pub use plan::{MergeOp, MergePlan};
pub use policy::{CombineHandle, SegmentMergePolicy, merge_indices};
pub use result::{Contributor, MergeResult, Origin, ResultKind, ResultSegment};
pub use segment::{IndexId, SegmentInfo, SegmentSet};
