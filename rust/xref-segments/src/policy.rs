//! Size-bucketed merge policy.
//!
//! Every source segment is checked against the target segments of its size
//! bucket. If the bucket already holds target segments, the source segment is
//! physically merged with all of them in one operation, so the bucket does not
//! keep accumulating similarly sized segments. A bucket whose segments (with
//! the incoming one) would exceed `max_mergeable_bucket` is left alone: a
//! partial merge would leave the bucket populated and qualifying again on the
//! next call. Segments produced by a merge are not reconsidered within the
//! same call.

use xref_common::{Result, error::Error};

use crate::{
    bucket::BucketFunction,
    config::MergePolicyConfig,
    plan::{MergeOp, MergePlan},
    result::{Contributor, MergeResult, Origin, ResultKind, ResultSegment},
    segment::{SegmentInfo, SegmentSet},
};

/// Storage-layer operation that materializes one new segment in the target
/// index from one or more existing segments.
///
/// A single input is an unmerged add, several inputs a physical merge. The
/// call returns the descriptor of the created segment. Implementations own
/// the removal of consumed target segments.
pub trait CombineHandle {
    fn add_indexes(&mut self, segments: &[SegmentInfo]) -> Result<SegmentInfo>;
}

impl<T: CombineHandle + ?Sized> CombineHandle for &mut T {
    fn add_indexes(&mut self, segments: &[SegmentInfo]) -> Result<SegmentInfo> {
        (**self).add_indexes(segments)
    }
}

impl<T: CombineHandle + ?Sized> CombineHandle for Box<T> {
    fn add_indexes(&mut self, segments: &[SegmentInfo]) -> Result<SegmentInfo> {
        (**self).add_indexes(segments)
    }
}

/// Stateless merge policy. Planning is deterministic: the same inputs always
/// produce the same plan.
#[derive(Debug, Clone)]
pub struct SegmentMergePolicy {
    config: MergePolicyConfig,
    buckets: BucketFunction,
}

struct TargetSlot<'a> {
    segment: &'a SegmentInfo,
    bucket: usize,
    consumed: bool,
}

impl SegmentMergePolicy {
    pub fn new(config: MergePolicyConfig) -> Result<SegmentMergePolicy> {
        config.validate()?;
        let buckets = BucketFunction::from_config(&config);
        Ok(SegmentMergePolicy { config, buckets })
    }

    pub fn config(&self) -> &MergePolicyConfig {
        &self.config
    }

    pub fn bucket(&self, size_bytes: u64) -> usize {
        self.buckets.bucket(size_bytes)
    }

    /// Decides how the segments of `source` enter `target`.
    pub fn plan(&self, source: &SegmentSet, target: &SegmentSet) -> MergePlan {
        let cap = self.config.max_mergeable_bucket;
        let mut slots: Vec<TargetSlot> = target
            .iter()
            .map(|segment| TargetSlot {
                segment,
                bucket: self.bucket(segment.size_bytes),
                consumed: false,
            })
            .collect();

        let mut sources: Vec<&SegmentInfo> = source.iter().collect();
        sources.sort_by(|a, b| {
            a.size_bytes
                .cmp(&b.size_bytes)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut ops = Vec::with_capacity(sources.len());
        for segment in sources {
            let bucket = self.bucket(segment.size_bytes);
            let partners: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| !slot.consumed && slot.bucket == bucket)
                .map(|(i, _)| i)
                .collect();

            if partners.is_empty() {
                log::debug!(
                    "'{}' ({} bytes, bucket {bucket}): no partners in bucket, adding unmerged",
                    segment.name,
                    segment.size_bytes
                );
                ops.push(MergeOp::AddUnmerged(segment.clone()));
                continue;
            }
            if partners.len() + 1 > cap {
                log::debug!(
                    "'{}' ({} bytes, bucket {bucket}): {} partners over cap {cap}, unmerged",
                    segment.name,
                    segment.size_bytes,
                    partners.len()
                );
                ops.push(MergeOp::AddUnmerged(segment.clone()));
                continue;
            }

            let mut group = partners;
            if self.config.include_smaller_buckets {
                let mut smaller: Vec<usize> = slots
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| !slot.consumed && slot.bucket < bucket)
                    .map(|(i, _)| i)
                    .collect();
                smaller.sort_by(|&a, &b| {
                    let (a, b) = (slots[a].segment, slots[b].segment);
                    b.size_bytes
                        .cmp(&a.size_bytes)
                        .then_with(|| a.name.cmp(&b.name))
                });
                let room = cap - (group.len() + 1);
                group.extend(smaller.into_iter().take(room));
                group.sort_unstable();
            }

            let targets: Vec<SegmentInfo> = group
                .iter()
                .map(|&i| {
                    slots[i].consumed = true;
                    slots[i].segment.clone()
                })
                .collect();
            log::debug!(
                "'{}' ({} bytes, bucket {bucket}): merging with {} target segments",
                segment.name,
                segment.size_bytes,
                targets.len()
            );
            ops.push(MergeOp::Combine {
                targets,
                source: segment.clone(),
            });
        }

        let carried_over = slots
            .iter()
            .filter(|slot| !slot.consumed)
            .map(|slot| slot.segment.clone())
            .collect();
        MergePlan { ops, carried_over }
    }

    /// Plans and executes the merge of `source` into `target` through
    /// `writer`.
    ///
    /// Operations run in plan order. The first failing storage call aborts
    /// the remaining operations and is returned as a `Combine` error;
    /// operations that already completed are not rolled back.
    pub fn merge_indices<W>(
        &self,
        name: &str,
        source: &SegmentSet,
        target: &SegmentSet,
        writer: &mut W,
    ) -> Result<MergeResult>
    where
        W: CombineHandle + ?Sized,
    {
        let plan = self.plan(source, target);
        log::debug!(
            "merging {} segments of '{}' into '{name}' ({}): {} ops, {} merges, {} kept",
            source.len(),
            source.index,
            target.len(),
            plan.ops.len(),
            plan.merge_count(),
            plan.carried_over.len()
        );

        let mut segments = Vec::with_capacity(plan.resulting_segment_count());
        for (i, op) in plan.ops.iter().enumerate() {
            let inputs = op.inputs();
            let created = writer.add_indexes(&inputs).map_err(|e| {
                log::warn!(
                    "storage call {} of {} for '{name}' failed after {i} applied: {e}",
                    i + 1,
                    plan.ops.len()
                );
                Error::combine(name, e)
            })?;

            let mut contributors: Vec<Contributor> = op
                .targets()
                .iter()
                .map(|segment| Contributor {
                    segment: segment.clone(),
                    origin: Origin::Target,
                })
                .collect();
            contributors.push(Contributor {
                segment: op.source().clone(),
                origin: Origin::Source,
            });
            segments.push(ResultSegment {
                segment: created,
                kind: if op.is_merge() {
                    ResultKind::Merged
                } else {
                    ResultKind::Added
                },
                contributors,
            });
        }

        segments.extend(plan.carried_over.into_iter().map(|segment| ResultSegment {
            contributors: vec![Contributor {
                segment: segment.clone(),
                origin: Origin::Target,
            }],
            segment,
            kind: ResultKind::CarriedOver,
        }));

        Ok(MergeResult {
            name: name.to_string(),
            segments,
        })
    }
}

/// Merges `source` into `target` with the given policy configuration.
pub fn merge_indices<W>(
    name: &str,
    source: &SegmentSet,
    target: &SegmentSet,
    config: MergePolicyConfig,
    writer: &mut W,
) -> Result<MergeResult>
where
    W: CombineHandle + ?Sized,
{
    SegmentMergePolicy::new(config)?.merge_indices(name, source, target, writer)
}
