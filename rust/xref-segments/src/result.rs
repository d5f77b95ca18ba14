//! Outcome of a merge call.

use ahash::AHashMap;
use xref_common::{Result, error::Error};

use crate::segment::{SegmentInfo, SegmentSet};

/// Which side of a merge call a contributing segment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Source,
    Target,
}

/// An original segment that contributed to a resulting segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub segment: SegmentInfo,
    pub origin: Origin,
}

/// How a resulting segment came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// A source segment added without a physical merge.
    Added,
    /// A new segment produced by physically merging several segments.
    Merged,
    /// A target segment untouched by the call.
    CarriedOver,
}

/// A segment present in the target after the merge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSegment {
    pub segment: SegmentInfo,
    pub kind: ResultKind,
    pub contributors: Vec<Contributor>,
}

impl ResultSegment {
    /// `true` for segments created by the call.
    pub fn is_new(&self) -> bool {
        self.kind != ResultKind::CarriedOver
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Name of the target index.
    pub name: String,
    /// Every segment of the target after the call: new segments in execution
    /// order, then carried-over segments in target order.
    pub segments: Vec<ResultSegment>,
}

impl MergeResult {
    pub fn new_segments(&self) -> impl Iterator<Item = &ResultSegment> {
        self.segments.iter().filter(|s| s.is_new())
    }

    pub fn carried_over(&self) -> impl Iterator<Item = &SegmentInfo> {
        self.segments
            .iter()
            .filter(|s| !s.is_new())
            .map(|s| &s.segment)
    }

    /// Number of physical merges (operations with more than one input).
    pub fn merges_performed(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.kind == ResultKind::Merged)
            .count()
    }

    /// Contributors of the segments created by the call.
    pub fn merged_entries(&self) -> impl Iterator<Item = &Contributor> {
        self.new_segments().flat_map(|s| s.contributors.iter())
    }

    /// Contributors of all resulting segments, carried-over ones included.
    pub fn contributors(&self) -> impl Iterator<Item = &Contributor> {
        self.segments.iter().flat_map(|s| s.contributors.iter())
    }

    /// Checks that the contributors partition `source` and `target` exactly:
    /// every original segment appears once, none is invented.
    pub fn verify_conservation(&self, source: &SegmentSet, target: &SegmentSet) -> Result<()> {
        let mut expected = AHashMap::<(Origin, &str), usize>::new();
        for (origin, set) in [(Origin::Source, source), (Origin::Target, target)] {
            for segment in set.iter() {
                *expected.entry((origin, segment.name.as_str())).or_default() += 1;
            }
        }

        for contributor in self.contributors() {
            let key = (contributor.origin, contributor.segment.name.as_str());
            match expected.get_mut(&key) {
                Some(count) if *count > 0 => *count -= 1,
                _ => {
                    return Err(Error::invalid_format(
                        "merge result",
                        format!(
                            "{:?} segment '{}' is not an unclaimed input of '{}'",
                            contributor.origin, contributor.segment.name, self.name
                        ),
                    ));
                }
            }
        }

        if let Some(((origin, name), _)) = expected.iter().find(|(_, count)| **count > 0) {
            return Err(Error::invalid_format(
                "merge result",
                format!("{origin:?} segment '{name}' is missing from '{}'", self.name),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contributor(name: &str, origin: Origin) -> Contributor {
        let index = match origin {
            Origin::Source => "src",
            Origin::Target => "dst",
        };
        Contributor {
            segment: SegmentInfo::new(name, 1, index),
            origin,
        }
    }

    fn sample() -> MergeResult {
        MergeResult {
            name: "dst".to_string(),
            segments: vec![
                ResultSegment {
                    segment: SegmentInfo::new("n0", 1, "dst"),
                    kind: ResultKind::Added,
                    contributors: vec![contributor("s0", Origin::Source)],
                },
                ResultSegment {
                    segment: SegmentInfo::new("n1", 2, "dst"),
                    kind: ResultKind::Merged,
                    contributors: vec![
                        contributor("t0", Origin::Target),
                        contributor("s1", Origin::Source),
                    ],
                },
                ResultSegment {
                    segment: SegmentInfo::new("t1", 1, "dst"),
                    kind: ResultKind::CarriedOver,
                    contributors: vec![contributor("t1", Origin::Target)],
                },
            ],
        }
    }

    fn sets() -> (SegmentSet, SegmentSet) {
        let mut source = SegmentSet::new("src");
        source.push("s0", 1).push("s1", 1);
        let mut target = SegmentSet::new("dst");
        target.push("t0", 1).push("t1", 1);
        (source, target)
    }

    #[test]
    fn test_accessors() {
        let result = sample();
        assert_eq!(result.merges_performed(), 1);
        assert_eq!(result.new_segments().count(), 2);
        assert_eq!(result.merged_entries().count(), 3);
        assert_eq!(result.contributors().count(), 4);
        let carried: Vec<_> = result.carried_over().map(|s| s.name.as_str()).collect();
        assert_eq!(carried, ["t1"]);
    }

    #[test]
    fn test_conservation() {
        let (source, target) = sets();
        sample().verify_conservation(&source, &target).unwrap();
    }

    #[test]
    fn test_conservation_detects_missing_and_duplicate() {
        let (source, target) = sets();

        let mut missing = sample();
        missing.segments.pop();
        let err = missing.verify_conservation(&source, &target).unwrap_err();
        assert!(err.to_string().contains("'t1' is missing"), "{err}");

        let mut duplicate = sample();
        duplicate.segments[0]
            .contributors
            .push(contributor("t1", Origin::Target));
        let err = duplicate.verify_conservation(&source, &target).unwrap_err();
        assert!(err.to_string().contains("'t1' is not an unclaimed input"), "{err}");

        let mut wrong_side = sample();
        wrong_side.segments[0].contributors[0].origin = Origin::Target;
        assert!(wrong_side.verify_conservation(&source, &target).is_err());
    }
}
