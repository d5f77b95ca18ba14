use ahash::AHashSet;
use xref_common::error::ErrorKind;
use xref_segments::{
    MIB, MergePolicyConfig, Origin, ResultKind, SegmentMergePolicy, SegmentSet, merge_indices,
};
use xref_testkit::{InMemoryIndexWriter, data_gen};

fn mb_set(index: &str, sizes: &[u64]) -> SegmentSet {
    SegmentSet::with_sizes(index, sizes.iter().map(|mb| mb * MIB))
}

#[test]
fn test_scenario_simple_no_merge() {
    let target = mb_set("dst", &[1000, 1500, 1200, 600]);
    let source = mb_set("src", &[1, 2]);
    let mut writer = InMemoryIndexWriter::new(&target);

    let result = merge_indices("dst", &source, &target, MergePolicyConfig::default(), &mut writer)
        .unwrap();

    let entries: Vec<_> = result.merged_entries().collect();
    assert_eq!(entries.len(), source.len());
    assert!(entries.iter().all(|c| c.origin == Origin::Source));
    assert_eq!(result.merges_performed(), 0);

    let carried: Vec<_> = result.carried_over().cloned().collect();
    assert_eq!(carried, target.segments);
    result.verify_conservation(&source, &target).unwrap();
}

#[test]
fn test_scenario_single_merge() {
    let target = mb_set("dst", &[1000, 1500, 1200, 600]);
    let source = mb_set("src", &[520]);
    let mut writer = InMemoryIndexWriter::new(&target);

    let result = merge_indices("dst", &source, &target, MergePolicyConfig::default(), &mut writer)
        .unwrap();

    let entries: Vec<_> = result.merged_entries().collect();
    assert_eq!(entries.len(), source.len() + 1);
    let from_target: Vec<_> = entries
        .iter()
        .filter(|c| c.origin != Origin::Source)
        .collect();
    assert_eq!(from_target.len(), 1);
    assert_eq!(from_target[0].segment.size_bytes, 600 * MIB);
    assert_eq!(
        entries
            .iter()
            .filter(|c| c.segment.size_bytes == 600 * MIB)
            .count(),
        1
    );

    assert_eq!(result.merges_performed(), 1);
    assert_eq!(result.carried_over().count(), 3);
    result.verify_conservation(&source, &target).unwrap();

    // The storage layer now holds the three large segments and the merged one.
    assert_eq!(writer.segments().len(), 4);
    assert_eq!(writer.total_size(), target.total_size() + source.total_size());
}

#[test]
fn test_scenario_cap_enforcement() {
    let target = mb_set("dst", &[1200, 1200, 1200]);
    let source = mb_set("src", &[520, 1200]);
    let mut writer = InMemoryIndexWriter::new(&target);
    let config = MergePolicyConfig::new().with_max_mergeable_bucket(3);

    let result = merge_indices("dst", &source, &target, config, &mut writer).unwrap();

    let entries: Vec<_> = result.merged_entries().collect();
    assert_eq!(entries.len(), source.len());
    assert!(entries.iter().all(|c| c.origin == Origin::Source));
    assert_eq!(result.merges_performed(), 0);
    result.verify_conservation(&source, &target).unwrap();
}

#[test]
fn test_conservation_and_cap_on_random_sizes() {
    let mut rng = fastrand::Rng::with_seed(data_gen::test_seed());
    for round in 0..200 {
        let cap = rng.usize(1..=6);
        let config = MergePolicyConfig::new()
            .with_max_mergeable_bucket(cap)
            .with_include_smaller_buckets(rng.bool());
        let policy = SegmentMergePolicy::new(config).unwrap();

        let source_count = rng.usize(0..8);
        let target_count = rng.usize(0..12);
        let source = SegmentSet::with_sizes(
            "src",
            data_gen::segment_sizes(&mut rng, source_count, 1 << 34),
        );
        let target = SegmentSet::with_sizes(
            "dst",
            data_gen::segment_sizes(&mut rng, target_count, 1 << 34),
        );

        let mut writer = InMemoryIndexWriter::new(&target);
        let result = policy
            .merge_indices("dst", &source, &target, &mut writer)
            .unwrap();

        result
            .verify_conservation(&source, &target)
            .unwrap_or_else(|e| panic!("round {round}: {e}"));
        for segment in &result.segments {
            assert!(segment.contributors.len() <= cap, "round {round}");
            if segment.kind == ResultKind::Merged {
                assert!(segment.contributors.len() >= 2);
                assert_eq!(
                    segment
                        .contributors
                        .iter()
                        .filter(|c| c.origin == Origin::Source)
                        .count(),
                    1
                );
            }
        }

        // The writer's final state matches the result.
        let result_names: AHashSet<_> = result.segments.iter().map(|s| &s.segment.name).collect();
        let writer_names: AHashSet<_> = writer.segments().iter().map(|s| &s.name).collect();
        assert_eq!(result_names, writer_names);
        assert_eq!(writer.total_size(), source.total_size() + target.total_size());
    }
}

#[test]
fn test_plan_is_deterministic_and_order_independent() {
    let mut rng = fastrand::Rng::with_seed(data_gen::test_seed());
    let policy = SegmentMergePolicy::new(MergePolicyConfig::default()).unwrap();
    for _ in 0..50 {
        let source_count = rng.usize(1..6);
        let source = SegmentSet::with_sizes(
            "src",
            data_gen::segment_sizes(&mut rng, source_count, 1 << 32),
        );
        let target_count = rng.usize(0..8);
        let target = SegmentSet::with_sizes(
            "dst",
            data_gen::segment_sizes(&mut rng, target_count, 1 << 32),
        );

        let plan = policy.plan(&source, &target);
        assert_eq!(plan, policy.plan(&source, &target));

        let mut shuffled = source.clone();
        rng.shuffle(&mut shuffled.segments);
        assert_eq!(plan, policy.plan(&shuffled, &target));
    }
}

#[test]
fn test_merged_output_is_stable_on_next_call() {
    // A merged bucket does not immediately qualify again within the same call.
    let target = mb_set("dst", &[600]);
    let source = mb_set("src", &[510, 520, 530]);
    let mut writer = InMemoryIndexWriter::new(&target);
    let result = merge_indices("dst", &source, &target, MergePolicyConfig::default(), &mut writer)
        .unwrap();
    assert_eq!(result.merges_performed(), 1);
    assert_eq!(writer.calls().len(), 3);
    assert_eq!(writer.calls()[0].len(), 2);
    assert_eq!(writer.segments().len(), 3);

    // The next call plans against a fresh snapshot, where the two segments
    // added unmerged now form a bucket of their own.
    let next_target = writer.snapshot();
    let next_source = mb_set("src2", &[540]);
    let next = merge_indices(
        "dst",
        &next_source,
        &next_target,
        MergePolicyConfig::default(),
        &mut writer,
    )
    .unwrap();
    assert_eq!(next.merges_performed(), 1);
    let merged = next.new_segments().next().unwrap();
    assert_eq!(merged.contributors.len(), 3);
    next.verify_conservation(&next_source, &next_target).unwrap();
    assert_eq!(writer.segments().len(), 2);
}

#[test]
fn test_combine_failure_propagates() {
    let target = mb_set("dst", &[1000, 600]);
    let source = mb_set("src", &[1, 520, 2]);
    let mut writer = InMemoryIndexWriter::new(&target).with_failure_on_call(2);

    let err = merge_indices("dst", &source, &target, MergePolicyConfig::default(), &mut writer)
        .unwrap_err();
    match err.kind() {
        ErrorKind::Combine { index, source } => {
            assert_eq!(index, "dst");
            assert!(source.to_string().contains("injected failure"));
        }
        other => panic!("unexpected error kind: {other:?}"),
    }

    // Completed operations are kept.
    assert_eq!(writer.calls().len(), 2);
    assert_eq!(writer.segments().len(), 4);
}

#[test]
fn test_invalid_config_fails_fast() {
    let target = mb_set("dst", &[600]);
    let source = mb_set("src", &[520]);
    let mut writer = InMemoryIndexWriter::new(&target);
    let config = MergePolicyConfig::new().with_max_mergeable_bucket(0);

    let err = merge_indices("dst", &source, &target, config, &mut writer).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    assert!(writer.calls().is_empty());
}

#[test]
fn test_config_from_json() {
    let config: MergePolicyConfig = serde_json::from_str(
        r#"{ "max_mergeable_bucket": 3, "bucket_base": 4.0, "include_smaller_buckets": false }"#,
    )
    .unwrap();
    let policy = SegmentMergePolicy::new(config).unwrap();
    assert_eq!(policy.config().size_unit, MIB);
    assert_eq!(policy.bucket(16 * MIB), 2);

    let bad: MergePolicyConfig = serde_json::from_str(r#"{ "bucket_base": 1.0 }"#).unwrap();
    assert!(SegmentMergePolicy::new(bad).is_err());
}
