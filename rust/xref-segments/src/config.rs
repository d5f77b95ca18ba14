//! Merge policy configuration.

use serde::{Deserialize, Serialize};
use xref_common::{Result, verify_arg};

/// One mebibyte, the default size unit of bucket zero.
pub const MIB: u64 = 1 << 20;

/// Configuration of [`SegmentMergePolicy`](crate::SegmentMergePolicy).
///
/// All fields have defaults, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicyConfig {
    /// Maximum number of segments combined by a single physical merge,
    /// counting the incoming source segment.
    pub max_mergeable_bucket: usize,
    /// Ratio between the size bounds of consecutive buckets.
    pub bucket_base: f64,
    /// Segments smaller than this fall into bucket zero.
    pub size_unit: u64,
    /// Whether target segments from smaller buckets may join a merge.
    pub include_smaller_buckets: bool,
}

impl Default for MergePolicyConfig {
    fn default() -> Self {
        MergePolicyConfig {
            max_mergeable_bucket: usize::MAX,
            bucket_base: 10.0,
            size_unit: MIB,
            include_smaller_buckets: true,
        }
    }
}

impl MergePolicyConfig {
    pub fn new() -> MergePolicyConfig {
        Self::default()
    }

    pub fn with_max_mergeable_bucket(mut self, max: usize) -> Self {
        self.max_mergeable_bucket = max;
        self
    }

    pub fn with_bucket_base(mut self, base: f64) -> Self {
        self.bucket_base = base;
        self
    }

    pub fn with_size_unit(mut self, unit: u64) -> Self {
        self.size_unit = unit;
        self
    }

    pub fn with_include_smaller_buckets(mut self, include: bool) -> Self {
        self.include_smaller_buckets = include;
        self
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(max_mergeable_bucket, self.max_mergeable_bucket >= 1);
        verify_arg!(
            bucket_base,
            self.bucket_base.is_finite() && self.bucket_base > 1.0
        );
        verify_arg!(size_unit, self.size_unit > 0);
        Ok(())
    }
}
