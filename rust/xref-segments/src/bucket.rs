//! Size buckets.
//!
//! Bucket `0` holds segments smaller than the size unit. Bucket `n > 0` holds
//! segments with `unit * base^n <= size < unit * base^(n + 1)`, i.e.
//! `floor(log_base(size / unit))` for sizes of at least one unit. The
//! logarithm is corrected against the bucket bounds, so sizes that are exact
//! powers of the base land in the right bucket despite rounding in `log`.

use crate::config::MergePolicyConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketFunction {
    unit: u64,
    base: f64,
}

impl BucketFunction {
    /// Callers validate `base > 1` and `unit > 0` beforehand.
    pub fn new(unit: u64, base: f64) -> BucketFunction {
        BucketFunction { unit, base }
    }

    pub fn from_config(config: &MergePolicyConfig) -> BucketFunction {
        BucketFunction::new(config.size_unit, config.bucket_base)
    }

    pub fn bucket(&self, size: u64) -> usize {
        if size < self.unit {
            return 0;
        }
        let size = size as f64;
        let mut bucket = (size / self.unit as f64).log(self.base).floor() as usize;
        if bucket > 0 && size < self.bound(bucket) {
            bucket -= 1;
        } else if size >= self.bound(bucket.saturating_add(1)) {
            bucket = bucket.saturating_add(1);
        }
        bucket
    }

    /// Smallest size (as a float) of bucket `bucket > 0`.
    fn bound(&self, bucket: usize) -> f64 {
        self.unit as f64 * self.base.powf(bucket as f64)
    }
}
