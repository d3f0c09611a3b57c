// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Serialized-size estimation for memory budgeting.
//!
//! Large top-level arrays are sampled: the first few elements are
//! serialized and the average is extrapolated over the whole array. The
//! result is a heuristic. Its error only shifts how early eviction kicks
//! in; the budget itself is enforced on the estimates, so it always holds.

use serde_json::Value;

#[derive(Debug, Clone, Copy)]
pub struct SizeEstimator {
    /// Arrays longer than this are sampled
    sample_threshold: usize,
    sample_len: usize,
}

impl SizeEstimator {
    pub fn new(sample_threshold: usize, sample_len: usize) -> Self {
        Self { sample_threshold, sample_len }
    }

    pub fn estimate(&self, value: &Value) -> usize {
        match value {
            Value::Array(items) if self.sample_len > 0 && items.len() > self.sample_threshold => {
                let sample = &items[..self.sample_len.min(items.len())];
                let sample_bytes: usize = sample.iter().map(serialized_len).sum();
                let per_item = sample_bytes.div_ceil(sample.len());
                // brackets + one comma between each pair
                let separators = 2 + items.len() - 1;
                per_item.saturating_mul(items.len()).saturating_add(separators)
            }
            _ => serialized_len(value),
        }
    }
}

impl Default for SizeEstimator {
    fn default() -> Self {
        Self::new(100, 10)
    }
}

fn serialized_len(value: &Value) -> usize {
    value.to_string().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_small_values_are_exact() {
        let est = SizeEstimator::default();
        let value = json!({"theme": "dark", "dailyGoal": 20});
        assert_eq!(est.estimate(&value), value.to_string().len());
        assert_eq!(est.estimate(&Value::Null), 4);
    }

    #[test]
    fn test_array_at_threshold_is_exact() {
        let est = SizeEstimator::new(5, 2);
        let value = json!([1, 22, 333, 4444, 55555]);
        assert_eq!(est.estimate(&value), value.to_string().len());
    }

    #[test]
    fn test_uniform_large_array_is_exact() {
        let est = SizeEstimator::new(10, 3);
        let items: Vec<Value> = (0..500).map(|_| json!({"id": "abc", "n": 1})).collect();
        let value = Value::Array(items);
        assert_eq!(est.estimate(&value), value.to_string().len());
    }

    #[test]
    fn test_skewed_large_array_extrapolates_from_prefix() {
        let est = SizeEstimator::new(10, 2);
        let mut items = vec![json!("a"), json!("b")];
        items.extend((0..98).map(|_| json!("a much longer string element")));
        let value = Value::Array(items);

        let estimate = est.estimate(&value);
        // Prefix is tiny, so the estimate undershoots the real size
        assert!(estimate < value.to_string().len());
        assert_eq!(estimate, 3 * 100 + 2 + 99);
    }

    #[test]
    fn test_zero_sample_len_falls_back_to_full_serialization() {
        let est = SizeEstimator::new(1, 0);
        let value = json!([1, 2, 3]);
        assert_eq!(est.estimate(&value), value.to_string().len());
    }
}
