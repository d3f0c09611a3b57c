// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

/// Memory-tier entry metadata for eviction
#[derive(Debug, Clone)]
pub struct EvictionCandidate {
    pub key: String,
    pub size_bytes: usize,
    /// Epoch millis of the last read or write
    pub last_accessed_ms: u64,
    pub access_count: u64,
}

/// Least-recently-used victim selection.
///
/// Ties on `last_accessed_ms` go to the entry with fewer accesses, then to
/// key order, so selection is deterministic.
#[derive(Debug, Default, Clone, Copy)]
pub struct LruPolicy;

impl LruPolicy {
    /// Pick victims, oldest first, until at least `bytes_to_free` are covered
    /// or the candidates run out.
    pub fn select_victims(&self, candidates: &[EvictionCandidate], bytes_to_free: usize) -> Vec<String> {
        if bytes_to_free == 0 {
            return Vec::new();
        }

        let mut ordered: Vec<&EvictionCandidate> = candidates.iter().collect();
        ordered.sort_by(|a, b| {
            a.last_accessed_ms
                .cmp(&b.last_accessed_ms)
                .then(a.access_count.cmp(&b.access_count))
                .then_with(|| a.key.cmp(&b.key))
        });

        let mut freed = 0usize;
        let mut victims = Vec::new();
        for candidate in ordered {
            if freed >= bytes_to_free {
                break;
            }
            freed = freed.saturating_add(candidate.size_bytes);
            victims.push(candidate.key.clone());
        }
        victims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(key: &str, size_bytes: usize, last_accessed_ms: u64, access_count: u64) -> EvictionCandidate {
        EvictionCandidate {
            key: key.to_string(),
            size_bytes,
            last_accessed_ms,
            access_count,
        }
    }

    #[test]
    fn test_nothing_to_free_selects_nothing() {
        let entries = vec![candidate("a", 10, 1, 0)];
        assert!(LruPolicy.select_victims(&entries, 0).is_empty());
    }

    #[test]
    fn test_oldest_evicted_first() {
        let entries = vec![
            candidate("recent", 100, 3_000, 1),
            candidate("oldest", 100, 1_000, 50),
            candidate("middle", 100, 2_000, 1),
        ];

        let victims = LruPolicy.select_victims(&entries, 150);
        assert_eq!(victims, vec!["oldest".to_string(), "middle".to_string()]);
    }

    #[test]
    fn test_stops_once_enough_freed() {
        let entries = vec![
            candidate("big", 1_000, 1, 0),
            candidate("small", 10, 2, 0),
        ];

        let victims = LruPolicy.select_victims(&entries, 500);
        assert_eq!(victims, vec!["big".to_string()]);
    }

    #[test]
    fn test_exhausts_candidates_when_not_enough() {
        let entries = vec![
            candidate("a", 10, 1, 0),
            candidate("b", 10, 2, 0),
        ];

        let victims = LruPolicy.select_victims(&entries, 1_000);
        assert_eq!(victims.len(), 2);
    }

    #[test]
    fn test_ties_broken_by_access_count_then_key() {
        let entries = vec![
            candidate("b", 10, 5, 0),
            candidate("busy", 10, 5, 9),
            candidate("a", 10, 5, 0),
        ];

        let victims = LruPolicy.select_victims(&entries, 30);
        assert_eq!(victims, vec!["a".to_string(), "b".to_string(), "busy".to_string()]);
    }
}
