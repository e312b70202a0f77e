// ==============================================
// CROSS-POLICY INVARIANT TESTS (integration)
// ==============================================
//
// Behavior every eviction policy must share, plus policy-specific
// reference scenarios checked from outside the crate.

use proptest::prelude::*;
use shardkit::builder::{CacheBuilder, CachePolicy};
use shardkit::policy::{AdaptiveCache, AdaptiveConfig, LfuCache, LruCache};
use shardkit::traits::{EvictionPolicy, LfuPolicy, LruPolicy, MutableCache};

fn all_policies() -> [CachePolicy; 3] {
    [
        CachePolicy::Lfu,
        CachePolicy::Lru,
        CachePolicy::Adaptive(AdaptiveConfig::default()),
    ]
}

#[derive(Debug, Clone)]
enum Op {
    Get(u8),
    Put(u8, u32),
    Remove(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..16).prop_map(Op::Get),
        4 => (0u8..16, any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
        1 => (0u8..16).prop_map(Op::Remove),
    ]
}

// ==============================================
// Capacity
// ==============================================

mod capacity {
    use super::*;

    #[test]
    fn zero_capacity_stores_nothing() {
        for policy in all_policies() {
            let mut cache = CacheBuilder::new(0).build::<&str, i32>(policy);
            cache.put("key", 42);
            assert_eq!(cache.len(), 0, "{}", policy.name());
            assert_eq!(cache.get(&"key"), None);
        }
    }

    #[test]
    fn len_never_exceeds_capacity() {
        for policy in all_policies() {
            let mut cache = CacheBuilder::new(5).build::<u32, u32>(policy);
            for i in 0..100 {
                cache.put(i, i);
                if i % 3 == 0 {
                    cache.get(&(i / 2));
                }
                assert!(cache.len() <= 5, "{} grew to {}", policy.name(), cache.len());
            }
            assert_eq!(cache.len(), 5);
        }
    }

    #[test]
    fn update_never_evicts() {
        for policy in all_policies() {
            let mut cache = CacheBuilder::new(2).build::<u32, u32>(policy);
            cache.put(1, 1);
            cache.put(2, 2);
            assert_eq!(cache.put(2, 20), Some(2));
            assert!(cache.contains(&1) && cache.contains(&2), "{}", policy.name());
        }
    }
}

// ==============================================
// LFU
// ==============================================

mod lfu {
    use super::*;

    #[test]
    fn capacity_two_reference_sequence() {
        let mut cache = LfuCache::new(2);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.get(&1), Some(&1));
        cache.put(3, 3);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&3), Some(&3));
        // 1 and 3 both at frequency 2; 1 got there first.
        cache.put(4, 4);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&3), Some(&3));
        assert_eq!(cache.get(&4), Some(&4));
        assert!(cache.check_invariants().is_ok());
    }

    #[test]
    fn frequency_counts_gets_and_updates() {
        let mut cache = LfuCache::new(4);
        cache.put("a", 1);
        cache.get(&"a");
        cache.put("a", 2);
        assert_eq!(cache.frequency(&"a"), Some(3));
        cache.get(&"missing");
        assert_eq!(cache.frequency(&"missing"), None);
    }

    proptest! {
        #[test]
        fn min_freq_matches_brute_force(ops in prop::collection::vec(op_strategy(), 1..200)) {
            let mut cache = LfuCache::new(6);
            for op in ops {
                match op {
                    Op::Get(k) => { cache.get(&k); }
                    Op::Put(k, v) => { cache.put(k, v); }
                    Op::Remove(k) => { cache.remove(&k); }
                }
                prop_assert!(cache.check_invariants().is_ok());
                let brute = cache.keys().filter_map(|k| cache.frequency(k)).min();
                prop_assert_eq!(cache.min_freq(), brute);
                prop_assert!(cache.len() <= 6);
            }
        }

        #[test]
        fn pop_lfu_drains_in_frequency_order(hits in prop::collection::vec(0u8..8, 0..60)) {
            let mut cache = LfuCache::new(8);
            for k in 0u8..8 {
                cache.put(k, ());
            }
            for k in hits {
                cache.get(&k);
            }
            let mut last = 0;
            while let Some((key, _)) = cache.peek_lfu().map(|(k, v)| (*k, *v)) {
                let freq = cache.frequency(&key).unwrap();
                prop_assert!(freq >= last);
                last = freq;
                prop_assert_eq!(cache.pop_lfu().map(|(k, _)| k), Some(key));
            }
            prop_assert!(cache.is_empty());
        }
    }
}

// ==============================================
// LRU
// ==============================================

mod lru {
    use super::*;

    #[test]
    fn capacity_one_reference_sequence() {
        let mut cache = LruCache::new(1);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(&2));
    }

    proptest! {
        #[test]
        fn matches_vec_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
            const CAP: usize = 5;
            let mut cache = LruCache::new(CAP);
            // Most recent first.
            let mut model: Vec<(u8, u32)> = Vec::new();

            for op in ops {
                match op {
                    Op::Get(k) => {
                        let expected = model.iter().position(|(mk, _)| *mk == k).map(|i| {
                            let entry = model.remove(i);
                            model.insert(0, entry);
                            entry.1
                        });
                        prop_assert_eq!(cache.get(&k).copied(), expected);
                    }
                    Op::Put(k, v) => {
                        if let Some(i) = model.iter().position(|(mk, _)| *mk == k) {
                            model.remove(i);
                        } else if model.len() == CAP {
                            model.pop();
                        }
                        model.insert(0, (k, v));
                        cache.put(k, v);
                    }
                    Op::Remove(k) => {
                        let expected = model.iter().position(|(mk, _)| *mk == k).map(|i| model.remove(i).1);
                        prop_assert_eq!(cache.remove(&k), expected);
                    }
                }
                let keys: Vec<u8> = cache.keys().copied().collect();
                let model_keys: Vec<u8> = model.iter().map(|(k, _)| *k).collect();
                prop_assert_eq!(keys, model_keys);
                prop_assert_eq!(cache.peek_lru().map(|(k, _)| *k), model.last().map(|(k, _)| *k));
            }
        }
    }
}

// ==============================================
// Adaptive
// ==============================================

mod adaptive {
    use super::*;

    #[test]
    fn ghost_hit_on_recent_side_grows_target() {
        let mut cache = AdaptiveCache::try_with_config(2, AdaptiveConfig::new(1, 0.0)).unwrap();
        cache.put(1, 1);
        cache.put(2, 2);
        cache.put(3, 3);
        assert_eq!(cache.ghost_recent_len(), 1);
        assert_eq!(cache.target(), 0);

        cache.put(1, 10);
        assert_eq!(cache.target(), 1);
        assert_eq!(cache.peek(&1), Some(&10));
        assert_eq!(cache.frequent_len(), 1);
    }

    proptest! {
        #[test]
        fn segments_and_target_stay_bounded(
            ops in prop::collection::vec(op_strategy(), 1..300),
            capacity in 1usize..8,
            delta in 1usize..4,
        ) {
            let mut cache = AdaptiveCache::try_with_config(capacity, AdaptiveConfig::new(delta, 0.5)).unwrap();
            for op in ops {
                match op {
                    Op::Get(k) => { cache.get(&k); }
                    Op::Put(k, v) => { cache.put(k, v); }
                    Op::Remove(k) => { cache.remove(&k); }
                }
                prop_assert!(cache.len() <= capacity);
                prop_assert_eq!(cache.recent_len() + cache.frequent_len(), cache.len());
                prop_assert!(cache.target() <= capacity);
                prop_assert!(cache.ghost_recent_len() <= capacity);
                prop_assert!(cache.ghost_frequent_len() <= capacity);
                if let Some(victim) = cache.peek_victim() {
                    prop_assert!(cache.contains(victim));
                }
            }
        }
    }
}
