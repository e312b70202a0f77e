// ==============================================
// RING PROPERTY TESTS (integration)
// ==============================================
//
// Placement and rebalance behavior checked over randomized memberships.
// Key hashes are taken from the ring itself so the checks hold for any seed.

use proptest::prelude::*;
use shardkit::rebalance::{MigrationEvent, MigrationKind, RebalanceCoordinator};
use shardkit::ring::{HashRing, Node, NodeId, RendezvousHash, RingConfig};
use shardkit::traits::NodeLocator;

fn ring_with(config: RingConfig, weights: &[u32]) -> HashRing {
    let mut ring = HashRing::try_new(config).unwrap();
    for (i, &weight) in weights.iter().enumerate() {
        ring.add_node(Node::new(format!("node-{i}"), weight));
    }
    ring
}

fn sample_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("key:{i}")).collect()
}

/// Checks that `events` name exactly the keys whose owner differs between
/// the two rings, with matching endpoints.
fn assert_events_cover_moves(before: &HashRing, after: &HashRing, events: &[MigrationEvent]) {
    for key in sample_keys(500) {
        let hash = after.hash_key(key.as_bytes());
        let old = before.locate_id(&key).unwrap();
        let new = after.locate_id(&key).unwrap();
        let covering: Vec<&MigrationEvent> =
            events.iter().filter(|e| e.range.contains(hash)).collect();

        if old == new {
            assert!(covering.is_empty(), "{key} did not move but is covered by {covering:?}");
        } else {
            assert_eq!(covering.len(), 1, "{key} moved {old} -> {new}");
            assert_eq!(&covering[0].from, old);
            assert_eq!(&covering[0].to, new);
        }
    }
}

// ==============================================
// Placement
// ==============================================

mod placement {
    use super::*;

    #[test]
    fn weighted_node_owns_proportional_share() {
        let ring = ring_with(RingConfig::default(), &[1, 3]);
        let shares = ring.ownership_share();
        let heavy = shares
            .iter()
            .find(|(id, _)| id.as_str() == "node-1")
            .map(|(_, share)| *share)
            .unwrap();
        assert!((0.65..0.85).contains(&heavy), "heavy share was {heavy}");
        let total: f64 = shares.iter().map(|(_, s)| s).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn same_membership_same_placement_regardless_of_join_order() {
        let config = RingConfig::new(32, 7);
        let mut forward = HashRing::try_new(config).unwrap();
        let mut backward = HashRing::try_new(config).unwrap();
        for i in 0..5 {
            forward.add_node(Node::new(format!("n{i}"), 1));
            backward.add_node(Node::new(format!("n{}", 4 - i), 1));
        }
        for key in sample_keys(200) {
            assert_eq!(forward.locate_id(&key), backward.locate_id(&key));
        }
    }

    #[test]
    fn rendezvous_and_ring_agree_on_membership_size() {
        let ring = ring_with(RingConfig::new(16, 0), &[1, 1, 1]);
        let mut rendezvous = RendezvousHash::new();
        for i in 0..3 {
            rendezvous.add_node(Node::new(format!("node-{i}"), 1));
        }
        let locators: [&dyn NodeLocator; 2] = [&ring, &rendezvous];
        for locator in locators {
            assert_eq!(locator.member_count(), 3);
            let owner = locator.owner_of(b"user:1").unwrap();
            assert!(owner.as_str().starts_with("node-"));
        }
    }

    #[test]
    fn merge_rejects_differently_shaped_rings() {
        let mut a = ring_with(RingConfig::new(16, 0), &[1]);
        let b = ring_with(RingConfig::new(16, 1), &[1]);
        assert!(a.merge(&b).is_err());
    }
}

// ==============================================
// Randomized memberships
// ==============================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn vnodes_are_sorted_and_owned_by_members(
        weights in prop::collection::vec(1u32..4, 1..6),
        replicas in 1u32..24,
        seed in any::<u32>(),
    ) {
        let ring = ring_with(RingConfig::new(replicas, seed), &weights);
        let hashes: Vec<u32> = ring.vnodes().map(|v| v.hash()).collect();
        prop_assert!(hashes.windows(2).all(|w| w[0] < w[1]));
        for vnode in ring.vnodes() {
            prop_assert!(ring.contains_node(vnode.node_id()));
        }
        prop_assert!(ring.vnode_count() <= replicas as usize * weights.iter().sum::<u32>() as usize);
    }

    #[test]
    fn removing_a_node_moves_only_its_keys(
        weights in prop::collection::vec(1u32..3, 2..6),
        victim in any::<prop::sample::Index>(),
    ) {
        let before = ring_with(RingConfig::new(16, 3), &weights);
        let removed = NodeId::from(format!("node-{}", victim.index(weights.len())));
        let mut after = before.clone();
        after.remove_node(&removed);

        for key in sample_keys(300) {
            let old = before.locate_id(&key).unwrap();
            let new = after.locate_id(&key).unwrap();
            if old != &removed {
                prop_assert_eq!(old, new);
            } else {
                prop_assert_ne!(new, &removed);
            }
        }
    }

    #[test]
    fn add_then_remove_restores_placement(
        weights in prop::collection::vec(1u32..3, 1..5),
        extra_weight in 1u32..4,
    ) {
        let original = ring_with(RingConfig::new(16, 11), &weights);
        let mut ring = original.clone();
        ring.add_node(Node::new("joiner", extra_weight));
        ring.remove_node("joiner");

        let a: Vec<(u32, NodeId)> = original.vnodes().map(|v| (v.hash(), v.node_id().clone())).collect();
        let b: Vec<(u32, NodeId)> = ring.vnodes().map(|v| (v.hash(), v.node_id().clone())).collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn join_events_cover_exactly_the_moved_keys(
        weights in prop::collection::vec(1u32..3, 1..5),
        seed in any::<u32>(),
    ) {
        let before = ring_with(RingConfig::new(12, seed), &weights);
        let mut after = before.clone();
        after.add_node(Node::new("joiner", 2));

        let events = RebalanceCoordinator::plan_node_added(&before, &after, "joiner");
        prop_assert!(events.iter().all(|e| e.kind == MigrationKind::Migrate));
        prop_assert!(events.iter().all(|e| e.to.as_str() == "joiner"));
        assert_events_cover_moves(&before, &after, &events);
    }

    #[test]
    fn leave_events_cover_exactly_the_moved_keys(
        weights in prop::collection::vec(1u32..3, 2..6),
        seed in any::<u32>(),
    ) {
        let before = ring_with(RingConfig::new(12, seed), &weights);
        let mut after = before.clone();
        after.remove_node("node-0");

        let events = RebalanceCoordinator::plan_node_removed(&before, &after, "node-0");
        prop_assert!(events.iter().all(|e| e.kind == MigrationKind::Reassign));
        prop_assert!(events.iter().all(|e| e.from.as_str() == "node-0"));
        assert_events_cover_moves(&before, &after, &events);
    }
}
