//! Index-linked building blocks shared by the eviction policies.

pub mod frequency_buckets;
pub mod ghost_list;
pub mod intrusive_list;
pub mod slot_arena;

pub use frequency_buckets::FrequencyBuckets;
pub use ghost_list::GhostList;
pub use intrusive_list::IntrusiveList;
pub use slot_arena::{SlotArena, SlotId};
