//! Walks a three-shard cache through a join and a leave, printing the
//! migration events a data mover would act on.
//!
//! Run with `RUST_LOG=shardkit=debug` to see the ring's own logging.

use shardkit::builder::CachePolicy;
use shardkit::rebalance::MigrationEvent;
use shardkit::sharded::ShardedCacheBuilder;
use shardkit::traits::{EvictionPolicy, MutableCache};
use tracing_subscriber::EnvFilter;

fn setup_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn summarize(label: &str, events: &[MigrationEvent]) {
    let moved: u64 = events.iter().map(|e| e.range.len()).sum();
    println!(
        "{label}: {} ranges, {:.2}% of the hash space",
        events.len(),
        moved as f64 * 100.0 / shardkit::ring::RING_SPACE as f64
    );
    for event in events.iter().take(4) {
        println!("  {event}");
    }
    if events.len() > 4 {
        println!("  ... {} more", events.len() - 4);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing("info");

    let (cache, events) = ShardedCacheBuilder::new(4_096)
        .policy(CachePolicy::Lfu)
        .shard("cache-a", 1)
        .shard("cache-b", 1)
        .shard("cache-c", 2)
        .build_with_events::<String, u64>()?;

    for i in 0..10_000u64 {
        cache.put(format!("user:{i}"), i)?;
    }
    for id in cache.shard_ids() {
        if let Some(shard) = cache.shard(&id) {
            println!("{id}: {} entries", shard.lock().len());
        }
    }

    cache.add_shard("cache-d", 1);
    let joined: Vec<MigrationEvent> = events.try_iter().collect();
    summarize("cache-d joined", &joined);

    let Some(drained) = cache.remove_shard("cache-a") else {
        return Ok(());
    };
    let left: Vec<MigrationEvent> = events.try_iter().collect();
    summarize("cache-a left", &left);

    // Replay the departed shard's entries onto their new owners.
    let mut replayed = 0;
    for i in 0..10_000u64 {
        let key = format!("user:{i}");
        let value = drained.lock().remove(&key);
        if let Some(value) = value {
            cache.put(key, value)?;
            replayed += 1;
        }
    }
    println!("replayed {replayed} entries, {} resident", cache.len());
    println!("{:?}", cache.metrics());
    Ok(())
}
