use anyhow::{ensure, Result};
use futures::future::join_all;
use recollect_core::{HistoryConfig, HistoryTracker, OrderedSet, RedisOrderedSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recollect_integration_tests=info,recollect_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🧪 Recollect Integration Tests");

    run_suite("local", None).await?;

    match std::env::var("RECOLLECT_REDIS_URL") {
        Ok(url) => {
            tracing::info!("   Redis: {}", url);
            let service: Arc<dyn OrderedSet> = Arc::new(RedisOrderedSet::connect(&url).await?);
            run_suite("redis", Some(service)).await?;
        }
        Err(_) => tracing::info!("RECOLLECT_REDIS_URL not set, skipping Redis suite"),
    }

    println!();
    tracing::info!("✅ All tests passed!");

    Ok(())
}

async fn run_suite(label: &str, service: Option<Arc<dyn OrderedSet>>) -> Result<()> {
    tracing::info!("Suite: {}", label);

    test_basic_operations(service.clone()).await?;
    test_parallel_add_has(service.clone()).await?;
    test_hashing(service.clone()).await?;
    test_expiration(service).await?;

    Ok(())
}

/// Each test gets its own collection so runs never see each other's entries
fn tracker(service: Option<Arc<dyn OrderedSet>>, ttl: Duration, clean_interval: Duration) -> Result<HistoryTracker> {
    let config = HistoryConfig::new(format!("it-{}", uuid::Uuid::new_v4()))
        .with_time_to_live(ttl)
        .with_clean_interval(clean_interval)
        .with_remote_timeout(Duration::from_secs(2));
    Ok(HistoryTracker::new(config, service)?)
}

/// Test basic ADD/HAS/GET/REMOVE operations
async fn test_basic_operations(service: Option<Arc<dyn OrderedSet>>) -> Result<()> {
    tracing::info!("Test: Basic Operations");

    let history = tracker(service, Duration::from_secs(60), Duration::from_secs(60))?;
    let key = format!("basic-test-{}", uuid::Uuid::new_v4());

    // ADD
    let first = SystemTime::now();
    history.try_add(&key, first).await?;
    ensure!(history.try_has(&key).await?, "Key should be seen right after add");

    // Re-add overwrites
    let second = first + Duration::from_secs(5);
    history.try_add(&key, second).await?;
    let recorded = history.try_get(&key).await?.unwrap_or(SystemTime::UNIX_EPOCH);
    let drift = recorded.duration_since(second).unwrap_or_else(|e| e.duration());
    ensure!(drift < Duration::from_millis(1), "Last add should win");

    // REMOVE, twice
    history.try_remove(&key).await?;
    history.try_remove(&key).await?;
    ensure!(!history.try_has(&key).await?, "Key should not be seen after remove");
    ensure!(history.try_get(&key).await?.is_none(), "Key should not be found after remove");

    history.shutdown();
    tracing::info!("   ✓ Basic operations work correctly");
    Ok(())
}

/// Test parallel ADD and HAS operations - verify no lost updates
async fn test_parallel_add_has(service: Option<Arc<dyn OrderedSet>>) -> Result<()> {
    let num_operations = 500;
    tracing::info!("Test: Parallel ADD/HAS ({} concurrent operations)", num_operations);

    let history = tracker(service, Duration::from_secs(60), Duration::from_secs(60))?;
    let keys: Vec<String> = (0..num_operations)
        .map(|i| format!("parallel-test-{}-{}", i, uuid::Uuid::new_v4()))
        .collect();

    let start = Instant::now();
    let add_futures: Vec<_> = keys
        .iter()
        .map(|key| {
            let history = history.clone();
            let key = key.clone();
            tokio::spawn(async move { history.try_add(&key, SystemTime::now()).await })
        })
        .collect();
    for result in join_all(add_futures).await {
        result??;
    }
    let add_elapsed = start.elapsed();

    let missing = Arc::new(AtomicUsize::new(0));
    let has_futures: Vec<_> = keys
        .iter()
        .map(|key| {
            let history = history.clone();
            let key = key.clone();
            let missing = Arc::clone(&missing);
            tokio::spawn(async move {
                if !history.try_has(&key).await? {
                    tracing::error!("Key not seen: {}", key);
                    missing.fetch_add(1, Ordering::SeqCst);
                }
                Ok::<_, recollect_core::Error>(())
            })
        })
        .collect();
    for result in join_all(has_futures).await {
        result??;
    }

    tracing::info!(
        "   Throughput: {:.0} adds/sec",
        num_operations as f64 / add_elapsed.as_secs_f64()
    );
    ensure!(missing.load(Ordering::SeqCst) == 0, "No keys should be lost");

    history.shutdown();
    tracing::info!("   ✓ All {} keys verified", num_operations);
    Ok(())
}

/// Test that hashed keys are found through their digest
async fn test_hashing(service: Option<Arc<dyn OrderedSet>>) -> Result<()> {
    tracing::info!("Test: Hashing");

    let history = tracker(service, Duration::from_secs(60), Duration::from_secs(60))?;
    history.use_hashing(true);

    let key = format!("hash-test-{}", uuid::Uuid::new_v4());
    history.try_add(&key, SystemTime::now()).await?;
    ensure!(history.try_has(&key).await?, "Hashed key should be seen");

    // Plain lookups miss entries stored as digests
    history.use_hashing(false);
    ensure!(!history.try_has(&key).await?, "Digest should not match the raw key");

    history.shutdown();
    tracing::info!("   ✓ Hashing works correctly");
    Ok(())
}

/// Test TTL expiration through the background cleaner
async fn test_expiration(service: Option<Arc<dyn OrderedSet>>) -> Result<()> {
    tracing::info!("Test: TTL Expiration");

    let history = tracker(service, Duration::from_secs(2), Duration::from_secs(1))?;
    let key = format!("order-42-{}", uuid::Uuid::new_v4());

    history.try_add(&key, SystemTime::now()).await?;
    ensure!(history.try_has(&key).await?, "Key should be seen immediately");

    // Past the TTL plus at least one clean cycle after it
    tracing::info!("   Waiting 3.5 seconds for expiration...");
    tokio::time::sleep(Duration::from_millis(3500)).await;

    ensure!(!history.try_has(&key).await?, "Key should be stale after TTL");
    ensure!(history.try_get(&key).await?.is_none(), "Key should be purged by the cleaner");

    history.shutdown();
    tracing::info!("   ✓ TTL expiration works correctly");
    Ok(())
}
