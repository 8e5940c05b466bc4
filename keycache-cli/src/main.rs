//! KEYCACHE CLI
//!
//! Command-line interface for exercising a KEYCACHE mount backed by an
//! in-memory key store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use keycache_admin::{
    read_cache_config, write_cache_config, CacheConfigReadRequest, CacheConfigResponse,
    CacheConfigWriteRequest, MountConfig, MountState,
};
use keycache_core::constants::{CACHE_TYPE_LRU, CACHE_TYPE_SYNCMAP};
use keycache_core::types::KeyType;
use keycache_store::MemoryKeyStore;

type Mount = MountState<Arc<MemoryKeyStore>>;

/// KEYCACHE - Switchable key-object cache
#[derive(Parser)]
#[command(name = "keycache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results and logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read or change the cache configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Load a key through the cache
    Get {
        /// Key name (seeded names are key-0 .. key-N)
        name: String,
        /// Number of keys to seed the store with
        #[arg(short, long, default_value = "16")]
        keys: usize,
    },

    /// Hammer the cache with concurrent lookups
    Bench(BenchArgs),
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Apply a cache strategy, then print the resulting configuration
    Set {
        /// Cache type: syncmap or lru
        #[arg(long)]
        cache_type: String,
        /// Capacity for the lru cache type
        #[arg(long)]
        cache_size: Option<i64>,
        /// Keys to load before switching
        #[arg(long, default_value = "0")]
        warm: usize,
    },

    /// Print the cache configuration
    Get {
        /// Also report the number of cached keys
        #[arg(long)]
        compute_cache_length: bool,
        /// Keys to load before reading
        #[arg(long, default_value = "0")]
        warm: usize,
    },
}

#[derive(Args)]
struct BenchArgs {
    /// Distinct key names to request
    #[arg(short, long, default_value = "1000")]
    keys: usize,
    /// Concurrent workers
    #[arg(short, long, default_value = "8")]
    workers: usize,
    /// Lookups per worker
    #[arg(short, long, default_value = "10000")]
    requests: usize,
    /// Cache type to start with: syncmap or lru
    #[arg(long, default_value = CACHE_TYPE_SYNCMAP)]
    cache_type: String,
    /// Capacity for the lru cache type
    #[arg(long, default_value = "256")]
    cache_size: i64,
    /// Simulated key store latency per load
    #[arg(long, default_value = "0")]
    load_latency_ms: u64,
    /// Number of store loads to fail
    #[arg(long, default_value = "0")]
    fail_loads: usize,
    /// Toggle between syncmap and lru at this interval
    #[arg(long)]
    switch_every_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "keycache=debug,info"
    } else {
        "keycache=info,warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Config { action } => cmd_config(action, cli.json).await,
        Commands::Get { name, keys } => cmd_get(&name, keys, cli.json).await,
        Commands::Bench(args) => cmd_bench(args, cli.json).await,
    }
}

/// Builds a mount from the environment over a freshly seeded store.
fn mount(keys: usize) -> Result<Mount> {
    let config = MountConfig::from_env().context("Invalid mount configuration")?;
    let store = Arc::new(MemoryKeyStore::seeded(keys, KeyType::default()));
    Ok(MountState::new(config, store))
}

async fn warm(state: &Mount, count: usize) -> Result<()> {
    for i in 0..count {
        state
            .lock_manager
            .get_key(&format!("key-{}", i))
            .await
            .with_context(|| format!("Failed to warm key-{}", i))?;
    }
    Ok(())
}

fn print_config(resp: &CacheConfigResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(resp)?);
        return Ok(());
    }

    println!("   {} {}", "cache-type:".dimmed(), resp.cache_type.green());
    if let Some(len) = resp.cache_length {
        println!("   {} {}", "cache-length:".dimmed(), len);
    }
    Ok(())
}

/// Read or change the cache configuration
async fn cmd_config(action: ConfigAction, json: bool) -> Result<()> {
    match action {
        ConfigAction::Set {
            cache_type,
            cache_size,
            warm: count,
        } => {
            let state = mount(count)?;
            warm(&state, count).await?;

            if !json {
                println!("{} {}", "⚙️  Applying cache-type".cyan().bold(), cache_type);
            }
            write_cache_config(&state, &CacheConfigWriteRequest::new(cache_type, cache_size))?;

            let resp = read_cache_config(
                &state,
                &CacheConfigReadRequest {
                    compute_cache_length: true,
                },
            );
            if !json {
                println!("\n{}", "✅ Cache reconfigured:".green().bold());
            }
            print_config(&resp, json)
        }
        ConfigAction::Get {
            compute_cache_length,
            warm: count,
        } => {
            let state = mount(count)?;
            warm(&state, count).await?;

            let resp = read_cache_config(
                &state,
                &CacheConfigReadRequest {
                    compute_cache_length,
                },
            );
            if !json {
                println!("{}", "📋 Cache configuration:".cyan().bold());
            }
            print_config(&resp, json)
        }
    }
}

/// Load a key through the cache
async fn cmd_get(name: &str, keys: usize, json: bool) -> Result<()> {
    let state = mount(keys)?;

    let start = Instant::now();
    let key = state
        .lock_manager
        .get_key(name)
        .await
        .with_context(|| format!("Failed to load {}", name))?;
    let first = start.elapsed();

    let start = Instant::now();
    state.lock_manager.get_key(name).await?;
    let second = start.elapsed();

    if json {
        let out = serde_json::json!({
            "name": key.name,
            "type": key.key_type.as_str(),
            "latest_version": key.latest_version,
            "min_decryption_version": key.min_decryption_version,
            "exportable": key.exportable,
            "versions": key.versions.len(),
            "first_lookup_us": first.as_micros() as u64,
            "second_lookup_us": second.as_micros() as u64,
            "cached": state.lock_manager.cache_enabled(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {}", "🔑 Key:".cyan().bold(), key.name);
    println!("   {} {}", "Type:".dimmed(), key.key_type);
    println!("   {} {}", "Latest version:".dimmed(), key.latest_version);
    println!("   {} {}", "Min decryption version:".dimmed(), key.min_decryption_version);
    println!("   {} {}", "Exportable:".dimmed(), key.exportable);
    println!("\n   ✓ First lookup: {:?}", first);
    if state.lock_manager.cache_enabled() {
        println!("   ✓ Second lookup (cached): {:?}", second);
    } else {
        println!("   ✓ Second lookup (caching disabled): {:?}", second);
    }

    Ok(())
}

/// Number of lookups a bench run issues across all workers.
fn total_lookups(workers: usize, requests: usize) -> Result<u64> {
    workers
        .checked_mul(requests)
        .and_then(|total| u64::try_from(total).ok())
        .context("--workers × --requests is too large")
}

/// Run concurrent lookups against a seeded mount
async fn cmd_bench(args: BenchArgs, json: bool) -> Result<()> {
    ensure!(args.keys > 0, "--keys must be greater than zero");
    ensure!(args.workers > 0, "--workers must be greater than zero");
    if let Some(ms) = args.switch_every_ms {
        ensure!(ms > 0, "--switch-every-ms must be greater than zero");
    }

    let state = Arc::new(mount(args.keys)?);
    let store = state.lock_manager.store();
    if args.load_latency_ms > 0 {
        store.set_load_latency(Some(Duration::from_millis(args.load_latency_ms)));
    }
    store.fail_next_loads(args.fail_loads);

    let initial = CacheConfigWriteRequest::new(args.cache_type.clone(), Some(args.cache_size));
    if state.lock_manager.cache_enabled() {
        write_cache_config(&*state, &initial)?;
    }

    if !json {
        println!(
            "{} {} workers × {} lookups over {} keys",
            "📊 Benchmarking".cyan().bold(),
            args.workers,
            args.requests,
            args.keys
        );
    }

    let total = total_lookups(args.workers, args.requests)?;
    let pb = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let switcher = args.switch_every_ms.map(|ms| {
        let state = Arc::clone(&state);
        let size = args.cache_size;
        let start_lru = args.cache_type == CACHE_TYPE_LRU;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(ms));
            ticker.tick().await;
            let mut switches = 0u64;
            loop {
                ticker.tick().await;
                let to_lru = (switches % 2 == 0) != start_lru;
                let req = if to_lru {
                    CacheConfigWriteRequest::new(CACHE_TYPE_LRU, Some(size))
                } else {
                    CacheConfigWriteRequest::new(CACHE_TYPE_SYNCMAP, None)
                };
                if let Err(err) = write_cache_config(&*state, &req) {
                    warn!(error = %err, "Stopping strategy switches");
                    break;
                }
                switches += 1;
            }
        })
    });

    let start = Instant::now();
    let mut handles = Vec::with_capacity(args.workers);
    for _ in 0..args.workers {
        let state = Arc::clone(&state);
        let pb = pb.clone();
        let keys = args.keys;
        let requests = args.requests;
        handles.push(tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut failures = 0u64;
            for _ in 0..requests {
                let name = format!("key-{}", rng.gen_range(0..keys));
                if state.lock_manager.get_key(&name).await.is_err() {
                    failures += 1;
                }
                pb.inc(1);
            }
            failures
        }));
    }

    let mut failures = 0u64;
    for handle in handles {
        failures += handle.await.context("Worker panicked")?;
    }
    let elapsed = start.elapsed();
    pb.finish_and_clear();

    if let Some(switcher) = switcher {
        switcher.abort();
    }

    let lock_stats = state.lock_manager.stats();
    let store_stats = state.lock_manager.store().stats();
    let config = read_cache_config(
        &*state,
        &CacheConfigReadRequest {
            compute_cache_length: true,
        },
    );
    let rate = total as f64 / elapsed.as_secs_f64();

    if json {
        let out = serde_json::json!({
            "lookups": total,
            "elapsed_ms": elapsed.as_millis() as u64,
            "lookups_per_sec": rate,
            "hits": lock_stats.hits,
            "misses": lock_stats.misses,
            "coalesced": lock_stats.coalesced,
            "store_loads": store_stats.loads,
            "failed_loads": store_stats.failed_loads,
            "max_concurrent_loads": store_stats.max_concurrent_loads,
            "lookup_failures": failures,
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let hit_rate = if total > 0 {
        lock_stats.hits as f64 * 100.0 / total as f64
    } else {
        0.0
    };

    println!("\n{}", "📈 Results:".green().bold());
    println!("   Lookups: {} in {:?} ({:.0}/sec)", total, elapsed, rate);
    println!("   Cache hits: {} ({:.1}%)", lock_stats.hits, hit_rate);
    println!("   Coalesced waits: {}", lock_stats.coalesced);
    println!(
        "   Store loads: {} (max {} concurrent)",
        store_stats.loads, store_stats.max_concurrent_loads
    );
    if failures > 0 {
        println!("   {} {} lookups failed", "❌".red(), failures);
    } else {
        println!("   {} No failed lookups", "✅".green());
    }
    println!("\n{}", "📋 Final configuration:".cyan().bold());
    print_config(&config, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_lookups() {
        assert_eq!(total_lookups(8, 10_000).unwrap(), 80_000);
        assert_eq!(total_lookups(0, 10).unwrap(), 0);
    }

    #[test]
    fn test_total_lookups_rejects_overflow() {
        assert!(total_lookups(usize::MAX, 2).is_err());
    }
}
