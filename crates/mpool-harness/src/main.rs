//! CLI churn driver for the pool allocator.
//!
//! Runs a deterministic alloc/repool workload against one pool and
//! prints the end state. Exists to demonstrate the allocation surface;
//! the allocator itself lives in `mpool-core`.

use std::process::ExitCode;
use std::ptr::NonNull;

use clap::Parser;
use mpool_core::Mpool;

/// Stress and demonstration driver for mpool.
#[derive(Debug, Parser)]
#[command(name = "mpool-harness")]
#[command(about = "Churn workload driver for the mpool allocator")]
struct Cli {
    /// Minimum size-class exponent (classes start at 2^MIN_EXP bytes).
    #[arg(long, default_value_t = 3)]
    min_exp: u32,
    /// Maximum size-class exponent (requests at or above 2^MAX_EXP map directly).
    #[arg(long, default_value_t = 16)]
    max_exp: u32,
    /// Number of alloc/repool operations to run.
    #[arg(long, default_value_t = 1_000_000)]
    iterations: u64,
    /// Number of chunks held live at any time.
    #[arg(long, default_value_t = 1024)]
    working_set: usize,
    /// Issue one oversized request every N iterations (0 disables).
    #[arg(long, default_value_t = 64)]
    oversized_every: u64,
    /// Seed for the deterministic request-size sequence.
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,
}

fn lcg(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    *state
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).init();
    let cli = Cli::parse();

    let mut pool = match Mpool::new(cli.min_exp, cli.max_exp) {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("mpool-harness: {err}");
            return ExitCode::FAILURE;
        }
    };

    let max_classed = pool.max_pool().saturating_sub(8).max(1);
    let mut slots: Vec<Option<NonNull<u8>>> = vec![None; cli.working_set.max(1)];
    let mut rng = cli.seed;
    let mut allocs = 0u64;
    let mut repools = 0u64;
    let mut oversized = 0u64;

    for iter in 0..cli.iterations {
        let r = lcg(&mut rng);
        let slot = (r as usize) % slots.len();

        if let Some(ptr) = slots[slot].take() {
            // SAFETY: every stored pointer came from this pool.
            unsafe { pool.repool(ptr) };
            repools += 1;
            continue;
        }

        let size = if cli.oversized_every != 0 && iter % cli.oversized_every == 0 {
            oversized += 1;
            pool.max_pool() + (r >> 16) as usize % pool.max_pool()
        } else {
            ((r >> 16) as usize % max_classed).max(1)
        };

        match pool.alloc(size) {
            Ok(ptr) => {
                // Touch the chunk so the mapping is really exercised.
                // SAFETY: alloc granted at least `size` usable bytes.
                unsafe { ptr.as_ptr().write(iter as u8) };
                slots[slot] = Some(ptr);
                allocs += 1;
            }
            Err(err) => {
                eprintln!("mpool-harness: allocation failed at iteration {iter}: {err}");
                break;
            }
        }
    }

    for ptr in slots.into_iter().flatten() {
        // SAFETY: every stored pointer came from this pool.
        unsafe { pool.repool(ptr) };
        repools += 1;
    }

    println!("classes:   {}", pool.class_count());
    println!("class max: {} bytes", pool.max_pool());
    println!("arenas:    {}", pool.arena_count());
    println!("allocs:    {allocs} ({oversized} oversized)");
    println!("repools:   {repools}");

    pool.destroy();
    ExitCode::SUCCESS
}
