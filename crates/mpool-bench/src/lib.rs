//! Benchmark-only crate; see `benches/pool_bench.rs`.
