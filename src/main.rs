//! learned-router: benchmark the learned leaf router against
//! authoritative lookups on a leaf-linked store.
//!
//! `LEARNED_INDEX=1` and `LEARNED_DEBUG=1` enable the learned path and its
//! interval diagnostics; `--learned` and `--debug` do the same per run.

use std::process::ExitCode;

use clap::Parser;
use learned_router::{BenchConfig, RuntimeFlags, StoreConfig, Workload, run_benchmark};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "learned-router", version, about = "Learned leaf router benchmark")]
struct Cli {
    /// Worker threads
    #[arg(default_value_t = 1)]
    threads: usize,

    /// Total operations, also the preload size for workloads B, C and D
    #[arg(default_value_t = 100_000)]
    ops: usize,

    /// A: 50/50 read/insert, B: 95/5 read/insert, C: read only, D: 50/50 read/scan
    #[arg(default_value = "A")]
    workload: Workload,

    /// Route reads through the learned router
    #[arg(long)]
    learned: bool,

    /// Log the interval behind every routed read
    #[arg(long)]
    debug: bool,

    /// Entries per leaf before it splits
    #[arg(long, default_value_t = 15)]
    leaf_capacity: usize,

    /// Keys looked up by the learned-vs-baseline microbenchmark
    #[arg(long, default_value_t = 50_000)]
    microbench_keys: usize,

    /// Seed for the worker random generators
    #[arg(long, default_value_t = 0xdead_beef)]
    seed: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let flags = RuntimeFlags::cached().with_overrides(cli.learned, cli.debug);

    let default_filter = if flags.debug { "info,learned_router=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = BenchConfig {
        threads: cli.threads,
        ops: cli.ops,
        workload: cli.workload,
        flags,
        store: StoreConfig {
            leaf_capacity: cli.leaf_capacity,
            ..Default::default()
        },
        microbench_keys: cli.microbench_keys,
        seed: cli.seed,
    };

    println!("Running benchmark:");
    println!("Threads = {}  Ops = {}  Workload = {}", config.threads, config.ops, config.workload);
    println!("Learned = {}  Debug = {}", flags.learned, flags.debug);
    println!();

    match run_benchmark(&config) {
        Ok(report) => {
            print!("{}", report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "benchmark failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
