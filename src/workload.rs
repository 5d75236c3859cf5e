//! Benchmark driver
//!
//! Preloads a [`LeafStore`], optionally harvests and trains a
//! [`LearnedRouter`] over its leaves, then fans a read/insert/scan mix out
//! over worker threads. In learned mode each read asks the router for a
//! hint, validates it through the store, and tallies the outcome per
//! thread; tallies are merged into the router after the workers join.

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{info, warn};

use crate::config::{BenchConfig, RouterConfig};
use crate::encoding::make_key;
use crate::error::{Error, Result};
use crate::router::LearnedRouter;
use crate::stats::{FeedbackTally, RouterStats};
use crate::storage::{LeafId, LeafStore};

/// Value written by every insert
const VALUE: &[u8] = b"v";

/// Entries visited by one scan operation
pub const SCAN_LENGTH: usize = 100;

/// Operation mix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Workload {
    /// 50% reads, 50% inserts, no preload
    #[default]
    A,
    /// 95% reads, 5% inserts
    B,
    /// Reads only
    C,
    /// 50% reads, 50% short scans
    D,
}

impl Workload {
    /// Whether the store is preloaded (and the router trained) before the run
    pub fn preloads(&self) -> bool {
        !matches!(self, Workload::A)
    }

    /// Single letter name
    pub fn name(&self) -> &'static str {
        match self {
            Workload::A => "A",
            Workload::B => "B",
            Workload::C => "C",
            Workload::D => "D",
        }
    }
}

impl FromStr for Workload {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Workload::A),
            "B" => Ok(Workload::B),
            "C" => Ok(Workload::C),
            "D" => Ok(Workload::D),
            _ => Err(Error::UnknownWorkload(s.to_string())),
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Learned versus baseline point lookups over the same keys
#[derive(Debug, Clone)]
pub struct MicrobenchReport {
    /// Router state when the lookups ran
    pub trained: bool,
    /// Boundaries in the model
    pub samples: usize,
    /// Lookups with the router disabled
    pub baseline: Duration,
    /// Lookups starting from a learned hint
    pub learned: Duration,
    /// Keys found by the baseline pass
    pub baseline_found: usize,
    /// Keys found by the learned pass
    pub learned_found: usize,
}

impl MicrobenchReport {
    /// Baseline time over learned time
    pub fn speedup(&self) -> f64 {
        let learned = self.learned.as_secs_f64();
        if learned == 0.0 {
            0.0
        } else {
            self.baseline.as_secs_f64() / learned
        }
    }
}

/// Result of a benchmark run
#[derive(Debug, Clone)]
pub struct BenchReport {
    /// Operation mix
    pub workload: Workload,
    /// Worker threads
    pub threads: usize,
    /// Operations completed by all workers
    pub ops: usize,
    /// Wall time of the worker phase
    pub elapsed: Duration,
    /// Keys inserted before the run
    pub preloaded: usize,
    /// Leaves harvested for training, when the learned path ran
    pub leaves_harvested: Option<usize>,
    /// Reads whose learned hint was accepted by the store
    pub hints_accepted: u64,
    /// Router accuracy over the worker phase
    pub router_stats: RouterStats,
    /// Learned-vs-baseline comparison, when the learned path ran
    pub microbench: Option<MicrobenchReport>,
}

impl BenchReport {
    /// Completed operations per second
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 { 0.0 } else { self.ops as f64 / secs }
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=====================")?;
        writeln!(f, "   Leaf Store Benchmark")?;
        writeln!(f, "=====================")?;
        writeln!(f, "Workload: {}", self.workload)?;
        writeln!(f, "Threads:  {}", self.threads)?;
        writeln!(f, "Ops:      {}", self.ops)?;
        writeln!(f, "Time:     {:.3} ms", self.elapsed.as_secs_f64() * 1000.0)?;
        writeln!(f, "Ops/sec:  {:.0}", self.ops_per_sec())?;

        if let Some(leaves) = self.leaves_harvested {
            writeln!(f)?;
            writeln!(f, "Leaves:   {}", leaves)?;
            writeln!(f, "Accepted: {}", self.hints_accepted)?;
            writeln!(f, "{}", self.router_stats)?;
        }

        if let Some(micro) = &self.microbench {
            writeln!(f)?;
            writeln!(f, "=== Learned Index Microbenchmark ===")?;
            writeln!(f, "Trained?     {}", micro.trained)?;
            writeln!(f, "#Samples     {}", micro.samples)?;
            writeln!(f, "Baseline GET {:.3} ms", micro.baseline.as_secs_f64() * 1000.0)?;
            writeln!(f, "Learned GET  {:.3} ms", micro.learned.as_secs_f64() * 1000.0)?;
            writeln!(f, "Speedup      {:.2}x", micro.speedup())?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct WorkerResult {
    ops: usize,
    hints_accepted: u64,
    tally: FeedbackTally,
}

/// Run one benchmark as described by `config`
pub fn run_benchmark(config: &BenchConfig) -> Result<BenchReport> {
    config.validate()?;

    let store = RwLock::new(LeafStore::new(config.store.clone())?);

    let mut preloaded = 0;
    if config.workload.preloads() {
        info!(keys = config.ops, "preloading store");
        let mut guard = store.write();
        for i in 0..config.ops as u64 {
            guard.insert(make_key(i).as_bytes(), VALUE)?;
        }
        preloaded = config.ops;
    }

    let mut router = LearnedRouter::new(RouterConfig {
        encoding: config.store.encoding,
        ..RouterConfig::from_flags(&config.flags)
    });

    let mut leaves_harvested = None;
    if config.flags.learned && config.workload.preloads() {
        router.set_enabled(true);
        let count = router.harvest(&*store.read());
        router.train();
        if !router.is_trained() {
            return Err(Error::TrainingFailed { samples: count });
        }
        leaves_harvested = Some(count);
    } else if config.flags.learned {
        warn!(workload = %config.workload, "workload has no preload; learned router stays untrained");
    }

    let per = config.ops / config.threads;
    let start = Instant::now();
    let results = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.threads)
            .map(|t| {
                let begin = t * per;
                let end = if t == config.threads - 1 { config.ops } else { (t + 1) * per };
                let (store, router) = (&store, &router);
                scope.spawn(move || run_worker(config, store, router, begin, end))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect::<Result<Vec<_>>>()
    })?;
    let elapsed = start.elapsed();

    let mut ops = 0;
    let mut hints_accepted = 0;
    for result in results {
        ops += result.ops;
        hints_accepted += result.hints_accepted;
        router.merge_tally(result.tally);
    }
    let router_stats = router.stats();

    info!(ops, elapsed_ms = elapsed.as_millis() as u64, "benchmark finished");
    if leaves_harvested.is_some() {
        info!(%router_stats, "learned router accuracy");
    }

    let microbench = leaves_harvested.map(|_| microbenchmark(&store.read(), &mut router, config.microbench_keys));

    Ok(BenchReport {
        workload: config.workload,
        threads: config.threads,
        ops,
        elapsed,
        preloaded,
        leaves_harvested,
        hints_accepted,
        router_stats,
        microbench,
    })
}

fn run_worker(
    config: &BenchConfig,
    store: &RwLock<LeafStore>,
    router: &LearnedRouter<LeafId>,
    begin: usize,
    end: usize,
) -> Result<WorkerResult> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(begin as u64));
    let learned = router.enabled() && router.is_trained();
    let mut result = WorkerResult::default();

    for _ in begin..end {
        let k = rng.gen_range(begin..end) as u64;
        match config.workload {
            Workload::A if rng.next_u64() & 1 == 0 => do_insert(store, k)?,
            Workload::B if rng.gen_range(0..100) >= 95 => do_insert(store, k)?,
            Workload::D if rng.next_u64() & 1 == 0 => do_scan(store, k),
            _ => {
                do_read(store, router, learned, k, &mut result);
            }
        }
        result.ops += 1;
    }
    Ok(result)
}

fn do_insert(store: &RwLock<LeafStore>, k: u64) -> Result<()> {
    store.write().insert(make_key(k).as_bytes(), VALUE)?;
    Ok(())
}

fn do_scan(store: &RwLock<LeafStore>, k: u64) {
    let visited = store.read().scan(make_key(k).as_bytes(), SCAN_LENGTH).count();
    std::hint::black_box(visited);
}

fn do_read(
    store: &RwLock<LeafStore>,
    router: &LearnedRouter<LeafId>,
    learned: bool,
    k: u64,
    result: &mut WorkerResult,
) -> bool {
    let key = make_key(k);
    let guard = store.read();
    if !learned {
        return guard.get(key.as_bytes()).is_some();
    }

    let q = router.config().encoding.encode(key.as_bytes());
    let hint = router.predict_leaf(q);
    let found = guard.get_hinted(key.as_bytes(), hint);
    if found.hint_valid {
        result.hints_accepted += 1;
    }

    let outcome = router.tally_prediction(&mut result.tally, &*guard, hint, found.leaf);
    if let (Some(outcome), true) = (outcome, router.config().debug) {
        let (_, pos) = router.interval_hit(q);
        router.debug_interval("read", q, pos, outcome);
    }
    found.value.is_some()
}

/// Time the same point lookups with the router enabled, then disabled
fn microbenchmark(store: &LeafStore, router: &mut LearnedRouter<LeafId>, keys: usize) -> MicrobenchReport {
    let keys: Vec<String> = (0..keys as u64).map(make_key).collect();

    router.set_enabled(true);
    router.reset_stats();
    let (learned, learned_found) = timed_gets(store, router, &keys);

    router.set_enabled(false);
    router.reset_stats();
    let (baseline, baseline_found) = timed_gets(store, router, &keys);
    router.set_enabled(true);

    MicrobenchReport {
        trained: router.is_trained(),
        samples: router.num_samples(),
        baseline,
        learned,
        baseline_found,
        learned_found,
    }
}

fn timed_gets(store: &LeafStore, router: &LearnedRouter<LeafId>, keys: &[String]) -> (Duration, usize) {
    let start = Instant::now();
    let mut found = 0;
    for key in keys {
        let hint = router.predict_key(key.as_bytes());
        if store.get_hinted(key.as_bytes(), hint).value.is_some() {
            found += 1;
        }
    }
    (start.elapsed(), found)
}
