//! Worker sizing: fits `threads * hash_factor` blocks into the usable cache.
//!
//! Every input is clamped, never rejected. Explicit values are trusted
//! (apart from the hash-factor ceiling) unless `safe_mode` is set, in which
//! case they are re-checked against the cache budget. The CPU usage cap only
//! applies when the thread count is chosen automatically.

use cpufit_hwprof::CpuTopology;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::workload::{Algo, WorkloadProfile};

/// The two topology facts the optimizer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBudget {
    /// Usable cache in bytes.
    pub available_cache: usize,
    pub logical_threads: usize,
}

impl From<&CpuTopology> for HostBudget {
    fn from(t: &CpuTopology) -> Self {
        Self {
            available_cache: t.available_cache(),
            logical_threads: t.threads(),
        }
    }
}

/// Zero means "choose automatically" for both `threads` and `hash_factor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub threads: usize,
    pub hash_factor: usize,
    /// Percent of logical threads usable when picking threads automatically.
    pub max_cpu_usage: usize,
    pub safe_mode: bool,
}

impl Default for OptimizationRequest {
    fn default() -> Self {
        Self {
            threads: 0,
            hash_factor: 0,
            max_cpu_usage: 100,
            safe_mode: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub threads: usize,
    pub hash_factor: usize,
}

pub fn optimize(
    host: HostBudget,
    workload: WorkloadProfile,
    request: &OptimizationRequest,
) -> OptimizationResult {
    let ceiling = workload.hash_factor_ceiling();
    let mut threads = request.threads;
    let mut hash_factor = request.hash_factor.min(ceiling);

    if !request.safe_mode && threads > 0 && hash_factor > 0 {
        debug!(threads, hash_factor, "manual parameters, skipping optimization");
        return OptimizationResult {
            threads,
            hash_factor,
        };
    }

    let max_factor = (host.available_cache / workload.block_size()).max(1);
    let max_threads = max_factor.min(host.logical_threads);
    let max_hash_factor = max_factor.min(ceiling);

    if request.safe_mode {
        if threads > max_threads {
            threads = max_threads;
        }
        // threads may still be 0 (auto); budget a single thread then
        let per_thread = max_factor / threads.max(1);
        if hash_factor > per_thread {
            hash_factor = per_thread.min(max_hash_factor).max(1);
        }
    }

    if threads == 0 {
        threads = if hash_factor == 0 {
            max_threads
        } else {
            max_threads.min(max_factor / hash_factor)
        };
        if request.max_cpu_usage < 100 {
            threads = threads.min(host.logical_threads * request.max_cpu_usage / 100);
        }
        threads = threads.max(1);
    }

    if hash_factor == 0 {
        hash_factor = max_hash_factor.min(max_factor / threads).max(1);
    }

    debug!(
        available_cache = host.available_cache,
        block_size = workload.block_size(),
        max_factor,
        max_threads,
        max_hash_factor,
        threads,
        hash_factor,
        "optimized worker parameters"
    );

    OptimizationResult {
        threads,
        hash_factor,
    }
}

/// In/out form: zero means unset on the way in, both are overwritten.
pub fn optimize_parameters(
    topology: &CpuTopology,
    threads: &mut usize,
    hash_factor: &mut usize,
    algo: Algo,
    max_cpu_usage: usize,
    safe_mode: bool,
) {
    let request = OptimizationRequest {
        threads: *threads,
        hash_factor: *hash_factor,
        max_cpu_usage,
        safe_mode,
    };
    let result = optimize(topology.into(), algo.profile(), &request);
    *threads = result.threads;
    *hash_factor = result.hash_factor;
}
