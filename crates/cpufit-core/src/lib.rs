//! cpufit-core
//!
//! Sizes a cache-bound parallel workload from the host topology:
//! - Workload profiles (block size, hash-factor ceiling) per algorithm.
//! - The optimizer turning usable cache + request into threads/hash factor.
//! - A process-wide capability surface over the probed topology.
//! - The JSON options file.

pub mod config;
pub mod cpu;
pub mod errors;
pub mod optimizer;
pub mod paths;
pub mod workload;

pub use config::{parse_affinity_mask, CpuConfig};
pub use errors::ConfigError;
pub use optimizer::{
    optimize, optimize_parameters, HostBudget, OptimizationRequest, OptimizationResult,
};
pub use paths::{config_path, cpufit_home};
pub use workload::{Algo, UnknownAlgo, WorkloadProfile, MAX_NUM_HASH_BLOCKS};

pub use cpufit_hwprof::{AffinityScope, CpuTopology};
