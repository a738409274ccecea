//! Process-wide CPU capability surface.
//!
//! The topology is probed on first use and shared read-only afterwards.
//! Callers that want to inject a topology should use [`CpuTopology`] and
//! [`crate::optimizer::optimize`] directly instead.

use cpufit_hwprof::{AffinityError, AffinityScope, CpuTopology};
use once_cell::sync::OnceCell;

use crate::optimizer;
use crate::workload::Algo;

static TOPOLOGY: OnceCell<CpuTopology> = OnceCell::new();

/// Probes the CPU on the first call; later calls return the same topology.
pub fn init() -> &'static CpuTopology {
    TOPOLOGY.get_or_init(cpufit_hwprof::detect_topology)
}

pub fn topology() -> &'static CpuTopology {
    init()
}

pub fn brand() -> &'static str {
    init().brand()
}
pub fn cores() -> usize {
    init().cores()
}
pub fn sockets() -> usize {
    init().sockets()
}
pub fn threads() -> usize {
    init().threads()
}
pub fn l2() -> usize {
    init().l2()
}
pub fn l3() -> usize {
    init().l3()
}
pub fn has_aes() -> bool {
    init().has_aes()
}
pub fn has_bmi2() -> bool {
    init().has_bmi2()
}
pub fn is_x64() -> bool {
    init().is_x64()
}
pub fn available_cache() -> usize {
    init().available_cache()
}

/// See [`optimizer::optimize_parameters`].
pub fn optimize_parameters(
    threads: &mut usize,
    hash_factor: &mut usize,
    algo: Algo,
    max_cpu_usage: usize,
    safe_mode: bool,
) {
    optimizer::optimize_parameters(init(), threads, hash_factor, algo, max_cpu_usage, safe_mode);
}

pub fn set_affinity(scope: AffinityScope, mask: u64) -> Result<(), AffinityError> {
    cpufit_hwprof::set_affinity(scope, mask)
}
