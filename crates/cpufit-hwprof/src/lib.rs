//! cpufit hardware profiling crate.
//! Probes the CPU once (CPUID + logical/physical counts) and normalizes the
//! result into an immutable [`CpuTopology`] with a usable-cache figure.

pub mod affinity;
pub mod cache;
pub mod detect;
pub mod erratum;
pub mod types;

pub use affinity::{set_affinity, AffinityError, AffinityScope};
pub use cache::available_cache;
pub use detect::{detect_topology, detect_topology_with, CpuIdentify, DetectError, RawCpuId};
pub use erratum::{l2_exclusive, ExclusivityErratum, L2_EXCLUSIVE_ERRATA};
pub use types::{Brand, CpuTopology, FeatureFlags, TopologySource, Vendor, BRAND_CAPACITY};
