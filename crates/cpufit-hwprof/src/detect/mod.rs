use thiserror::Error;
use tracing::{debug, warn};

use crate::erratum;
use crate::types::{Brand, CpuTopology, FeatureFlags, TopologySource, Vendor};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use x86::NativeCpuId;

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
mod fallback;
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub use fallback::NativeCpuId;

mod util;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("CPU identification is not supported on {0}")]
    Unsupported(&'static str),

    #[error("CPUID leaf missing: {0}")]
    MissingLeaf(&'static str),

    #[error("probe disabled by env ({0})")]
    Disabled(&'static str),
}

/// Raw facts from the identification facility, before normalization.
///
/// Cache sizes are bytes of a single instance: `l2_per_core` is one L2
/// (which the erratum parts share between two cores), `l3_per_socket` one L3.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCpuId {
    pub brand: String,
    pub vendor_id: String,
    pub extended_family: u32,
    pub model: u32,
    pub total_logical_cpus: usize,
    pub logical_per_socket: usize,
    pub cores_per_socket: usize,
    pub l2_per_core: usize,
    pub l3_per_socket: usize,
    pub aes: bool,
    pub bmi2: bool,
}

/// External CPU identification facility.
pub trait CpuIdentify {
    fn identify(&self) -> Result<RawCpuId, DetectError>;
}

impl CpuTopology {
    /// Normalizes raw facility output into machine-wide aggregates.
    pub fn from_raw(raw: &RawCpuId) -> Self {
        let total_threads = raw.total_logical_cpus.max(1);
        let sockets = total_threads
            .checked_div(raw.logical_per_socket)
            .unwrap_or(0)
            .max(1);
        let total_cores = raw.cores_per_socket.saturating_mul(sockets).max(1);

        let l3_cache = if raw.l3_per_socket > 0 {
            raw.l3_per_socket.saturating_mul(sockets)
        } else {
            0
        };

        let vendor = Vendor::from_id(&raw.vendor_id);
        let quirk = erratum::find(vendor, raw.extended_family);
        if let Some(e) = quirk {
            debug!(family = raw.extended_family, note = e.note, "L2 exclusivity erratum applies");
        }
        let l2_exclusive = quirk.is_some();
        let l2_cache = if l2_exclusive {
            raw.l2_per_core
                .saturating_mul(total_cores / 2)
                .saturating_mul(sockets)
        } else if raw.l2_per_core > 0 {
            raw.l2_per_core
                .saturating_mul(total_cores)
                .saturating_mul(sockets)
        } else {
            0
        };

        Self {
            source: TopologySource::Detected,
            brand: Brand::new(&raw.brand),
            vendor,
            extended_family: raw.extended_family,
            sockets,
            total_cores,
            total_threads,
            l2_cache,
            l3_cache,
            l2_exclusive,
            flags: FeatureFlags {
                x86_64: cfg!(target_arch = "x86_64"),
                aes: raw.aes,
                bmi2: raw.bmi2,
            },
        }
    }
}

/// Probes the host once. Never fails: an unidentified CPU yields
/// [`CpuTopology::unknown`].
pub fn detect_topology() -> CpuTopology {
    detect_topology_with(&NativeCpuId)
}

pub fn detect_topology_with<I: CpuIdentify + ?Sized>(facility: &I) -> CpuTopology {
    probe(facility, util::disabled("cpuid"))
}

fn probe<I: CpuIdentify + ?Sized>(facility: &I, cpuid_disabled: bool) -> CpuTopology {
    if cpuid_disabled {
        warn!(
            reason = %DetectError::Disabled("CPUFIT_HWPROF_DISABLE_CPUID"),
            "using unknown CPU topology"
        );
        return CpuTopology::unknown();
    }

    match facility.identify() {
        Ok(raw) => {
            if util::hwprof_debug() {
                debug!(?raw, "raw cpu identification");
            }
            let topology = CpuTopology::from_raw(&raw);
            debug!(
                brand = topology.brand(),
                sockets = topology.sockets(),
                cores = topology.cores(),
                threads = topology.threads(),
                l2 = topology.l2(),
                l3 = topology.l3(),
                l2_exclusive = topology.l2_exclusive(),
                "cpu topology detected"
            );
            topology
        }
        Err(e) => {
            warn!(error = %e, "CPU identification failed, using unknown topology");
            CpuTopology::unknown()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIB: usize = 1024;

    struct Fixed(Result<RawCpuId, &'static str>);

    impl CpuIdentify for Fixed {
        fn identify(&self) -> Result<RawCpuId, DetectError> {
            self.0.clone().map_err(DetectError::MissingLeaf)
        }
    }

    fn intel_quad() -> RawCpuId {
        RawCpuId {
            brand: "Intel(R) Core(TM) i7-4770 CPU @ 3.40GHz".into(),
            vendor_id: "GenuineIntel".into(),
            extended_family: 0x6,
            model: 0x3c,
            total_logical_cpus: 8,
            logical_per_socket: 8,
            cores_per_socket: 4,
            l2_per_core: 256 * KIB,
            l3_per_socket: 8192 * KIB,
            aes: true,
            bmi2: true,
        }
    }

    #[test]
    fn intel_uses_per_core_l2_and_inclusive_l3() {
        let t = CpuTopology::from_raw(&intel_quad());
        assert_eq!(t.source(), TopologySource::Detected);
        assert_eq!(t.vendor(), Vendor::Intel);
        assert_eq!((t.sockets(), t.cores(), t.threads()), (1, 4, 8));
        assert_eq!(t.l2(), 1024 * KIB);
        assert_eq!(t.l3(), 8192 * KIB);
        assert!(!t.l2_exclusive());
        assert_eq!(t.available_cache(), 8192 * KIB);
        assert!(t.has_aes());
        assert!(t.has_bmi2());
    }

    #[test]
    fn amd_erratum_aggregates_per_core_pair() {
        let raw = RawCpuId {
            brand: "AMD A10-7850K".into(),
            vendor_id: "AuthenticAMD".into(),
            extended_family: 0x15,
            total_logical_cpus: 4,
            logical_per_socket: 4,
            cores_per_socket: 4,
            l2_per_core: 512 * KIB,
            l3_per_socket: 2048 * KIB,
            ..RawCpuId::default()
        };
        let t = CpuTopology::from_raw(&raw);
        assert!(t.l2_exclusive());
        assert_eq!(t.l2(), 1024 * KIB);
        assert_eq!(t.l3(), 2048 * KIB);
        assert_eq!(t.available_cache(), 3072 * KIB);
    }

    #[test]
    fn amd_outside_erratum_range_is_inclusive() {
        let raw = RawCpuId {
            vendor_id: "AuthenticAMD".into(),
            extended_family: 0x17,
            total_logical_cpus: 16,
            logical_per_socket: 16,
            cores_per_socket: 8,
            l2_per_core: 512 * KIB,
            l3_per_socket: 32 * 1024 * KIB,
            ..RawCpuId::default()
        };
        let t = CpuTopology::from_raw(&raw);
        assert!(!t.l2_exclusive());
        assert_eq!(t.l2(), 4096 * KIB);
        assert_eq!(t.available_cache(), 32 * 1024 * KIB);
    }

    #[test]
    fn multi_socket_scales_l3_and_cores() {
        let raw = RawCpuId {
            total_logical_cpus: 32,
            logical_per_socket: 16,
            cores_per_socket: 8,
            l2_per_core: 256 * KIB,
            l3_per_socket: 20 * 1024 * KIB,
            ..intel_quad()
        };
        let t = CpuTopology::from_raw(&raw);
        assert_eq!(t.sockets(), 2);
        assert_eq!(t.cores(), 16);
        assert_eq!(t.l3(), 40 * 1024 * KIB);
        // per-core figure times total cores times sockets
        assert_eq!(t.l2(), 256 * KIB * 16 * 2);
    }

    #[test]
    fn zero_counts_floor_to_one() {
        let raw = RawCpuId::default();
        let t = CpuTopology::from_raw(&raw);
        assert_eq!((t.sockets(), t.cores(), t.threads()), (1, 1, 1));
        assert_eq!((t.l2(), t.l3()), (0, 0));
    }

    #[test]
    fn per_socket_larger_than_total_keeps_one_socket() {
        let raw = RawCpuId {
            total_logical_cpus: 4,
            logical_per_socket: 16,
            ..intel_quad()
        };
        assert_eq!(CpuTopology::from_raw(&raw).sockets(), 1);
    }

    #[test]
    fn missing_cache_levels_report_zero() {
        let raw = RawCpuId {
            l2_per_core: 0,
            l3_per_socket: 0,
            ..intel_quad()
        };
        let t = CpuTopology::from_raw(&raw);
        assert_eq!((t.l2(), t.l3()), (0, 0));
        assert_eq!(t.available_cache(), 0);
    }

    #[test]
    fn facility_failure_degrades_to_unknown() {
        let t = detect_topology_with(&Fixed(Err("leaf 1")));
        assert!(t.is_unknown());
        assert_eq!(t, CpuTopology::unknown());
    }

    #[test]
    fn disable_switch_forces_unknown_even_when_facility_works() {
        let t = probe(&Fixed(Ok(intel_quad())), true);
        assert_eq!(t, CpuTopology::unknown());
        assert!(!probe(&Fixed(Ok(intel_quad())), false).is_unknown());
    }

    #[test]
    fn facility_success_is_normalized() {
        let t = detect_topology_with(&Fixed(Ok(intel_quad())));
        assert!(!t.is_unknown());
        assert_eq!(t.threads(), 8);
    }

    #[test]
    fn x64_flag_follows_build_target() {
        let t = CpuTopology::from_raw(&intel_quad());
        assert_eq!(t.is_x64(), cfg!(target_arch = "x86_64"));
    }

    #[test]
    fn native_probe_never_panics() {
        let t = detect_topology();
        assert!(t.threads() >= 1);
        assert!(t.cores() >= 1);
        assert!(t.sockets() >= 1);
        assert!(t.brand().len() < crate::types::BRAND_CAPACITY);
    }
}
