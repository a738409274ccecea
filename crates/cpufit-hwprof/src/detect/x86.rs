use raw_cpuid::{CacheType, CpuId, CpuIdReader, TopologyType};

use super::util;
use super::{CpuIdentify, DetectError, RawCpuId};

const KIB: usize = 1024;

/// CPUID-backed identification; thread counts come from `num_cpus`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCpuId;

impl CpuIdentify for NativeCpuId {
    fn identify(&self) -> Result<RawCpuId, DetectError> {
        let cpuid = CpuId::new();

        let vendor_id = cpuid
            .get_vendor_info()
            .map(|v| v.as_str().to_string())
            .ok_or(DetectError::MissingLeaf("vendor (0x0)"))?;
        let features = cpuid
            .get_feature_info()
            .ok_or(DetectError::MissingLeaf("features (0x1)"))?;

        // Prefer full brand string; fall back to vendor
        let brand = cpuid
            .get_processor_brand_string()
            .map(|b| b.as_str().trim().to_string())
            .unwrap_or_else(|| vendor_id.clone());

        let bmi2 = cpuid
            .get_extended_feature_info()
            .map(|f| f.has_bmi2())
            .unwrap_or(false);

        let total_logical_cpus = num_cpus::get();
        let logical_per_socket = logical_per_package(&cpuid)
            .unwrap_or(features.max_logical_processor_ids() as usize);
        let sockets = total_logical_cpus
            .checked_div(logical_per_socket)
            .unwrap_or(0)
            .max(1);
        let cores_per_socket = num_cpus::get_physical() / sockets;

        let (l2_per_core, l3_per_socket) = cache_sizes(&cpuid);

        Ok(RawCpuId {
            brand,
            vendor_id,
            extended_family: features.family_id() as u32,
            model: features.model_id() as u32,
            total_logical_cpus,
            logical_per_socket,
            cores_per_socket,
            l2_per_core,
            l3_per_socket,
            aes: features.has_aesni(),
            bmi2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_facility_reports_the_host() {
        let raw = NativeCpuId.identify().expect("cpuid on x86 host");
        assert!(raw.total_logical_cpus >= 1);
        assert!(!raw.vendor_id.is_empty());
    }
}

/// Logical processors per package from the extended topology leaf.
fn logical_per_package<R: CpuIdReader>(cpuid: &CpuId<R>) -> Option<usize> {
    cpuid
        .get_extended_topology_info()?
        .find(|level| matches!(level.level_type(), TopologyType::Core))
        .map(|level| level.processors() as usize)
        .filter(|&n| n > 0)
}

/// (one L2 instance, one L3 instance) in bytes; 0 when not reported.
fn cache_sizes<R: CpuIdReader>(cpuid: &CpuId<R>) -> (usize, usize) {
    let mut l2 = 0;
    let mut l3 = 0;

    if let Some(params) = cpuid.get_cache_parameters() {
        for cache in params {
            if !matches!(cache.cache_type(), CacheType::Unified | CacheType::Data) {
                continue;
            }
            let bytes = util::cache_bytes(
                cache.associativity(),
                cache.physical_line_partitions(),
                cache.coherency_line_size(),
                cache.sets(),
            );
            match cache.level() {
                2 => l2 = bytes,
                3 => l3 = bytes,
                _ => {}
            }
        }
    }

    // AMD parts without the deterministic cache leaf
    if l2 == 0 || l3 == 0 {
        if let Some(info) = cpuid.get_l2_l3_cache_and_tlb_info() {
            if l2 == 0 {
                l2 = info.l2cache_size() as usize * KIB;
            }
            if l3 == 0 {
                l3 = info.l3cache_size() as usize * 512 * KIB;
            }
        }
    }

    (l2, l3)
}
