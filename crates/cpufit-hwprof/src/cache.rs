use crate::types::CpuTopology;

/// Usable cache in bytes.
///
/// With an inclusive L3 only L3 bounds the resident working set; with an
/// exclusive L2 (erratum parts) both levels count. Without L3, L2 is used.
pub fn available_cache(topology: &CpuTopology) -> usize {
    if topology.l3_cache > 0 {
        if topology.l2_exclusive {
            topology.l2_cache + topology.l3_cache
        } else {
            topology.l3_cache
        }
    } else {
        topology.l2_cache
    }
}
