use super::{CpuIdentify, DetectError, RawCpuId};

/// No CPUID outside x86; the probe degrades to the unknown topology.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCpuId;

impl CpuIdentify for NativeCpuId {
    fn identify(&self) -> Result<RawCpuId, DetectError> {
        Err(DetectError::Unsupported(std::env::consts::ARCH))
    }
}
