use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the brand buffer, terminator included.
pub const BRAND_CAPACITY: usize = 64;

const UNKNOWN_BRAND: &str = "Unknown CPU";

/// Processor brand string, bounded to `BRAND_CAPACITY - 1` bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Brand(String);

impl Brand {
    /// Copies `raw` up to the first NUL, truncating on a char boundary if it
    /// does not fit the buffer.
    pub fn new(raw: &str) -> Self {
        let raw = raw.split('\0').next().unwrap_or_default().trim();
        let mut end = raw.len().min(BRAND_CAPACITY - 1);
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        Self(raw[..end].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    Intel,
    Amd,
    Other,
}

impl Vendor {
    /// Maps a CPUID vendor identification string.
    pub fn from_id(id: &str) -> Self {
        match id {
            "GenuineIntel" => Vendor::Intel,
            "AuthenticAMD" => Vendor::Amd,
            _ => Vendor::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub x86_64: bool,
    pub aes: bool,
    pub bmi2: bool,
}

/// Whether the topology came from a successful probe or is the safe-floor
/// stand-in used when identification failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologySource {
    Detected,
    Unknown,
}

/// Normalized, machine-wide view of the CPU. Built once, never mutated.
///
/// Cache figures are aggregate bytes across every socket. `l2_exclusive`
/// is only set when the L2 figure was aggregated per core pair (see
/// [`crate::erratum`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuTopology {
    pub(crate) source: TopologySource,
    pub(crate) brand: Brand,
    pub(crate) vendor: Vendor,
    pub(crate) extended_family: u32,
    pub(crate) sockets: usize,
    pub(crate) total_cores: usize,
    pub(crate) total_threads: usize,
    pub(crate) l2_cache: usize,
    pub(crate) l3_cache: usize,
    pub(crate) l2_exclusive: bool,
    pub(crate) flags: FeatureFlags,
}

impl CpuTopology {
    /// Safe floors: one socket, one core, one thread, no cache, no flags.
    pub fn unknown() -> Self {
        Self {
            source: TopologySource::Unknown,
            brand: Brand::new(UNKNOWN_BRAND),
            vendor: Vendor::Other,
            extended_family: 0,
            sockets: 1,
            total_cores: 1,
            total_threads: 1,
            l2_cache: 0,
            l3_cache: 0,
            l2_exclusive: false,
            flags: FeatureFlags::default(),
        }
    }

    pub fn source(&self) -> TopologySource {
        self.source
    }
    pub fn is_unknown(&self) -> bool {
        self.source == TopologySource::Unknown
    }
    pub fn brand(&self) -> &str {
        self.brand.as_str()
    }
    pub fn vendor(&self) -> Vendor {
        self.vendor
    }
    pub fn extended_family(&self) -> u32 {
        self.extended_family
    }
    pub fn sockets(&self) -> usize {
        self.sockets
    }
    pub fn cores(&self) -> usize {
        self.total_cores
    }
    pub fn threads(&self) -> usize {
        self.total_threads
    }
    /// Aggregate L2 bytes.
    pub fn l2(&self) -> usize {
        self.l2_cache
    }
    /// Aggregate L3 bytes.
    pub fn l3(&self) -> usize {
        self.l3_cache
    }
    pub fn l2_exclusive(&self) -> bool {
        self.l2_exclusive
    }
    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }
    pub fn has_aes(&self) -> bool {
        self.flags.aes
    }
    pub fn has_bmi2(&self) -> bool {
        self.flags.bmi2
    }
    pub fn is_x64(&self) -> bool {
        self.flags.x86_64
    }
    pub fn available_cache(&self) -> usize {
        crate::cache::available_cache(self)
    }
}
