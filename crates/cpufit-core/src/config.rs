use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::num::ParseIntError;
use std::path::Path;
use tracing::debug;

use crate::errors::{ConfigError, Result};
use crate::optimizer::OptimizationRequest;
use crate::workload::{Algo, MAX_NUM_HASH_BLOCKS};

pub const DEFAULT_MAX_CPU_USAGE: usize = 75;

/// CPU section of the options file. Every key is optional.
///
/// ```json
/// { "algo": "cryptonight", "threads": 0, "multihash-factor": 0,
///   "max-cpu-usage": 75, "safe": false, "cpu-affinity": "0xF" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CpuConfig {
    pub algo: Algo,
    pub threads: usize,
    #[serde(rename = "multihash-factor")]
    pub hash_factor: usize,
    pub max_cpu_usage: usize,
    pub safe: bool,
    #[serde(with = "affinity_mask")]
    pub cpu_affinity: Option<u64>,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            algo: Algo::default(),
            threads: 0,
            hash_factor: 0,
            max_cpu_usage: DEFAULT_MAX_CPU_USAGE,
            safe: false,
            cpu_affinity: None,
        }
    }
}

impl CpuConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let buf = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: CpuConfig = serde_json::from_slice(&buf)?;
        config.validate()?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// Missing file means defaults; anything else that fails is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |source: io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.max_cpu_usage) {
            return Err(ConfigError::MaxCpuUsage(self.max_cpu_usage));
        }
        if self.hash_factor > MAX_NUM_HASH_BLOCKS {
            return Err(ConfigError::HashFactor {
                value: self.hash_factor,
                max: MAX_NUM_HASH_BLOCKS,
            });
        }
        Ok(())
    }

    pub fn request(&self) -> OptimizationRequest {
        OptimizationRequest {
            threads: self.threads,
            hash_factor: self.hash_factor,
            max_cpu_usage: self.max_cpu_usage,
            safe_mode: self.safe,
        }
    }
}

/// Accepts `0x`-prefixed hex or decimal.
pub fn parse_affinity_mask(s: &str) -> std::result::Result<u64, ParseIntError> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

// "cpu-affinity" may be a JSON number or a string; written back as hex.
mod affinity_mask {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(mask: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match mask {
            Some(m) => s.serialize_str(&format!("{m:#x}")),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Option::<Repr>::deserialize(d)? {
            None => Ok(None),
            Some(Repr::Num(n)) => Ok(Some(n)),
            Some(Repr::Text(t)) => super::parse_affinity_mask(&t)
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid cpu-affinity {t:?}: {e}"))),
        }
    }
}
