use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Build-time maximum for the per-thread hash factor.
pub const MAX_NUM_HASH_BLOCKS: usize = 5;

const MIB: usize = 1024 * 1024;

/// Memory footprint of one workload unit and the hash-factor ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadProfile {
    block_size: usize,
    hash_factor_ceiling: usize,
}

impl WorkloadProfile {
    /// Both values are floored at 1.
    pub const fn new(block_size: usize, hash_factor_ceiling: usize) -> Self {
        Self {
            block_size: if block_size == 0 { 1 } else { block_size },
            hash_factor_ceiling: if hash_factor_ceiling == 0 {
                1
            } else {
                hash_factor_ceiling
            },
        }
    }

    /// Bytes of cache one block occupies.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn hash_factor_ceiling(&self) -> usize {
        self.hash_factor_ceiling
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algo {
    #[default]
    Cryptonight,
    CryptonightLite,
}

impl Algo {
    pub const ALL: [Algo; 2] = [Algo::Cryptonight, Algo::CryptonightLite];

    pub fn name(self) -> &'static str {
        match self {
            Algo::Cryptonight => "cryptonight",
            Algo::CryptonightLite => "cryptonight-lite",
        }
    }

    /// Scratchpad bytes per hash.
    pub fn block_size(self) -> usize {
        match self {
            Algo::Cryptonight => 2 * MIB,
            Algo::CryptonightLite => MIB,
        }
    }

    pub fn profile(self) -> WorkloadProfile {
        WorkloadProfile::new(self.block_size(), MAX_NUM_HASH_BLOCKS)
    }
}

impl fmt::Display for Algo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown algorithm: {0}")]
pub struct UnknownAlgo(pub String);

impl FromStr for Algo {
    type Err = UnknownAlgo;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cryptonight" | "cn" => Ok(Algo::Cryptonight),
            "cryptonight-lite" | "cn-lite" | "cryptonight-light" => Ok(Algo::CryptonightLite),
            _ => Err(UnknownAlgo(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lite_block_is_half_of_standard() {
        assert_eq!(Algo::Cryptonight.block_size(), 2 * Algo::CryptonightLite.block_size());
    }

    #[test]
    fn profiles_carry_build_ceiling() {
        for algo in Algo::ALL {
            assert_eq!(algo.profile().hash_factor_ceiling(), MAX_NUM_HASH_BLOCKS);
        }
    }

    #[test]
    fn zero_profile_values_floor_to_one() {
        let p = WorkloadProfile::new(0, 0);
        assert_eq!((p.block_size(), p.hash_factor_ceiling()), (1, 1));
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("cryptonight".parse(), Ok(Algo::Cryptonight));
        assert_eq!("CN-Lite".parse(), Ok(Algo::CryptonightLite));
        assert_eq!(
            "scrypt".parse::<Algo>(),
            Err(UnknownAlgo("scrypt".to_string()))
        );
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for algo in Algo::ALL {
            assert_eq!(algo.to_string().parse::<Algo>(), Ok(algo));
        }
    }
}
