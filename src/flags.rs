use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::policy::PolicyKind;
use crate::error::ConfigError;
use crate::hierarchy::HierarchyConfig;
use crate::system::AddressSpace;

xflags::xflags! {
    /// Trace-driven multi-level cache hierarchy simulator.
    cmd CacheSimArgs {
        /// Path to the trace file to simulate.
        required trace_file: PathBuf

        /// Path the metrics report is written to (default: metrics.out).
        optional -o, --output output: PathBuf

        /// Replacement policy: LRU (default), LFU, RAND, NMRU, or NMFU.
        optional -p, --policy policy: PolicyKind

        /// Hierarchy model.
        /// I: Inclusive (default)
        /// E: Exclusive-bypassing
        optional -m, --model model: ModelArg

        /// Physical address width in bits (default: 64).
        optional -a, --address-bits bits: u32

        /// Comma-separated L1,L2,L3 sizes in bytes
        /// (default: 32768,2097152,16777216).
        optional --sizes sizes: String

        /// Comma-separated L1,L2,L3 associativities (default: 32,1,1).
        optional --assocs assocs: String

        /// Block size in bytes (default: 32).
        optional -b, --block-size block_size: u64

        /// Comma-separated read:write latency pairs for L1,L2,L3,MEM,
        /// e.g. 1:1,8:8,20:20,100:100 (default: all zero).
        optional --latencies latencies: String

        /// Seed for the RAND/NMRU/NMFU randomness source.
        optional -s, --seed seed: u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelArg {
    Inclusive,
    Bypassing,
}

impl FromStr for ModelArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "I" | "INCLUSIVE" => Ok(ModelArg::Inclusive),
            "E" | "EXCLUSIVE" | "BYPASSING" => Ok(ModelArg::Bypassing),
            _ => Err(format!(
                "Invalid hierarchy model: '{}'. Expected 'I' or 'E'.",
                s
            )),
        }
    }
}

impl CacheSimArgs {
    /// Assemble the hierarchy configuration from the flag surface
    pub fn hierarchy_config(&self) -> Result<HierarchyConfig, ConfigError> {
        let address_space = AddressSpace::from_bits(self.address_bits.unwrap_or(64))?;

        let level_sizes = match &self.sizes {
            Some(s) => parse_triple(s, "sizes")?,
            None => [32768, 2097152, 16777216],
        };
        let level_associativities = match &self.assocs {
            Some(s) => {
                let parsed = parse_triple(s, "assocs")?;
                [parsed[0] as usize, parsed[1] as usize, parsed[2] as usize]
            }
            None => [32, 1, 1],
        };
        let level_latencies = match &self.latencies {
            Some(s) => Some(parse_latencies(s)?),
            None => None,
        };

        Ok(HierarchyConfig {
            address_space,
            level_sizes,
            level_associativities,
            block_size: self.block_size.unwrap_or(32),
            level_latencies,
        })
    }
}

fn parse_triple(list: &str, field: &'static str) -> Result<[u64; 3], ConfigError> {
    let entries: Vec<&str> = list.split(',').collect();
    if entries.len() != 3 {
        return Err(ConfigError::WrongLevelCount {
            field,
            expected: 3,
            actual: entries.len(),
        });
    }
    let mut values = [0u64; 3];
    for (value, entry) in values.iter_mut().zip(&entries) {
        *value = entry
            .trim()
            .parse()
            .map_err(|_| ConfigError::MalformedEntry {
                field,
                entry: entry.to_string(),
            })?;
    }
    Ok(values)
}

fn parse_latencies(list: &str) -> Result<[(u64, u64); 4], ConfigError> {
    const FIELD: &str = "latencies";
    let entries: Vec<&str> = list.split(',').collect();
    if entries.len() != 4 {
        return Err(ConfigError::WrongLevelCount {
            field: FIELD,
            expected: 4,
            actual: entries.len(),
        });
    }
    fn malformed(entry: &str) -> ConfigError {
        ConfigError::MalformedEntry {
            field: FIELD,
            entry: entry.to_string(),
        }
    }

    let mut pairs = [(0u64, 0u64); 4];
    for (pair, entry) in pairs.iter_mut().zip(&entries) {
        let (read, write) = entry
            .trim()
            .split_once(':')
            .ok_or_else(|| malformed(entry))?;
        pair.0 = read.trim().parse().map_err(|_| malformed(entry))?;
        pair.1 = write.trim().parse().map_err(|_| malformed(entry))?;
    }
    Ok(pairs)
}
