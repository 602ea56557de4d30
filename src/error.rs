use std::path::PathBuf;

use thiserror::Error;

use crate::system::{Address, LevelName};

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Trace error: {0}")]
    TraceError(#[from] TraceError),

    #[error("Metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    #[error(
        "Cold placement of {address:#x} into {level} evicted {evicted:#x}; \
         pre-loading is expected to be conflict-free"
    )]
    ColdPlacementConflict {
        address: Address,
        level: LevelName,
        evicted: Address,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors in the cache and hierarchy configuration, surfaced at construction
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be a power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: u64 },

    #[error("{level}: associativity {associativity} does not divide the block count {blocks}")]
    AssociativityMismatch {
        level: LevelName,
        associativity: usize,
        blocks: u64,
    },

    #[error("{level}: block size {block_size} does not divide the cache size {size}")]
    BlockSizeMismatch {
        level: LevelName,
        block_size: u64,
        size: u64,
    },

    #[error("{level}: offset and index bits ({used}) exceed the {available}-bit address space")]
    AddressSpaceExhausted {
        level: LevelName,
        used: u32,
        available: u32,
    },

    #[error("Unsupported address width: {0} bits")]
    UnsupportedAddressWidth(u32),

    #[error("Field '{field}' must list {expected} values, got {actual}")]
    WrongLevelCount {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Field '{field}' has a malformed entry: '{entry}'")]
    MalformedEntry { field: &'static str, entry: String },
}

/// Errors related to the trace input file
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace file '{0}': {1}")]
    FileRead(PathBuf, #[source] std::io::Error),
}

/// Errors raised while recording metrics
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Transition {from}->{to} is not in the declared transition-pair set")]
    UnknownTransition { from: LevelName, to: LevelName },
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
