//! Trace input and the simulation loop
//!
//! A trace is a text file with one record per line:
//! `<D|I> <R|W> <hex-address>`. Malformed lines are warned about and
//! skipped; the trace continues.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::error::{SimulatorResult, TraceError};
use crate::hierarchy::{CacheSystem, Operation};
use crate::system::Address;

const PROGRESS_INTERVAL: u64 = 1_000_000;

/// Whether a record touches data or an instruction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    Data,
    Instruction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    pub kind: AccessKind,
    pub operation: Operation,
    pub address: Address,
}

/// Why a single line was rejected
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected 3 fields, got {0}")]
    FieldCount(usize),

    #[error("unknown access type '{0}': expected 'D' or 'I'")]
    UnknownKind(String),

    #[error("unknown operation '{0}': expected 'R' or 'W'")]
    UnknownOperation(String),

    #[error("malformed hex address '{0}'")]
    BadAddress(String),
}

/// Parse one trace line into a record
pub fn parse_record(line: &str) -> Result<TraceRecord, RecordError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(RecordError::FieldCount(parts.len()));
    }

    let kind = match parts[0] {
        "D" => AccessKind::Data,
        "I" => AccessKind::Instruction,
        other => return Err(RecordError::UnknownKind(other.to_string())),
    };
    let operation = match parts[1] {
        "R" => Operation::Read,
        "W" => Operation::Write,
        other => return Err(RecordError::UnknownOperation(other.to_string())),
    };

    let literal = parts[2];
    // Conventional 0x literal with at least three digits; a stray 'x'
    // past the prefix disqualifies the line
    if literal.len() < 5 {
        return Err(RecordError::BadAddress(literal.to_string()));
    }
    let digits = literal
        .strip_prefix("0x")
        .ok_or_else(|| RecordError::BadAddress(literal.to_string()))?;
    if digits.contains('x') {
        return Err(RecordError::BadAddress(literal.to_string()));
    }
    let address = Address::from_str_radix(digits, 16)
        .map_err(|_| RecordError::BadAddress(literal.to_string()))?;

    Ok(TraceRecord {
        kind,
        operation,
        address,
    })
}

/// Feed a trace file through the hierarchy. Returns the number of
/// records simulated (skipped lines excluded)
pub fn run_trace<S: CacheSystem + ?Sized>(system: &mut S, path: &Path) -> SimulatorResult<u64> {
    let file =
        File::open(path).map_err(|e| TraceError::FileRead(path.to_path_buf(), e))?;
    let reader = BufReader::new(file);

    let mut processed = 0u64;
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| TraceError::FileRead(path.to_path_buf(), e))?;
        // Some trace producers pad lines with NUL bytes
        let line = line.trim_end_matches('\0');
        if line.trim().is_empty() {
            continue;
        }

        match parse_record(line) {
            Ok(record) => {
                let for_data = record.kind == AccessKind::Data;
                match record.operation {
                    Operation::Read => system.perform_fetch(record.address, for_data)?,
                    Operation::Write => system.perform_set(record.address, for_data)?,
                };
                processed += 1;
                if processed % PROGRESS_INTERVAL == 0 {
                    log::info!("processed {} records", processed);
                }
            }
            Err(e) => log::warn!("skipping line {}: {}", line_number + 1, e),
        }
    }

    Ok(processed)
}
