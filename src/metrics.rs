//! Per-run counters and the textual report
//!
//! The collector tracks per-level hit/miss counts, global access counters
//! split by read/write and data/instruction, latency sums, and a
//! per-address histogram of block movements between levels. Movement
//! pairs must come from the set declared at construction.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{MetricsError, SimulatorResult};
use crate::system::{Address, LevelName};

pub struct CacheMetrics {
    level_hits: [u64; 5],
    level_misses: [u64; 5],

    transition_pairs: Vec<(LevelName, LevelName)>,
    transitions: BTreeMap<Address, AddressRecord>,

    total_accesses: u64,
    read_accesses: u64,
    write_accesses: u64,
    data_accesses: u64,
    instruction_accesses: u64,

    total_latency: u64,
    read_latency: u64,
    write_latency: u64,
}

struct AddressRecord {
    // Parallel to the declared transition_pairs
    counts: Vec<u64>,
    accesses: u64,
    last_seen: u64,
    total_distance: u64,
}

impl AddressRecord {
    fn new(pairs: usize) -> Self {
        Self {
            counts: vec![0; pairs],
            accesses: 0,
            last_seen: 0,
            total_distance: 0,
        }
    }
}

impl CacheMetrics {
    pub fn new(transition_pairs: &[(LevelName, LevelName)]) -> Self {
        Self {
            level_hits: [0; 5],
            level_misses: [0; 5],
            transition_pairs: transition_pairs.to_vec(),
            transitions: BTreeMap::new(),
            total_accesses: 0,
            read_accesses: 0,
            write_accesses: 0,
            data_accesses: 0,
            instruction_accesses: 0,
            total_latency: 0,
            read_latency: 0,
            write_latency: 0,
        }
    }

    /// Record the level that served an access, along with the global and
    /// per-address access bookkeeping
    pub fn add_hit(
        &mut self,
        address: Address,
        level: LevelName,
        is_read: bool,
        is_instruction: bool,
    ) {
        self.level_hits[level as usize] += 1;
        self.total_accesses += 1;
        if is_read {
            self.read_accesses += 1;
        } else {
            self.write_accesses += 1;
        }
        if is_instruction {
            self.instruction_accesses += 1;
        } else {
            self.data_accesses += 1;
        }

        let pairs = self.transition_pairs.len();
        let record = self
            .transitions
            .entry(address)
            .or_insert_with(|| AddressRecord::new(pairs));
        record.accesses += 1;
        record.total_distance += self.total_accesses - record.last_seen;
        record.last_seen = self.total_accesses;
    }

    pub fn add_miss(&mut self, level: LevelName) {
        self.level_misses[level as usize] += 1;
    }

    /// Record a block movement between two declared levels
    pub fn add_transition(
        &mut self,
        from: LevelName,
        to: LevelName,
        address: Address,
    ) -> Result<(), MetricsError> {
        let pair_index = self
            .transition_pairs
            .iter()
            .position(|&(f, t)| f == from && t == to)
            .ok_or(MetricsError::UnknownTransition { from, to })?;
        let pairs = self.transition_pairs.len();
        let record = self
            .transitions
            .entry(address)
            .or_insert_with(|| AddressRecord::new(pairs));
        record.counts[pair_index] += 1;
        Ok(())
    }

    pub fn add_latency(&mut self, amount: u64, is_read: bool) {
        self.total_latency += amount;
        if is_read {
            self.read_latency += amount;
        } else {
            self.write_latency += amount;
        }
    }

    pub fn hits(&self, level: LevelName) -> u64 {
        self.level_hits[level as usize]
    }

    pub fn misses(&self, level: LevelName) -> u64 {
        self.level_misses[level as usize]
    }

    /// Fraction of probes of this level that hit; 0 if it was never probed
    pub fn hit_rate(&self, level: LevelName) -> f64 {
        let probes = self.hits(level) + self.misses(level);
        if probes == 0 {
            return 0.0;
        }
        self.hits(level) as f64 / probes as f64
    }

    pub fn total_accesses(&self) -> u64 {
        self.total_accesses
    }

    pub fn read_accesses(&self) -> u64 {
        self.read_accesses
    }

    pub fn write_accesses(&self) -> u64 {
        self.write_accesses
    }

    pub fn data_accesses(&self) -> u64 {
        self.data_accesses
    }

    pub fn instruction_accesses(&self) -> u64 {
        self.instruction_accesses
    }

    pub fn average_latency(&self) -> f64 {
        ratio(self.total_latency, self.total_accesses)
    }

    pub fn average_read_latency(&self) -> f64 {
        ratio(self.read_latency, self.read_accesses)
    }

    pub fn average_write_latency(&self) -> f64 {
        ratio(self.write_latency, self.write_accesses)
    }

    /// How often the movement `from->to` was recorded for an address
    pub fn transition_count(&self, address: Address, from: LevelName, to: LevelName) -> u64 {
        let Some(record) = self.transitions.get(&address) else {
            return 0;
        };
        self.transition_pairs
            .iter()
            .position(|&(f, t)| f == from && t == to)
            .map(|i| record.counts[i])
            .unwrap_or(0)
    }

    pub fn address_accesses(&self, address: Address) -> u64 {
        self.transitions.get(&address).map_or(0, |r| r.accesses)
    }

    pub fn average_distance(&self, address: Address) -> f64 {
        self.transitions
            .get(&address)
            .map_or(0.0, |r| ratio(r.total_distance, r.accesses))
    }

    /// Write the textual report
    pub fn save(&self, path: &Path) -> SimulatorResult<()> {
        let mut out = BufWriter::new(File::create(path)?);

        writeln!(out, "Overall Stats:")?;
        for level in LevelName::ALL {
            writeln!(
                out,
                "{} - {} misses {} hits",
                level,
                self.misses(level),
                self.hits(level)
            )?;
        }
        writeln!(out, "Total Accesses: {}", self.total_accesses)?;
        writeln!(out, "Total Read Accesses: {}", self.read_accesses)?;
        writeln!(out, "Total Write Accesses: {}", self.write_accesses)?;
        writeln!(out, "Total Data Accesses: {}", self.data_accesses)?;
        writeln!(out, "Total Instr Accesses: {}", self.instruction_accesses)?;
        writeln!(out, "Average Latency: {:.2}", self.average_latency())?;
        writeln!(out, "Average Read Latency: {:.2}", self.average_read_latency())?;
        writeln!(out, "Average Write Latency: {:.2}", self.average_write_latency())?;

        writeln!(out, "Transition Stats:")?;
        let header: Vec<String> = self
            .transition_pairs
            .iter()
            .map(|(f, t)| format!("{}->{}", f, t))
            .collect();
        writeln!(out, "{}", header.join(" "))?;
        for (address, record) in &self.transitions {
            let mut row: Vec<String> = self
                .transition_pairs
                .iter()
                .zip(&record.counts)
                .map(|((f, t), count)| format!("\"{}->{}\": {}", f, t, count))
                .collect();
            row.push(format!("\"accesses\": {}", record.accesses));
            row.push(format!(
                "\"avg-distance\": {:.2}",
                ratio(record.total_distance, record.accesses)
            ));
            writeln!(out, "{:#x}:{{{}}}", address, row.join(", "))?;
        }
        out.flush()?;
        Ok(())
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS: [(LevelName, LevelName); 3] = [
        (LevelName::Dl1, LevelName::Dl1),
        (LevelName::Ul2, LevelName::Dl1),
        (LevelName::Dl1, LevelName::Ul2),
    ];

    #[test]
    fn test_hit_bookkeeping() {
        let mut metrics = CacheMetrics::new(&PAIRS);
        metrics.add_hit(0x100, LevelName::Dl1, true, false);
        metrics.add_hit(0x200, LevelName::Ul2, false, false);
        metrics.add_hit(0x100, LevelName::Dl1, true, true);

        assert_eq!(metrics.hits(LevelName::Dl1), 2);
        assert_eq!(metrics.hits(LevelName::Ul2), 1);
        assert_eq!(metrics.total_accesses(), 3);
        assert_eq!(metrics.read_accesses(), 2);
        assert_eq!(metrics.write_accesses(), 1);
        assert_eq!(metrics.data_accesses(), 2);
        assert_eq!(metrics.instruction_accesses(), 1);
    }

    #[test]
    fn test_reuse_distance() {
        let mut metrics = CacheMetrics::new(&PAIRS);
        // Accesses 1 and 3 touch the same address: distances 1 and 2
        metrics.add_hit(0x100, LevelName::Dl1, true, false);
        metrics.add_hit(0x200, LevelName::Dl1, true, false);
        metrics.add_hit(0x100, LevelName::Dl1, true, false);

        assert_eq!(metrics.address_accesses(0x100), 2);
        assert!((metrics.average_distance(0x100) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_transitions_are_validated() {
        let mut metrics = CacheMetrics::new(&PAIRS);
        assert!(metrics
            .add_transition(LevelName::Ul2, LevelName::Dl1, 0x100)
            .is_ok());
        assert!(metrics
            .add_transition(LevelName::Mem, LevelName::Dl1, 0x100)
            .is_err());
        assert_eq!(
            metrics.transition_count(0x100, LevelName::Ul2, LevelName::Dl1),
            1
        );
        assert_eq!(
            metrics.transition_count(0x100, LevelName::Dl1, LevelName::Dl1),
            0
        );
    }

    #[test]
    fn test_hit_and_miss_rates() {
        let mut metrics = CacheMetrics::new(&PAIRS);
        metrics.add_miss(LevelName::Dl1);
        metrics.add_miss(LevelName::Dl1);
        metrics.add_hit(0x100, LevelName::Dl1, true, false);
        assert_eq!(metrics.misses(LevelName::Dl1), 2);
        assert!((metrics.hit_rate(LevelName::Dl1) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.hit_rate(LevelName::Ul3), 0.0);
    }

    #[test]
    fn test_latency_averages() {
        let mut metrics = CacheMetrics::new(&PAIRS);
        metrics.add_latency(10, true);
        metrics.add_latency(30, false);
        metrics.add_hit(0x100, LevelName::Dl1, true, false);
        metrics.add_hit(0x200, LevelName::Dl1, false, false);
        assert!((metrics.average_latency() - 20.0).abs() < 1e-9);
        assert!((metrics.average_read_latency() - 10.0).abs() < 1e-9);
        assert!((metrics.average_write_latency() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_save_report_format() {
        let mut metrics = CacheMetrics::new(&PAIRS);
        metrics.add_miss(LevelName::Dl1);
        metrics.add_transition(LevelName::Ul2, LevelName::Dl1, 0x1a0).unwrap();
        metrics.add_hit(0x1a0, LevelName::Ul2, true, false);

        let path = std::env::temp_dir().join("cachesim_metrics_report_test.out");
        metrics.save(&path).unwrap();
        let report = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = report.lines();
        assert_eq!(lines.next(), Some("Overall Stats:"));
        assert_eq!(lines.next(), Some("IL1 - 0 misses 0 hits"));
        assert_eq!(lines.next(), Some("DL1 - 1 misses 0 hits"));
        assert!(report.contains("Total Accesses: 1"));
        assert!(report.contains("Average Latency: 0.00"));
        assert!(report.contains("Transition Stats:"));
        assert!(report.contains("DL1->DL1 UL2->DL1 DL1->UL2"));
        assert!(report.contains(
            "0x1a0:{\"DL1->DL1\": 0, \"UL2->DL1\": 1, \"DL1->UL2\": 0, \
             \"accesses\": 1, \"avg-distance\": 1.00}"
        ));
    }
}
