//! Multi-level hierarchy engine
//!
//! Fixed topology: split L1 (IL1 for instruction fetches, DL1 for data)
//! over a unified L2 and L3, with MEM as the degenerate sink level. The
//! two variants share the level stack, the policy with its global clock,
//! and the metrics collector; they differ in how blocks are allocated on
//! a miss.

pub mod bypassing;
pub mod inclusive;

use crate::cache::block::Block;
use crate::cache::level::CacheLevel;
use crate::cache::policy::ReplacementPolicy;
use crate::cache::{get_log_2, get_mask};
use crate::error::{SimulatorError, SimulatorResult};
use crate::metrics::CacheMetrics;
use crate::system::{Address, AddressSpace, LevelName};

/// Read or write, as seen by the hierarchy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// Where an access ended up: the level that served it, the level the
/// block now lives in, and a snapshot of that block
#[derive(Debug)]
pub struct AccessOutcome {
    pub destination: LevelName,
    pub hit_in: LevelName,
    pub block: Block,
}

/// Constructor arguments shared by both hierarchy variants
#[derive(Clone, Debug)]
pub struct HierarchyConfig {
    pub address_space: AddressSpace,
    /// L1, L2, L3 sizes in bytes (IL1 and DL1 share the L1 shape)
    pub level_sizes: [u64; 3],
    pub level_associativities: [usize; 3],
    pub block_size: u64,
    /// (read, write) latency per level: L1, L2, L3, MEM. Zero if absent
    pub level_latencies: Option<[(u64, u64); 4]>,
}

/// Every block movement the hierarchy may report. Evictions spill one
/// level down; promotions climb from MEM toward L1; hits self-loop
pub const TRANSITION_PAIRS: [(LevelName, LevelName); 23] = [
    (LevelName::Dl1, LevelName::Dl1),
    (LevelName::Dl1, LevelName::Ul2),
    (LevelName::Dl1, LevelName::Ul3),
    (LevelName::Dl1, LevelName::Mem),
    (LevelName::Ul2, LevelName::Ul2),
    (LevelName::Ul2, LevelName::Ul3),
    (LevelName::Ul2, LevelName::Mem),
    (LevelName::Ul3, LevelName::Ul3),
    (LevelName::Ul3, LevelName::Mem),
    (LevelName::Mem, LevelName::Mem),
    (LevelName::Mem, LevelName::Ul3),
    (LevelName::Mem, LevelName::Ul2),
    (LevelName::Mem, LevelName::Dl1),
    (LevelName::Ul3, LevelName::Ul2),
    (LevelName::Ul3, LevelName::Dl1),
    (LevelName::Ul2, LevelName::Dl1),
    (LevelName::Il1, LevelName::Il1),
    (LevelName::Il1, LevelName::Ul2),
    (LevelName::Il1, LevelName::Ul3),
    (LevelName::Il1, LevelName::Mem),
    (LevelName::Ul2, LevelName::Il1),
    (LevelName::Ul3, LevelName::Il1),
    (LevelName::Mem, LevelName::Il1),
];

/// Common interface of the hierarchy variants
pub trait CacheSystem {
    fn perform_fetch(&mut self, address: Address, for_data: bool)
        -> SimulatorResult<AccessOutcome>;

    fn perform_set(&mut self, address: Address, for_data: bool)
        -> SimulatorResult<AccessOutcome>;

    /// Pre-load a block without touching policy metadata. A placement
    /// that evicts anything is fatal
    fn populate(&mut self, address: Address, level: LevelName, dirty: bool)
        -> SimulatorResult<()>;

    fn metrics(&self) -> &CacheMetrics;

    fn policy(&self) -> &ReplacementPolicy;
}

/// The five levels plus the shared policy and metrics
pub struct LevelStack {
    pub(crate) il1: CacheLevel,
    pub(crate) dl1: CacheLevel,
    pub(crate) ul2: CacheLevel,
    pub(crate) ul3: CacheLevel,
    pub(crate) mem: CacheLevel,
    pub(crate) policy: ReplacementPolicy,
    pub(crate) metrics: CacheMetrics,
    /// Clears offset bits across the whole address space; metrics rows
    /// are keyed by this block-granular base address
    base_mask: Address,
}

impl LevelStack {
    pub fn new(config: &HierarchyConfig, policy: ReplacementPolicy) -> SimulatorResult<Self> {
        let space = config.address_space;
        let block_size = config.block_size;
        let latencies = config.level_latencies.unwrap_or([(0, 0); 4]);

        let il1 = CacheLevel::new(
            LevelName::Il1,
            space,
            config.level_sizes[0],
            config.level_associativities[0],
            block_size,
            latencies[0].0,
            latencies[0].1,
        )?;
        let dl1 = CacheLevel::new(
            LevelName::Dl1,
            space,
            config.level_sizes[0],
            config.level_associativities[0],
            block_size,
            latencies[0].0,
            latencies[0].1,
        )?;
        let ul2 = CacheLevel::new(
            LevelName::Ul2,
            space,
            config.level_sizes[1],
            config.level_associativities[1],
            block_size,
            latencies[1].0,
            latencies[1].1,
        )?;
        let ul3 = CacheLevel::new(
            LevelName::Ul3,
            space,
            config.level_sizes[2],
            config.level_associativities[2],
            block_size,
            latencies[2].0,
            latencies[2].1,
        )?;
        // MEM is a single-block sink; it exists for naming and latency
        let mem = CacheLevel::new(
            LevelName::Mem,
            space,
            block_size,
            1,
            block_size,
            latencies[3].0,
            latencies[3].1,
        )?;

        let base_mask = space.mask() & !get_mask(get_log_2(block_size));

        Ok(Self {
            il1,
            dl1,
            ul2,
            ul3,
            mem,
            policy,
            metrics: CacheMetrics::new(&TRANSITION_PAIRS),
            base_mask,
        })
    }

    pub(crate) fn level(&self, name: LevelName) -> &CacheLevel {
        match name {
            LevelName::Il1 => &self.il1,
            LevelName::Dl1 => &self.dl1,
            LevelName::Ul2 => &self.ul2,
            LevelName::Ul3 => &self.ul3,
            LevelName::Mem => &self.mem,
        }
    }

    /// The block-granular metrics key for an address
    pub(crate) fn base(&self, address: Address) -> Address {
        address & self.base_mask
    }

    /// Account the probe latency of a level
    pub(crate) fn charge(&mut self, name: LevelName, op: Operation) {
        let (read, write) = {
            let level = self.level(name);
            (level.read_latency(), level.write_latency())
        };
        match op {
            Operation::Read => self.metrics.add_latency(read, true),
            Operation::Write => self.metrics.add_latency(write, false),
        }
    }

    /// Touch the resident block for `address` at `name`, if any, and
    /// return a snapshot of it
    pub(crate) fn touch_resident(
        &mut self,
        name: LevelName,
        address: Address,
        op: Operation,
    ) -> Option<Block> {
        let block = match name {
            LevelName::Il1 => self.il1.get_mut(address),
            LevelName::Dl1 => self.dl1.get_mut(address),
            LevelName::Ul2 => self.ul2.get_mut(address),
            LevelName::Ul3 => self.ul3.get_mut(address),
            LevelName::Mem => self.mem.get_mut(address),
        }?;
        match op {
            Operation::Read => block.read(&self.policy),
            Operation::Write => block.write(&self.policy),
        }
        Some(block.clone())
    }

    /// Allocate a fresh block for `address` into `target`, optionally
    /// touching it as a read or write. An eviction is recorded as a
    /// movement from `target` to `spill` and the victim is dropped
    pub(crate) fn install(
        &mut self,
        target: LevelName,
        spill: LevelName,
        address: Address,
        dirty: bool,
        access: Option<Operation>,
    ) -> SimulatorResult<Block> {
        let base = address & self.level(target).base_address_mask();
        let mut block = Block::new(base, dirty, &self.policy);
        match access {
            Some(Operation::Read) => block.read(&self.policy),
            Some(Operation::Write) => block.write(&self.policy),
            None => {}
        }
        let snapshot = block.clone();
        let evicted = match target {
            LevelName::Il1 => self.il1.put(block, &mut self.policy),
            LevelName::Dl1 => self.dl1.put(block, &mut self.policy),
            LevelName::Ul2 => self.ul2.put(block, &mut self.policy),
            LevelName::Ul3 => self.ul3.put(block, &mut self.policy),
            LevelName::Mem => self.mem.put(block, &mut self.policy),
        };
        if let Some(victim) = evicted {
            self.metrics
                .add_transition(target, spill, victim.base_address())?;
        }
        Ok(snapshot)
    }

    /// Conflict-free warm-up placement
    pub(crate) fn populate(
        &mut self,
        address: Address,
        name: LevelName,
        dirty: bool,
    ) -> SimulatorResult<()> {
        let base = address & self.level(name).base_address_mask();
        let block = Block::new(base, dirty, &self.policy);
        let evicted = match name {
            LevelName::Il1 => self.il1.put(block, &mut self.policy),
            LevelName::Dl1 => self.dl1.put(block, &mut self.policy),
            LevelName::Ul2 => self.ul2.put(block, &mut self.policy),
            LevelName::Ul3 => self.ul3.put(block, &mut self.policy),
            LevelName::Mem => self.mem.put(block, &mut self.policy),
        };
        if let Some(victim) = evicted {
            return Err(SimulatorError::ColdPlacementConflict {
                address: base,
                level: name,
                evicted: victim.base_address(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::cache::policy::{PolicyKind, ReplacementPolicy};

    /// The end-to-end scenario shape: 16-bit space, 4-byte blocks,
    /// L1 16B direct-mapped, L2 32B 2-way, L3 64B 2-way, zero latencies
    pub(crate) fn scenario_config() -> HierarchyConfig {
        HierarchyConfig {
            address_space: AddressSpace::In16Bit,
            level_sizes: [16, 32, 64],
            level_associativities: [1, 2, 2],
            block_size: 4,
            level_latencies: None,
        }
    }

    pub(crate) fn scenario_policy() -> ReplacementPolicy {
        ReplacementPolicy::with_seed(PolicyKind::Lru, 0)
    }

    pub(crate) fn latency_config() -> HierarchyConfig {
        HierarchyConfig {
            level_latencies: Some([(1, 2), (8, 9), (20, 21), (100, 101)]),
            ..scenario_config()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_level_stack_geometry() {
        let stack = LevelStack::new(&scenario_config(), scenario_policy()).unwrap();
        assert_eq!(stack.il1.num_sets(), 4);
        assert_eq!(stack.dl1.num_sets(), 4);
        assert_eq!(stack.ul2.num_sets(), 4);
        assert_eq!(stack.ul3.num_sets(), 8);
        assert_eq!(stack.mem.num_blocks(), 1);
        assert_eq!(stack.base(0x0107), 0x0104);
    }

    #[test]
    fn test_populate_places_without_touching() {
        let mut stack = LevelStack::new(&scenario_config(), scenario_policy()).unwrap();
        stack.populate(0x0042, LevelName::Ul2, true).unwrap();
        let block = stack.ul2.get(0x0040).expect("populated block");
        assert!(block.is_dirty());
        assert_eq!(block.base_address(), 0x0040);
    }

    #[test]
    fn test_populate_conflict_is_fatal() {
        let mut stack = LevelStack::new(&scenario_config(), scenario_policy()).unwrap();
        // DL1 set 0 is direct-mapped: the second placement must evict
        stack.populate(0x0000, LevelName::Dl1, false).unwrap();
        let conflict = stack.populate(0x0010, LevelName::Dl1, false);
        assert!(matches!(
            conflict,
            Err(SimulatorError::ColdPlacementConflict {
                level: LevelName::Dl1,
                ..
            })
        ));
    }

    #[test]
    fn test_install_records_spill_transitions() {
        let mut stack = LevelStack::new(&scenario_config(), scenario_policy()).unwrap();
        stack.populate(0x0000, LevelName::Dl1, false).unwrap();
        stack
            .install(LevelName::Dl1, LevelName::Ul2, 0x0010, false, None)
            .unwrap();
        assert_eq!(
            stack
                .metrics
                .transition_count(0x0000, LevelName::Dl1, LevelName::Ul2),
            1
        );
        assert!(stack.dl1.get(0x0000).is_none());
        assert!(stack.dl1.get(0x0010).is_some());
    }
}
