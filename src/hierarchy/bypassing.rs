//! Exclusive-bypassing hierarchy variant
//!
//! Probing matches the inclusive variant, but allocation is lazy: a
//! fetch promotes a block one level up at most, and a store that misses
//! L1 is applied in place (or installed into L3 when nothing holds the
//! block). Deeper copies are left where they are, so an eviction from a
//! shallow level is dropped after its movement is recorded.

use crate::cache::policy::ReplacementPolicy;
use crate::error::SimulatorResult;
use crate::metrics::CacheMetrics;
use crate::system::{Address, LevelName};

use super::{AccessOutcome, CacheSystem, HierarchyConfig, LevelStack, Operation};

pub struct BypassingHierarchy {
    pub(crate) levels: LevelStack,
}

impl BypassingHierarchy {
    pub fn new(config: &HierarchyConfig, policy: ReplacementPolicy) -> SimulatorResult<Self> {
        Ok(Self {
            levels: LevelStack::new(config, policy)?,
        })
    }

    fn access(
        &mut self,
        address: Address,
        for_data: bool,
        op: Operation,
    ) -> SimulatorResult<AccessOutcome> {
        let s = &mut self.levels;
        let l1 = LevelName::l1(for_data);
        let base = s.base(address);

        s.charge(l1, op);
        let outcome = if let Some(block) = s.touch_resident(l1, address, op) {
            AccessOutcome {
                destination: l1,
                hit_in: l1,
                block,
            }
        } else {
            s.metrics.add_miss(l1);
            s.charge(LevelName::Ul2, op);
            if let Some(block) = s.touch_resident(LevelName::Ul2, address, op) {
                match op {
                    Operation::Read => {
                        // Allocate from L2 to L1; the L1 victim is
                        // dropped, its data still lives in L2
                        let promoted =
                            s.install(l1, LevelName::Ul2, address, block.is_dirty(), None)?;
                        AccessOutcome {
                            destination: l1,
                            hit_in: LevelName::Ul2,
                            block: promoted,
                        }
                    }
                    // Write the L2 copy in place
                    Operation::Write => AccessOutcome {
                        destination: LevelName::Ul2,
                        hit_in: LevelName::Ul2,
                        block,
                    },
                }
            } else {
                s.metrics.add_miss(LevelName::Ul2);
                s.charge(LevelName::Ul3, op);
                if let Some(block) = s.touch_resident(LevelName::Ul3, address, op) {
                    match op {
                        Operation::Read => {
                            // Allocate from L3 to L2 only
                            let promoted = s.install(
                                LevelName::Ul2,
                                LevelName::Ul3,
                                address,
                                block.is_dirty(),
                                None,
                            )?;
                            AccessOutcome {
                                destination: LevelName::Ul2,
                                hit_in: LevelName::Ul3,
                                block: promoted,
                            }
                        }
                        Operation::Write => AccessOutcome {
                            destination: LevelName::Ul3,
                            hit_in: LevelName::Ul3,
                            block,
                        },
                    }
                } else {
                    s.metrics.add_miss(LevelName::Ul3);
                    s.charge(LevelName::Mem, op);
                    // Not in the cache: install into L3 only
                    let fresh =
                        s.install(LevelName::Ul3, LevelName::Mem, address, false, Some(op))?;
                    AccessOutcome {
                        destination: LevelName::Ul3,
                        hit_in: LevelName::Mem,
                        block: fresh,
                    }
                }
            }
        };

        s.policy.step();
        s.metrics
            .add_hit(base, outcome.hit_in, op == Operation::Read, !for_data);
        s.metrics
            .add_transition(outcome.hit_in, outcome.destination, base)?;
        Ok(outcome)
    }
}

impl CacheSystem for BypassingHierarchy {
    fn perform_fetch(
        &mut self,
        address: Address,
        for_data: bool,
    ) -> SimulatorResult<AccessOutcome> {
        self.access(address, for_data, Operation::Read)
    }

    fn perform_set(&mut self, address: Address, for_data: bool) -> SimulatorResult<AccessOutcome> {
        self.access(address, for_data, Operation::Write)
    }

    fn populate(&mut self, address: Address, level: LevelName, dirty: bool) -> SimulatorResult<()> {
        self.levels.populate(address, level, dirty)
    }

    fn metrics(&self) -> &CacheMetrics {
        &self.levels.metrics
    }

    fn policy(&self) -> &ReplacementPolicy {
        &self.levels.policy
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn hierarchy() -> BypassingHierarchy {
        BypassingHierarchy::new(&scenario_config(), scenario_policy()).unwrap()
    }

    #[test]
    fn test_store_miss_installs_only_into_l3() {
        let mut h = hierarchy();
        let outcome = h.perform_set(0x0100, true).unwrap();
        assert_eq!(outcome.hit_in, LevelName::Mem);
        assert_eq!(outcome.destination, LevelName::Ul3);

        assert!(h.levels.dl1.get(0x0100).is_none());
        assert!(h.levels.ul2.get(0x0100).is_none());
        let resident = h.levels.ul3.get(0x0100).expect("installed in L3");
        assert!(resident.is_dirty());

        let m = h.metrics();
        assert_eq!(m.transition_count(0x0100, LevelName::Mem, LevelName::Ul3), 1);
        assert_eq!(m.transition_count(0x0100, LevelName::Ul3, LevelName::Ul2), 0);
        assert_eq!(m.transition_count(0x0100, LevelName::Ul2, LevelName::Dl1), 0);
    }

    #[test]
    fn test_fetches_climb_one_level_per_hit() {
        let mut h = hierarchy();
        // Cold fetch lands in L3 only
        let outcome = h.perform_fetch(0x0040, true).unwrap();
        assert_eq!(outcome.destination, LevelName::Ul3);
        assert!(h.levels.ul2.get(0x0040).is_none());

        // Second fetch hits L3 and climbs into L2
        let outcome = h.perform_fetch(0x0040, true).unwrap();
        assert_eq!(outcome.hit_in, LevelName::Ul3);
        assert_eq!(outcome.destination, LevelName::Ul2);
        assert!(h.levels.ul2.get(0x0040).is_some());
        assert!(h.levels.dl1.get(0x0040).is_none());

        // Third fetch hits L2 and climbs into L1
        let outcome = h.perform_fetch(0x0040, true).unwrap();
        assert_eq!(outcome.hit_in, LevelName::Ul2);
        assert_eq!(outcome.destination, LevelName::Dl1);
        assert!(h.levels.dl1.get(0x0040).is_some());

        // Fourth fetch is an L1 hit
        let outcome = h.perform_fetch(0x0040, true).unwrap();
        assert_eq!(outcome.hit_in, LevelName::Dl1);
        assert_eq!(
            h.metrics()
                .transition_count(0x0040, LevelName::Dl1, LevelName::Dl1),
            1
        );
    }

    #[test]
    fn test_store_hits_deep_levels_in_place() {
        let mut h = hierarchy();
        h.perform_fetch(0x0040, true).unwrap();
        // The block sits in L3; a store must dirty it there
        let outcome = h.perform_set(0x0040, true).unwrap();
        assert_eq!(outcome.hit_in, LevelName::Ul3);
        assert_eq!(outcome.destination, LevelName::Ul3);
        assert!(h.levels.ul3.get(0x0040).unwrap().is_dirty());
        assert!(h.levels.ul2.get(0x0040).is_none());
        assert_eq!(
            h.metrics()
                .transition_count(0x0040, LevelName::Ul3, LevelName::Ul3),
            1
        );
    }

    #[test]
    fn test_l3_evictions_spill_to_mem() {
        let mut h = hierarchy();
        // L3 set 0 is 2-way; three cold blocks mapping to it force an
        // eviction. Set index uses bits 2..4, so stride by 0x20
        h.perform_fetch(0x0000, true).unwrap();
        h.perform_fetch(0x0020, true).unwrap();
        h.perform_fetch(0x0040, true).unwrap();
        assert_eq!(
            h.metrics()
                .transition_count(0x0000, LevelName::Ul3, LevelName::Mem),
            1
        );
        assert!(h.levels.ul3.get(0x0000).is_none());
    }

    #[test]
    fn test_promotion_does_not_refresh_recency() {
        let mut h = hierarchy();
        // Install 0x0000 into L2 (two fetches), then climb 0x0020 next
        // to it. The promoted copies keep their insertion metadata
        h.perform_fetch(0x0000, true).unwrap();
        h.perform_fetch(0x0000, true).unwrap();
        h.perform_fetch(0x0020, true).unwrap();
        h.perform_fetch(0x0020, true).unwrap();
        let a = h.levels.ul2.get(0x0000).unwrap().policy_data();
        let b = h.levels.ul2.get(0x0020).unwrap().policy_data();
        // LRU metadata equals the clock at promotion time
        assert_eq!(a, 1);
        assert_eq!(b, 3);
    }

    #[test]
    fn test_clock_and_hit_totals() {
        let mut h = hierarchy();
        let mut state = 0x1357u64;
        for i in 0..1_000u64 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let address = (state >> 32) as Address & 0x0ff0;
            if i % 4 == 0 {
                h.perform_set(address, true).unwrap();
            } else {
                h.perform_fetch(address, i % 2 == 0).unwrap();
            }
        }
        assert_eq!(h.policy().clock(), 1_000);
        let hit_sum: u64 = LevelName::ALL.iter().map(|&l| h.metrics().hits(l)).sum();
        assert_eq!(hit_sum, 1_000);
    }
}
