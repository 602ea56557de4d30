//! Inclusive hierarchy variant
//!
//! Every block resident in a shallower level is also resident in every
//! deeper level, so a hit anywhere promotes the block up to L1 and
//! evictions along the way can be dropped: the data is still below.
//! Each promotion hop and each eviction is recorded as a movement.

use crate::cache::policy::ReplacementPolicy;
use crate::error::SimulatorResult;
use crate::metrics::CacheMetrics;
use crate::system::{Address, LevelName};

use super::{AccessOutcome, CacheSystem, HierarchyConfig, LevelStack, Operation};

pub struct InclusiveHierarchy {
    pub(crate) levels: LevelStack,
}

impl InclusiveHierarchy {
    pub fn new(config: &HierarchyConfig, policy: ReplacementPolicy) -> SimulatorResult<Self> {
        Ok(Self {
            levels: LevelStack::new(config, policy)?,
        })
    }

    /// Walk the levels top-down; on a miss below L1, allocate on the way
    /// back up so the inclusion property is preserved
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
            s.metrics.add_transition(l1, l1, base)?;
            AccessOutcome {
                destination: l1,
                hit_in: l1,
                block,
            }
        } else {
            s.metrics.add_miss(l1);
            s.charge(LevelName::Ul2, op);
            if let Some(block) = s.touch_resident(LevelName::Ul2, address, op) {
                // Allocate from L2 to L1
                let promoted =
                    s.install(l1, LevelName::Ul2, address, block.is_dirty(), Some(op))?;
                s.metrics.add_transition(LevelName::Ul2, l1, base)?;
                AccessOutcome {
                    destination: l1,
                    hit_in: LevelName::Ul2,
                    block: promoted,
                }
            } else {
                s.metrics.add_miss(LevelName::Ul2);
                s.charge(LevelName::Ul3, op);
                let (hit_in, dirty) =
                    if let Some(block) = s.touch_resident(LevelName::Ul3, address, op) {
                        (LevelName::Ul3, block.is_dirty())
                    } else {
                        s.metrics.add_miss(LevelName::Ul3);
                        s.charge(LevelName::Mem, op);
                        // Not in the cache: allocate from MEM to L3
                        let fresh =
                            s.install(LevelName::Ul3, LevelName::Mem, address, false, Some(op))?;
                        s.metrics
                            .add_transition(LevelName::Mem, LevelName::Ul3, base)?;
                        (LevelName::Mem, fresh.is_dirty())
                    };
                // Allocate from L3 to L2, then from L2 to L1
                let mid = s.install(LevelName::Ul2, LevelName::Ul3, address, dirty, Some(op))?;
                s.metrics
                    .add_transition(LevelName::Ul3, LevelName::Ul2, base)?;
                let promoted = s.install(l1, LevelName::Ul2, address, mid.is_dirty(), Some(op))?;
                s.metrics.add_transition(LevelName::Ul2, l1, base)?;
                AccessOutcome {
                    destination: l1,
                    hit_in,
                    block: promoted,
                }
            }
        };

        s.policy.step();
        s.metrics
            .add_hit(base, outcome.hit_in, op == Operation::Read, !for_data);
        Ok(outcome)
    }
}

impl CacheSystem for InclusiveHierarchy {
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
