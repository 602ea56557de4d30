//! Replacement policies driving block eviction
//!
//! A single policy value is shared by every level of a hierarchy so the
//! logical clock is global: it advances exactly once per completed
//! top-level access. Policies never mutate cache storage; they compute
//! metadata and select victims.

use std::str::FromStr;

use crate::cache::block::Block;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyKind {
    Lru,
    Lfu,
    Rand,
    Nmru,
    Nmfu,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::Lru,
        PolicyKind::Lfu,
        PolicyKind::Rand,
        PolicyKind::Nmru,
        PolicyKind::Nmfu,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::Lru => "LRU",
            PolicyKind::Lfu => "LFU",
            PolicyKind::Rand => "RAND",
            PolicyKind::Nmru => "NMRU",
            PolicyKind::Nmfu => "NMFU",
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LRU" => Ok(PolicyKind::Lru),
            "LFU" => Ok(PolicyKind::Lfu),
            "RAND" => Ok(PolicyKind::Rand),
            "NMRU" => Ok(PolicyKind::Nmru),
            "NMFU" => Ok(PolicyKind::Nmfu),
            _ => Err(format!(
                "Unknown replacement policy: '{}'. Expected LRU, LFU, RAND, NMRU, or NMFU.",
                s
            )),
        }
    }
}

/// A replacement policy with its shared logical clock and
/// injected randomness source
pub struct ReplacementPolicy {
    kind: PolicyKind,
    clock: u64,
    rng: fastrand::Rng,
}

impl ReplacementPolicy {
    pub fn new(kind: PolicyKind) -> Self {
        Self {
            kind,
            clock: 0,
            rng: fastrand::Rng::new(),
        }
    }

    /// Fix the randomness source for reproducible RAND/NMRU/NMFU runs
    pub fn with_seed(kind: PolicyKind, seed: u64) -> Self {
        Self {
            kind,
            clock: 0,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Advance the logical clock; called once per completed access
    pub fn step(&mut self) {
        self.clock += 1;
    }

    /// Metadata for a freshly created block
    pub fn default_metadata(&self) -> u64 {
        match self.kind {
            PolicyKind::Lru | PolicyKind::Nmru | PolicyKind::Rand => self.clock,
            PolicyKind::Lfu | PolicyKind::Nmfu => 0,
        }
    }

    /// New metadata for a block that was just read or written
    pub fn touch(&self, block: &Block) -> u64 {
        match self.kind {
            PolicyKind::Lru | PolicyKind::Nmru => self.clock,
            PolicyKind::Lfu | PolicyKind::Nmfu => block.policy_data() + 1,
            PolicyKind::Rand => block.policy_data(),
        }
    }

    /// Select the victim slot in a fully occupied set.
    /// Calling this on a set with empty slots is a logic error
    pub fn evict(&mut self, set: &[Option<Block>]) -> usize {
        assert!(
            set.iter().all(Option::is_some),
            "evict called on a set with empty slots"
        );

        match self.kind {
            PolicyKind::Lru | PolicyKind::Lfu => index_of_min(set),
            PolicyKind::Rand => self.rng.usize(0..set.len()),
            PolicyKind::Nmru | PolicyKind::Nmfu => {
                // Uniform over every slot except the most-used one.
                // A direct-mapped set has no alternative to offer
                if set.len() == 1 {
                    return 0;
                }
                let shielded = index_of_max(set);
                let mut pick = self.rng.usize(0..set.len() - 1);
                if pick >= shielded {
                    pick += 1;
                }
                pick
            }
        }
    }
}

// Ties break toward the first slot in set order

fn index_of_min(set: &[Option<Block>]) -> usize {
    let mut best = 0;
    for (i, slot) in set.iter().enumerate().skip(1) {
        if metadata(slot) < metadata(&set[best]) {
            best = i;
        }
    }
    best
}

fn index_of_max(set: &[Option<Block>]) -> usize {
    let mut best = 0;
    for (i, slot) in set.iter().enumerate().skip(1) {
        if metadata(slot) > metadata(&set[best]) {
            best = i;
        }
    }
    best
}

fn metadata(slot: &Option<Block>) -> u64 {
    slot.as_ref().map(Block::policy_data).unwrap_or(0)
}
