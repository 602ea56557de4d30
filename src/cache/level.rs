//! One set-associative cache level
//!
//! A level knows nothing about the hierarchy above or below it: it maps
//! addresses to sets, looks blocks up, and places blocks with
//! policy-driven eviction. Storage is a slot array per set; slot order is
//! preserved so victim selection is reproducible.

use crate::cache::block::Block;
use crate::cache::policy::ReplacementPolicy;
use crate::cache::{get_log_2, get_mask, is_pow_2};
use crate::error::ConfigError;
use crate::system::{Address, AddressSpace, LevelName};

pub struct CacheLevel {
    name: LevelName,
    size: u64,
    associativity: usize,
    block_size: u64,
    num_blocks: u64,
    num_sets: u64,

    offset_bits: u32,
    index_bits: u32,
    tag_bits: u32,
    base_address_mask: Address,

    read_latency: u64,
    write_latency: u64,

    sets: Vec<Vec<Option<Block>>>,
}

// An address decomposes as | tag | index | offset |
impl CacheLevel {
    pub fn new(
        name: LevelName,
        address_space: AddressSpace,
        size: u64,
        associativity: usize,
        block_size: u64,
        read_latency: u64,
        write_latency: u64,
    ) -> Result<Self, ConfigError> {
        if !is_pow_2(size) {
            return Err(ConfigError::NotPowerOfTwo {
                field: "cache size",
                value: size,
            });
        }
        if !is_pow_2(block_size) {
            return Err(ConfigError::NotPowerOfTwo {
                field: "block size",
                value: block_size,
            });
        }
        if !is_pow_2(associativity as u64) {
            return Err(ConfigError::NotPowerOfTwo {
                field: "associativity",
                value: associativity as u64,
            });
        }
        if size % block_size != 0 {
            return Err(ConfigError::BlockSizeMismatch {
                level: name,
                block_size,
                size,
            });
        }
        let num_blocks = size / block_size;
        if num_blocks % associativity as u64 != 0 {
            return Err(ConfigError::AssociativityMismatch {
                level: name,
                associativity,
                blocks: num_blocks,
            });
        }
        let num_sets = num_blocks / associativity as u64;

        let offset_bits = get_log_2(block_size);
        let index_bits = get_log_2(num_sets);
        if offset_bits + index_bits > address_space.bits() {
            return Err(ConfigError::AddressSpaceExhausted {
                level: name,
                used: offset_bits + index_bits,
                available: address_space.bits(),
            });
        }
        let tag_bits = address_space.bits() - offset_bits - index_bits;
        let base_address_mask = get_mask(tag_bits + index_bits) << offset_bits;

        let sets = (0..num_sets)
            .map(|_| (0..associativity).map(|_| None).collect())
            .collect();

        Ok(Self {
            name,
            size,
            associativity,
            block_size,
            num_blocks,
            num_sets,
            offset_bits,
            index_bits,
            tag_bits,
            base_address_mask,
            read_latency,
            write_latency,
            sets,
        })
    }

    pub fn name(&self) -> LevelName {
        self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn num_blocks(&self) -> u64 {
        self.num_blocks
    }

    pub fn num_sets(&self) -> u64 {
        self.num_sets
    }

    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }

    pub fn tag_bits(&self) -> u32 {
        self.tag_bits
    }

    pub fn base_address_mask(&self) -> Address {
        self.base_address_mask
    }

    pub fn read_latency(&self) -> u64 {
        self.read_latency
    }

    pub fn write_latency(&self) -> u64 {
        self.write_latency
    }

    /// The set an address maps to
    pub fn set_index(&self, address: Address) -> usize {
        ((self.num_sets as Address - 1) & (address >> self.offset_bits)) as usize
    }

    /// Number of occupied slots in a set
    pub fn set_occupancy(&self, set_index: usize) -> usize {
        self.sets[set_index].iter().flatten().count()
    }

    /// Pure lookup: no metadata is touched. The caller decides whether
    /// the access counts as a read or write and touches the block itself
    pub fn get(&self, address: Address) -> Option<&Block> {
        let base = address & self.base_address_mask;
        let set = &self.sets[self.set_index(address)];
        set.iter().flatten().find(|b| b.base_address() == base)
    }

    pub fn get_mut(&mut self, address: Address) -> Option<&mut Block> {
        let base = address & self.base_address_mask;
        let set_index = self.set_index(address);
        self.sets[set_index]
            .iter_mut()
            .flatten()
            .find(|b| b.base_address() == base)
    }

    /// Place a block, evicting through the policy when the set is full.
    /// Returns the evicted block, if any
    pub fn put(&mut self, block: Block, policy: &mut ReplacementPolicy) -> Option<Block> {
        debug_assert_eq!(
            block.base_address() & get_mask(self.offset_bits),
            0,
            "block base address carries offset bits"
        );
        let set_index = self.set_index(block.base_address());
        let set = &mut self.sets[set_index];

        if let Some(slot) = set
            .iter_mut()
            .find(|slot| slot.as_ref() == Some(&block))
        {
            // Block already resident, assume a rewrite
            *slot = Some(block);
            return None;
        }
        if let Some(slot) = set.iter_mut().find(|slot| slot.is_none()) {
            // Space available, take the first empty slot
            *slot = Some(block);
            return None;
        }
        let victim_index = policy.evict(set);
        set[victim_index].replace(block)
    }

    /// Clear the matching slot if the block is resident; no-op otherwise
    pub fn remove(&mut self, block: &Block) {
        self.remove_base(block.base_address());
    }

    /// Clear the slot holding `base_address` if present; no-op otherwise
    pub fn remove_base(&mut self, base_address: Address) {
        let set_index = self.set_index(base_address);
        for slot in &mut self.sets[set_index] {
            if slot.as_ref().map(Block::base_address) == Some(base_address) {
                *slot = None;
                return;
            }
        }
    }
}
