//! System-wide definitions: the address type, the supported
//! physical address widths, and the names of the hierarchy levels

use std::fmt;

use crate::error::ConfigError;

/// Addresses are wide enough for the largest supported address space
pub type Address = u128;

/// The physical address width a cache system runs on,
/// represented as a full-width mask
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressSpace {
    In8Bit,
    In16Bit,
    In32Bit,
    In48Bit,
    In64Bit,
    In80Bit,
    In96Bit,
    In112Bit,
    In128Bit,
}

impl AddressSpace {
    /// The number of address bits
    pub fn bits(self) -> u32 {
        match self {
            AddressSpace::In8Bit => 8,
            AddressSpace::In16Bit => 16,
            AddressSpace::In32Bit => 32,
            AddressSpace::In48Bit => 48,
            AddressSpace::In64Bit => 64,
            AddressSpace::In80Bit => 80,
            AddressSpace::In96Bit => 96,
            AddressSpace::In112Bit => 112,
            AddressSpace::In128Bit => 128,
        }
    }

    /// The full-width address mask
    pub fn mask(self) -> Address {
        crate::cache::get_mask(self.bits())
    }

    pub fn from_bits(bits: u32) -> Result<Self, ConfigError> {
        match bits {
            8 => Ok(AddressSpace::In8Bit),
            16 => Ok(AddressSpace::In16Bit),
            32 => Ok(AddressSpace::In32Bit),
            48 => Ok(AddressSpace::In48Bit),
            64 => Ok(AddressSpace::In64Bit),
            80 => Ok(AddressSpace::In80Bit),
            96 => Ok(AddressSpace::In96Bit),
            112 => Ok(AddressSpace::In112Bit),
            128 => Ok(AddressSpace::In128Bit),
            _ => Err(ConfigError::UnsupportedAddressWidth(bits)),
        }
    }
}

/// The fixed set of levels in the three-level hierarchy.
/// MEM is the degenerate sink level backing the deepest cache
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LevelName {
    Il1 = 0,
    Dl1 = 1,
    Ul2 = 2,
    Ul3 = 3,
    Mem = 4,
}

impl LevelName {
    /// Report order for metrics output
    pub const ALL: [LevelName; 5] = [
        LevelName::Il1,
        LevelName::Dl1,
        LevelName::Ul2,
        LevelName::Ul3,
        LevelName::Mem,
    ];

    /// The L1 that serves an access: DL1 for data, IL1 for instructions
    pub fn l1(for_data: bool) -> Self {
        if for_data {
            LevelName::Dl1
        } else {
            LevelName::Il1
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LevelName::Il1 => "IL1",
            LevelName::Dl1 => "DL1",
            LevelName::Ul2 => "UL2",
            LevelName::Ul3 => "UL3",
            LevelName::Mem => "MEM",
        }
    }
}

impl fmt::Display for LevelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_widths() {
        assert_eq!(AddressSpace::In8Bit.mask(), 0xff);
        assert_eq!(AddressSpace::In16Bit.mask(), 0xffff);
        assert_eq!(AddressSpace::In64Bit.mask(), u64::MAX as Address);
        assert_eq!(AddressSpace::In128Bit.mask(), Address::MAX);
    }

    #[test]
    fn test_from_bits() {
        for space in [
            AddressSpace::In8Bit,
            AddressSpace::In16Bit,
            AddressSpace::In32Bit,
            AddressSpace::In48Bit,
            AddressSpace::In64Bit,
            AddressSpace::In80Bit,
            AddressSpace::In96Bit,
            AddressSpace::In112Bit,
            AddressSpace::In128Bit,
        ] {
            assert_eq!(AddressSpace::from_bits(space.bits()).unwrap(), space);
        }
        assert!(AddressSpace::from_bits(24).is_err());
    }

    #[test]
    fn test_level_names() {
        assert_eq!(LevelName::l1(true), LevelName::Dl1);
        assert_eq!(LevelName::l1(false), LevelName::Il1);
        assert_eq!(LevelName::Ul2.to_string(), "UL2");
    }
}
