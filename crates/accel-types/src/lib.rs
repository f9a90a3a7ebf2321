//! Shared value types used across the accelerator host stack.
//!
//! None of these types talk to a bus or a transport; they exist so the
//! protocol, bus, transport and client crates agree on one vocabulary
//! instead of passing raw `u32`/`u8` around.

use std::fmt;

/// A 24-bit byte address on the accelerator's control/data bus.
///
/// The top 8 bits of the underlying `u32` are always zero; this is
/// enforced at construction rather than trusted at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusAddress(u32);

/// Largest address the bus will accept (23 usable bits).
pub const MAX_BUS_ADDRESS: u32 = 0x007F_FFFF;

impl BusAddress {
    /// Builds a bus address, rejecting anything above [`MAX_BUS_ADDRESS`].
    pub fn new(raw: u32) -> Result<Self, AddressOutOfRange> {
        if raw > MAX_BUS_ADDRESS {
            return Err(AddressOutOfRange { address: raw });
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Returns the address offset by `delta` bytes, failing the same way
    /// `new` would if the result runs past the addressable range.
    pub fn offset(self, delta: u32) -> Result<Self, AddressOutOfRange> {
        Self::new(self.0.saturating_add(delta))
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06x}", self.0)
    }
}

/// Error returned when a caller asks for an address outside the bus's
/// 24-bit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressOutOfRange {
    pub address: u32,
}

impl fmt::Display for AddressOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "address 0x{:06x} exceeds the 24-bit bus range", self.address)
    }
}

impl std::error::Error for AddressOutOfRange {}

/// Which of the two coexisting register-map revisions a client targets.
///
/// This is the single place revision-dependent behaviour is chosen; every
/// other crate asks a [`Revision`] for the answer instead of hard-coding
/// an address, flag bit, or terminator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    /// The older, Wishbone-bridged register layout: separate length/mask/vp
    /// setup registers, an explicit error flag, bitvector table and
    /// dictionary image at the high end of the address space, and word
    /// terminator `0xFE` / list terminator `0xFF`.
    Wishbone,
    /// The newer, directly-addressed register layout: a single
    /// length-doubles-as-enable control byte, no error flag, bitvector
    /// table and dictionary image near the bottom of the address space,
    /// and word terminator `0x00` / list terminator `0x01`.
    Direct,
}

/// Result of a completed search: the winning dictionary entry and its
/// edit distance from the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub index: u16,
    pub distance: u8,
}

/// Memory-side chip-select pin selection, for transports that expose more
/// than one addressable device on the same SPI bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChipSelect {
    #[default]
    None,
    Cs,
    Cs2,
    Cs3,
}

impl fmt::Display for ChipSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChipSelect::None => "none",
            ChipSelect::Cs => "cs",
            ChipSelect::Cs2 => "cs2",
            ChipSelect::Cs3 => "cs3",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_rejects_out_of_range() {
        assert!(BusAddress::new(MAX_BUS_ADDRESS).is_ok());
        assert!(BusAddress::new(MAX_BUS_ADDRESS + 1).is_err());
    }

    #[test]
    fn address_offset_propagates_error() {
        let addr = BusAddress::new(MAX_BUS_ADDRESS - 1).unwrap();
        assert!(addr.offset(1).is_ok());
        assert!(addr.offset(2).is_err());
    }

    #[test]
    fn display_is_zero_padded_hex() {
        let addr = BusAddress::new(0x2a).unwrap();
        assert_eq!(addr.to_string(), "0x00002a");
    }
}
