//! The register file and search logic shared by both wire-level device
//! models. This is the one place in the repository, besides
//! `accel-oracle` itself, that legitimately computes an edit distance -
//! it is standing in for hardware that does so in silicon.

use std::collections::BTreeMap;

use accel_bus::Operation;
use accel_protocol::RegisterMap;
use accel_types::Revision;

/// In-process stand-in for the synthesised accelerator's register file.
///
/// Search completes synchronously, inside the write that starts it,
/// rather than taking the thousands of real clock cycles hardware
/// would; client code observes this as a device that finishes
/// suspiciously fast; it does not change protocol-level correctness,
/// only wall-clock fidelity. `SimUartAccelerator`/`SimSpiAccelerator`
/// layer the wire framing on top of this.
pub struct AcceleratorCore {
    registers: RegisterMap,
    bitvectors: [u16; 256],
    dictionary: BTreeMap<u32, u8>,
    control: u8,
    distance: u8,
    index: u16,
}

impl AcceleratorCore {
    #[must_use]
    pub fn new(revision: Revision) -> Self {
        Self {
            registers: RegisterMap::for_revision(revision),
            bitvectors: [0; 256],
            dictionary: BTreeMap::new(),
            control: 0,
            distance: 0,
            index: 0,
        }
    }

    /// Executes one bus-level frame against the register file, returning
    /// the response byte a real device would shift back.
    pub fn execute(&mut self, operation: Operation, address: u32, value: u8) -> u8 {
        match operation {
            Operation::Read => self.read(address),
            Operation::Write => {
                self.write(address, value);
                0
            }
        }
    }

    fn read(&mut self, address: u32) -> u8 {
        let regs = self.registers;
        if address == regs.control_address {
            self.control
        } else if address == regs.distance_address {
            self.distance
        } else if address == regs.index_address {
            (self.index >> 8) as u8
        } else if address == regs.index_address + 1 {
            self.index as u8
        } else if self.in_bitvector_range(address) {
            self.read_bitvector_byte(address)
        } else {
            *self.dictionary.get(&address).unwrap_or(&regs.list_terminator)
        }
    }

    fn write(&mut self, address: u32, value: u8) {
        let regs = self.registers;
        if address == regs.control_address {
            if value == regs.start_value(value) && value != 0 {
                self.run_search(value);
            }
            return;
        }
        if self.in_bitvector_range(address) {
            self.write_bitvector_byte(address, value);
            return;
        }
        if regs.requires_setup_scalars()
            && (address == regs.length_address
                || address == regs.mask_address
                || address == regs.mask_address + 1
                || address == regs.vp_address
                || address == regs.vp_address + 1)
        {
            // Setup scalars are consumed implicitly by reconstructing the
            // probe from the bitvector table; the device model does not
            // need to remember them, only acknowledge the write.
            return;
        }
        self.dictionary.insert(address, value);
    }

    fn in_bitvector_range(&self, address: u32) -> bool {
        address >= self.registers.base_bitvector_address
            && address < self.registers.base_bitvector_address + accel_protocol::BITVECTOR_TABLE_BYTES
    }

    fn read_bitvector_byte(&self, address: u32) -> u8 {
        let offset = address - self.registers.base_bitvector_address;
        let symbol = (offset / 2) as usize;
        let vector = self.bitvectors[symbol];
        if offset % 2 == 0 {
            (vector >> 8) as u8
        } else {
            vector as u8
        }
    }

    fn write_bitvector_byte(&mut self, address: u32, value: u8) {
        let offset = address - self.registers.base_bitvector_address;
        let symbol = (offset / 2) as usize;
        let vector = &mut self.bitvectors[symbol];
        if offset % 2 == 0 {
            *vector = (*vector & 0x00FF) | (u16::from(value) << 8);
        } else {
            *vector = (*vector & 0xFF00) | u16::from(value);
        }
    }

    /// Recovers the probe string from the bitvector table: at each
    /// position `k` exactly one symbol's vector has bit `k` set, since
    /// every probe byte occupies exactly one position.
    fn reconstruct_probe(&self, length: usize) -> Vec<u8> {
        let mut probe = vec![0u8; length];
        for (symbol, &vector) in self.bitvectors.iter().enumerate() {
            for k in 0..length {
                if vector & (1 << k) != 0 {
                    probe[k] = symbol as u8;
                }
            }
        }
        probe
    }

    fn dictionary_words(&self) -> Vec<Vec<u8>> {
        let regs = self.registers;
        let mut words = Vec::new();
        let mut current = Vec::new();
        let mut address = regs.base_dictionary_address;
        loop {
            let byte = *self.dictionary.get(&address).unwrap_or(&regs.list_terminator);
            if byte == regs.list_terminator {
                break;
            }
            if byte == regs.word_terminator {
                words.push(std::mem::take(&mut current));
            } else {
                current.push(byte);
            }
            address += 1;
            if words.len() > 1 << 20 {
                break;
            }
        }
        words
    }

    fn run_search(&mut self, start_value: u8) {
        let length = match self.registers.revision {
            Revision::Direct => start_value as usize,
            Revision::Wishbone => {
                // The dedicated length register was written separately;
                // recover the probe length from however many bit
                // positions are actually occupied in the table instead
                // of tracking a redundant field.
                (0..16)
                    .rev()
                    .find(|&k| self.bitvectors.iter().any(|&v| v & (1 << k) != 0))
                    .map_or(0, |k| k + 1)
            }
        };
        if length == 0 {
            self.control = 0;
            return;
        }

        let probe = self.reconstruct_probe(length);
        let words = self.dictionary_words();
        match accel_oracle::best_match(&probe, &words) {
            Some((index, distance)) => {
                self.index = index;
                self.distance = distance;
            }
            None => {
                self.index = 0;
                self.distance = 0;
            }
        }

        for &c in &probe {
            self.bitvectors[c as usize] = 0;
        }
        self.control = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(core: &mut AcceleratorCore, base: u32, words: &[&[u8]], word_term: u8, list_term: u8) {
        let mut addr = base;
        for word in words {
            for &b in *word {
                core.execute(Operation::Write, addr, b);
                addr += 1;
            }
            core.execute(Operation::Write, addr, word_term);
            addr += 1;
        }
        core.execute(Operation::Write, addr, list_term);
    }

    fn write_bitvectors(core: &mut AcceleratorCore, base_bv: u32, probe: &[u8]) {
        let mut map: BTreeMap<u8, u16> = BTreeMap::new();
        for (i, &c) in probe.iter().enumerate() {
            *map.entry(c).or_insert(0) |= 1 << i;
        }
        for (c, v) in map {
            let addr = base_bv + u32::from(c) * 2;
            core.execute(Operation::Write, addr, (v >> 8) as u8);
            core.execute(Operation::Write, addr + 1, v as u8);
        }
    }

    #[test]
    fn direct_revision_exact_match() {
        let mut core = AcceleratorCore::new(Revision::Direct);
        let regs = RegisterMap::for_revision(Revision::Direct);
        load(
            &mut core,
            regs.base_dictionary_address,
            &[b"h", b"he", b"hes", b"hest", b"heste", b"hesten"],
            regs.word_terminator,
            regs.list_terminator,
        );
        write_bitvectors(&mut core, regs.base_bitvector_address, b"hest");
        core.execute(Operation::Write, regs.control_address, regs.start_value(4));

        assert_eq!(core.execute(Operation::Read, regs.control_address, 0), 0);
        let distance = core.execute(Operation::Read, regs.distance_address, 0);
        let index_hi = core.execute(Operation::Read, regs.index_address, 0);
        let index_lo = core.execute(Operation::Read, regs.index_address + 1, 0);
        let index = (u16::from(index_hi) << 8) | u16::from(index_lo);
        assert_eq!(distance, 0);
        assert_eq!(index, 3);
    }

    #[test]
    fn wishbone_revision_breaks_ties_by_lowest_index() {
        let mut core = AcceleratorCore::new(Revision::Wishbone);
        let regs = RegisterMap::for_revision(Revision::Wishbone);
        load(
            &mut core,
            regs.base_dictionary_address,
            &[b"cat", b"cot", b"dog"],
            regs.word_terminator,
            regs.list_terminator,
        );
        write_bitvectors(&mut core, regs.base_bitvector_address, b"cog");
        core.execute(Operation::Write, regs.control_address, regs.start_value(3));

        let distance = core.execute(Operation::Read, regs.distance_address, 0);
        let index_hi = core.execute(Operation::Read, regs.index_address, 0);
        let index_lo = core.execute(Operation::Read, regs.index_address + 1, 0);
        let index = (u16::from(index_hi) << 8) | u16::from(index_lo);
        assert_eq!(distance, 1);
        assert_eq!(index, 0);
    }

    #[test]
    fn bitvector_table_is_zero_after_search() {
        let mut core = AcceleratorCore::new(Revision::Direct);
        let regs = RegisterMap::for_revision(Revision::Direct);
        load(
            &mut core,
            regs.base_dictionary_address,
            &[b"a"],
            regs.word_terminator,
            regs.list_terminator,
        );
        write_bitvectors(&mut core, regs.base_bitvector_address, b"b");
        core.execute(Operation::Write, regs.control_address, regs.start_value(1));

        for c in 0..=255u16 {
            let addr = regs.base_bitvector_address + c * 2;
            assert_eq!(core.execute(Operation::Read, addr, 0), 0);
            assert_eq!(core.execute(Operation::Read, addr + 1, 0), 0);
        }
    }
}
