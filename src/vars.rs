/// Versioned variable addressing.
///
/// Every dialect encodes "which variable" as a raw integer whose high bits
/// select the address space (global, local, bit) and whose low bits index
/// into it. The split points moved between versions, so each family gets an
/// `AddressingScheme`: a plain strategy table consulted by the store, not a
/// trait hierarchy. Out-of-range addresses are corrupt-script territory and
/// fail loudly; the tick loop treats them as fatal for the whole run.
use bitvec::prelude::*;

use crate::version::ScummVersion;

/// Local variable slots per script
pub const NUM_LOCALS: usize = 25;

/// How one version family carves up a raw variable address
#[derive(Debug, Clone, Copy)]
pub struct AddressingScheme {
    /// High bit selecting the bit-variable space, 0 if the family has none
    pub bit_mask: u32,
    /// High bit selecting script-local variables, 0 if the family has none
    pub local_mask: u32,
    /// High bit requesting one level of indirection (V5 only)
    pub indirect_mask: u32,
    /// Bit-vars alias into the bits of numeric globals rather than a
    /// separate array (V1-V4)
    pub packed_bits: bool,
    pub num_globals: usize,
    pub num_bits: usize,
}

impl AddressingScheme {
    pub fn for_version(version: ScummVersion) -> AddressingScheme {
        use ScummVersion::*;
        match version {
            // 8-bit addresses, one flat global space
            V0 => AddressingScheme {
                bit_mask: 0,
                local_mask: 0,
                indirect_mask: 0,
                packed_bits: false,
                num_globals: 256,
                num_bits: 0,
            },
            // Bit-vars live inside the numeric globals' bits
            V1 | V2 => AddressingScheme {
                bit_mask: 0x8000,
                local_mask: 0x4000,
                indirect_mask: 0,
                packed_bits: true,
                num_globals: 256,
                num_bits: 0,
            },
            V3 | V4 => AddressingScheme {
                bit_mask: 0x8000,
                local_mask: 0x4000,
                indirect_mask: 0,
                packed_bits: true,
                num_globals: 800,
                num_bits: 0,
            },
            // Separate bit array plus the extra indirection bit
            V5 => AddressingScheme {
                bit_mask: 0x8000,
                local_mask: 0x4000,
                indirect_mask: 0x2000,
                packed_bits: false,
                num_globals: 800,
                num_bits: 2048,
            },
            V6 | V7 => AddressingScheme {
                bit_mask: 0x8000,
                local_mask: 0x4000,
                indirect_mask: 0,
                packed_bits: false,
                num_globals: 800,
                num_bits: 4096,
            },
            // 32-bit addresses
            V8 => AddressingScheme {
                bit_mask: 0x8000_0000,
                local_mask: 0x4000_0000,
                indirect_mask: 0,
                packed_bits: false,
                num_globals: 4096,
                num_bits: 4096,
            },
        }
    }
}

/// Where a raw address landed after decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolved {
    Global(usize),
    Local(usize),
    Bit(usize),
    /// Single bit within a numeric global (packed families)
    PackedBit { var: usize, bit: u32 },
}

/// Numeric globals plus the bit-variable array for one engine instance.
/// Locals belong to the running script slot and are passed in per access.
pub struct VariableStore {
    scheme: AddressingScheme,
    globals: Vec<i32>,
    bits: BitVec,
}

impl VariableStore {
    pub fn new(version: ScummVersion) -> VariableStore {
        let scheme = AddressingScheme::for_version(version);
        VariableStore {
            globals: vec![0; scheme.num_globals],
            bits: bitvec![0; scheme.num_bits],
            scheme,
        }
    }

    pub fn scheme(&self) -> &AddressingScheme {
        &self.scheme
    }

    pub fn num_globals(&self) -> usize {
        self.globals.len()
    }

    /// Decode a raw address into an address space slot, following at most
    /// one level of indirection.
    fn resolve(&self, raw: u32, locals: &[i32; NUM_LOCALS], depth: u8) -> Result<Resolved, String> {
        let s = &self.scheme;

        if s.indirect_mask != 0 && raw & s.indirect_mask != 0 {
            if depth > 0 {
                return Err(format!(
                    "Double indirection in variable address 0x{:04x}",
                    raw
                ));
            }
            let inner = raw & !s.indirect_mask;
            let resolved = self.resolve(inner, locals, depth + 1)?;
            let target = self.load(resolved, locals);
            if target < 0 {
                return Err(format!(
                    "Indirect variable address 0x{:04x} resolved to negative value {}",
                    raw, target
                ));
            }
            log::debug!(
                "Indirect var 0x{:04x} -> var 0x{:04x} -> addr 0x{:04x}",
                raw,
                inner,
                target
            );
            return self.resolve(target as u32, locals, depth + 1);
        }

        if s.bit_mask != 0 && raw & s.bit_mask != 0 {
            let low = raw & !s.bit_mask;
            if s.packed_bits {
                let var = ((low >> 4) & 0xFF) as usize;
                let bit = low & 0xF;
                if var >= self.globals.len() {
                    return Err(format!(
                        "Packed bit-var 0x{:04x} names global {} but only {} exist",
                        raw,
                        var,
                        self.globals.len()
                    ));
                }
                return Ok(Resolved::PackedBit { var, bit });
            }
            let idx = low as usize;
            if idx >= self.bits.len() {
                return Err(format!(
                    "Bit-var address 0x{:04x} out of range (index {}, {} bits)",
                    raw,
                    idx,
                    self.bits.len()
                ));
            }
            return Ok(Resolved::Bit(idx));
        }

        if s.local_mask != 0 && raw & s.local_mask != 0 {
            let idx = (raw & !s.local_mask) as usize;
            if idx >= NUM_LOCALS {
                return Err(format!(
                    "Local variable address 0x{:04x} out of range (index {}, {} locals)",
                    raw, idx, NUM_LOCALS
                ));
            }
            return Ok(Resolved::Local(idx));
        }

        let idx = raw as usize;
        if idx >= self.globals.len() {
            return Err(format!(
                "Global variable address 0x{:04x} out of range ({} globals)",
                raw,
                self.globals.len()
            ));
        }
        Ok(Resolved::Global(idx))
    }

    fn load(&self, slot: Resolved, locals: &[i32; NUM_LOCALS]) -> i32 {
        match slot {
            Resolved::Global(i) => self.globals[i],
            Resolved::Local(i) => locals[i],
            Resolved::Bit(i) => self.bits[i] as i32,
            Resolved::PackedBit { var, bit } => (self.globals[var] >> bit) & 1,
        }
    }

    pub fn read(&self, raw: u32, locals: &[i32; NUM_LOCALS]) -> Result<i32, String> {
        let slot = self.resolve(raw, locals, 0)?;
        let value = self.load(slot, locals);
        log::debug!("read_var(0x{:04x}) = {}", raw, value);
        Ok(value)
    }

    pub fn write(
        &mut self,
        raw: u32,
        value: i32,
        locals: &mut [i32; NUM_LOCALS],
    ) -> Result<(), String> {
        let slot = self.resolve(raw, locals, 0)?;
        log::debug!("write_var(0x{:04x}) = {}", raw, value);
        match slot {
            Resolved::Global(i) => self.globals[i] = value,
            Resolved::Local(i) => locals[i] = value,
            Resolved::Bit(i) => self.bits.set(i, value != 0),
            Resolved::PackedBit { var, bit } => {
                if value != 0 {
                    self.globals[var] |= 1 << bit;
                } else {
                    self.globals[var] &= !(1 << bit);
                }
            }
        }
        Ok(())
    }

    /// Direct global access for engine bookkeeping and the serializer
    pub fn global(&self, index: usize) -> Result<i32, String> {
        self.globals
            .get(index)
            .copied()
            .ok_or_else(|| format!("Global index {} out of range", index))
    }

    pub fn set_global(&mut self, index: usize, value: i32) -> Result<(), String> {
        match self.globals.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(format!("Global index {} out of range", index)),
        }
    }

    pub fn globals(&self) -> &[i32] {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut [i32] {
        &mut self.globals
    }

    pub fn bits(&self) -> &BitVec {
        &self.bits
    }

    pub fn bits_mut(&mut self) -> &mut BitVec {
        &mut self.bits
    }
}
