/// Script slots and the instruction byte stream.
///
/// A `ScriptSlot` is one running script: an id into the bank, a cursor into
/// its immutable byte sequence, 25 local variables, and a status. Operand
/// fetches live here as cursor-advancing primitives so no handler ever
/// duplicates the width/endianness decision.
use std::sync::Arc;

use indexmap::IndexMap;

use crate::vars::NUM_LOCALS;
use crate::version::OperandWidth;

/// Script slots available per engine instance
pub const NUM_SLOTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Free,
    Running,
    /// Killed this tick, reclaimed on the next dispatch scan
    Dead,
}

/// One running script occupying a slot
#[derive(Debug, Clone)]
pub struct ScriptSlot {
    pub script_id: u16,
    pub status: SlotStatus,
    /// Byte offset of the next opcode to decode
    pub cursor: usize,
    pub locals: [i32; NUM_LOCALS],
    /// Immutable instruction bytes, shared with the bank
    pub code: Arc<Vec<u8>>,
}

impl ScriptSlot {
    pub fn free() -> ScriptSlot {
        ScriptSlot {
            script_id: 0,
            status: SlotStatus::Free,
            cursor: 0,
            locals: [0; NUM_LOCALS],
            code: Arc::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == SlotStatus::Running
    }

    /// Fetch the next byte and advance the cursor
    pub fn fetch_byte(&mut self) -> Result<u8, String> {
        match self.code.get(self.cursor) {
            Some(&b) => {
                self.cursor += 1;
                Ok(b)
            }
            None => Err(format!(
                "Script {} ran off the end of its code at offset {}",
                self.script_id, self.cursor
            )),
        }
    }

    /// Fetch a literal word at the version's operand width, little-endian
    pub fn fetch_word(&mut self, width: OperandWidth) -> Result<i32, String> {
        match width {
            OperandWidth::W8 => Ok(self.fetch_byte()? as i32),
            OperandWidth::W16 => {
                let lo = self.fetch_byte()? as u16;
                let hi = self.fetch_byte()? as u16;
                Ok((lo | (hi << 8)) as i16 as i32)
            }
            OperandWidth::W32 => {
                let mut v: u32 = 0;
                for shift in [0u32, 8, 16, 24] {
                    v |= (self.fetch_byte()? as u32) << shift;
                }
                Ok(v as i32)
            }
        }
    }

    /// Fetch a raw variable address at the version's address width
    pub fn fetch_addr(&mut self, width: OperandWidth) -> Result<u32, String> {
        match width {
            OperandWidth::W8 => Ok(self.fetch_byte()? as u32),
            OperandWidth::W16 => {
                let lo = self.fetch_byte()? as u32;
                let hi = self.fetch_byte()? as u32;
                Ok(lo | (hi << 8))
            }
            OperandWidth::W32 => {
                let mut v: u32 = 0;
                for shift in [0u32, 8, 16, 24] {
                    v |= (self.fetch_byte()? as u32) << shift;
                }
                Ok(v)
            }
        }
    }

    /// Signed relative jump, encoded as a 16-bit offset from the cursor
    /// position after the offset itself
    pub fn jump_relative(&mut self, offset: i16) -> Result<(), String> {
        let target = self.cursor as i64 + offset as i64;
        if target < 0 || target as usize > self.code.len() {
            return Err(format!(
                "Script {} jump to offset {} outside code of length {}",
                self.script_id,
                target,
                self.code.len()
            ));
        }
        self.cursor = target as usize;
        Ok(())
    }
}

/// Source of raw instruction bytes by script id
pub trait ScriptBank {
    fn script(&self, id: u16) -> Result<Arc<Vec<u8>>, String>;
}

/// In-memory bank, insertion-ordered for deterministic iteration
#[derive(Default)]
pub struct MemoryScriptBank {
    scripts: IndexMap<u16, Arc<Vec<u8>>>,
}

impl MemoryScriptBank {
    pub fn new() -> MemoryScriptBank {
        MemoryScriptBank {
            scripts: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, id: u16, code: Vec<u8>) {
        self.scripts.insert(id, Arc::new(code));
    }

    pub fn ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.scripts.keys().copied()
    }
}

impl ScriptBank for MemoryScriptBank {
    fn script(&self, id: u16) -> Result<Arc<Vec<u8>>, String> {
        self.scripts
            .get(&id)
            .cloned()
            .ok_or_else(|| format!("No script with id {}", id))
    }
}
