/// Opcode name tables and the deliberate no-op allow-list.
///
/// Names are for logging and diagnostics only; dispatch itself is the match
/// in the ops modules. The allow-list is the explicit record of opcodes that
/// decode their operands and intentionally do nothing, as opposed to opcodes
/// we simply do not know.
use std::collections::HashSet;

use crate::version::Dialect;

/// Name for a masked opcode in the byte-oriented dialects (V0 through V5)
pub fn get_byte_opcode_name(masked: u8) -> &'static str {
    match masked {
        0x00 => "stopObjectCode",
        0x01 => "putActor",
        0x02 => "startScript",
        0x03 => "stopScript",
        0x04 => "stopAllButCurrent",
        0x05 => "walkActorTo",
        0x06 => "faceActor",
        0x07 => "faceTowardPoint",
        0x08 => "animateActor",
        0x09 => "freezeActor",
        0x0A => "move",
        0x0B => "add",
        0x0C => "subtract",
        0x0D => "multiply",
        0x0E => "divide",
        0x0F => "increment",
        0x10 => "decrement",
        0x11 => "jump",
        0x12 => "isEqual",
        0x13 => "isNotEqual",
        0x14 => "isLess",
        0x15 => "isGreaterEqual",
        0x16 => "getRandomNumber",
        0x17 => "breakHere",
        0x18 => "waitForActor",
        0x19 => "startSound",
        0x1A => "stopSound",
        0x1B => "resourceRoutines",
        0x1C => "cursorCommand",
        _ => "unknown",
    }
}

/// Name for an opcode in the stack dialect (V6 through V8)
pub fn get_stack_opcode_name(opcode: u8) -> &'static str {
    match opcode {
        0x00 => "pushWord",
        0x01 => "pushVar",
        0x02 => "dup",
        0x03 => "pop",
        0x04 => "add",
        0x05 => "sub",
        0x06 => "mul",
        0x07 => "div",
        0x08 => "eq",
        0x09 => "neq",
        0x0A => "lt",
        0x0B => "ge",
        0x0C => "not",
        0x0D => "jump",
        0x0E => "jumpIfNot",
        0x0F => "writeVar",
        0x10 => "incVar",
        0x11 => "decVar",
        0x12 => "stopObjectCode",
        0x13 => "breakHere",
        0x14 => "startScript",
        0x15 => "stopScript",
        0x16 => "stopAllButCurrent",
        0x17 => "putActor",
        0x18 => "walkActorTo",
        0x19 => "faceActor",
        0x1A => "faceTowardPoint",
        0x1B => "animateActor",
        0x1C => "freezeActor",
        0x1D => "getRandomNumber",
        0x1E => "waitForActor",
        0x1F => "startSound",
        0x20 => "soundKludge",
        _ => "unknown",
    }
}

pub fn opcode_name(dialect: Dialect, masked: u8) -> &'static str {
    match dialect {
        Dialect::Stack => get_stack_opcode_name(masked),
        _ => get_byte_opcode_name(masked),
    }
}

lazy_static! {
    /// Byte-dialect opcodes that consume their operands and do nothing,
    /// matching original behaviour (sound and resource hints)
    pub static ref BYTE_NOOP_OPCODES: HashSet<u8> = {
        let mut set = HashSet::new();
        set.insert(0x19); // startSound
        set.insert(0x1A); // stopSound
        set.insert(0x1B); // resourceRoutines
        set.insert(0x1C); // cursorCommand
        set
    };

    /// Stack-dialect deliberate no-ops
    pub static ref STACK_NOOP_OPCODES: HashSet<u8> = {
        let mut set = HashSet::new();
        set.insert(0x1F); // startSound
        set.insert(0x20); // soundKludge
        set
    };
}

pub fn is_noop_opcode(dialect: Dialect, masked: u8) -> bool {
    match dialect {
        Dialect::Stack => STACK_NOOP_OPCODES.contains(&masked),
        _ => BYTE_NOOP_OPCODES.contains(&masked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_names() {
        assert_eq!(get_byte_opcode_name(0x0A), "move");
        assert_eq!(get_byte_opcode_name(0x18), "waitForActor");
        assert_eq!(get_byte_opcode_name(0xF0), "unknown");
    }

    #[test]
    fn test_noop_allow_list_is_explicit() {
        assert!(is_noop_opcode(Dialect::Mid, 0x19));
        assert!(is_noop_opcode(Dialect::Stack, 0x20));
        // unknown opcodes are not silently allowed
        assert!(!is_noop_opcode(Dialect::Mid, 0x1F));
        assert!(!is_noop_opcode(Dialect::Stack, 0x21));
    }
}
