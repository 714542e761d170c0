/// Mid dialect handlers (V3, V4, V5).
///
/// Three parameter-presence bits (0x80, 0x40, 0x20) are folded into the
/// opcode byte; the low five bits name the operation. Each folded bit says
/// whether the corresponding value operand is a variable address instead of
/// a literal word. Conditional jumps take the branch when the condition is
/// FALSE; the offset skips the guarded body.
use log::debug;

use crate::interpreter::{Engine, ExecError, ExecutionResult};
use crate::opcode_tables::{get_byte_opcode_name, is_noop_opcode};
use crate::script::ScriptSlot;
use crate::version::{Dialect, OperandWidth};

pub const PARAM_1: u8 = 0x80;
pub const PARAM_2: u8 = 0x40;
pub const PARAM_3: u8 = 0x20;

pub fn execute(
    engine: &mut Engine,
    slot: &mut ScriptSlot,
    opcode: u8,
    op_start: usize,
) -> Result<ExecutionResult, ExecError> {
    let masked = opcode & 0x1F;
    debug!(
        "slot script {} @{:04x}: {:02x} {} ",
        slot.script_id,
        op_start,
        opcode,
        get_byte_opcode_name(masked)
    );

    let p1 = opcode & PARAM_1 != 0;
    let p2 = opcode & PARAM_2 != 0;
    let p3 = opcode & PARAM_3 != 0;

    match masked {
        // stopObjectCode
        0x00 => Ok(ExecutionResult::Terminate),
        // putActor actor, x, y
        0x01 => {
            let actor = engine.read_value(slot, p1)?;
            let x = engine.read_value(slot, p2)?;
            let y = engine.read_value(slot, p3)?;
            engine.put_actor(actor, x, y)?;
            Ok(ExecutionResult::Continue)
        }
        // startScript id
        0x02 => {
            let id = engine.read_value(slot, p1)?;
            engine.start_script(id as u16)?;
            Ok(ExecutionResult::Continue)
        }
        // stopScript slot
        0x03 => {
            let n = engine.read_value(slot, p1)? as usize;
            if Some(n) == engine.current_slot() {
                return Ok(ExecutionResult::Terminate);
            }
            engine.kill_slot(n)?;
            Ok(ExecutionResult::Continue)
        }
        // stopAllButCurrent
        0x04 => {
            engine.stop_all_but_current();
            Ok(ExecutionResult::Continue)
        }
        // walkActorTo actor, x, y
        0x05 => {
            let actor = engine.read_value(slot, p1)?;
            let x = engine.read_value(slot, p2)?;
            let y = engine.read_value(slot, p3)?;
            engine.walk_actor_to(actor, x, y)?;
            Ok(ExecutionResult::Continue)
        }
        // faceActor actor, other
        0x06 => {
            let actor = engine.read_value(slot, p1)?;
            let other = engine.read_value(slot, p2)?;
            engine.face_actor(actor, other)?;
            Ok(ExecutionResult::Continue)
        }
        // faceTowardPoint actor, x, y
        0x07 => {
            let actor = engine.read_value(slot, p1)?;
            let x = engine.read_value(slot, p2)?;
            let y = engine.read_value(slot, p3)?;
            engine.face_actor_toward_point(actor, x, y)?;
            Ok(ExecutionResult::Continue)
        }
        // animateActor actor, anim
        0x08 => {
            let actor = engine.read_value(slot, p1)?;
            let anim = engine.read_value(slot, p2)?;
            engine.animate_actor(actor, anim)?;
            Ok(ExecutionResult::Continue)
        }
        // freezeActor actor, flag
        0x09 => {
            let actor = engine.read_value(slot, p1)?;
            let flag = engine.read_value(slot, p2)?;
            engine.freeze_actor(actor, flag != 0)?;
            Ok(ExecutionResult::Continue)
        }
        // move dest, value
        0x0A => {
            let dest = engine.read_dest_addr(slot)?;
            let value = engine.read_value(slot, p1)?;
            engine.write_var(slot, dest, value)?;
            Ok(ExecutionResult::Continue)
        }
        0x0B..=0x0E => arithmetic(engine, slot, masked, p1),
        // increment dest
        0x0F => {
            let dest = engine.read_dest_addr(slot)?;
            let v = engine.read_var(slot, dest)?;
            engine.write_var(slot, dest, v.wrapping_add(1))?;
            Ok(ExecutionResult::Continue)
        }
        // decrement dest
        0x10 => {
            let dest = engine.read_dest_addr(slot)?;
            let v = engine.read_var(slot, dest)?;
            engine.write_var(slot, dest, v.wrapping_sub(1))?;
            Ok(ExecutionResult::Continue)
        }
        // jump offset
        0x11 => {
            let offset = fetch_offset(slot)?;
            slot.jump_relative(offset).map_err(ExecError::Slot)?;
            Ok(ExecutionResult::Continue)
        }
        0x12..=0x15 => conditional(engine, slot, masked, p1, p2),
        // getRandomNumber dest, max
        0x16 => {
            let dest = engine.read_dest_addr(slot)?;
            let max = engine.read_value(slot, p1)?;
            let value = engine.rng.gen_range_inclusive(max);
            engine.write_var(slot, dest, value)?;
            Ok(ExecutionResult::Continue)
        }
        // breakHere
        0x17 => Ok(ExecutionResult::Yield),
        // waitForActor actor: busy-poll, the cursor rolls back to the
        // opcode byte so the same wait re-executes next tick
        0x18 => {
            let actor = engine.read_value(slot, p1)?;
            if engine.is_actor_moving(actor)? {
                slot.cursor = op_start;
                return Ok(ExecutionResult::Yield);
            }
            Ok(ExecutionResult::Continue)
        }
        // startSound / stopSound: deliberate no-ops, operand consumed
        0x19 | 0x1A => {
            debug_assert!(is_noop_opcode(Dialect::Mid, masked));
            let _ = engine.read_value(slot, p1)?;
            Ok(ExecutionResult::Continue)
        }
        // resourceRoutines sub, id: deliberate no-op
        0x1B => {
            let _sub = slot.fetch_byte().map_err(ExecError::Slot)?;
            let _ = engine.read_value(slot, p1)?;
            Ok(ExecutionResult::Continue)
        }
        // cursorCommand sub: deliberate no-op
        0x1C => {
            let _sub = slot.fetch_byte().map_err(ExecError::Slot)?;
            Ok(ExecutionResult::Continue)
        }
        _ => Err(ExecError::Slot(format!(
            "Unknown opcode {:02x} (masked {:02x}) in script {} at {:04x}",
            opcode, masked, slot.script_id, op_start
        ))),
    }
}

/// add/subtract/multiply/divide share decode: dest addr then one value
fn arithmetic(
    engine: &mut Engine,
    slot: &mut ScriptSlot,
    masked: u8,
    p1: bool,
) -> Result<ExecutionResult, ExecError> {
    let dest = engine.read_dest_addr(slot)?;
    let value = engine.read_value(slot, p1)?;
    let old = engine.read_var(slot, dest)?;
    let new = match masked {
        0x0B => old.wrapping_add(value),
        0x0C => old.wrapping_sub(value),
        0x0D => old.wrapping_mul(value),
        0x0E => {
            if value == 0 {
                return Err(ExecError::Slot(format!(
                    "Division by zero in script {}",
                    slot.script_id
                )));
            }
            old / value
        }
        _ => unreachable!(),
    };
    engine.write_var(slot, dest, new)?;
    Ok(ExecutionResult::Continue)
}

/// Comparison family: left, right, offset; branch taken when false
fn conditional(
    engine: &mut Engine,
    slot: &mut ScriptSlot,
    masked: u8,
    p1: bool,
    p2: bool,
) -> Result<ExecutionResult, ExecError> {
    let left = engine.read_value(slot, p1)?;
    let right = engine.read_value(slot, p2)?;
    let offset = fetch_offset(slot)?;
    let cond = match masked {
        0x12 => left == right,
        0x13 => left != right,
        0x14 => left < right,
        0x15 => left >= right,
        _ => unreachable!(),
    };
    if !cond {
        slot.jump_relative(offset).map_err(ExecError::Slot)?;
    }
    Ok(ExecutionResult::Continue)
}

/// Jump offsets are 16-bit signed in every byte dialect, regardless of the
/// literal operand width
pub(crate) fn fetch_offset(slot: &mut ScriptSlot) -> Result<i16, ExecError> {
    let w = slot
        .fetch_word(OperandWidth::W16)
        .map_err(ExecError::Slot)?;
    Ok(w as i16)
}
