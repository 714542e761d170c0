/// Early dialect handlers (V1, V2).
///
/// Only one parameter bit exists (0x80) and it covers the first value
/// operand; any further value operands are literal bytes. Comparison
/// opcodes read the LEFT side as a variable address outright, which is why
/// their encoding differs from the mid dialect. Jump offsets stay 16-bit.
use log::debug;

use crate::interpreter::{Engine, ExecError, ExecutionResult};
use crate::opcode_tables::get_byte_opcode_name;
use crate::ops_v5::fetch_offset;
use crate::script::ScriptSlot;

pub const PARAM_1: u8 = 0x80;

pub fn execute(
    engine: &mut Engine,
    slot: &mut ScriptSlot,
    opcode: u8,
    op_start: usize,
) -> Result<ExecutionResult, ExecError> {
    let masked = opcode & 0x7F;
    debug!(
        "slot script {} @{:04x}: {:02x} {}",
        slot.script_id,
        op_start,
        opcode,
        get_byte_opcode_name(masked)
    );
    let p1 = opcode & PARAM_1 != 0;

    match masked {
        0x00 => Ok(ExecutionResult::Terminate),
        0x01 => {
            let actor = engine.read_value(slot, p1)?;
            let x = engine.read_value(slot, false)?;
            let y = engine.read_value(slot, false)?;
            engine.put_actor(actor, x, y)?;
            Ok(ExecutionResult::Continue)
        }
        0x02 => {
            let id = engine.read_value(slot, p1)?;
            engine.start_script(id as u16)?;
            Ok(ExecutionResult::Continue)
        }
        0x03 => {
            let n = engine.read_value(slot, p1)? as usize;
            if Some(n) == engine.current_slot() {
                return Ok(ExecutionResult::Terminate);
            }
            engine.kill_slot(n)?;
            Ok(ExecutionResult::Continue)
        }
        0x04 => {
            engine.stop_all_but_current();
            Ok(ExecutionResult::Continue)
        }
        0x05 => {
            let actor = engine.read_value(slot, p1)?;
            let x = engine.read_value(slot, false)?;
            let y = engine.read_value(slot, false)?;
            engine.walk_actor_to(actor, x, y)?;
            Ok(ExecutionResult::Continue)
        }
        0x06 => {
            let actor = engine.read_value(slot, p1)?;
            let other = engine.read_value(slot, false)?;
            engine.face_actor(actor, other)?;
            Ok(ExecutionResult::Continue)
        }
        0x07 => {
            let actor = engine.read_value(slot, p1)?;
            let x = engine.read_value(slot, false)?;
            let y = engine.read_value(slot, false)?;
            engine.face_actor_toward_point(actor, x, y)?;
            Ok(ExecutionResult::Continue)
        }
        0x08 => {
            let actor = engine.read_value(slot, p1)?;
            let anim = engine.read_value(slot, false)?;
            engine.animate_actor(actor, anim)?;
            Ok(ExecutionResult::Continue)
        }
        0x09 => {
            let actor = engine.read_value(slot, p1)?;
            let flag = engine.read_value(slot, false)?;
            engine.freeze_actor(actor, flag != 0)?;
            Ok(ExecutionResult::Continue)
        }
        0x0A => {
            let dest = engine.read_dest_addr(slot)?;
            let value = engine.read_value(slot, p1)?;
            engine.write_var(slot, dest, value)?;
            Ok(ExecutionResult::Continue)
        }
        0x0B..=0x0E => {
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
        0x0F => {
            let dest = engine.read_dest_addr(slot)?;
            let v = engine.read_var(slot, dest)?;
            engine.write_var(slot, dest, v.wrapping_add(1))?;
            Ok(ExecutionResult::Continue)
        }
        0x10 => {
            let dest = engine.read_dest_addr(slot)?;
            let v = engine.read_var(slot, dest)?;
            engine.write_var(slot, dest, v.wrapping_sub(1))?;
            Ok(ExecutionResult::Continue)
        }
        0x11 => {
            let offset = fetch_offset(slot)?;
            slot.jump_relative(offset).map_err(ExecError::Slot)?;
            Ok(ExecutionResult::Continue)
        }
        // comparisons: left is always a variable in this dialect
        0x12..=0x15 => {
            let left_addr = engine.read_dest_addr(slot)?;
            let left = engine.read_var(slot, left_addr)?;
            let right = engine.read_value(slot, p1)?;
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
        0x16 => {
            let dest = engine.read_dest_addr(slot)?;
            let max = engine.read_value(slot, p1)?;
            let value = engine.rng.gen_range_inclusive(max);
            engine.write_var(slot, dest, value)?;
            Ok(ExecutionResult::Continue)
        }
        0x17 => Ok(ExecutionResult::Yield),
        0x18 => {
            let actor = engine.read_value(slot, p1)?;
            if engine.is_actor_moving(actor)? {
                slot.cursor = op_start;
                return Ok(ExecutionResult::Yield);
            }
            Ok(ExecutionResult::Continue)
        }
        0x19 | 0x1A => {
            let _ = engine.read_value(slot, p1)?;
            Ok(ExecutionResult::Continue)
        }
        0x1B => {
            let _sub = slot.fetch_byte().map_err(ExecError::Slot)?;
            let _ = engine.read_value(slot, p1)?;
            Ok(ExecutionResult::Continue)
        }
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
