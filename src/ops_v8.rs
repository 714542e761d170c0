/// Stack dialect handlers (V6, V7, V8).
///
/// Single-byte opcodes over an explicit value stack. Operands are pushed by
/// earlier instructions and popped here, last operand first. Literal width
/// follows the version (16-bit until V8 went 32-bit). waitForActor carries
/// an embedded back-offset that re-runs the whole push sequence next tick,
/// so the busy-poll survives save and restore byte-exactly.
use log::debug;

use crate::interpreter::{Engine, ExecError, ExecutionResult};
use crate::opcode_tables::get_stack_opcode_name;
use crate::ops_v5::fetch_offset;
use crate::script::ScriptSlot;

pub fn execute(
    engine: &mut Engine,
    slot: &mut ScriptSlot,
    opcode: u8,
    op_start: usize,
) -> Result<ExecutionResult, ExecError> {
    debug!(
        "slot script {} @{:04x}: {:02x} {} (depth {})",
        slot.script_id,
        op_start,
        opcode,
        get_stack_opcode_name(opcode),
        engine.stack_depth()
    );

    match opcode {
        // pushWord literal
        0x00 => {
            let v = slot
                .fetch_word(engine.version().operand_width())
                .map_err(ExecError::Slot)?;
            engine.push(v)?;
            Ok(ExecutionResult::Continue)
        }
        // pushVar addr
        0x01 => {
            let addr = slot
                .fetch_addr(engine.version().addr_width())
                .map_err(ExecError::Slot)?;
            let v = engine.read_var(slot, addr)?;
            engine.push(v)?;
            Ok(ExecutionResult::Continue)
        }
        0x02 => {
            let v = engine.pop()?;
            engine.push(v)?;
            engine.push(v)?;
            Ok(ExecutionResult::Continue)
        }
        0x03 => {
            engine.pop()?;
            Ok(ExecutionResult::Continue)
        }
        // binary arithmetic, right operand on top
        0x04..=0x07 => {
            let b = engine.pop()?;
            let a = engine.pop()?;
            let v = match opcode {
                0x04 => a.wrapping_add(b),
                0x05 => a.wrapping_sub(b),
                0x06 => a.wrapping_mul(b),
                0x07 => {
                    if b == 0 {
                        return Err(ExecError::Slot(format!(
                            "Division by zero in script {}",
                            slot.script_id
                        )));
                    }
                    a / b
                }
                _ => unreachable!(),
            };
            engine.push(v)?;
            Ok(ExecutionResult::Continue)
        }
        // comparisons push 1 or 0
        0x08..=0x0B => {
            let b = engine.pop()?;
            let a = engine.pop()?;
            let v = match opcode {
                0x08 => a == b,
                0x09 => a != b,
                0x0A => a < b,
                0x0B => a >= b,
                _ => unreachable!(),
            };
            engine.push(v as i32)?;
            Ok(ExecutionResult::Continue)
        }
        0x0C => {
            let v = engine.pop()?;
            engine.push((v == 0) as i32)?;
            Ok(ExecutionResult::Continue)
        }
        0x0D => {
            let offset = fetch_offset(slot)?;
            slot.jump_relative(offset).map_err(ExecError::Slot)?;
            Ok(ExecutionResult::Continue)
        }
        // jumpIfNot: offset in the stream, condition on the stack
        0x0E => {
            let offset = fetch_offset(slot)?;
            let cond = engine.pop()?;
            if cond == 0 {
                slot.jump_relative(offset).map_err(ExecError::Slot)?;
            }
            Ok(ExecutionResult::Continue)
        }
        0x0F => {
            let addr = slot
                .fetch_addr(engine.version().addr_width())
                .map_err(ExecError::Slot)?;
            let v = engine.pop()?;
            engine.write_var(slot, addr, v)?;
            Ok(ExecutionResult::Continue)
        }
        0x10 | 0x11 => {
            let addr = slot
                .fetch_addr(engine.version().addr_width())
                .map_err(ExecError::Slot)?;
            let v = engine.read_var(slot, addr)?;
            let v = if opcode == 0x10 {
                v.wrapping_add(1)
            } else {
                v.wrapping_sub(1)
            };
            engine.write_var(slot, addr, v)?;
            Ok(ExecutionResult::Continue)
        }
        0x12 => Ok(ExecutionResult::Terminate),
        0x13 => Ok(ExecutionResult::Yield),
        0x14 => {
            let id = engine.pop()?;
            engine.start_script(id as u16)?;
            Ok(ExecutionResult::Continue)
        }
        0x15 => {
            let n = engine.pop()? as usize;
            if Some(n) == engine.current_slot() {
                return Ok(ExecutionResult::Terminate);
            }
            engine.kill_slot(n)?;
            Ok(ExecutionResult::Continue)
        }
        0x16 => {
            engine.stop_all_but_current();
            Ok(ExecutionResult::Continue)
        }
        0x17 => {
            let y = engine.pop()?;
            let x = engine.pop()?;
            let actor = engine.pop()?;
            engine.put_actor(actor, x, y)?;
            Ok(ExecutionResult::Continue)
        }
        0x18 => {
            let y = engine.pop()?;
            let x = engine.pop()?;
            let actor = engine.pop()?;
            engine.walk_actor_to(actor, x, y)?;
            Ok(ExecutionResult::Continue)
        }
        0x19 => {
            let other = engine.pop()?;
            let actor = engine.pop()?;
            engine.face_actor(actor, other)?;
            Ok(ExecutionResult::Continue)
        }
        0x1A => {
            let y = engine.pop()?;
            let x = engine.pop()?;
            let actor = engine.pop()?;
            engine.face_actor_toward_point(actor, x, y)?;
            Ok(ExecutionResult::Continue)
        }
        0x1B => {
            let anim = engine.pop()?;
            let actor = engine.pop()?;
            engine.animate_actor(actor, anim)?;
            Ok(ExecutionResult::Continue)
        }
        0x1C => {
            let flag = engine.pop()?;
            let actor = engine.pop()?;
            engine.freeze_actor(actor, flag != 0)?;
            Ok(ExecutionResult::Continue)
        }
        0x1D => {
            let max = engine.pop()?;
            let v = engine.rng.gen_range_inclusive(max);
            engine.push(v)?;
            Ok(ExecutionResult::Continue)
        }
        // waitForActor: actor on the stack, back-offset in the stream; when
        // still moving, jump back over the pushes and yield
        0x1E => {
            let actor = engine.pop()?;
            let offset = fetch_offset(slot)?;
            if engine.is_actor_moving(actor)? {
                slot.jump_relative(offset).map_err(ExecError::Slot)?;
                return Ok(ExecutionResult::Yield);
            }
            Ok(ExecutionResult::Continue)
        }
        // startSound / soundKludge: deliberate no-ops, operand consumed
        0x1F | 0x20 => {
            engine.pop()?;
            Ok(ExecutionResult::Continue)
        }
        _ => Err(ExecError::Slot(format!(
            "Unknown opcode {:02x} in script {} at {:04x}",
            opcode, slot.script_id, op_start
        ))),
    }
}
