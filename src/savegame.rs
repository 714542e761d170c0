//! Ordered field-by-field save state.
//!
//! Every mutable field is synced through one `Serializer` in a fixed order,
//! each tagged with the save-format version that introduced it. Loading an
//! older save simply skips newer fields, leaving them at their freshly
//! initialized defaults, so the format stays backward compatible without
//! per-field presence flags. The caller must have built the engine against
//! the same scripts and room before restoring.

use log::debug;

use crate::actor::{Actor, QuantWalkData, WalkData};
use crate::boxes::Point;
use crate::interpreter::Engine;
use crate::script::{ScriptSlot, SlotStatus};
use crate::vars::VariableStore;

pub const SAVE_MAGIC: [u8; 4] = *b"MANS";
pub const CURRENT_SAVE_VERSION: u32 = 3;

enum Mode<'a> {
    Saving(&'a mut Vec<u8>),
    Loading { data: &'a [u8], pos: usize },
}

pub struct Serializer<'a> {
    mode: Mode<'a>,
    version: u32,
}

impl<'a> Serializer<'a> {
    /// Writes the header and syncs at the current format version
    pub fn saving(out: &'a mut Vec<u8>) -> Serializer<'a> {
        out.extend_from_slice(&SAVE_MAGIC);
        out.extend_from_slice(&CURRENT_SAVE_VERSION.to_le_bytes());
        Serializer {
            mode: Mode::Saving(out),
            version: CURRENT_SAVE_VERSION,
        }
    }

    /// Validates the header and syncs at the save's recorded version
    pub fn loading(data: &'a [u8]) -> Result<Serializer<'a>, String> {
        if data.len() < 8 {
            return Err(format!("Save data too short: {} bytes", data.len()));
        }
        if data[0..4] != SAVE_MAGIC {
            return Err("Bad save magic".to_string());
        }
        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version > CURRENT_SAVE_VERSION {
            return Err(format!(
                "Save version {} is newer than supported version {}",
                version, CURRENT_SAVE_VERSION
            ));
        }
        debug!("loading save version {}", version);
        Ok(Serializer {
            mode: Mode::Loading { data, pos: 8 },
            version,
        })
    }

    pub fn is_saving(&self) -> bool {
        matches!(self.mode, Mode::Saving(_))
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    fn sync_bytes(&mut self, buf: &mut [u8], since: u32) -> Result<(), String> {
        if self.version < since {
            return Ok(());
        }
        match &mut self.mode {
            Mode::Saving(out) => {
                out.extend_from_slice(buf);
                Ok(())
            }
            Mode::Loading { data, pos } => {
                let end = *pos + buf.len();
                if end > data.len() {
                    return Err(format!(
                        "Save data truncated at offset {} (wanted {} bytes)",
                        pos,
                        buf.len()
                    ));
                }
                buf.copy_from_slice(&data[*pos..end]);
                *pos = end;
                Ok(())
            }
        }
    }

    pub fn sync_u8(&mut self, v: &mut u8, since: u32) -> Result<(), String> {
        let mut buf = [*v];
        self.sync_bytes(&mut buf, since)?;
        *v = buf[0];
        Ok(())
    }

    pub fn sync_bool(&mut self, v: &mut bool, since: u32) -> Result<(), String> {
        let mut b = *v as u8;
        self.sync_u8(&mut b, since)?;
        *v = b != 0;
        Ok(())
    }

    pub fn sync_u16(&mut self, v: &mut u16, since: u32) -> Result<(), String> {
        let mut buf = v.to_le_bytes();
        self.sync_bytes(&mut buf, since)?;
        *v = u16::from_le_bytes(buf);
        Ok(())
    }

    pub fn sync_i32(&mut self, v: &mut i32, since: u32) -> Result<(), String> {
        let mut buf = v.to_le_bytes();
        self.sync_bytes(&mut buf, since)?;
        *v = i32::from_le_bytes(buf);
        Ok(())
    }

    pub fn sync_u64(&mut self, v: &mut u64, since: u32) -> Result<(), String> {
        let mut buf = v.to_le_bytes();
        self.sync_bytes(&mut buf, since)?;
        *v = u64::from_le_bytes(buf);
        Ok(())
    }
}

/// A piece of engine state that writes itself through a serializer
pub trait SyncState {
    fn sync_state(&mut self, s: &mut Serializer) -> Result<(), String>;
}

impl SyncState for Point {
    fn sync_state(&mut self, s: &mut Serializer) -> Result<(), String> {
        s.sync_i32(&mut self.x, 1)?;
        s.sync_i32(&mut self.y, 1)
    }
}

impl SyncState for WalkData {
    fn sync_state(&mut self, s: &mut Serializer) -> Result<(), String> {
        self.cur.sync_state(s)?;
        self.next.sync_state(s)?;
        self.dest.sync_state(s)?;
        s.sync_u8(&mut self.dest_box, 1)?;
        s.sync_u8(&mut self.next_box, 1)?;
        s.sync_i32(&mut self.dest_facing, 1)?;
        s.sync_i32(&mut self.delta_x_factor, 1)?;
        s.sync_i32(&mut self.delta_y_factor, 1)?;
        s.sync_i32(&mut self.x_frac, 1)?;
        s.sync_i32(&mut self.y_frac, 1)
    }
}

impl SyncState for QuantWalkData {
    // The quantized counters were not saved by the first format revision
    fn sync_state(&mut self, s: &mut Serializer) -> Result<(), String> {
        s.sync_i32(&mut self.x_count_inc, 2)?;
        s.sync_i32(&mut self.y_count_inc, 2)?;
        s.sync_i32(&mut self.x_count, 2)?;
        s.sync_i32(&mut self.y_count, 2)?;
        s.sync_i32(&mut self.modulo, 2)?;
        s.sync_bool(&mut self.y_count_greater_than_x_count, 2)
    }
}

impl SyncState for Actor {
    fn sync_state(&mut self, s: &mut Serializer) -> Result<(), String> {
        s.sync_u8(&mut self.id, 1)?;
        self.pos.sync_state(s)?;
        s.sync_u8(&mut self.walkbox, 1)?;
        self.dest.sync_state(s)?;
        s.sync_u8(&mut self.dest_box, 1)?;
        s.sync_i32(&mut self.facing, 1)?;
        s.sync_i32(&mut self.target_facing, 1)?;
        s.sync_u8(&mut self.moving, 1)?;
        s.sync_i32(&mut self.speed_x, 1)?;
        s.sync_i32(&mut self.speed_y, 1)?;
        s.sync_bool(&mut self.is_player, 1)?;
        s.sync_bool(&mut self.in_room, 1)?;
        self.walkdata.sync_state(s)?;
        self.quant.sync_state(s)
    }
}

impl SyncState for VariableStore {
    fn sync_state(&mut self, s: &mut Serializer) -> Result<(), String> {
        let mut count = self.num_globals() as u16;
        s.sync_u16(&mut count, 1)?;
        if count as usize != self.num_globals() {
            return Err(format!(
                "Save has {} globals, engine expects {}",
                count,
                self.num_globals()
            ));
        }
        for v in self.globals_mut() {
            s.sync_i32(v, 1)?;
        }
        let mut bit_count = self.bits().len() as u16;
        s.sync_u16(&mut bit_count, 1)?;
        if bit_count as usize != self.bits().len() {
            return Err(format!(
                "Save has {} bit-vars, engine expects {}",
                bit_count,
                self.bits().len()
            ));
        }
        for i in 0..self.bits().len() {
            let mut bit = self.bits()[i];
            s.sync_bool(&mut bit, 1)?;
            self.bits_mut().set(i, bit);
        }
        Ok(())
    }
}

impl SyncState for ScriptSlot {
    fn sync_state(&mut self, s: &mut Serializer) -> Result<(), String> {
        s.sync_u16(&mut self.script_id, 1)?;
        let mut status = match self.status {
            SlotStatus::Free => 0u8,
            SlotStatus::Running => 1,
            SlotStatus::Dead => 2,
        };
        s.sync_u8(&mut status, 1)?;
        self.status = match status {
            0 => SlotStatus::Free,
            1 => SlotStatus::Running,
            2 => SlotStatus::Dead,
            other => return Err(format!("Bad slot status {} in save", other)),
        };
        let mut cursor = self.cursor as u64;
        s.sync_u64(&mut cursor, 1)?;
        self.cursor = cursor as usize;
        for local in self.locals.iter_mut() {
            s.sync_i32(local, 1)?;
        }
        Ok(())
    }
}

/// Serialize the engine's mutable state
pub fn save_engine(engine: &mut Engine) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    let mut s = Serializer::saving(&mut out);
    sync_engine(engine, &mut s)?;
    Ok(out)
}

/// Restore state saved by `save_engine` into an engine built against the
/// same scripts, room and actor roster
pub fn restore_engine(engine: &mut Engine, data: &[u8]) -> Result<(), String> {
    let mut s = Serializer::loading(data)?;
    sync_engine(engine, &mut s)?;
    // Code bytes are not saved; running slots re-bind from the bank
    for i in 0..engine.slots().len() {
        let (id, running) = {
            let slot = &engine.slots()[i];
            (slot.script_id, slot.status == SlotStatus::Running)
        };
        if running {
            let code = engine.bank().script(id)?;
            let slot = &mut engine.slots_mut()[i];
            slot.code = code;
            if slot.cursor > slot.code.len() {
                return Err(format!(
                    "Restored cursor {} past end of script {} ({} bytes)",
                    slot.cursor,
                    id,
                    slot.code.len()
                ));
            }
        }
    }
    Ok(())
}

fn sync_engine(engine: &mut Engine, s: &mut Serializer) -> Result<(), String> {
    let mut tick = engine.tick_count();
    s.sync_u64(&mut tick, 3)?;
    engine.set_tick_count(tick);

    // The value stack was added to the format with revision 2
    let mut depth = engine.stack_depth() as u16;
    s.sync_u16(&mut depth, 2)?;
    if s.is_saving() {
        let copy: Vec<i32> = engine.stack().to_vec();
        for mut v in copy {
            s.sync_i32(&mut v, 2)?;
        }
    } else if s.version() >= 2 {
        engine.stack_mut().clear();
        for _ in 0..depth {
            let mut v = 0i32;
            s.sync_i32(&mut v, 2)?;
            engine.stack_mut().push(v);
        }
    }

    engine.vars.sync_state(s)?;

    let mut actor_count = engine.actors.len() as u16;
    s.sync_u16(&mut actor_count, 1)?;
    if actor_count as usize != engine.actors.len() {
        return Err(format!(
            "Save has {} actors, engine has {}",
            actor_count,
            engine.actors.len()
        ));
    }
    for actor in engine.actors.iter_mut() {
        actor.sync_state(s)?;
    }

    let mut slot_count = engine.slots().len() as u16;
    s.sync_u16(&mut slot_count, 1)?;
    if slot_count as usize != engine.slots().len() {
        return Err(format!(
            "Save has {} slots, engine has {}",
            slot_count,
            engine.slots().len()
        ));
    }
    for slot in engine.slots_mut().iter_mut() {
        slot.sync_state(s)?;
    }
    Ok(())
}
