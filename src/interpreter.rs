use log::{debug, warn};

use crate::actor::{angle_from_delta, Actor, OLD_DIR_TO_NEW_DIR, MF_TURN};
use crate::boxes::{BoxGraph, Point};
use crate::costume::{CostumeAnimator, NullAnimator};
use crate::path::{adjust_point_to_nearest_box, BoxMatrix, NO_BOX};
use crate::room::RoomPlan;
use crate::script::{ScriptBank, ScriptSlot, SlotStatus, NUM_SLOTS};
use crate::srand::SRand;
use crate::vars::VariableStore;
use crate::version::{Dialect, ScummVersion, WalkVariant};
use crate::{ops_v0, ops_v2, ops_v5, ops_v8, walk, walk_v0};

/// Result of executing one instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Continue with the next instruction in this slot
    Continue,
    /// Slot gives up the rest of its tick (breakHere, wait re-arm)
    Yield,
    /// Slot is finished; mark dead
    Terminate,
}

/// How far an execution error reaches
#[derive(Debug, Clone)]
pub enum ExecError {
    /// Kills only the current script slot
    Slot(String),
    /// Aborts the whole run; state is no longer trustworthy
    Fatal(String),
}

impl ExecError {
    pub fn message(&self) -> &str {
        match self {
            ExecError::Slot(m) | ExecError::Fatal(m) => m,
        }
    }
}

/// Shared value stack depth for the stack dialects
pub const STACK_LIMIT: usize = 256;

/// A script must break within this many instructions per tick
pub const TICK_INSTRUCTION_QUOTA: u32 = 10_000;

/// The interpreter core: variable store, script slots, actors and the
/// current room's walk geometry, advanced one tick at a time.
pub struct Engine {
    version: ScummVersion,
    pub vars: VariableStore,
    pub actors: Vec<Actor>,
    slots: Vec<ScriptSlot>,
    graph: BoxGraph,
    matrix: BoxMatrix,
    bank: Box<dyn ScriptBank>,
    pub rng: SRand,
    animator: Box<dyn CostumeAnimator>,
    stack: Vec<i32>,
    /// Slot currently being stepped; its array entry is a placeholder
    current_slot: Option<usize>,
    tick_count: u64,
}

impl Engine {
    pub fn new(version: ScummVersion, bank: Box<dyn ScriptBank>) -> Engine {
        let graph = BoxGraph::new(Vec::new(), version);
        Engine {
            version,
            vars: VariableStore::new(version),
            actors: Vec::new(),
            slots: (0..NUM_SLOTS).map(|_| ScriptSlot::free()).collect(),
            matrix: BoxMatrix::empty(&graph),
            graph,
            bank,
            rng: SRand::new_uniform(),
            animator: Box::new(NullAnimator),
            stack: Vec::new(),
            current_slot: None,
            tick_count: 0,
        }
    }

    pub fn version(&self) -> ScummVersion {
        self.version
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub(crate) fn set_tick_count(&mut self, t: u64) {
        self.tick_count = t;
    }

    pub(crate) fn bank(&self) -> &dyn ScriptBank {
        self.bank.as_ref()
    }

    pub fn set_animator(&mut self, animator: Box<dyn CostumeAnimator>) {
        self.animator = animator;
    }

    pub fn graph(&self) -> &BoxGraph {
        &self.graph
    }

    pub fn slots(&self) -> &[ScriptSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [ScriptSlot] {
        &mut self.slots
    }

    pub fn set_room(&mut self, plan: &RoomPlan) -> Result<(), String> {
        let (graph, matrix) = plan.load(self.version)?;
        self.graph = graph;
        self.matrix = matrix;
        // Boxes changed under everyone's feet; stale ids must not survive
        for actor in &mut self.actors {
            actor.set_box(NO_BOX);
            actor.stop_moving();
        }
        Ok(())
    }

    pub fn add_actor(&mut self, actor: Actor) {
        self.actors.push(actor);
    }

    fn actor_index(actors: &[Actor], id: i32) -> Result<usize, ExecError> {
        actors
            .iter()
            .position(|a| a.id as i32 == id)
            .ok_or_else(|| ExecError::Slot(format!("No actor with id {}", id)))
    }

    pub fn actor(&self, id: i32) -> Result<&Actor, ExecError> {
        let idx = Engine::actor_index(&self.actors, id)?;
        Ok(&self.actors[idx])
    }

    pub fn actor_mut(&mut self, id: i32) -> Result<&mut Actor, ExecError> {
        let idx = Engine::actor_index(&self.actors, id)?;
        Ok(&mut self.actors[idx])
    }

    // -- script slot management ------------------------------------------

    /// Claim a free slot for `script_id` and set it running
    pub fn start_script(&mut self, script_id: u16) -> Result<usize, ExecError> {
        let code = self.bank.script(script_id).map_err(ExecError::Slot)?;
        let current = self.current_slot;
        let idx = self
            .slots
            .iter()
            .enumerate()
            .position(|(i, s)| s.status == SlotStatus::Free && Some(i) != current)
            .ok_or_else(|| {
                ExecError::Slot(format!(
                    "No free slot for script {} ({} slots)",
                    script_id, NUM_SLOTS
                ))
            })?;
        let slot = &mut self.slots[idx];
        slot.script_id = script_id;
        slot.status = SlotStatus::Running;
        slot.cursor = 0;
        slot.locals = [0; crate::vars::NUM_LOCALS];
        slot.code = code;
        debug!("start_script {} in slot {}", script_id, idx);
        Ok(idx)
    }

    /// Mark a slot dead; it is reclaimed on the next dispatch scan
    pub fn kill_slot(&mut self, n: usize) -> Result<(), ExecError> {
        match self.slots.get_mut(n) {
            Some(slot) => {
                if slot.status == SlotStatus::Running {
                    debug!("kill_slot {}: script {}", n, slot.script_id);
                    slot.status = SlotStatus::Dead;
                }
                Ok(())
            }
            None => Err(ExecError::Slot(format!(
                "stopScript: slot {} out of range",
                n
            ))),
        }
    }

    pub(crate) fn current_slot(&self) -> Option<usize> {
        self.current_slot
    }

    pub fn stop_all_but_current(&mut self) {
        let keep = self.current_slot;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if Some(i) != keep && slot.status == SlotStatus::Running {
                debug!("stop_all_but_current kills slot {}", i);
                slot.status = SlotStatus::Dead;
            }
        }
    }

    // -- operand plumbing -------------------------------------------------

    /// One value operand: a variable read or a literal word, chosen by the
    /// dialect's parameter bit
    pub(crate) fn read_value(
        &self,
        slot: &mut ScriptSlot,
        is_var: bool,
    ) -> Result<i32, ExecError> {
        if is_var {
            let addr = slot
                .fetch_addr(self.version.addr_width())
                .map_err(ExecError::Slot)?;
            // Addressing violations poison the whole decode path
            self.vars.read(addr, &slot.locals).map_err(ExecError::Fatal)
        } else {
            slot.fetch_word(self.version.operand_width())
                .map_err(ExecError::Slot)
        }
    }

    /// Destination operand: always a raw variable address
    pub(crate) fn read_dest_addr(&self, slot: &mut ScriptSlot) -> Result<u32, ExecError> {
        slot.fetch_addr(self.version.addr_width())
            .map_err(ExecError::Slot)
    }

    pub(crate) fn read_var(&self, slot: &ScriptSlot, addr: u32) -> Result<i32, ExecError> {
        self.vars.read(addr, &slot.locals).map_err(ExecError::Fatal)
    }

    pub(crate) fn write_var(
        &mut self,
        slot: &mut ScriptSlot,
        addr: u32,
        value: i32,
    ) -> Result<(), ExecError> {
        self.vars
            .write(addr, value, &mut slot.locals)
            .map_err(ExecError::Fatal)
    }

    // -- value stack (V6+) ------------------------------------------------

    pub(crate) fn push(&mut self, value: i32) -> Result<(), ExecError> {
        if self.stack.len() >= STACK_LIMIT {
            return Err(ExecError::Fatal(format!(
                "Value stack overflow (limit {})",
                STACK_LIMIT
            )));
        }
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<i32, ExecError> {
        self.stack
            .pop()
            .ok_or_else(|| ExecError::Fatal("Value stack underflow".to_string()))
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn stack(&self) -> &[i32] {
        &self.stack
    }

    pub(crate) fn stack_mut(&mut self) -> &mut Vec<i32> {
        &mut self.stack
    }

    // -- actor effects shared by every dialect ----------------------------

    pub fn put_actor(&mut self, id: i32, x: i32, y: i32) -> Result<(), ExecError> {
        let idx = Engine::actor_index(&self.actors, id)?;
        let actor = &mut self.actors[idx];
        actor.stop_moving();
        if self.graph.num_boxes() > 0 {
            let (snapped, box_id) =
                adjust_point_to_nearest_box(&self.graph, Point::new(x, y), actor.is_player)
                    .map_err(ExecError::Slot)?;
            actor.pos = snapped;
            actor.set_box(box_id);
        } else {
            actor.pos = Point::new(x, y);
            actor.set_box(NO_BOX);
        }
        debug!("putActor {} at {}", id, actor.pos);
        Ok(())
    }

    pub(crate) fn walk_actor_to(&mut self, id: i32, x: i32, y: i32) -> Result<(), ExecError> {
        let idx = Engine::actor_index(&self.actors, id)?;
        walk::start_walk(
            &mut self.actors[idx],
            &self.graph,
            Point::new(x, y),
            None,
        )
        .map_err(ExecError::Slot)
    }

    pub(crate) fn face_actor_toward_point(&mut self, id: i32, x: i32, y: i32) -> Result<(), ExecError> {
        let dir_count = self.version.dir_count();
        let actor = self.actor_mut(id)?;
        let dx = x - actor.pos.x;
        let dy = y - actor.pos.y;
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        actor.target_facing = angle_from_delta(dir_count, dx, dy);
        actor.moving |= MF_TURN;
        Ok(())
    }

    pub(crate) fn face_actor(&mut self, id: i32, other: i32) -> Result<(), ExecError> {
        let target = self.actor(other)?.pos;
        self.face_actor_toward_point(id, target.x, target.y)
    }

    /// Animation values 0..3 are facing requests in old-direction indexes;
    /// anything else is a frame advance handed to the animator
    pub(crate) fn animate_actor(&mut self, id: i32, anim: i32) -> Result<(), ExecError> {
        let actor_idx = Engine::actor_index(&self.actors, id)?;
        if (0..4).contains(&anim) {
            let actor = &mut self.actors[actor_idx];
            actor.target_facing = OLD_DIR_TO_NEW_DIR[anim as usize];
            actor.moving |= MF_TURN;
        } else {
            self.animator.on_walk_frame(self.actors[actor_idx].id);
        }
        Ok(())
    }

    pub(crate) fn freeze_actor(&mut self, id: i32, frozen: bool) -> Result<(), ExecError> {
        self.actor_mut(id)?.freeze(frozen);
        Ok(())
    }

    pub(crate) fn is_actor_moving(&self, id: i32) -> Result<bool, ExecError> {
        Ok(self.actor(id)?.is_moving())
    }

    // -- tick loop --------------------------------------------------------

    /// Decode and execute one instruction of `slot`
    fn step_slot(
        &mut self,
        slot: &mut ScriptSlot,
    ) -> Result<ExecutionResult, ExecError> {
        let op_start = slot.cursor;
        let opcode = slot.fetch_byte().map_err(ExecError::Slot)?;
        match self.version.dialect() {
            Dialect::V0 => ops_v0::execute(self, slot, opcode, op_start),
            Dialect::Early => ops_v2::execute(self, slot, opcode, op_start),
            Dialect::Mid => ops_v5::execute(self, slot, opcode, op_start),
            Dialect::Stack => ops_v8::execute(self, slot, opcode, op_start),
        }
    }

    /// One frame: every runnable slot steps until it yields or dies, then
    /// every actor's walk machine advances exactly once. Scripts may depend
    /// on that ordering.
    pub fn run_tick(&mut self) -> Result<(), String> {
        self.tick_count += 1;
        debug!("--- tick {} ---", self.tick_count);

        for idx in 0..self.slots.len() {
            if self.slots[idx].status == SlotStatus::Dead {
                self.slots[idx] = ScriptSlot::free();
                continue;
            }
            if !self.slots[idx].is_running() {
                continue;
            }

            let mut slot = std::mem::replace(&mut self.slots[idx], ScriptSlot::free());
            self.current_slot = Some(idx);
            let mut executed: u32 = 0;
            let mut fatal: Option<String> = None;

            loop {
                match self.step_slot(&mut slot) {
                    Ok(ExecutionResult::Continue) => {
                        executed += 1;
                        if executed >= TICK_INSTRUCTION_QUOTA {
                            fatal = Some(format!(
                                "Script {} in slot {} executed {} instructions without breaking",
                                slot.script_id, idx, TICK_INSTRUCTION_QUOTA
                            ));
                            break;
                        }
                    }
                    Ok(ExecutionResult::Yield) => break,
                    Ok(ExecutionResult::Terminate) => {
                        debug!("slot {} (script {}) terminated", idx, slot.script_id);
                        slot.status = SlotStatus::Dead;
                        break;
                    }
                    Err(ExecError::Slot(e)) => {
                        warn!(
                            "slot {} (script {}) killed: {}",
                            idx, slot.script_id, e
                        );
                        slot.status = SlotStatus::Dead;
                        break;
                    }
                    Err(ExecError::Fatal(e)) => {
                        fatal = Some(e);
                        break;
                    }
                }
            }

            self.current_slot = None;
            self.slots[idx] = slot;
            if let Some(e) = fatal {
                return Err(e);
            }
        }

        for actor in &mut self.actors {
            match self.version.walk_variant() {
                WalkVariant::Continuous => walk::walk_actor_tick(
                    actor,
                    &self.graph,
                    &self.matrix,
                    self.version,
                    self.animator.as_mut(),
                )?,
                WalkVariant::Quantized => walk_v0::walk_actor_tick(
                    actor,
                    &self.graph,
                    self.version,
                    self.animator.as_mut(),
                )?,
            }
        }

        Ok(())
    }

    /// Run ticks until no script is running and no actor is moving, with a
    /// bound for tests and demos
    pub fn run_until_idle(&mut self, max_ticks: u32) -> Result<u32, String> {
        for n in 0..max_ticks {
            if !self.slots.iter().any(|s| s.is_running())
                && !self.actors.iter().any(|a| a.is_moving())
            {
                return Ok(n);
            }
            self.run_tick()?;
        }
        Err(format!("Engine still busy after {} ticks", max_ticks))
    }
}
