//! Engine-level dispatch tests: scripts assembled by hand, run tick by tick.

use crate::actor::Actor;
use crate::boxes::WalkBox;
use crate::interpreter::{Engine, TICK_INSTRUCTION_QUOTA};
use crate::room::RoomPlan;
use crate::script::{MemoryScriptBank, SlotStatus};
use crate::srand::SRand;
use crate::version::ScummVersion;

use test_log::test;

/// Little-endian 16-bit operand, the mid dialect's literal and address width
fn w(v: i32) -> [u8; 2] {
    (v as i16).to_le_bytes()
}

fn engine_with_scripts(version: ScummVersion, scripts: Vec<(u16, Vec<u8>)>) -> Engine {
    let mut bank = MemoryScriptBank::new();
    for (id, code) in scripts {
        bank.insert(id, code);
    }
    let mut engine = Engine::new(version, Box::new(bank));
    engine.rng = SRand::new_predictable(7);
    engine
}

fn engine_with_room(version: ScummVersion, scripts: Vec<(u16, Vec<u8>)>) -> Engine {
    let mut engine = engine_with_scripts(version, scripts);
    let plan = RoomPlan::new(
        vec![WalkBox::rect(0, 0, 100, 100), WalkBox::rect(100, 0, 200, 100)],
        320,
        200,
    );
    engine.set_room(&plan).unwrap();
    let mut hero = Actor::new(1);
    hero.is_player = true;
    engine.add_actor(hero);
    engine.put_actor(1, 50, 50).unwrap();
    engine
}

fn locals() -> [i32; crate::vars::NUM_LOCALS] {
    [0; crate::vars::NUM_LOCALS]
}

// -- mid dialect ----------------------------------------------------------

#[test]
fn test_move_literal_and_variable() {
    // move var10, 99; move var11, var10 (param bit selects variable); stop
    let mut code = vec![0x0A];
    code.extend(w(10));
    code.extend(w(99));
    code.push(0x0A | 0x80);
    code.extend(w(11));
    code.extend(w(10));
    code.push(0x00);

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(10, &locals()).unwrap(), 99);
    assert_eq!(e.vars.read(11, &locals()).unwrap(), 99);
    assert_eq!(e.slots()[0].status, SlotStatus::Dead);
}

#[test]
fn test_arithmetic_family() {
    // var5 = 10; add 7; subtract 2; multiply 4; divide 6 -> 10
    let mut code = vec![0x0A];
    code.extend(w(5));
    code.extend(w(10));
    for (op, v) in [(0x0B, 7), (0x0C, 2), (0x0D, 4), (0x0E, 6)] {
        code.push(op);
        code.extend(w(5));
        code.extend(w(v));
    }
    code.push(0x00);

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(5, &locals()).unwrap(), 10);
}

#[test]
fn test_division_by_zero_kills_only_that_slot() {
    let mut bad = vec![0x0E];
    bad.extend(w(5));
    bad.extend(w(0));
    bad.push(0x00);
    // The healthy script sets var20 every tick then breaks
    let mut good = vec![0x0F];
    good.extend(w(20));
    good.push(0x17);

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, bad), (2, good)]);
    e.start_script(1).unwrap();
    e.start_script(2).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.slots()[0].status, SlotStatus::Dead);
    assert!(e.slots()[1].is_running());
    assert_eq!(e.vars.read(20, &locals()).unwrap(), 1);
}

#[test]
fn test_conditional_jumps_when_false() {
    // var1 = 5; isEqual var1, 5 -> fall through, set var2 = 1; stop
    // isEqual var1, 6 would jump over the same body
    let mut code = vec![0x0A];
    code.extend(w(1));
    code.extend(w(5));
    code.push(0x12 | 0x80); // isEqual var1, literal 5
    code.extend(w(1));
    code.extend(w(5));
    code.extend(w(5)); // offset over the 5-byte move
    code.push(0x0A);
    code.extend(w(2));
    code.extend(w(1));
    code.push(0x12 | 0x80); // isEqual var1, literal 6: false -> jump
    code.extend(w(1));
    code.extend(w(6));
    code.extend(w(5));
    code.push(0x0A); // skipped
    code.extend(w(3));
    code.extend(w(1));
    code.push(0x00);

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(2, &locals()).unwrap(), 1, "true path executed");
    assert_eq!(e.vars.read(3, &locals()).unwrap(), 0, "false path skipped");
}

#[test]
fn test_break_here_yields_until_next_tick() {
    // increment var1; breakHere; increment var1; stop
    let mut code = vec![0x0F];
    code.extend(w(1));
    code.push(0x17);
    code.push(0x0F);
    code.extend(w(1));
    code.push(0x00);

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(1, &locals()).unwrap(), 1);
    assert!(e.slots()[0].is_running());
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(1, &locals()).unwrap(), 2);
    assert_eq!(e.slots()[0].status, SlotStatus::Dead);
}

#[test]
fn test_wait_for_actor_busy_polls_with_cursor_rollback() {
    // walkActorTo 1, 150, 50; waitForActor 1; move var1, 1; stop
    let mut code = vec![0x05];
    code.extend(w(1));
    code.extend(w(150));
    code.extend(w(50));
    let wait_offset = code.len();
    code.push(0x18);
    code.extend(w(1));
    code.push(0x0A);
    code.extend(w(1));
    code.extend(w(1));
    code.push(0x00);

    let mut e = engine_with_room(ScummVersion::V5, vec![(1, code)]);
    e.start_script(1).unwrap();

    e.run_tick().unwrap();
    // Blocked on the wait: cursor rolled back to the wait opcode itself
    assert_eq!(e.slots()[0].cursor, wait_offset);
    assert!(e.actor(1).unwrap().is_moving());
    assert_eq!(e.vars.read(1, &locals()).unwrap(), 0);

    for _ in 0..60 {
        e.run_tick().unwrap();
        if e.slots()[0].status == SlotStatus::Dead {
            break;
        }
        assert_eq!(e.slots()[0].cursor, wait_offset, "re-armed every tick");
    }
    assert_eq!(e.slots()[0].status, SlotStatus::Dead);
    assert!(!e.actor(1).unwrap().is_moving());
    assert_eq!(e.actor(1).unwrap().pos.x, 150);
    assert_eq!(e.vars.read(1, &locals()).unwrap(), 1, "wait released");
}

#[test]
fn test_stop_all_but_current() {
    // Script 1 breaks forever; script 2 kills everyone else then stops
    let bystander = vec![0x17];
    let killer = vec![0x04, 0x00];

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, bystander), (2, killer)]);
    e.start_script(1).unwrap();
    e.start_script(2).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.slots()[0].status, SlotStatus::Dead, "bystander killed");
    assert_eq!(e.slots()[1].status, SlotStatus::Dead, "killer ran to its stop");
}

#[test]
fn test_stop_script_by_slot_number() {
    let bystander = vec![0x17];
    // stopScript slot 0; breakHere
    let mut killer = vec![0x03];
    killer.extend(w(0));
    killer.push(0x17);

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, bystander), (2, killer)]);
    e.start_script(1).unwrap();
    e.start_script(2).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.slots()[0].status, SlotStatus::Dead);
    assert!(e.slots()[1].is_running());
    // Dead slot is reclaimed on the next scan
    e.run_tick().unwrap();
    assert_eq!(e.slots()[0].status, SlotStatus::Free);
}

#[test]
fn test_stop_script_on_own_slot_terminates() {
    let mut code = vec![0x03];
    code.extend(w(0));
    code.push(0x17); // never reached

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.slots()[0].status, SlotStatus::Dead);
}

#[test]
fn test_start_script_spawns_second_slot() {
    // Script 1 starts script 2 then stops; script 2 increments var1 forever
    let mut spawner = vec![0x02];
    spawner.extend(w(2));
    spawner.push(0x00);
    let mut worker = vec![0x0F];
    worker.extend(w(1));
    worker.push(0x17);

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, spawner), (2, worker)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert!(e.slots()[1].is_running());
    assert_eq!(e.slots()[1].script_id, 2);
    // Spawned mid-scan, so the worker already ran this tick
    assert_eq!(e.vars.read(1, &locals()).unwrap(), 1);
}

#[test]
fn test_unknown_opcode_kills_only_its_slot() {
    let bad = vec![0x1F]; // masked 0x1F has no handler in the mid dialect
    let good = vec![0x17];

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, bad), (2, good)]);
    e.start_script(1).unwrap();
    e.start_script(2).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.slots()[0].status, SlotStatus::Dead);
    assert!(e.slots()[1].is_running());
}

#[test]
fn test_noop_allow_list_opcodes_run_clean() {
    // startSound 3; stopSound 3; resourceRoutines sub=1 id=2; cursorCommand sub=5
    let mut code = vec![0x19];
    code.extend(w(3));
    code.push(0x1A);
    code.extend(w(3));
    code.push(0x1B);
    code.push(0x01);
    code.extend(w(2));
    code.push(0x1C);
    code.push(0x05);
    code.push(0x00);

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.slots()[0].status, SlotStatus::Dead, "ran to its stop");
}

#[test]
fn test_runaway_script_hits_quota() {
    // jump back to self forever, never breaking
    let mut code = vec![0x11];
    code.extend(w(-3));

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, code)]);
    e.start_script(1).unwrap();
    let err = e.run_tick().unwrap_err();
    assert!(err.contains(&TICK_INSTRUCTION_QUOTA.to_string()), "{}", err);
}

#[test]
fn test_addressing_violation_is_fatal_for_the_run() {
    // move var3000, 1: past the 800 mid-dialect globals
    let mut bad = vec![0x0A];
    bad.extend(w(3000));
    bad.extend(w(1));
    let good = vec![0x17];

    let mut e = engine_with_scripts(ScummVersion::V5, vec![(1, bad), (2, good)]);
    e.start_script(1).unwrap();
    e.start_script(2).unwrap();
    assert!(e.run_tick().is_err());
}

#[test]
fn test_random_is_deterministic_with_seeded_rng() {
    // getRandomNumber var1, 100; stop
    let mut code = vec![0x16];
    code.extend(w(1));
    code.extend(w(100));
    code.push(0x00);

    let mut a = engine_with_scripts(ScummVersion::V5, vec![(1, code.clone())]);
    let mut b = engine_with_scripts(ScummVersion::V5, vec![(1, code)]);
    a.start_script(1).unwrap();
    b.start_script(1).unwrap();
    a.run_tick().unwrap();
    b.run_tick().unwrap();
    let va = a.vars.read(1, &locals()).unwrap();
    assert_eq!(va, b.vars.read(1, &locals()).unwrap());
    assert!((0..=100).contains(&va));
}

// -- early dialect --------------------------------------------------------

#[test]
fn test_early_dialect_byte_operands() {
    // move var10, 42 (byte literal); add var10, 8; stop
    let code = vec![
        0x0A, 0x0A, 0x00, 42, // move: W16 address, W8 literal
        0x0B, 0x0A, 0x00, 8, 0x00,
    ];
    let mut e = engine_with_scripts(ScummVersion::V2, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(10, &locals()).unwrap(), 50);
}

#[test]
fn test_early_conditional_reads_left_side_as_variable() {
    // move var1, 9; isEqual var1, 9 -> fall through -> increment var2; stop
    let code = vec![
        0x0A, 0x01, 0x00, 9, // move var1, 9
        0x12, 0x01, 0x00, 9, 0x04, 0x00, // isEqual var1, 9, offset 4
        0x0F, 0x02, 0x00, // increment var2
        0x00,
    ];
    let mut e = engine_with_scripts(ScummVersion::V2, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(2, &locals()).unwrap(), 1);
}

// -- V0 dialect -----------------------------------------------------------

#[test]
fn test_v0_has_no_multiply() {
    // multiply is not part of the oldest instruction set
    let code = vec![0x0D, 0x05, 2];
    let mut e = engine_with_scripts(ScummVersion::V0, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.slots()[0].status, SlotStatus::Dead, "unknown opcode");
}

#[test]
fn test_v0_byte_addressing_and_walk() {
    // move var10, 30; walkActorTo actor 1 -> (90, 50); waitForActor 1; stop
    let code = vec![
        0x0A, 0x0A, 30, // move var10, 30 (byte addr, byte literal)
        0x05, 0x01, 90, 50, // walkActorTo
        0x18, 0x01, // waitForActor
        0x00,
    ];
    let mut e = engine_with_room(ScummVersion::V0, vec![(1, code)]);
    e.start_script(1).unwrap();
    for _ in 0..80 {
        e.run_tick().unwrap();
        if e.slots()[0].status == SlotStatus::Dead {
            break;
        }
    }
    assert_eq!(e.vars.read(10, &locals()).unwrap(), 30);
    assert_eq!(e.actor(1).unwrap().pos.x, 90);
    assert_eq!(e.slots()[0].status, SlotStatus::Dead);
}

// -- stack dialect --------------------------------------------------------

fn push16(code: &mut Vec<u8>, v: i32) {
    code.push(0x00);
    code.extend(w(v));
}

#[test]
fn test_stack_arithmetic_and_store() {
    // (3 + 4) * 5 -> writeVar var1; stop
    let mut code = Vec::new();
    push16(&mut code, 3);
    push16(&mut code, 4);
    code.push(0x04); // add
    push16(&mut code, 5);
    code.push(0x06); // mul
    code.push(0x0F); // writeVar
    code.extend(w(1));
    code.push(0x12);

    let mut e = engine_with_scripts(ScummVersion::V6, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(1, &locals()).unwrap(), 35);
    assert_eq!(e.stack_depth(), 0, "stack balanced");
}

#[test]
fn test_stack_jump_if_not() {
    // if (var1 == 7) increment var2; stop
    let mut code = Vec::new();
    code.push(0x01); // pushVar var1
    code.extend(w(1));
    push16(&mut code, 7);
    code.push(0x08); // eq
    code.push(0x0E); // jumpIfNot over the increment (3 bytes)
    code.extend(w(3));
    code.push(0x10); // incVar var2
    code.extend(w(2));
    code.push(0x12);

    let mut e = engine_with_scripts(ScummVersion::V6, vec![(1, code.clone())]);
    e.vars.set_global(1, 7).unwrap();
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(2, &locals()).unwrap(), 1);

    let mut e = engine_with_scripts(ScummVersion::V6, vec![(1, code)]);
    e.vars.set_global(1, 8).unwrap();
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(2, &locals()).unwrap(), 0);
}

#[test]
fn test_stack_wait_for_actor_loops_over_pushes() {
    let mut code = Vec::new();
    push16(&mut code, 1);
    push16(&mut code, 150);
    push16(&mut code, 50);
    code.push(0x18); // walkActorTo
    let label = code.len();
    push16(&mut code, 1);
    code.push(0x1E); // waitForActor
    let off = label as i64 - (code.len() as i64 + 2);
    code.extend(w(off as i32));
    code.push(0x10); // incVar var1
    code.extend(w(1));
    code.push(0x12);

    let mut e = engine_with_room(ScummVersion::V6, vec![(1, code)]);
    e.start_script(1).unwrap();
    for _ in 0..80 {
        e.run_tick().unwrap();
        if e.slots()[0].status == SlotStatus::Dead {
            break;
        }
        assert_eq!(e.stack_depth(), 0, "waits leave nothing behind");
    }
    assert_eq!(e.slots()[0].status, SlotStatus::Dead);
    assert_eq!(e.actor(1).unwrap().pos.x, 150);
    assert_eq!(e.vars.read(1, &locals()).unwrap(), 1);
}

#[test]
fn test_stack_underflow_is_fatal() {
    let code = vec![0x04]; // add with an empty stack
    let mut e = engine_with_scripts(ScummVersion::V6, vec![(1, code)]);
    e.start_script(1).unwrap();
    assert!(e.run_tick().is_err());
}

#[test]
fn test_v8_wide_literals() {
    // push 100000; push 3; mul; writeVar var1; stop
    let mut code = Vec::new();
    code.push(0x00);
    code.extend_from_slice(&100_000i32.to_le_bytes());
    code.push(0x00);
    code.extend_from_slice(&3i32.to_le_bytes());
    code.push(0x06);
    code.push(0x0F);
    code.extend_from_slice(&1u32.to_le_bytes());
    code.push(0x12);

    let mut e = engine_with_scripts(ScummVersion::V8, vec![(1, code)]);
    e.start_script(1).unwrap();
    e.run_tick().unwrap();
    assert_eq!(e.vars.read(1, &locals()).unwrap(), 300_000);
}
