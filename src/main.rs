use log::info;
use mansion::actor::Actor;
use mansion::boxes::WalkBox;
use mansion::interpreter::Engine;
use mansion::room::RoomPlan;
use mansion::script::MemoryScriptBank;
use mansion::srand::SRand;
use mansion::version::ScummVersion;
use std::env;

/// Demo scene: one actor walks across two adjoining boxes while a script
/// busy-polls for arrival, then faces the actor north and stops.
fn demo_script(version: ScummVersion) -> Vec<u8> {
    match version.dialect() {
        mansion::version::Dialect::Stack => {
            let width = version.operand_width();
            let push_word = |code: &mut Vec<u8>, v: i32| {
                code.push(0x00);
                match width {
                    mansion::version::OperandWidth::W32 => {
                        code.extend_from_slice(&v.to_le_bytes())
                    }
                    _ => code.extend_from_slice(&(v as i16).to_le_bytes()),
                }
            };
            let mut code = Vec::new();
            push_word(&mut code, 1);
            push_word(&mut code, 150);
            push_word(&mut code, 50);
            code.push(0x18); // walkActorTo
            let label = code.len();
            push_word(&mut code, 1);
            code.push(0x1E); // waitForActor, loops back to the push
            let off = label as i64 - (code.len() as i64 + 2);
            code.extend_from_slice(&(off as i16).to_le_bytes());
            code.push(0x12); // stopObjectCode
            code
        }
        mansion::version::Dialect::Mid => vec![
            // walkActorTo actor=1, x=150, y=50
            0x05, 0x01, 0x00, 0x96, 0x00, 0x32, 0x00,
            // waitForActor actor=1
            0x18, 0x01, 0x00,
            // faceTowardPoint actor=1, x=150, y=0
            0x07, 0x01, 0x00, 0x96, 0x00, 0x00, 0x00,
            // stopObjectCode
            0x00,
        ],
        _ => vec![
            // walkActorTo actor=1, x=150, y=50 (byte operands)
            0x05, 0x01, 0x96, 0x32,
            // waitForActor actor=1
            0x18, 0x01,
            // stopObjectCode
            0x00,
        ],
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let version = match args.get(1) {
        Some(s) => ScummVersion::from_number(s.parse::<u8>()?)?,
        None => ScummVersion::V5,
    };
    info!("mansion demo, engine version {}", version.number());

    let mut bank = MemoryScriptBank::new();
    bank.insert(1, demo_script(version));

    let mut engine = Engine::new(version, Box::new(bank));
    engine.rng = SRand::new_predictable(1);

    let plan = RoomPlan::new(
        vec![WalkBox::rect(0, 0, 100, 100), WalkBox::rect(100, 0, 200, 100)],
        320,
        200,
    );
    engine.set_room(&plan)?;

    let mut hero = Actor::new(1);
    hero.is_player = true;
    engine.add_actor(hero);
    engine.put_actor(1, 50, 50).map_err(|e| e.message().to_string())?;

    engine.start_script(1).map_err(|e| e.message().to_string())?;

    let ticks = engine.run_until_idle(1000)?;
    let hero = engine.actor(1).map_err(|e| e.message().to_string())?;
    println!(
        "idle after {} ticks: actor 1 at {} facing {}",
        ticks, hero.pos, hero.facing
    );
    Ok(())
}
