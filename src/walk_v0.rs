//! Quantized walk state machine used by the oldest engine family.
//!
//! The original implementation was a tangle of numbered jump labels over
//! integer slope counters. The labels are kept as an explicit phase enum
//! and the order of checks inside each phase is preserved, including a
//! literally duplicated arrival check the original executed twice in a
//! row. Several callers depend on the exact order, so nothing here is
//! "cleaned up".

use crate::actor::{angle_from_delta, Actor, MF_FROZEN, MF_IN_LEG, MF_NEW_LEG, MF_TURN};
use crate::boxes::{BoxGraph, Point, BOX_INVISIBLE};
use crate::costume::CostumeAnimator;
use crate::version::ScummVersion;
use log::debug;

/// Phases of the per-tick transition loop, mirroring the original's
/// numbered jump targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ArriveCheck,
    ArriveCheckAgain,
    NewLeg,
    MajorStep,
    MinorStep,
    Finish,
    Blocked,
    Done,
}

/// Advance the quantized walk state machine by one tick.
pub fn walk_actor_tick(
    actor: &mut Actor,
    graph: &BoxGraph,
    version: ScummVersion,
    animator: &mut dyn CostumeAnimator,
) -> Result<(), String> {
    if actor.moving == 0 || actor.moving & MF_FROZEN != 0 {
        return Ok(());
    }

    // Turn-only commands (faceActor and friends) never route; the facing
    // rotates one quantum per tick while the position stays put
    if actor.moving & MF_TURN != 0 {
        let old = actor.facing;
        if actor.turn_step(version) {
            actor.moving &= !MF_TURN;
        }
        if actor.facing != old {
            animator.on_facing_changed(actor.id, actor.facing);
        }
        return Ok(());
    }

    if actor.moving & (MF_NEW_LEG | MF_IN_LEG) == 0 {
        return Ok(());
    }

    let mut phase = Phase::ArriveCheck;
    loop {
        phase = match phase {
            Phase::ArriveCheck => {
                if actor.pos == actor.walkdata.dest {
                    Phase::Finish
                } else {
                    Phase::ArriveCheckAgain
                }
            }
            // The original performs the identical comparison twice back to
            // back; kept verbatim rather than collapsed.
            Phase::ArriveCheckAgain => {
                if actor.pos == actor.walkdata.dest {
                    Phase::Finish
                } else if actor.moving & MF_NEW_LEG != 0 {
                    Phase::NewLeg
                } else {
                    Phase::MajorStep
                }
            }
            Phase::NewLeg => {
                calc_walk_distances(actor);
                actor.moving &= !MF_NEW_LEG;
                actor.moving |= MF_IN_LEG;
                let dir_count = version.dir_count();
                let new_facing = angle_from_delta(
                    dir_count,
                    actor.walkdata.dest.x - actor.pos.x,
                    actor.walkdata.dest.y - actor.pos.y,
                );
                if new_facing != actor.facing {
                    actor.facing = new_facing;
                    animator.on_facing_changed(actor.id, new_facing);
                }
                Phase::MajorStep
            }
            Phase::MajorStep => {
                animator.on_walk_frame(actor.id);
                let tentative = step_toward_dest(actor, actor.quant.y_count_greater_than_x_count);
                if try_step(actor, graph, tentative)? {
                    Phase::MinorStep
                } else {
                    Phase::Blocked
                }
            }
            Phase::MinorStep => {
                let y_major = actor.quant.y_count_greater_than_x_count;
                let (count, inc) = if y_major {
                    (&mut actor.quant.x_count, actor.quant.x_count_inc)
                } else {
                    (&mut actor.quant.y_count, actor.quant.y_count_inc)
                };
                *count += inc;
                if *count >= actor.quant.modulo && actor.quant.modulo > 0 {
                    *count -= actor.quant.modulo;
                    let tentative = step_toward_dest(actor, !y_major);
                    if !try_step(actor, graph, tentative)? {
                        Phase::Blocked
                    } else if actor.pos == actor.walkdata.dest {
                        Phase::Finish
                    } else {
                        Phase::Done
                    }
                } else if actor.pos == actor.walkdata.dest {
                    Phase::Finish
                } else {
                    Phase::Done
                }
            }
            Phase::Blocked => {
                // The tentative step fell outside every known box and was
                // backtracked. If the dominant-axis coordinate has already
                // reached its target, treat the walk as arrived; otherwise
                // the destination is unreachable and movement stops.
                let arrived = if actor.quant.y_count_greater_than_x_count {
                    actor.pos.y == actor.walkdata.dest.y
                } else {
                    actor.pos.x == actor.walkdata.dest.x
                };
                if arrived {
                    Phase::Finish
                } else {
                    debug!(
                        "actor {}: blocked at {}, destination {} unreachable",
                        actor.id, actor.pos, actor.walkdata.dest
                    );
                    actor.moving = 0;
                    Phase::Done
                }
            }
            Phase::Finish => {
                actor.moving = 0;
                let dest_facing = actor.walkdata.dest_facing;
                if dest_facing >= 0 && dest_facing != actor.facing {
                    actor.facing = dest_facing;
                    animator.on_facing_changed(actor.id, dest_facing);
                }
                debug!("actor {}: walk finished at {}", actor.id, actor.pos);
                Phase::Done
            }
            Phase::Done => break,
        };
    }
    Ok(())
}

/// Recompute the slope accumulators for the remaining straight run.
/// The dominant-axis flag is set when x_inc <= y_inc, as in the original.
fn calc_walk_distances(actor: &mut Actor) {
    let dx = (actor.walkdata.dest.x - actor.pos.x).abs();
    let dy = (actor.walkdata.dest.y - actor.pos.y).abs();
    actor.quant.x_count_inc = dx;
    actor.quant.y_count_inc = dy;
    actor.quant.y_count_greater_than_x_count = dx <= dy;
    actor.quant.modulo = dx.max(dy);
    actor.quant.x_count = 0;
    actor.quant.y_count = 0;
    debug!(
        "actor {}: walk distances dx={} dy={} modulo={} y_major={}",
        actor.id, dx, dy, actor.quant.modulo, actor.quant.y_count_greater_than_x_count
    );
}

/// One tentative unit step toward the destination on the chosen axis
fn step_toward_dest(actor: &Actor, y_axis: bool) -> Point {
    let mut p = actor.pos;
    if y_axis {
        p.y += (actor.walkdata.dest.y - actor.pos.y).signum();
    } else {
        p.x += (actor.walkdata.dest.x - actor.pos.x).signum();
    }
    p
}

/// Validate a tentative position against the box set and commit it if it
/// lands in a visible box (lower-numbered boxes first, as the oldest
/// family scans). Returns false, leaving the actor unmoved, when the
/// position is outside every box.
fn try_step(actor: &mut Actor, graph: &BoxGraph, tentative: Point) -> Result<bool, String> {
    if tentative == actor.pos {
        return Ok(true);
    }
    for id in 0..graph.num_boxes() as u8 {
        if graph.flags(id)? & BOX_INVISIBLE != 0 {
            continue;
        }
        if graph.point_in_box(id, tentative)? {
            actor.pos = tentative;
            actor.set_box(id);
            return Ok(true);
        }
    }
    Ok(false)
}
