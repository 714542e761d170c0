use crate::actor::{
    angle_from_delta, Actor, MF_FROZEN, MF_IN_LEG, MF_LAST_LEG, MF_NEW_LEG, MF_TURN,
};
use crate::boxes::{BoxGraph, Point, BOX_LOCKED, BOX_PLAYER_ONLY};
use crate::costume::CostumeAnimator;
use crate::path::{adjust_point_to_nearest_box, BoxMatrix};
use crate::version::ScummVersion;
use log::debug;

/// Begin a walk toward `dest`, shared by both walk variants.
///
/// The target point is first moved into the nearest legal box. Commanding
/// a walk to the point the actor already stands on terminates immediately,
/// in zero ticks, with no position change.
pub fn start_walk(
    actor: &mut Actor,
    graph: &BoxGraph,
    dest: Point,
    dest_facing: Option<i32>,
) -> Result<(), String> {
    let (adjusted, dest_box) = adjust_point_to_nearest_box(graph, dest, actor.is_player)?;
    debug!(
        "actor {}: walk to {} (adjusted {} box {})",
        actor.id, dest, adjusted, dest_box
    );

    actor.dest = adjusted;
    actor.dest_box = dest_box;
    actor.walkdata.dest = adjusted;
    actor.walkdata.dest_box = dest_box;
    actor.walkdata.dest_facing = dest_facing.unwrap_or(-1);

    if actor.pos == adjusted {
        actor.moving &= MF_FROZEN;
        if let Some(d) = dest_facing {
            if d != actor.facing {
                actor.target_facing = d;
                actor.moving |= MF_TURN;
            }
        }
        return Ok(());
    }

    // Make sure the actor's own box is known before routing starts
    if actor.walkbox == crate::path::NO_BOX {
        let (snapped, own_box) = adjust_point_to_nearest_box(graph, actor.pos, actor.is_player)?;
        actor.pos = snapped;
        actor.set_box(own_box);
    }

    actor.quant = Default::default();
    actor.moving = (actor.moving & (MF_IN_LEG | MF_FROZEN)) | MF_NEW_LEG;
    Ok(())
}

/// Advance the continuous walk state machine by one tick.
pub fn walk_actor_tick(
    actor: &mut Actor,
    graph: &BoxGraph,
    matrix: &BoxMatrix,
    version: ScummVersion,
    animator: &mut dyn CostumeAnimator,
) -> Result<(), String> {
    if actor.moving == 0 || actor.moving & MF_FROZEN != 0 {
        return Ok(());
    }

    if actor.moving & MF_NEW_LEG == 0 {
        if actor.moving & MF_IN_LEG != 0 && actor_walk_step(actor, version, animator) {
            return Ok(());
        }

        if actor.moving & MF_LAST_LEG != 0 {
            debug!("actor {}: route complete at {}", actor.id, actor.pos);
            actor.moving = 0;
            actor.set_box(actor.walkdata.dest_box);
            let dest_facing = actor.walkdata.dest_facing;
            if dest_facing >= 0 && dest_facing != actor.facing {
                actor.target_facing = dest_facing;
                actor.moving = MF_TURN;
            }
            return Ok(());
        }

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
    }
    actor.moving &= !MF_NEW_LEG;

    // Pick legs until one consumes the tick (or the route ends)
    loop {
        if actor.walkbox == actor.dest_box {
            actor.moving = (actor.moving & MF_IN_LEG) | MF_LAST_LEG;
            let dest = actor.walkdata.dest;
            if !calc_movement_factor(actor, version, animator, dest) {
                // Already standing on the destination point: finish now
                actor.moving = 0;
                actor.set_box(actor.walkdata.dest_box);
                let dest_facing = actor.walkdata.dest_facing;
                if dest_facing >= 0 && dest_facing != actor.facing {
                    actor.target_facing = dest_facing;
                    actor.moving = MF_TURN;
                }
            }
            return Ok(());
        }

        let next = match matrix.get_next_box(actor.walkbox, actor.dest_box)? {
            Some(b) => b,
            None => {
                // Unreachable target: normal outcome, route ends here
                debug!(
                    "actor {}: no path from box {} to box {}",
                    actor.id, actor.walkbox, actor.dest_box
                );
                actor.dest_box = actor.walkbox;
                actor.walkdata.dest_box = actor.walkbox;
                actor.walkdata.dest = actor.pos;
                actor.moving |= MF_LAST_LEG;
                return Ok(());
            }
        };

        if next == actor.walkbox {
            // A table naming the current box as its own next hop can never
            // make progress; treat it as malformed adjacency data
            return Err(format!(
                "Box matrix names box {} as its own next hop toward box {}",
                next, actor.dest_box
            ));
        }

        let flags = graph.flags(next)?;
        let exempt = actor.is_player && flags & BOX_PLAYER_ONLY != 0;
        if flags & BOX_LOCKED != 0 && !exempt {
            // Walk up to the shared edge but never enter the locked box
            debug!("actor {}: box {} is locked, stopping at edge", actor.id, next);
            let edge = graph.closest_point_in_box(next, actor.pos)?;
            actor.dest_box = actor.walkbox;
            actor.walkdata.dest_box = actor.walkbox;
            actor.walkdata.dest = edge;
            actor.dest = edge;
            actor.moving = (actor.moving & MF_IN_LEG) | MF_LAST_LEG;
            calc_movement_factor(actor, version, animator, edge);
            return Ok(());
        }

        actor.walkdata.next_box = next;
        // Leg endpoint: the nearest point on the next box, which lies on
        // the shared edge between the two boxes
        let target = graph.closest_point_in_box(next, actor.pos)?;
        if calc_movement_factor(actor, version, animator, target) {
            return Ok(());
        }
        // Zero-length leg: we are already on the edge, step into the box
        actor.set_box(next);
    }
}

/// Set up per-tick deltas for a leg toward `target` and take the first
/// step. Returns false when the actor already stands on the target.
fn calc_movement_factor(
    actor: &mut Actor,
    version: ScummVersion,
    animator: &mut dyn CostumeAnimator,
    target: Point,
) -> bool {
    if actor.pos == target {
        actor.moving &= !MF_IN_LEG;
        return false;
    }

    let diff_x = (target.x - actor.pos.x) as i64;
    let diff_y = (target.y - actor.pos.y) as i64;

    let mut delta_y_factor = (actor.speed_y as i64) << 16;
    if diff_y < 0 {
        delta_y_factor = -delta_y_factor;
    }
    let mut delta_x_factor = if diff_y != 0 {
        delta_y_factor * diff_x / diff_y
    } else {
        delta_y_factor = 0;
        let f = (actor.speed_x as i64) << 16;
        if diff_x < 0 {
            -f
        } else {
            f
        }
    };

    let x_limit = (actor.speed_x as i64) << 16;
    if delta_x_factor.abs() > x_limit {
        delta_x_factor = if diff_x < 0 { -x_limit } else { x_limit };
        delta_y_factor = if diff_x != 0 {
            delta_x_factor * diff_y / diff_x
        } else {
            0
        };
    }

    actor.walkdata.cur = actor.pos;
    actor.walkdata.next = target;
    actor.walkdata.delta_x_factor = delta_x_factor as i32;
    actor.walkdata.delta_y_factor = delta_y_factor as i32;
    actor.walkdata.x_frac = 0;
    actor.walkdata.y_frac = 0;
    actor.target_facing = angle_from_delta(
        version.dir_count(),
        delta_x_factor as i32,
        delta_y_factor as i32,
    );
    actor.moving |= MF_IN_LEG;

    actor_walk_step(actor, version, animator)
}

/// One position step along the current leg. Returns true while the leg is
/// still in progress, false once the endpoint has been reached (MF_IN_LEG
/// is cleared so the caller can choose the next leg on the next tick).
fn actor_walk_step(
    actor: &mut Actor,
    version: ScummVersion,
    animator: &mut dyn CostumeAnimator,
) -> bool {
    animator.on_walk_frame(actor.id);

    if actor.facing != actor.target_facing {
        let old = actor.facing;
        actor.turn_step(version);
        if actor.facing != old {
            animator.on_facing_changed(actor.id, actor.facing);
        }
    }

    let wd = &mut actor.walkdata;
    wd.x_frac = wd.x_frac.wrapping_add(wd.delta_x_factor);
    wd.y_frac = wd.y_frac.wrapping_add(wd.delta_y_factor);
    let mut x = wd.cur.x + (wd.x_frac >> 16);
    let mut y = wd.cur.y + (wd.y_frac >> 16);

    // Never overshoot the leg endpoint
    if (x - wd.cur.x).abs() > (wd.next.x - wd.cur.x).abs() {
        x = wd.next.x;
    }
    if (y - wd.cur.y).abs() > (wd.next.y - wd.cur.y).abs() {
        y = wd.next.y;
    }

    actor.pos = Point::new(x, y);
    if actor.pos == actor.walkdata.next {
        actor.moving &= !MF_IN_LEG;
        return false;
    }
    true
}
