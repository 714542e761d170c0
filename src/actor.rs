use crate::boxes::Point;
use crate::path::NO_BOX;
use crate::version::ScummVersion;

/// Movement phase bits in Actor::moving
pub const MF_NEW_LEG: u8 = 0x01;
pub const MF_IN_LEG: u8 = 0x02;
pub const MF_TURN: u8 = 0x04;
pub const MF_LAST_LEG: u8 = 0x08;
pub const MF_FROZEN: u8 = 0x80;

/// Old-style direction index -> angle in degrees.
/// Scripts compare against both representations, so the conversion is an
/// exact table, never arithmetic.
pub const OLD_DIR_TO_NEW_DIR: [i32; 4] = [270, 90, 180, 0];

/// Sector upper bounds for quantizing an angle to one of 8 simple
/// directions, matching the reference tables
const SIMPLE_DIR_8: [i32; 8] = [22, 72, 107, 157, 202, 252, 287, 337];
const SIMPLE_DIR_4: [i32; 4] = [71, 109, 251, 289];

/// Angle -> old-style direction index (0=left, 1=right, 2=down, 3=up)
pub fn new_dir_to_old_dir(angle: i32) -> usize {
    let a = normalize_angle_raw(angle);
    if (71..=109).contains(&a) {
        1
    } else if (110..=251).contains(&a) {
        2
    } else if (252..=289).contains(&a) {
        0
    } else {
        3
    }
}

fn normalize_angle_raw(angle: i32) -> i32 {
    ((angle % 360) + 360) % 360
}

/// Quantize an angle to the nearest simple direction index for the given
/// direction count (4 or 8), using the reference sector tables.
pub fn to_simple_dir(dir_count: i32, angle: i32) -> i32 {
    let a = normalize_angle_raw(angle);
    if dir_count == 8 {
        for (i, hi) in SIMPLE_DIR_8.iter().enumerate().skip(1) {
            if a > SIMPLE_DIR_8[i - 1] && a <= *hi {
                return i as i32;
            }
        }
        0
    } else {
        for (i, hi) in SIMPLE_DIR_4.iter().enumerate().skip(1) {
            if a > SIMPLE_DIR_4[i - 1] && a <= *hi {
                return i as i32;
            }
        }
        0
    }
}

/// Simple direction index -> angle
pub fn from_simple_dir(dir_count: i32, dir: i32) -> i32 {
    if dir_count == 8 {
        dir * 45
    } else {
        dir * 90
    }
}

/// Normalize an angle onto the version's compass quantum
pub fn normalize_angle(dir_count: i32, angle: i32) -> i32 {
    from_simple_dir(dir_count, to_simple_dir(dir_count, angle))
}

/// Facing angle implied by a movement delta, quantized to 4 directions
/// with the reference's 2:1 dominance test, with diagonal buckets when the
/// version supports 8 directions.
pub fn angle_from_delta(dir_count: i32, dx: i32, dy: i32) -> i32 {
    if dx == 0 && dy == 0 {
        return 0;
    }
    if dy.abs() * 2 <= dx.abs() {
        if dx > 0 {
            90
        } else {
            270
        }
    } else if dx.abs() * 2 <= dy.abs() {
        if dy > 0 {
            180
        } else {
            0
        }
    } else if dir_count == 8 {
        match (dx > 0, dy > 0) {
            (true, true) => 135,
            (true, false) => 45,
            (false, true) => 225,
            (false, false) => 315,
        }
    } else if dy.abs() >= dx.abs() {
        if dy > 0 {
            180
        } else {
            0
        }
    } else if dx > 0 {
        90
    } else {
        270
    }
}

/// Per-leg movement state for the continuous walk variant
#[derive(Debug, Clone, Default)]
pub struct WalkData {
    /// Start of the current leg
    pub cur: Point,
    /// End of the current leg
    pub next: Point,
    /// Final destination of the whole route
    pub dest: Point,
    pub dest_box: u8,
    /// Box the current leg is heading into
    pub next_box: u8,
    /// Facing to adopt once the route completes, or -1
    pub dest_facing: i32,
    /// 16.16 fixed-point per-tick deltas
    pub delta_x_factor: i32,
    pub delta_y_factor: i32,
    /// 16.16 accumulated offset from `cur`
    pub x_frac: i32,
    pub y_frac: i32,
}

/// Counter state for the quantized walk variant (oldest family).
/// The shared modulus is max(x_inc, y_inc); the dominant-axis flag is set
/// when x_inc <= y_inc, mirroring the original comparison.
#[derive(Debug, Clone, Default)]
pub struct QuantWalkData {
    pub x_count_inc: i32,
    pub y_count_inc: i32,
    pub x_count: i32,
    pub y_count: i32,
    pub modulo: i32,
    pub y_count_greater_than_x_count: bool,
}

/// The movement-relevant subset of an actor.
///
/// Created on actor init, persists across rooms; walk state is reset on
/// room re-entry. Mutated once per game tick by the walk state machine.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: u8,
    pub pos: Point,
    pub walkbox: u8,
    pub dest: Point,
    pub dest_box: u8,
    /// Continuous facing angle in degrees
    pub facing: i32,
    pub target_facing: i32,
    /// Movement phase bitfield (MF_*)
    pub moving: u8,
    pub speed_x: i32,
    pub speed_y: i32,
    pub is_player: bool,
    pub in_room: bool,
    pub walkdata: WalkData,
    pub quant: QuantWalkData,
}

impl Actor {
    pub fn new(id: u8) -> Self {
        Actor {
            id,
            pos: Point::default(),
            walkbox: NO_BOX,
            dest: Point::default(),
            dest_box: NO_BOX,
            facing: 90,
            target_facing: 90,
            moving: 0,
            speed_x: 8,
            speed_y: 2,
            is_player: false,
            in_room: false,
            walkdata: WalkData {
                dest_facing: -1,
                ..WalkData::default()
            },
            quant: QuantWalkData::default(),
        }
    }

    /// Old-style direction index for the current facing
    pub fn old_dir(&self) -> usize {
        new_dir_to_old_dir(self.facing)
    }

    pub fn set_box(&mut self, box_id: u8) {
        self.walkbox = box_id;
    }

    pub fn is_moving(&self) -> bool {
        self.moving != 0
    }

    pub fn freeze(&mut self, frozen: bool) {
        if frozen {
            self.moving |= MF_FROZEN;
        } else {
            self.moving &= !MF_FROZEN;
        }
    }

    pub fn stop_moving(&mut self) {
        self.moving = 0;
    }

    /// Reset walk state, as done on room re-entry
    pub fn reset_walk(&mut self) {
        self.moving = 0;
        self.walkbox = NO_BOX;
        self.dest_box = NO_BOX;
        self.walkdata = WalkData {
            dest_facing: -1,
            ..WalkData::default()
        };
        self.quant = QuantWalkData::default();
    }

    /// Rotate facing one compass quantum toward `target_facing`.
    /// Returns true once aligned.
    pub fn turn_step(&mut self, version: ScummVersion) -> bool {
        let dir_count = version.dir_count();
        let quantum = 360 / dir_count;
        let facing = normalize_angle(dir_count, self.facing);
        let target = normalize_angle(dir_count, self.target_facing);
        if facing == target {
            self.facing = target;
            return true;
        }
        let mut diff = target - facing;
        if diff > 180 {
            diff -= 360;
        } else if diff < -180 {
            diff += 360;
        }
        let step = if diff > 0 { quantum } else { -quantum };
        self.facing = normalize_angle_raw(facing + step);
        normalize_angle(dir_count, self.facing) == target
    }
}
