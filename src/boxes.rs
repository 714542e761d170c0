use crate::version::ScummVersion;
use log::debug;
use std::fmt;

/// Walk box flag bits, as stored in room data
pub const BOX_X_FLIP: u8 = 0x08;
pub const BOX_Y_FLIP: u8 = 0x10;
pub const BOX_PLAYER_ONLY: u8 = 0x20;
pub const BOX_LOCKED: u8 = 0x40;
pub const BOX_INVISIBLE: u8 = 0x80;

/// Tolerance (squared pixels) for membership in a degenerate (line) box
const LINE_BOX_SQ_TOLERANCE: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    /// Squared euclidean distance, in i64 to dodge overflow on bad data
    pub fn sq_dist(self, other: Point) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// A convex quadrilateral region of a room's floor plan.
///
/// Corners are upper-left, upper-right, lower-right, lower-left in the
/// room's coordinate space. A box may degenerate to a line segment (two
/// corner pairs coincide). Boxes are immutable for the lifetime of a room.
#[derive(Debug, Clone)]
pub struct WalkBox {
    pub ul: Point,
    pub ur: Point,
    pub lr: Point,
    pub ll: Point,
    pub flags: u8,
    /// Scale value; high bit set means the low bits name a
    /// scale-interpolation slot instead of a literal scale
    pub scale: u16,
    /// Z-order mask used by the compositor for occlusion
    pub mask: u8,
}

impl WalkBox {
    pub fn new(ul: Point, ur: Point, lr: Point, ll: Point) -> Self {
        WalkBox {
            ul,
            ur,
            lr,
            ll,
            flags: 0,
            scale: 255,
            mask: 0,
        }
    }

    /// Axis-aligned rectangle helper, used heavily by tests and the demo
    pub fn rect(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        WalkBox::new(
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        )
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    fn corners(&self) -> [Point; 4] {
        [self.ul, self.ur, self.lr, self.ll]
    }

    /// True if the quad has collapsed into a line segment
    fn is_line(&self) -> bool {
        (self.ul == self.ur && self.lr == self.ll) || (self.ul == self.ll && self.ur == self.lr)
    }
}

/// The static geometric data of one room: an arena of boxes indexed by
/// small integer id, plus the version that governs coordinate fix-ups.
pub struct BoxGraph {
    boxes: Vec<WalkBox>,
    version: ScummVersion,
}

impl BoxGraph {
    pub fn new(boxes: Vec<WalkBox>, version: ScummVersion) -> Self {
        BoxGraph { boxes, version }
    }

    pub fn empty(version: ScummVersion) -> Self {
        BoxGraph {
            boxes: Vec::new(),
            version,
        }
    }

    pub fn num_boxes(&self) -> usize {
        self.boxes.len()
    }

    pub fn version(&self) -> ScummVersion {
        self.version
    }

    fn check_id(&self, box_id: u8) -> Result<(), String> {
        if (box_id as usize) < self.boxes.len() {
            Ok(())
        } else {
            Err(format!(
                "Box id {} out of range (room has {} boxes)",
                box_id,
                self.boxes.len()
            ))
        }
    }

    pub fn flags(&self, box_id: u8) -> Result<u8, String> {
        self.check_id(box_id)?;
        Ok(self.boxes[box_id as usize].flags)
    }

    pub fn scale(&self, box_id: u8) -> Result<u16, String> {
        self.check_id(box_id)?;
        Ok(self.boxes[box_id as usize].scale)
    }

    /// Corner coordinates in ul, ur, lr, ll order.
    ///
    /// For the early-tile family the source data sometimes has left/right
    /// or top/bottom corner pairs swapped; those are normalized here so the
    /// geometry routines can rely on the ordering.
    pub fn coordinates(&self, box_id: u8) -> Result<[Point; 4], String> {
        self.check_id(box_id)?;
        let b = &self.boxes[box_id as usize];
        let mut c = b.corners();
        if self.version.box_coord_fixup() {
            if c[0].x > c[1].x {
                c.swap(0, 1);
                c.swap(3, 2);
            }
            if c[0].y > c[3].y {
                c.swap(0, 3);
                c.swap(1, 2);
            }
        }
        Ok(c)
    }

    /// Neighbor test: the two boxes share a collinear touching edge.
    ///
    /// Each box's corner ring is rotated through all four offsets (16
    /// combinations) and each candidate edge pair is tested in both
    /// windings, because room data does not guarantee consistent edge
    /// direction. Invisible boxes are never neighbors of anything.
    pub fn are_neighbors(&self, box_a: u8, box_b: u8) -> Result<bool, String> {
        if self.flags(box_a)? & BOX_INVISIBLE != 0 || self.flags(box_b)? & BOX_INVISIBLE != 0 {
            return Ok(false);
        }
        if box_a == box_b {
            return Ok(true);
        }
        let ca = self.coordinates(box_a)?;
        let cb = self.coordinates(box_b)?;
        for j in 0..4 {
            let a0 = ca[j];
            let a1 = ca[(j + 1) & 3];
            for k in 0..4 {
                let b0 = cb[k];
                let b1 = cb[(k + 1) & 3];
                if edges_touch(a0, a1, b0, b1) || edges_touch(a0, a1, b1, b0) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Point membership test.
    ///
    /// Degenerate boxes are treated as "near the segment" within a small
    /// pixel tolerance rather than strict polygon containment.
    pub fn point_in_box(&self, box_id: u8, p: Point) -> Result<bool, String> {
        self.check_id(box_id)?;
        let b = &self.boxes[box_id as usize];
        let c = self.coordinates(box_id)?;

        // Quick bounding rejection
        if (p.x < c[0].x && p.x < c[1].x && p.x < c[2].x && p.x < c[3].x)
            || (p.x > c[0].x && p.x > c[1].x && p.x > c[2].x && p.x > c[3].x)
            || (p.y < c[0].y && p.y < c[1].y && p.y < c[2].y && p.y < c[3].y)
            || (p.y > c[0].y && p.y > c[1].y && p.y > c[2].y && p.y > c[3].y)
        {
            return Ok(false);
        }

        if b.is_line() {
            let q = closest_pt_on_segment(c[0], c[2], p);
            return Ok(p.sq_dist(q) <= LINE_BOX_SQ_TOLERANCE);
        }

        // Point must lie on the inner side of every edge of the ring
        Ok(compare_slope(c[0], c[1], p)
            && compare_slope(c[1], c[2], p)
            && compare_slope(c[2], c[3], p)
            && compare_slope(c[3], c[0], p))
    }

    /// Closest legal point inside the box for an arbitrary target point.
    ///
    /// If the point's Y is strictly outside the box's vertical range, Y
    /// is clamped to that extreme and the X range at the clamped Y is
    /// found by repeated midpoint bisection of the side edges (matching
    /// the reference engine's rounding, not a closed-form slope). If Y is
    /// in range and X already lies between the side edges, the point is
    /// unchanged; otherwise only X is clamped.
    pub fn closest_point_in_box(&self, box_id: u8, p: Point) -> Result<Point, String> {
        let c = self.coordinates(box_id)?;
        let top = c[0].y.min(c[1].y).min(c[2].y).min(c[3].y);
        let bottom = c[0].y.max(c[1].y).max(c[2].y).max(c[3].y);

        let mut q = p;
        if q.y < top {
            q.y = top;
        } else if q.y > bottom {
            q.y = bottom;
        }

        let xa = edge_x_at_y(c[0], c[3], q.y);
        let xb = edge_x_at_y(c[1], c[2], q.y);
        let (xmin, xmax) = if xa <= xb { (xa, xb) } else { (xb, xa) };
        if q.x < xmin {
            q.x = xmin;
        } else if q.x > xmax {
            q.x = xmax;
        }
        Ok(q)
    }

    /// Approximate distance from a point to a box, plus the closest point.
    ///
    /// The metric is |dx| + |dy|/4; box coordinates use anisotropic axis
    /// scaling so Y is deweighted. The oldest family doubles the X term to
    /// compensate for its coarser horizontal tile granularity.
    pub fn box_distance(&self, box_id: u8, p: Point) -> Result<(Point, u32), String> {
        let q = self.closest_point_in_box(box_id, p)?;
        let mut dx = (p.x - q.x).unsigned_abs();
        let dy = (p.y - q.y).unsigned_abs();
        if self.version.x_distance_doubling() {
            dx *= 2;
        }
        let dist = dx + dy / 4;
        debug!(
            "box_distance: box {} point {} -> closest {} dist {}",
            box_id, p, q, dist
        );
        Ok((q, dist))
    }
}

/// Winding test used by point_in_box, written exactly as the reference
/// engine compares edge slopes (<=, so boundary points are inside).
fn compare_slope(p1: Point, p2: Point, p3: Point) -> bool {
    (p2.y - p1.y) as i64 * (p3.x - p1.x) as i64 <= (p3.y - p1.y) as i64 * (p2.x - p1.x) as i64
}

/// Closest point on segment a-b to p (integer arithmetic)
fn closest_pt_on_segment(a: Point, b: Point, p: Point) -> Point {
    let dx = (b.x - a.x) as i64;
    let dy = (b.y - a.y) as i64;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0 {
        return a;
    }
    let t = ((p.x - a.x) as i64 * dx + (p.y - a.y) as i64 * dy).clamp(0, len_sq);
    Point::new(
        a.x + ((t * dx) / len_sq) as i32,
        a.y + ((t * dy) / len_sq) as i32,
    )
}

/// X coordinate of an edge at a given Y, by repeated midpoint bisection.
/// Integer midpoints reproduce the reference engine's rounding behaviour.
fn edge_x_at_y(e0: Point, e1: Point, y: i32) -> i32 {
    let (mut a, mut b) = if e0.y <= e1.y { (e0, e1) } else { (e1, e0) };
    if y <= a.y {
        return a.x;
    }
    if y >= b.y {
        return b.x;
    }
    for _ in 0..32 {
        let mid = Point::new((a.x + b.x) / 2, (a.y + b.y) / 2);
        if mid == a || mid == b {
            break;
        }
        if y < mid.y {
            b = mid;
        } else {
            a = mid;
        }
        if a.y == y {
            return a.x;
        }
        if b.y == y {
            return b.x;
        }
    }
    a.x
}

/// Two directed edges touch when they are collinear and their projections
/// on the dominant axis overlap (sharing more than a single corner point).
fn edges_touch(a0: Point, a1: Point, b0: Point, b1: Point) -> bool {
    let cross1 = cross(a0, a1, b0);
    let cross2 = cross(a0, a1, b1);
    if cross1 != 0 || cross2 != 0 {
        return false;
    }
    // Degenerate edges (repeated corner) never form a shared boundary
    if a0 == a1 || b0 == b1 {
        return false;
    }
    let horizontal = (a1.x - a0.x).abs() >= (a1.y - a0.y).abs();
    let (alo, ahi, blo, bhi) = if horizontal {
        (
            a0.x.min(a1.x),
            a0.x.max(a1.x),
            b0.x.min(b1.x),
            b0.x.max(b1.x),
        )
    } else {
        (
            a0.y.min(a1.y),
            a0.y.max(a1.y),
            b0.y.min(b1.y),
            b0.y.max(b1.y),
        )
    };
    alo.max(blo) < ahi.min(bhi)
}

fn cross(a: Point, b: Point, c: Point) -> i64 {
    (b.x - a.x) as i64 * (c.y - a.y) as i64 - (b.y - a.y) as i64 * (c.x - a.x) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_box_graph() -> BoxGraph {
        // Two unit boxes sharing a vertical edge at x=100
        BoxGraph::new(
            vec![WalkBox::rect(0, 0, 100, 100), WalkBox::rect(100, 0, 200, 100)],
            ScummVersion::V5,
        )
    }

    #[test]
    fn test_neighbors_symmetric() {
        let g = two_box_graph();
        for a in 0..2u8 {
            for b in 0..2u8 {
                assert_eq!(
                    g.are_neighbors(a, b).unwrap(),
                    g.are_neighbors(b, a).unwrap(),
                    "neighbor symmetry violated for ({a},{b})"
                );
            }
        }
        assert!(g.are_neighbors(0, 1).unwrap());
    }

    #[test]
    fn test_invisible_box_has_no_neighbors() {
        let g = BoxGraph::new(
            vec![
                WalkBox::rect(0, 0, 100, 100),
                WalkBox::rect(100, 0, 200, 100).with_flags(BOX_INVISIBLE),
            ],
            ScummVersion::V5,
        );
        assert!(!g.are_neighbors(0, 1).unwrap());
        assert!(!g.are_neighbors(1, 0).unwrap());
    }

    #[test]
    fn test_corner_touch_is_not_neighboring() {
        // Boxes meeting only at the single corner point (100,100)
        let g = BoxGraph::new(
            vec![WalkBox::rect(0, 0, 100, 100), WalkBox::rect(100, 100, 200, 200)],
            ScummVersion::V5,
        );
        assert!(!g.are_neighbors(0, 1).unwrap());
    }

    #[test]
    fn test_point_in_box() {
        let g = two_box_graph();
        assert!(g.point_in_box(0, Point::new(50, 50)).unwrap());
        assert!(g.point_in_box(0, Point::new(0, 0)).unwrap());
        assert!(!g.point_in_box(0, Point::new(150, 50)).unwrap());
        assert!(!g.point_in_box(0, Point::new(5000, 5000)).unwrap());
    }

    #[test]
    fn test_point_in_slanted_box() {
        let b = WalkBox::new(
            Point::new(10, 0),
            Point::new(20, 0),
            Point::new(30, 10),
            Point::new(20, 10),
        );
        let g = BoxGraph::new(vec![b], ScummVersion::V5);
        assert!(g.point_in_box(0, Point::new(20, 5)).unwrap());
        assert!(!g.point_in_box(0, Point::new(11, 9)).unwrap());
    }

    #[test]
    fn test_degenerate_box_near_segment() {
        // A box collapsed to the segment (0,0)-(50,10)
        let b = WalkBox::new(
            Point::new(0, 0),
            Point::new(50, 10),
            Point::new(50, 10),
            Point::new(0, 0),
        );
        let g = BoxGraph::new(vec![b], ScummVersion::V5);
        assert!(g.point_in_box(0, Point::new(25, 5)).unwrap());
        assert!(g.point_in_box(0, Point::new(26, 4)).unwrap());
        assert!(!g.point_in_box(0, Point::new(5, 10)).unwrap());
        // The bounding pre-check still applies to line boxes
        assert!(!g.point_in_box(0, Point::new(25, 40)).unwrap());
    }

    #[test]
    fn test_closest_point_clamping() {
        let g = two_box_graph();
        // Above the box: Y clamps to the top edge, X bisected into range
        assert_eq!(
            g.closest_point_in_box(0, Point::new(50, -20)).unwrap(),
            Point::new(50, 0)
        );
        // Laterally outside: Y kept, X clamped
        assert_eq!(
            g.closest_point_in_box(1, Point::new(50, 50)).unwrap(),
            Point::new(100, 50)
        );
        // Inside: unchanged
        assert_eq!(
            g.closest_point_in_box(0, Point::new(30, 70)).unwrap(),
            Point::new(30, 70)
        );
    }

    #[test]
    fn test_distance_metric() {
        let g = two_box_graph();
        // Point (150,50) is 50 to the right of box 0 -> |dx| + |dy|/4 = 50
        let (q, d) = g.box_distance(0, Point::new(150, 50)).unwrap();
        assert_eq!(q, Point::new(100, 50));
        assert_eq!(d, 50);

        // Oldest family doubles the X term
        let g0 = BoxGraph::new(vec![WalkBox::rect(0, 0, 100, 100)], ScummVersion::V0);
        let (_, d0) = g0.box_distance(0, Point::new(150, 50)).unwrap();
        assert_eq!(d0, 100);
    }

    #[test]
    fn test_coord_fixup_early_family() {
        // Flipped left/right corner pairs get normalized for V2
        let b = WalkBox::new(
            Point::new(100, 0),
            Point::new(0, 0),
            Point::new(0, 50),
            Point::new(100, 50),
        );
        let g = BoxGraph::new(vec![b.clone()], ScummVersion::V2);
        let c = g.coordinates(0).unwrap();
        assert_eq!(c[0], Point::new(0, 0));
        assert_eq!(c[1], Point::new(100, 0));
        assert_eq!(c[2], Point::new(100, 50));
        assert_eq!(c[3], Point::new(0, 50));

        // Later versions leave the data alone
        let g5 = BoxGraph::new(vec![b], ScummVersion::V5);
        assert_eq!(g5.coordinates(0).unwrap()[0], Point::new(100, 0));
    }

    #[test]
    fn test_bad_box_id_is_loud() {
        let g = two_box_graph();
        assert!(g.flags(7).is_err());
        assert!(g.point_in_box(2, Point::new(0, 0)).is_err());
    }
}
