use crate::boxes::{BoxGraph, Point, BOX_INVISIBLE, BOX_PLAYER_ONLY};
use crate::version::MatrixFormat;
use log::debug;

/// Sentinel for "no box" / "no path"
pub const NO_BOX: u8 = 0xFF;

/// Next-hop routing data over the walk box graph.
///
/// Three historical layouts exist. The oldest family ships no routing data
/// at all and the itinerary is computed from adjacency when the room loads;
/// the early-tile family ships a dense matrix; all later families ship a
/// sparse run-length table. The variant is memoized per room.
pub enum BoxMatrix {
    /// entry (i,j) = box preceding j on the shortest path from i, or NO_BOX
    Itinerary { num_boxes: usize, pred: Vec<u8> },
    /// raw bytes: per-row offset index table, then rows of next-box bytes
    Dense(Vec<u8>),
    /// raw bytes: per row, (lo, hi, dest) triples terminated by 0xFF
    RunLength(Vec<u8>),
}

impl BoxMatrix {
    /// Build the routing data appropriate for the room's version family.
    /// `raw` is the adjacency resource as loaded; the itinerary format
    /// ignores it and derives everything from box geometry. A room authored
    /// without adjacency bytes gets the computed itinerary in any family,
    /// so in-memory rooms route without hand-encoding a table.
    pub fn from_room(graph: &BoxGraph, raw: &[u8]) -> Result<BoxMatrix, String> {
        if raw.is_empty() {
            return BoxMatrix::itinerary(graph);
        }
        match graph.version().matrix_format() {
            MatrixFormat::Itinerary => BoxMatrix::itinerary(graph),
            MatrixFormat::Dense => Ok(BoxMatrix::Dense(raw.to_vec())),
            MatrixFormat::RunLength => Ok(BoxMatrix::RunLength(raw.to_vec())),
        }
    }

    /// Matrix for a roomless engine; any routing query is an error until a
    /// real room loads
    pub fn empty(graph: &BoxGraph) -> BoxMatrix {
        match graph.version().matrix_format() {
            MatrixFormat::Itinerary => BoxMatrix::Itinerary {
                num_boxes: 0,
                pred: Vec::new(),
            },
            MatrixFormat::Dense => BoxMatrix::Dense(Vec::new()),
            MatrixFormat::RunLength => BoxMatrix::RunLength(Vec::new()),
        }
    }

    /// All-pairs shortest-path closure over "1 if neighbor, else infinity",
    /// the Floyd-Warshall relaxation the oldest family ran at room load.
    pub fn itinerary(graph: &BoxGraph) -> Result<BoxMatrix, String> {
        let n = graph.num_boxes();
        if n > NO_BOX as usize {
            return Err(format!("Too many boxes for itinerary matrix: {n}"));
        }
        const INF: u32 = 0xFFFF;
        let mut dist = vec![INF; n * n];
        let mut pred = vec![NO_BOX; n * n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    dist[i * n + j] = 0;
                } else if graph.are_neighbors(i as u8, j as u8)? {
                    dist[i * n + j] = 1;
                    pred[i * n + j] = i as u8;
                }
            }
        }
        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    let through = dist[i * n + k].saturating_add(dist[k * n + j]);
                    if through < dist[i * n + j] {
                        dist[i * n + j] = through;
                        pred[i * n + j] = pred[k * n + j];
                    }
                }
            }
        }
        debug!("itinerary matrix built for {} boxes", n);
        Ok(BoxMatrix::Itinerary { num_boxes: n, pred })
    }

    /// Next box to step into to eventually reach `to` from `from`.
    ///
    /// `Ok(None)` is the normal "no path" outcome, not an error; malformed
    /// table data is an error. `get_next_box(a, a) == a` always.
    pub fn get_next_box(&self, from: u8, to: u8) -> Result<Option<u8>, String> {
        if from == to {
            return Ok(Some(to));
        }
        match self {
            BoxMatrix::Itinerary { num_boxes, pred } => {
                let n = *num_boxes;
                if from as usize >= n || to as usize >= n {
                    return Err(format!(
                        "getNextBox: box out of range (from {from}, to {to}, {n} boxes)"
                    ));
                }
                // Walk the itinerary chain from `to` backward until we hit
                // the box whose predecessor is `from`; that is the first hop.
                let mut cur = to;
                for _ in 0..n {
                    let p = pred[from as usize * n + cur as usize];
                    if p == NO_BOX {
                        return Ok(None);
                    }
                    if p == from {
                        return Ok(Some(cur));
                    }
                    cur = p;
                }
                Ok(None)
            }
            BoxMatrix::Dense(data) => {
                let offset = *data
                    .get(from as usize)
                    .ok_or_else(|| format!("Dense box matrix: no row index for box {from}"))?
                    as usize;
                let byte = *data
                    .get(offset + to as usize)
                    .ok_or_else(|| format!("Dense box matrix: row {from} truncated at {to}"))?;
                Ok(if byte == NO_BOX { None } else { Some(byte) })
            }
            BoxMatrix::RunLength(data) => {
                let mut pos = 0usize;
                // Skip the rows before `from`
                for _ in 0..from {
                    while *data
                        .get(pos)
                        .ok_or_else(|| "Run-length box matrix truncated".to_string())?
                        != NO_BOX
                    {
                        pos += 3;
                    }
                    pos += 1;
                }
                // Scan the whole row; the authoring tool allowed overlapping
                // ranges where a later entry overrides an earlier one, so the
                // last match wins.
                let mut found = None;
                while *data
                    .get(pos)
                    .ok_or_else(|| "Run-length box matrix truncated".to_string())?
                    != NO_BOX
                {
                    let lo = data[pos];
                    let hi = *data
                        .get(pos + 1)
                        .ok_or_else(|| "Run-length box matrix truncated".to_string())?;
                    let dest = *data
                        .get(pos + 2)
                        .ok_or_else(|| "Run-length box matrix truncated".to_string())?;
                    if lo <= to && to <= hi {
                        found = Some(dest);
                    }
                    pos += 3;
                }
                Ok(found)
            }
        }
    }
}

/// Move an arbitrary target point into the nearest legal box.
///
/// The iteration order is reversed between the oldest family (prefers
/// lower-numbered boxes) and all later families (prefer higher-numbered
/// ones); both are intentional and reproduced exactly. Invisible boxes are
/// skipped, except that player-only boxes stay candidates for the player.
/// An exact containment hit returns immediately; otherwise the running
/// minimum distance decides.
pub fn adjust_point_to_nearest_box(
    graph: &BoxGraph,
    p: Point,
    is_player: bool,
) -> Result<(Point, u8), String> {
    let n = graph.num_boxes();
    if n == 0 {
        return Err("adjustPointToNearestBox: room has no boxes".to_string());
    }
    let ids: Vec<u8> = if graph.version().box_search_ascending() {
        (0..n as u8).collect()
    } else {
        (0..n as u8).rev().collect()
    };

    let mut best: Option<(Point, u8, u32)> = None;
    for id in ids {
        let flags = graph.flags(id)?;
        if flags & BOX_INVISIBLE != 0 && !(flags & BOX_PLAYER_ONLY != 0 && is_player) {
            continue;
        }
        if graph.point_in_box(id, p)? {
            debug!("adjust_point: {} already inside box {}", p, id);
            return Ok((p, id));
        }
        let (q, dist) = graph.box_distance(id, p)?;
        match best {
            Some((_, _, bd)) if dist >= bd => {}
            _ => best = Some((q, id, dist)),
        }
    }
    let (q, id, dist) = best.ok_or_else(|| {
        "adjustPointToNearestBox: no candidate box (all invisible)".to_string()
    })?;
    debug!("adjust_point: {} -> {} in box {} (dist {})", p, q, id, dist);
    Ok((q, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::WalkBox;
    use crate::version::ScummVersion;

    fn line_graph(version: ScummVersion) -> BoxGraph {
        // Three boxes in a row: 0-1-2
        BoxGraph::new(
            vec![
                WalkBox::rect(0, 0, 100, 100),
                WalkBox::rect(100, 0, 200, 100),
                WalkBox::rect(200, 0, 300, 100),
            ],
            version,
        )
    }

    #[test]
    fn test_itinerary_routes_along_line() {
        let g = line_graph(ScummVersion::V0);
        let m = BoxMatrix::itinerary(&g).unwrap();
        assert_eq!(m.get_next_box(0, 2).unwrap(), Some(1));
        assert_eq!(m.get_next_box(0, 1).unwrap(), Some(1));
        assert_eq!(m.get_next_box(2, 0).unwrap(), Some(1));
        assert_eq!(m.get_next_box(1, 1).unwrap(), Some(1));
    }

    #[test]
    fn test_itinerary_reflexive_for_all() {
        let g = line_graph(ScummVersion::V0);
        let m = BoxMatrix::itinerary(&g).unwrap();
        for a in 0..3u8 {
            assert_eq!(m.get_next_box(a, a).unwrap(), Some(a));
        }
    }

    #[test]
    fn test_itinerary_disconnected_clusters() {
        // Two isolated clusters: {0,1} and {2,3}
        let g = BoxGraph::new(
            vec![
                WalkBox::rect(0, 0, 50, 50),
                WalkBox::rect(50, 0, 100, 50),
                WalkBox::rect(500, 0, 550, 50),
                WalkBox::rect(550, 0, 600, 50),
            ],
            ScummVersion::V0,
        );
        let m = BoxMatrix::itinerary(&g).unwrap();
        assert_eq!(m.get_next_box(0, 1).unwrap(), Some(1));
        assert_eq!(m.get_next_box(2, 3).unwrap(), Some(3));
        assert_eq!(m.get_next_box(0, 3).unwrap(), None);
        assert_eq!(m.get_next_box(3, 0).unwrap(), None);
    }

    #[test]
    fn test_from_room_without_bytes_routes_in_every_family() {
        // In-memory rooms carry no adjacency resource; every family must
        // still route through the computed itinerary
        for version in [
            ScummVersion::V0,
            ScummVersion::V2,
            ScummVersion::V5,
            ScummVersion::V8,
        ] {
            let g = line_graph(version);
            let m = BoxMatrix::from_room(&g, &[]).unwrap();
            assert_eq!(m.get_next_box(0, 2).unwrap(), Some(1));
            assert_eq!(m.get_next_box(2, 0).unwrap(), Some(1));
        }
    }

    #[test]
    fn test_dense_lookup() {
        // 3x3 matrix: offsets 3,6,9 then three rows
        let raw = vec![
            3, 6, 9, // row offsets
            0, 1, 1, // from 0
            0, 1, 2, // from 1
            1, 1, 2, // from 2
        ];
        let m = BoxMatrix::Dense(raw);
        assert_eq!(m.get_next_box(0, 2).unwrap(), Some(1));
        assert_eq!(m.get_next_box(2, 0).unwrap(), Some(1));
        assert_eq!(m.get_next_box(1, 1).unwrap(), Some(1));
    }

    #[test]
    fn test_dense_no_path_and_truncation() {
        let m = BoxMatrix::Dense(vec![2, 4, NO_BOX, NO_BOX, 0, 1]);
        assert_eq!(m.get_next_box(0, 1).unwrap(), None);
        // Row offset pointing past the table is malformed data
        let bad = BoxMatrix::Dense(vec![2, 40, 0, 1]);
        assert!(bad.get_next_box(1, 1).is_ok()); // reflexive short-circuits
        assert!(bad.get_next_box(1, 0).is_err());
    }

    #[test]
    fn test_run_length_last_match_wins() {
        // From box 0: 0..=5 -> 1, but 2..=3 overridden later to 2
        let raw = vec![
            0, 5, 1, 2, 3, 2, NO_BOX, // row 0
            0, 0, 0, NO_BOX, // row 1
        ];
        let m = BoxMatrix::RunLength(raw);
        assert_eq!(m.get_next_box(0, 1).unwrap(), Some(1));
        assert_eq!(m.get_next_box(0, 3).unwrap(), Some(2));
        assert_eq!(m.get_next_box(0, 5).unwrap(), Some(1));
        assert_eq!(m.get_next_box(0, 9).unwrap(), None);
        assert_eq!(m.get_next_box(1, 0).unwrap(), Some(0));
    }

    #[test]
    fn test_run_length_truncated_is_loud() {
        let m = BoxMatrix::RunLength(vec![0, 5]);
        assert!(m.get_next_box(0, 3).is_err());
    }

    #[test]
    fn test_adjust_point_containment_hit() {
        let g = line_graph(ScummVersion::V5);
        let (q, id) = adjust_point_to_nearest_box(&g, Point::new(150, 50), false).unwrap();
        assert_eq!(q, Point::new(150, 50));
        assert_eq!(id, 1);
    }

    #[test]
    fn test_adjust_point_nearest_fallback() {
        let g = line_graph(ScummVersion::V5);
        let (q, id) = adjust_point_to_nearest_box(&g, Point::new(320, 50), false).unwrap();
        assert_eq!(id, 2);
        assert_eq!(q, Point::new(300, 50));
    }

    #[test]
    fn test_adjust_point_search_order() {
        // Two identical stacked boxes: equidistant, tie broken by scan order
        let boxes = vec![WalkBox::rect(0, 0, 100, 100), WalkBox::rect(0, 0, 100, 100)];
        let g_old = BoxGraph::new(boxes.clone(), ScummVersion::V0);
        let g_new = BoxGraph::new(boxes, ScummVersion::V5);
        let p = Point::new(150, 50);
        assert_eq!(adjust_point_to_nearest_box(&g_old, p, false).unwrap().1, 0);
        assert_eq!(adjust_point_to_nearest_box(&g_new, p, false).unwrap().1, 1);
    }

    #[test]
    fn test_adjust_point_skips_invisible() {
        use crate::boxes::BOX_INVISIBLE;
        let g = BoxGraph::new(
            vec![
                WalkBox::rect(0, 0, 100, 100).with_flags(BOX_INVISIBLE),
                WalkBox::rect(100, 0, 200, 100),
            ],
            ScummVersion::V5,
        );
        let (_, id) = adjust_point_to_nearest_box(&g, Point::new(50, 50), false).unwrap();
        assert_eq!(id, 1);
    }
}
