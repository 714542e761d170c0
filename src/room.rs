/// Room resources as the walk layer consumes them.
///
/// The resource loader proper (file formats, decompression) is outside this
/// crate; a `RoomPlan` is the already-decoded contract surface: the walk
/// boxes, the raw adjacency bytes in whatever layout the version uses, and
/// the room's pixel dimensions.
use crate::boxes::{BoxGraph, WalkBox};
use crate::path::BoxMatrix;
use crate::version::ScummVersion;

pub struct RoomPlan {
    pub boxes: Vec<WalkBox>,
    /// Adjacency bytes in the version's on-disk layout; empty means the
    /// itinerary is computed from box geometry instead
    pub matrix_bytes: Vec<u8>,
    pub width: i32,
    pub height: i32,
}

impl RoomPlan {
    pub fn new(boxes: Vec<WalkBox>, width: i32, height: i32) -> RoomPlan {
        RoomPlan {
            boxes,
            matrix_bytes: Vec::new(),
            width,
            height,
        }
    }

    pub fn with_matrix(mut self, bytes: Vec<u8>) -> RoomPlan {
        self.matrix_bytes = bytes;
        self
    }

    /// Build the graph and routing matrix the walk layer runs against
    pub fn load(&self, version: ScummVersion) -> Result<(BoxGraph, BoxMatrix), String> {
        log::debug!(
            "Loading room plan: {} boxes, {}x{} px, {} matrix bytes",
            self.boxes.len(),
            self.width,
            self.height,
            self.matrix_bytes.len()
        );
        let graph = BoxGraph::new(self.boxes.clone(), version);
        let matrix = BoxMatrix::from_room(&graph, &self.matrix_bytes)?;
        Ok((graph, matrix))
    }
}
