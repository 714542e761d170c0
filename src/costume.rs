/// Narrow callback contract toward the costume/animation subsystem.
///
/// The walk state machines drive animation purely through these two hooks;
/// the animator needs no geometry knowledge.
pub trait CostumeAnimator {
    /// The actor's quantized facing changed to `new_dir` (degrees)
    fn on_facing_changed(&mut self, actor_id: u8, new_dir: i32);
    /// The actor advanced its position this tick
    fn on_walk_frame(&mut self, actor_id: u8);
}

/// Default animator that ignores all callbacks
pub struct NullAnimator;

impl CostumeAnimator for NullAnimator {
    fn on_facing_changed(&mut self, _actor_id: u8, _new_dir: i32) {}
    fn on_walk_frame(&mut self, _actor_id: u8) {}
}

/// Records every callback, for tests
#[derive(Default)]
pub struct RecordingAnimator {
    pub facing_changes: Vec<(u8, i32)>,
    pub walk_frames: Vec<u8>,
}

impl CostumeAnimator for RecordingAnimator {
    fn on_facing_changed(&mut self, actor_id: u8, new_dir: i32) {
        self.facing_changes.push((actor_id, new_dir));
    }

    fn on_walk_frame(&mut self, actor_id: u8) {
        self.walk_frames.push(actor_id);
    }
}
