use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

/// RandMode controls random generator behaviour. May be predictable for testing or truly random for gameplay
pub enum RandMode {
    Predictable,
    RandomUniform,
}

pub struct SRand {
    rng: Box<dyn RngCore>,
    rand_mode: RandMode,
}

impl SRand {
    pub fn new(rm: RandMode) -> SRand {
        SRand {
            rng: Box::new(rand::thread_rng()),
            rand_mode: rm,
        }
    }

    pub fn new_uniform() -> SRand {
        SRand::new(RandMode::RandomUniform)
    }

    pub fn new_predictable(seed: u64) -> SRand {
        SRand {
            rng: Box::new(StdRng::seed_from_u64(seed)),
            rand_mode: RandMode::Predictable,
        }
    }

    pub fn is_predictable(&self) -> bool {
        matches!(self.rand_mode, RandMode::Predictable)
    }

    /// Generates a value in [0..=max], the range getRandomNumber exposes
    pub fn gen_range_inclusive(&mut self, max: i32) -> i32 {
        if max <= 0 {
            return 0;
        }
        self.rng.gen_range(0..=max)
    }
}
