//! Host-side input and output vectors.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The three host vectors of one run. All share one length.
#[derive(Debug, Clone, PartialEq)]
pub struct HostVectors {
    pub a: Vec<f32>,
    pub b: Vec<f32>,
    pub c: Vec<f32>,
}

impl HostVectors {
    /// `a` and `b` filled with seeded values in `[0, 1]`, `c` zeroed.
    pub fn random(len: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let a = (0..len).map(|_| rng.gen_range(0.0f32..=1.0)).collect();
        let b = (0..len).map(|_| rng.gen_range(0.0f32..=1.0)).collect();
        Self { a, b, c: vec![0.0; len] }
    }

    /// Fixed inputs with a zeroed output.
    ///
    /// # Panics
    ///
    /// If `a` and `b` differ in length.
    pub fn from_inputs(a: Vec<f32>, b: Vec<f32>) -> Self {
        assert_eq!(a.len(), b.len(), "input vectors differ in length");
        let c = vec![0.0; a.len()];
        Self { a, b, c }
    }

    pub fn len(&self) -> usize {
        self.c.len()
    }

    pub fn is_empty(&self) -> bool {
        self.c.is_empty()
    }
}
