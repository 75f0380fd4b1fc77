//! Shared helpers for the CPU backend integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `len` uniform values in `[-2, 2)` from a fixed seed.
pub fn random_data(seed: u64, len: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-2.0..2.0)).collect()
}

/// Like [`random_data`] for a 3-vector field, with every `zero_every`-th
/// cell set to the zero vector.
pub fn random_vectors(seed: u64, cells: usize, zero_every: usize) -> Vec<f32> {
    let mut data = random_data(seed, 3 * cells);
    for cell in (0..cells).step_by(zero_every.max(1)) {
        for c in 0..3 {
            data[cell + c * cells] = 0.0;
        }
    }
    data
}

pub fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol,
            "mismatch at {i}: got {a}, expected {e}"
        );
    }
}

/// Magnitude of cell `i` of a component-major 3-vector field.
pub fn magnitude(data: &[f32], i: usize) -> f32 {
    let n = data.len() / 3;
    (data[i] * data[i] + data[i + n] * data[i + n] + data[i + 2 * n] * data[i + 2 * n]).sqrt()
}
