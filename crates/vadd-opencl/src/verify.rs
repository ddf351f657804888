//! Host-side check of device results.

use serde::Serialize;
use std::fmt;

/// Default acceptance threshold.
pub const DEFAULT_TOLERANCE: f64 = vadd_common::config::DEFAULT_TOLERANCE;

/// One rejected element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mismatch {
    pub index: usize,
    pub a: f32,
    pub b: f32,
    pub actual: f32,
    pub expected: f32,
    pub deviation: f32,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " tmp {:.6} h_a {:.6} h_b {:.6} h_c {:.6} ",
            self.deviation, self.a, self.b, self.actual
        )
    }
}

/// Outcome of checking every element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub accepted: usize,
    pub total: usize,
    pub tolerance: f64,
    pub mismatches: Vec<Mismatch>,
}

impl Verification {
    pub fn all_correct(&self) -> bool {
        self.accepted == self.total
    }

    pub fn summary(&self) -> String {
        format!("C = A+B: {} out of {} results were correct.", self.accepted, self.total)
    }
}

/// Check `c[i]` against `a[i] + b[i]` for every `i`.
///
/// The deviation is computed in `f32`, squared in `f64`, and must be
/// strictly below `tolerance^2`. NaN deviations are rejected.
///
/// # Panics
///
/// If the three slices differ in length.
pub fn verify(a: &[f32], b: &[f32], c: &[f32], tolerance: f64) -> Verification {
    assert!(
        a.len() == b.len() && b.len() == c.len(),
        "verify inputs differ in length: a={} b={} c={}",
        a.len(),
        b.len(),
        c.len()
    );
    let limit = tolerance * tolerance;
    let mut mismatches = Vec::new();
    for (index, ((&a, &b), &actual)) in a.iter().zip(b).zip(c).enumerate() {
        let expected = a + b;
        let deviation = expected - actual;
        let squared = f64::from(deviation) * f64::from(deviation);
        let within = squared < limit;
        if !within {
            mismatches.push(Mismatch { index, a, b, actual, expected, deviation });
        }
    }
    Verification {
        accepted: c.len() - mismatches.len(),
        total: c.len(),
        tolerance,
        mismatches,
    }
}
