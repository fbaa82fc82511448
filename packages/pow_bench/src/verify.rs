use std::fmt;

use crate::{Precondition, Result};

/// Largest absolute difference at which two result values are still considered equal.
pub const EPSILON: f64 = 1e-6;

/// Outcome of comparing a result sequence against the reference.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum Verification {
    /// Every value is within [`EPSILON`] of the reference.
    Match,

    /// The first index at which the values differ by more than [`EPSILON`].
    Mismatch {
        /// Index of the first differing value.
        index: usize,

        /// The reference value at `index`.
        expected: f64,

        /// The compared value at `index`.
        actual: f64,
    },
}

impl Verification {
    /// Whether the sequences matched.
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => write!(f, "results match"),
            Self::Mismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "mismatch at index {index} (expected {expected}, got {actual})"
            ),
        }
    }
}

/// Compares `actual` against `expected` value by value, in index order.
///
/// Stops at the first pair whose absolute difference exceeds [`EPSILON`]. Identical values always
/// match, including equal infinities and two NaNs. A NaN paired with a number never matches.
///
/// # Errors
///
/// Returns [`Precondition::LengthMismatch`] if the sequences differ in length. Nothing is compared
/// in that case.
///
/// # Example
///
/// ```
/// use pow_bench::{Verification, verify};
///
/// assert_eq!(verify(&[1.0, 2.0], &[1.0, 2.0]).unwrap(), Verification::Match);
/// assert_eq!(
///     verify(&[1.0, 2.0], &[1.0, 2.5]).unwrap(),
///     Verification::Mismatch {
///         index: 1,
///         expected: 2.0,
///         actual: 2.5
///     }
/// );
/// ```
pub fn verify(expected: &[f64], actual: &[f64]) -> Result<Verification> {
    if expected.len() != actual.len() {
        return Err(Precondition::LengthMismatch {
            left: expected.len(),
            right: actual.len(),
        }
        .into());
    }

    let mismatch = expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (expected, actual))| !within_epsilon(**expected, **actual));

    Ok(match mismatch {
        Some((index, (expected, actual))) => Verification::Mismatch {
            index,
            expected: *expected,
            actual: *actual,
        },
        None => Verification::Match,
    })
}

fn within_epsilon(a: f64, b: f64) -> bool {
    // Identical values are equal even where subtracting them gives NaN (infinities, NaN itself).
    if a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()) {
        return true;
    }

    // Any other pair involving NaN lands on the "not equal" side.
    (a - b).abs() <= EPSILON
}
