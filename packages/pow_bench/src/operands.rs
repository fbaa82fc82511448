use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Precondition, Result};

/// Exclusive upper bound of the generated exponents.
///
/// Keeps `base.powf(exponent)` finite for every base the generator can produce.
pub const MAX_EXPONENT: f64 = 10.0;

/// The pair of input sequences that every strategy transforms.
///
/// Both sequences have the same nonzero length. The pair is immutable once created, so any number
/// of strategies (and their workers) can read it concurrently.
///
/// # Example
///
/// ```
/// use pow_bench::Operands;
///
/// let operands = Operands::new(vec![2.0, 3.0], vec![2.0, 3.0]).unwrap();
/// assert_eq!(operands.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Operands {
    bases: Box<[f64]>,
    exponents: Box<[f64]>,
}

impl Operands {
    /// Creates an operand pair from existing sequences.
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::EmptyInput`] if the sequences are empty and
    /// [`Precondition::LengthMismatch`] if their lengths differ.
    pub fn new(bases: impl Into<Box<[f64]>>, exponents: impl Into<Box<[f64]>>) -> Result<Self> {
        let bases = bases.into();
        let exponents = exponents.into();

        if bases.len() != exponents.len() {
            return Err(Precondition::LengthMismatch {
                left: bases.len(),
                right: exponents.len(),
            }
            .into());
        }

        if bases.is_empty() {
            return Err(Precondition::EmptyInput.into());
        }

        Ok(Self { bases, exponents })
    }

    /// Generates `len` random operand pairs, seeded from the wall clock.
    ///
    /// Bases are drawn from `[0, len)` and exponents from `[0, MAX_EXPONENT)`. Two calls are not
    /// expected to produce the same values.
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::EmptyInput`] if `len` is zero.
    pub fn generate(len: usize) -> Result<Self> {
        Self::generate_with_seed(len, wall_clock_seed())
    }

    /// Generates `len` random operand pairs from a fixed seed.
    ///
    /// Same bounds as [`generate()`][Self::generate] but reproducible, which is what benchmarks
    /// and tests want.
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::EmptyInput`] if `len` is zero.
    #[expect(
        clippy::cast_precision_loss,
        reason = "the upper bound of the bases does not need to be exact"
    )]
    pub fn generate_with_seed(len: usize, seed: u64) -> Result<Self> {
        if len == 0 {
            return Err(Precondition::EmptyInput.into());
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let max_base = len as f64;

        let bases = (0..len)
            .map(|_| rng.random_range(0.0..max_base))
            .collect::<Box<[_]>>();
        let exponents = (0..len)
            .map(|_| rng.random_range(0.0..MAX_EXPONENT))
            .collect::<Box<[_]>>();

        Ok(Self { bases, exponents })
    }

    /// The bases, `a` in `a^b`.
    #[must_use]
    pub fn bases(&self) -> &[f64] {
        &self.bases
    }

    /// The exponents, `b` in `a^b`.
    #[must_use]
    pub fn exponents(&self) -> &[f64] {
        &self.exponents
    }

    /// Number of operand pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// Always `false`, operand pairs are never empty. Provided for API completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            elapsed.as_secs() ^ u64::from(elapsed.subsec_nanos()).rotate_left(32)
        })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::Error;

    assert_impl_all!(Operands: Send, Sync);

    #[test]
    fn new_rejects_length_mismatch() {
        let result = Operands::new(vec![1.0, 2.0], vec![1.0]);

        assert!(matches!(
            result,
            Err(Error::PreconditionViolation(Precondition::LengthMismatch {
                left: 2,
                right: 1
            }))
        ));
    }

    #[test]
    fn new_rejects_empty() {
        let result = Operands::new(Vec::new(), Vec::new());

        assert!(matches!(
            result,
            Err(Error::PreconditionViolation(Precondition::EmptyInput))
        ));
    }

    #[test]
    fn generate_rejects_zero_len() {
        assert!(matches!(
            Operands::generate(0),
            Err(Error::PreconditionViolation(Precondition::EmptyInput))
        ));
    }

    #[test]
    fn generated_values_respect_bounds() {
        let operands = Operands::generate(1000).unwrap();

        assert_eq!(operands.len(), 1000);
        assert_eq!(operands.exponents().len(), 1000);
        assert!(operands.bases().iter().all(|b| (0.0..1000.0).contains(b)));
        assert!(
            operands
                .exponents()
                .iter()
                .all(|e| (0.0..MAX_EXPONENT).contains(e))
        );
    }

    #[test]
    fn generated_powers_are_finite() {
        let operands = Operands::generate_with_seed(10_000, 7).unwrap();

        assert!(
            operands
                .bases()
                .iter()
                .zip(operands.exponents())
                .all(|(b, e)| b.powf(*e).is_finite())
        );
    }

    #[test]
    fn same_seed_same_operands() {
        let first = Operands::generate_with_seed(64, 42).unwrap();
        let second = Operands::generate_with_seed(64, 42).unwrap();

        assert_eq!(first, second);
    }
}
