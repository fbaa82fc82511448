/// The element transform computed by every strategy: `base` raised to `exponent`.
#[inline]
#[must_use]
pub fn power(base: f64, exponent: f64) -> f64 {
    base.powf(exponent)
}

/// Applies [`power()`] to each pair of `bases` and `exponents` in index order, writing into `out`.
///
/// # Panics
///
/// Panics if the three slices do not have the same length.
pub fn apply(bases: &[f64], exponents: &[f64], out: &mut [f64]) {
    assert_eq!(bases.len(), exponents.len(), "operand slices must match");
    assert_eq!(bases.len(), out.len(), "output slice must match operands");

    for ((slot, base), exponent) in out.iter_mut().zip(bases).zip(exponents) {
        *slot = power(*base, *exponent);
    }
}
