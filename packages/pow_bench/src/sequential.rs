use crate::transform::apply;
use crate::{Operands, Result, Strategy, StrategyKind};

/// Computes the transform on the calling thread, strictly in index order.
///
/// This is the ground truth that the parallel strategies are checked against.
///
/// # Example
///
/// ```
/// use pow_bench::{Operands, Sequential, Strategy};
///
/// let operands = Operands::new(vec![2.0, 3.0, 4.0], vec![2.0, 2.0, 2.0]).unwrap();
/// let result = Sequential.compute(&operands).unwrap();
///
/// assert_eq!(&*result, &[4.0, 9.0, 16.0]);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Sequential;

impl Strategy for Sequential {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sequential
    }

    fn compute(&self, operands: &Operands) -> Result<Box<[f64]>> {
        let mut result = vec![0.0; operands.len()].into_boxed_slice();

        apply(operands.bases(), operands.exponents(), &mut result);

        Ok(result)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn computes_every_index() {
        let operands = Operands::new(vec![1.5, 0.0, 10.0], vec![2.0, 0.0, 3.0]).unwrap();

        let result = Sequential.compute(&operands).unwrap();

        assert_eq!(&*result, &[2.25, 1.0, 1000.0]);
    }

    #[test]
    fn reports_kind() {
        assert_eq!(Sequential.kind(), StrategyKind::Sequential);
    }
}
