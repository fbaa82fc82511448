use std::ops::Range;

use num_integer::Integer;

use crate::{Precondition, Result};

/// Division of the index domain `0..len` into one contiguous range per worker.
///
/// Every range but the last has `len / workers` elements. The last range additionally absorbs the
/// `len % workers` leftover elements, so the work is not perfectly balanced when `len` is not a
/// multiple of `workers`.
///
/// # Example
///
/// ```
/// use pow_bench::Partition;
///
/// let partition = Partition::plan(10, 3).unwrap();
///
/// assert_eq!(partition.ranges(), &[0..3, 3..6, 6..10]);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Partition {
    ranges: Box<[Range<usize>]>,
    len: usize,
}

impl Partition {
    /// Plans the ranges for distributing `len` elements between `workers` workers.
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::EmptyInput`] if `len` is zero and [`Precondition::WorkerCount`]
    /// if `workers` is not in `1..=len`.
    pub fn plan(len: usize, workers: usize) -> Result<Self> {
        if len == 0 {
            return Err(Precondition::EmptyInput.into());
        }

        if workers == 0 || workers > len {
            return Err(Precondition::WorkerCount { workers, len }.into());
        }

        let (base_size, _) = len.div_rem(&workers);

        let mut ranges = Vec::with_capacity(workers);
        let mut start = 0_usize;

        for worker in 0..workers {
            // The last range extends to the end of the domain, absorbing the remainder.
            let end = if worker == workers.wrapping_sub(1) {
                len
            } else {
                start
                    .checked_add(base_size)
                    .expect("ranges never extend past len, which is a usize")
            };

            ranges.push(start..end);
            start = end;
        }

        Ok(Self {
            ranges: ranges.into_boxed_slice(),
            len,
        })
    }

    /// The ranges, ordered by worker index.
    #[must_use]
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// The number of workers (and ranges).
    #[must_use]
    pub fn workers(&self) -> usize {
        self.ranges.len()
    }

    /// The size of the index domain covered by the partition.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`, a partition never covers an empty domain. Provided for API completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Splits `data` into one shared slice per range, in worker order.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not have exactly [`len()`][Self::len] elements.
    pub fn split<'a, T>(&self, data: &'a [T]) -> impl Iterator<Item = &'a [T]> {
        assert_eq!(data.len(), self.len, "data must cover the partitioned domain");

        self.ranges.iter().map(move |range| {
            data.get(range.clone())
                .expect("ranges are within the domain, guarded by the length assertion")
        })
    }

    /// Splits `data` into one exclusive slice per range, in worker order.
    ///
    /// The slices are disjoint, so each can be handed to a different worker without any
    /// synchronization between them.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not have exactly [`len()`][Self::len] elements.
    pub fn split_mut<'a, T>(&self, data: &'a mut [T]) -> Vec<&'a mut [T]> {
        assert_eq!(data.len(), self.len, "data must cover the partitioned domain");

        let mut remaining = data;
        let mut slices = Vec::with_capacity(self.ranges.len());

        for range in &self.ranges {
            let (head, tail) = remaining.split_at_mut(range.len());
            slices.push(head);
            remaining = tail;
        }

        slices
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::Error;

    fn assert_covers_domain(partition: &Partition, len: usize) {
        let ranges = partition.ranges();

        assert_eq!(ranges.first().map(|r| r.start), Some(0));
        assert_eq!(ranges.last().map(|r| r.end), Some(len));

        for pair in ranges.windows(2) {
            let [left, right] = pair else {
                unreachable!("windows(2) always yields pairs");
            };
            assert_eq!(left.end, right.start);
        }

        assert_eq!(ranges.iter().map(ExactSizeIterator::len).sum::<usize>(), len);
    }

    #[test]
    fn remainder_goes_to_last_range() {
        let partition = Partition::plan(10, 3).unwrap();

        assert_eq!(partition.ranges(), &[0..3, 3..6, 6..10]);
        assert_covers_domain(&partition, 10);
    }

    #[test]
    fn remainder_is_not_spread() {
        // 11 = 4 * 2 + 3, an even spread would give sizes 3, 3, 3, 2.
        let partition = Partition::plan(11, 4).unwrap();

        let sizes = partition
            .ranges()
            .iter()
            .map(ExactSizeIterator::len)
            .collect::<Vec<_>>();

        assert_eq!(sizes, [2, 2, 2, 5]);
    }

    #[test]
    fn one_worker_takes_everything() {
        let partition = Partition::plan(17, 1).unwrap();

        assert_eq!(partition.ranges(), &[0..17]);
    }

    #[test]
    fn as_many_workers_as_elements_gives_singletons() {
        let partition = Partition::plan(5, 5).unwrap();

        assert_eq!(partition.ranges(), &[0..1, 1..2, 2..3, 3..4, 4..5]);
    }

    #[test]
    fn covers_domain_for_many_shapes() {
        for len in 1..=64 {
            for workers in 1..=len {
                let partition = Partition::plan(len, workers).unwrap();

                assert_eq!(partition.workers(), workers);
                assert_covers_domain(&partition, len);

                let last = partition.ranges().last().unwrap();
                assert_eq!(last.len(), len / workers + len % workers);
            }
        }
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(matches!(
            Partition::plan(10, 0),
            Err(Error::PreconditionViolation(Precondition::WorkerCount {
                workers: 0,
                len: 10
            }))
        ));
    }

    #[test]
    fn rejects_more_workers_than_elements() {
        assert!(matches!(
            Partition::plan(3, 4),
            Err(Error::PreconditionViolation(Precondition::WorkerCount {
                workers: 4,
                len: 3
            }))
        ));
    }

    #[test]
    fn rejects_empty_domain() {
        assert!(matches!(
            Partition::plan(0, 1),
            Err(Error::PreconditionViolation(Precondition::EmptyInput))
        ));
    }

    #[test]
    fn split_mut_yields_disjoint_slices() {
        let partition = Partition::plan(7, 3).unwrap();
        let mut data = [0_usize; 7];

        for (worker, slice) in partition.split_mut(&mut data).into_iter().enumerate() {
            slice.fill(worker);
        }

        assert_eq!(data, [0, 0, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn split_matches_ranges() {
        let partition = Partition::plan(5, 2).unwrap();
        let data = [1, 2, 3, 4, 5];

        let slices = partition.split(&data).collect::<Vec<_>>();

        assert_eq!(slices, [&[1, 2][..], &[3, 4, 5][..]]);
    }

    #[test]
    #[should_panic]
    fn split_mut_rejects_wrong_length() {
        let partition = Partition::plan(5, 2).unwrap();
        let mut data = [0; 4];

        drop(partition.split_mut(&mut data));
    }
}
