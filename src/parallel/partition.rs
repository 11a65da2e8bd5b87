//! Static partitioning of a ragged index space
//!
//! Pre-computes, for each of up to [`MAX_TASKS`](super::MAX_TASKS) tasks, the
//! (outer, inner) start coordinate of its contiguous flattened range. The
//! sweep is a single pass over the outer sequence: O(L + T), no allocation
//! beyond the two fixed tables.
//!
//! Author: Moroya Sakamoto

use std::ops::Range;

use super::{Ragged, MAX_TASKS};

/// Start coordinates and task count for one nested-parallel dispatch
///
/// Task `t` owns the flattened range `[t*N/T, (t+1)*N/T)`; ranges are
/// disjoint, contiguous, cover `[0, N)`, and differ in size by at most one.
/// `task_start(t)` names the sub-array and inner offset holding the first
/// element of task `t`'s range. Boundaries landing at the exact end of a
/// sub-array advance to the next sub-array that still has elements, so a
/// start offset always satisfies `j0 < len(A_i)` while the range is
/// non-empty.
#[derive(Debug, Clone)]
pub struct NestedPartition {
    i0: [usize; MAX_TASKS],
    j0: [usize; MAX_TASKS],
    task_count: usize,
    total: usize,
}

impl NestedPartition {
    /// Partition for the rayon pool's thread count
    pub fn new<R: Ragged + ?Sized>(ragged: &R, min_step: usize) -> Self {
        Self::with_threads(ragged, min_step, rayon::current_num_threads())
    }

    /// Partition for an explicit thread count
    ///
    /// The task count is `max(1, min(num_threads, ceil(N/min_step),
    /// MAX_TASKS))`; an empty input yields one task owning an empty range.
    pub fn with_threads<R: Ragged + ?Sized>(
        ragged: &R,
        min_step: usize,
        num_threads: usize,
    ) -> Self {
        let min_step = min_step.max(1);

        let total: usize = (0..ragged.len()).map(|i| ragged.sub_len(i)).sum();
        let blocks = total.div_ceil(min_step);
        let task_count = num_threads.min(blocks).min(MAX_TASKS).max(1);

        let mut i0 = [0usize; MAX_TASKS];
        let mut j0 = [0usize; MAX_TASKS];

        // One sweep: for every boundary k_t = t*N/T, record the sub-array
        // containing the element at flattened index k_t.
        let mut t = 0;
        let mut boundary = 0;
        let mut prefix = 0;
        for i in 0..ragged.len() {
            if t == task_count {
                break;
            }
            let n = ragged.sub_len(i);
            while t < task_count && boundary < prefix + n {
                i0[t] = i;
                j0[t] = boundary - prefix;
                t += 1;
                boundary = t * total / task_count;
            }
            prefix += n;
        }

        NestedPartition {
            i0,
            j0,
            task_count,
            total,
        }
    }

    /// Number of tasks in this partition
    #[inline]
    pub fn task_count(&self) -> usize {
        self.task_count
    }

    /// Total number of flattened elements
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Flattened index range owned by task `t`
    #[inline]
    pub fn task_range(&self, t: usize) -> Range<usize> {
        let k0 = t * self.total / self.task_count;
        let k1 = (t + 1) * self.total / self.task_count;
        k0..k1
    }

    /// (outer index, inner offset) of the first element of task `t`
    #[inline]
    pub fn task_start(&self, t: usize) -> (usize, usize) {
        (self.i0[t], self.j0[t])
    }
}
