//! Nested-parallel iteration over ragged collections (Deep Fried Edition)
//!
//! Load-balances an "array of arrays" onto the rayon pool: the flattened
//! index space is split into at most [`MAX_TASKS`] exactly balanced
//! contiguous ranges, each task walking its range one intra-sub-array
//! sub-range at a time. Scene build and refit passes use this to traverse
//! "every geometry's primitive list" without scanning for sizes at dispatch
//! time.
//!
//! # Deep Fried Optimizations
//! - **Static Partitioning**: start coordinates are precomputed in one O(L+T)
//!   sweep; tasks never scan or steal.
//! - **Monomorphised Kernels**: kernels are generic parameters, not trait
//!   objects; no virtual dispatch inside the task loop.
//! - **Inline Single-Task Path**: a one-task dispatch runs on the calling
//!   thread without touching the pool.
//!
//! A kernel that panics aborts the dispatch: sibling tasks run to completion
//! and the panic resurfaces on the calling thread after the join.
//!
//! Author: Moroya Sakamoto

use std::ops::Range;

use rayon::prelude::*;

mod partition;

pub use partition::NestedPartition;

/// Ceiling on the number of tasks one dispatch fans out to
///
/// An implementation knob, not a contract: callers must not assume its
/// value.
pub const MAX_TASKS: usize = 32;

/// Sized sub-array of a ragged collection
pub trait SubArray {
    /// Number of elements in this sub-array
    fn len(&self) -> usize;

    /// True when the sub-array holds no elements
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> SubArray for [T] {
    #[inline]
    fn len(&self) -> usize {
        <[T]>::len(self)
    }
}

impl<T> SubArray for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// Indexable view of a ragged collection: a sequence of optional sub-arrays
///
/// An absent entry has length zero and is skipped by the drivers; only the
/// prefix-sum sweep ever looks at it.
pub trait Ragged {
    /// Sub-array payload handed to kernels
    type Sub: SubArray + ?Sized;

    /// Number of outer entries
    fn len(&self) -> usize;

    /// Sub-array at `i`, or `None` when the entry is absent
    fn get(&self, i: usize) -> Option<&Self::Sub>;

    /// Length of entry `i`; absent entries report zero
    #[inline]
    fn sub_len(&self, i: usize) -> usize {
        self.get(i).map_or(0, SubArray::len)
    }

    /// True when there are no outer entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Ragged for [Vec<T>] {
    type Sub = Vec<T>;

    #[inline]
    fn len(&self) -> usize {
        <[Vec<T>]>::len(self)
    }

    #[inline]
    fn get(&self, i: usize) -> Option<&Vec<T>> {
        <[Vec<T>]>::get(self, i)
    }
}

impl<T> Ragged for Vec<Vec<T>> {
    type Sub = Vec<T>;

    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn get(&self, i: usize) -> Option<&Vec<T>> {
        self.as_slice().get(i)
    }
}

impl<A: SubArray> Ragged for [Option<A>] {
    type Sub = A;

    #[inline]
    fn len(&self) -> usize {
        <[Option<A>]>::len(self)
    }

    #[inline]
    fn get(&self, i: usize) -> Option<&A> {
        <[Option<A>]>::get(self, i)?.as_ref()
    }
}

impl<A: SubArray> Ragged for Vec<Option<A>> {
    type Sub = A;

    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn get(&self, i: usize) -> Option<&A> {
        self.as_slice().get(i)?.as_ref()
    }
}

/// Kernel capability for the nested drivers
///
/// `apply` receives a sub-array, an index range inside it, and the flattened
/// index of the range's first element. Closures of the matching shape
/// implement it; named types can implement it directly for kernels with
/// state.
pub trait NestedKernel<Sub: ?Sized> {
    /// Kernel result; folded by [`reduce_nested`], discarded by
    /// [`for_each_nested`]
    type Output;

    /// Process `sub[range]`, whose first element has flattened index `base`
    fn apply(&self, sub: &Sub, range: Range<usize>, base: usize) -> Self::Output;
}

impl<Sub: ?Sized, F, T> NestedKernel<Sub> for F
where
    F: Fn(&Sub, Range<usize>, usize) -> T,
{
    type Output = T;

    #[inline]
    fn apply(&self, sub: &Sub, range: Range<usize>, base: usize) -> T {
        self(sub, range, base)
    }
}

/// Walk task `t`'s flattened range, visiting each maximal intra-sub-array
/// sub-range it intersects. Sub-ranges are guaranteed non-empty.
fn walk_task<R, F>(ragged: &R, part: &NestedPartition, t: usize, mut visit: F)
where
    R: Ragged + ?Sized,
    F: FnMut(&R::Sub, Range<usize>, usize),
{
    let span = part.task_range(t);
    let (start_i, start_j) = part.task_start(t);

    let mut k = span.start;
    let mut i = start_i;
    let mut j = start_j;
    while k < span.end && i < ragged.len() {
        let n = ragged.sub_len(i);
        let r0 = j;
        let r1 = n.min(r0 + (span.end - k));
        if r1 > r0 {
            if let Some(sub) = ragged.get(i) {
                visit(sub, r0..r1, k);
            }
            k += r1 - r0;
        }
        j = 0;
        i += 1;
    }
}

/// Parallel iteration over every element of a ragged collection
///
/// Builds a [`NestedPartition`] for `min_step`-grained tasks and dispatches
/// them onto the rayon pool. The kernel is called once per maximal
/// intra-sub-array sub-range a task owns, with the flattened index of the
/// sub-range's first element; within one task the flattened order is
/// preserved, across tasks no order is guaranteed.
///
/// # Arguments
/// * `ragged` - The ragged collection
/// * `min_step` - Smallest number of elements worth a task of its own
/// * `kernel` - `(sub_array, range, base_index)` kernel; effects must be
///   disjoint across tasks
pub fn for_each_nested<R, K>(ragged: &R, min_step: usize, kernel: K)
where
    R: Ragged + Sync + ?Sized,
    R::Sub: Sync,
    K: NestedKernel<R::Sub> + Sync,
{
    let part = NestedPartition::new(ragged, min_step);

    if part.task_count() == 1 {
        walk_task(ragged, &part, 0, |sub, range, base| {
            kernel.apply(sub, range, base);
        });
        return;
    }

    (0..part.task_count()).into_par_iter().for_each(|t| {
        walk_task(ragged, &part, t, |sub, range, base| {
            kernel.apply(sub, range, base);
        });
    });
}

/// Parallel reduction over every element of a ragged collection
///
/// Dispatch matches [`for_each_nested`]. Every kernel result is folded into
/// its task's accumulator with `combine` (seeded by `identity`), and the
/// per-task values are folded in task-index order afterwards, again seeded
/// by `identity`. `combine` must be associative; commutativity is not
/// required.
///
/// # Arguments
/// * `ragged` - The ragged collection
/// * `min_step` - Smallest number of elements worth a task of its own
/// * `identity` - Identity value of `combine`
/// * `kernel` - `(sub_array, range, base_index) -> value` kernel
/// * `combine` - Associative combiner
///
/// # Returns
/// The folded value over all sub-ranges
pub fn reduce_nested<R, K, V, C>(
    ragged: &R,
    min_step: usize,
    identity: V,
    kernel: K,
    combine: C,
) -> V
where
    R: Ragged + Sync + ?Sized,
    R::Sub: Sync,
    K: NestedKernel<R::Sub, Output = V> + Sync,
    V: Clone + Send + Sync,
    C: Fn(V, V) -> V + Sync,
{
    let part = NestedPartition::new(ragged, min_step);

    let fold_task = |t: usize| {
        let mut acc = identity.clone();
        walk_task(ragged, &part, t, |sub, range, base| {
            let value = kernel.apply(sub, range, base);
            acc = combine(acc.clone(), value);
        });
        acc
    };

    if part.task_count() == 1 {
        return fold_task(0);
    }

    let per_task: Vec<V> = (0..part.task_count())
        .into_par_iter()
        .map(fold_task)
        .collect();

    per_task.into_iter().fold(identity, |a, b| combine(a, b))
}

/// Sequential fallback with the same kernel signature
///
/// Visits each non-empty sub-array once with its full range. `min_step` is
/// accepted for signature parity with [`for_each_nested`] and has no effect
/// on a sequential walk.
pub fn sequential_for_each_nested<R, K>(ragged: &R, _min_step: usize, kernel: K)
where
    R: Ragged + ?Sized,
    K: NestedKernel<R::Sub>,
{
    let mut k = 0;
    for i in 0..ragged.len() {
        let n = ragged.sub_len(i);
        if n > 0 {
            if let Some(sub) = ragged.get(i) {
                kernel.apply(sub, 0..n, k);
            }
        }
        k += n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_for_each_visits_every_element_once() {
        let arrays = vec![vec![10u32, 11, 12], vec![], vec![20, 21], vec![30]];
        let visited = Mutex::new(Vec::new());

        for_each_nested(&arrays, 1, |sub: &Vec<u32>, range: Range<usize>, base: usize| {
            let mut guard = visited.lock().unwrap();
            for (offset, idx) in range.clone().enumerate() {
                guard.push((base + offset, sub[idx]));
            }
        });

        let mut seen = visited.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(
            seen,
            vec![(0, 10), (1, 11), (2, 12), (3, 20), (4, 21), (5, 30)]
        );
    }

    #[test]
    fn test_for_each_with_absent_entries() {
        let arrays: Vec<Option<Vec<u32>>> =
            vec![Some(vec![1, 2]), None, Some(vec![3]), None, Some(vec![4, 5])];
        let sum = AtomicUsize::new(0);

        for_each_nested(&arrays, 1, |sub: &Vec<u32>, range: Range<usize>, _base: usize| {
            let partial: u32 = range.clone().map(|i| sub[i]).sum();
            sum.fetch_add(partial as usize, Ordering::Relaxed);
        });

        assert_eq!(sum.load(Ordering::Relaxed), 15);
    }

    #[test]
    fn test_reduce_counts_elements() {
        let arrays = vec![vec![0u8; 17], vec![0; 3], vec![], vec![0; 41]];
        let total = reduce_nested(
            &arrays,
            1,
            0usize,
            |_sub: &Vec<u8>, range: Range<usize>, _base: usize| range.len(),
            |a, b| a + b,
        );
        assert_eq!(total, 61);
    }

    #[test]
    fn test_reduce_identity_law() {
        let arrays = vec![vec![0u8; 9], vec![0; 4]];
        let value = reduce_nested(
            &arrays,
            1,
            7usize,
            |_sub: &Vec<u8>, _range: Range<usize>, _base: usize| 7usize,
            |a, b| a.max(b),
        );
        assert_eq!(value, 7);
    }

    #[test]
    fn test_reduce_non_commutative_combiner() {
        // String concatenation is associative but not commutative; folding in
        // task-index order must preserve the flattened element order.
        let arrays = vec![vec!["a", "b"], vec!["c"], vec!["d", "e", "f"]];
        let joined = reduce_nested(
            &arrays,
            1,
            String::new(),
            |sub: &Vec<&str>, range: Range<usize>, _base: usize| {
                range.clone().map(|i| sub[i]).collect::<String>()
            },
            |a, b| a + &b,
        );
        assert_eq!(joined, "abcdef");
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let arrays = vec![vec![1u64, 2, 3], vec![4], vec![], vec![5, 6]];

        let par_sum = AtomicUsize::new(0);
        for_each_nested(&arrays, 2, |sub: &Vec<u64>, range: Range<usize>, _base: usize| {
            let partial: u64 = range.clone().map(|i| sub[i]).sum();
            par_sum.fetch_add(partial as usize, Ordering::Relaxed);
        });

        let seq_sum = std::cell::Cell::new(0u64);
        let bases = std::cell::RefCell::new(Vec::new());
        sequential_for_each_nested(&arrays, 2, |sub: &Vec<u64>, range: Range<usize>, base: usize| {
            seq_sum.set(seq_sum.get() + range.clone().map(|i| sub[i]).sum::<u64>());
            bases.borrow_mut().push(base);
        });

        assert_eq!(par_sum.load(Ordering::Relaxed) as u64, seq_sum.get());
        assert_eq!(bases.into_inner(), vec![0, 3, 4]);
    }

    #[test]
    fn test_named_kernel_type() {
        struct CountKernel;

        impl NestedKernel<Vec<u32>> for CountKernel {
            type Output = usize;

            fn apply(&self, _sub: &Vec<u32>, range: Range<usize>, _base: usize) -> usize {
                range.len()
            }
        }

        let arrays = vec![vec![0u32; 5], vec![0; 2]];
        let total = reduce_nested(&arrays, 1, 0usize, CountKernel, |a, b| a + b);
        assert_eq!(total, 7);
    }
}
