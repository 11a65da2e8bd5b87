//! Integration tests: nested-parallel iteration over ragged collections
//!
//! Covers partition coverage/balance, the reduce laws, and the literal
//! partitioning scenarios.
//!
//! Author: Moroya Sakamoto

mod common;

use std::ops::Range;
use std::sync::Mutex;

use alice_rt::prelude::*;

// ============================================================================
// Literal partitioning scenarios
// ============================================================================

#[test]
fn four_arrays_four_tasks() {
    // [[a,b,c], [], [d,e], [f]] with 4 threads: N = 6, T = 4, boundaries
    // floor(t*6/4) = 0, 1, 3, 4.
    let arrays = vec![
        vec!['a', 'b', 'c'],
        vec![],
        vec!['d', 'e'],
        vec!['f'],
    ];
    let part = NestedPartition::with_threads(&arrays, 1, 4);

    assert_eq!(part.total(), 6);
    assert_eq!(part.task_count(), 4);
    assert_eq!(part.task_range(0), 0..1);
    assert_eq!(part.task_range(1), 1..3);
    assert_eq!(part.task_range(2), 3..4);
    assert_eq!(part.task_range(3), 4..6);

    assert_eq!(part.task_start(0), (0, 0));
    assert_eq!(part.task_start(1), (0, 1));
    assert_eq!(part.task_start(2), (2, 0));
    assert_eq!(part.task_start(3), (2, 1));
}

#[test]
fn hundred_elements_eight_tasks() {
    // One sub-array of 100 with min_step 10 and 8 threads: every task owns
    // 12 or 13 contiguous elements.
    let arrays = vec![vec![0u8; 100]];
    let part = NestedPartition::with_threads(&arrays, 10, 8);

    assert_eq!(part.task_count(), 8);
    let mut covered = 0;
    for t in 0..8 {
        let range = part.task_range(t);
        assert!(range.len() == 12 || range.len() == 13);
        assert_eq!(range.start, covered);
        covered = range.end;
    }
    assert_eq!(covered, 100);
}

// ============================================================================
// Coverage and balance properties
// ============================================================================

#[test]
fn every_flattened_index_visited_exactly_once() {
    let shapes: &[Vec<usize>] = &[
        vec![3, 0, 2, 1],
        vec![0, 0, 0],
        vec![100],
        vec![1; 40],
        vec![17, 1, 0, 0, 9, 2, 0, 31],
    ];
    for shape in shapes {
        let arrays: Vec<Vec<u64>> = shape
            .iter()
            .scan(0u64, |next, &n| {
                let sub = (*next..*next + n as u64).collect();
                *next += n as u64;
                Some(sub)
            })
            .collect();
        let total: usize = shape.iter().sum();

        for min_step in [1usize, 2, 7, 100] {
            let visited = Mutex::new(vec![0u32; total]);
            for_each_nested(&arrays, min_step, |sub: &Vec<u64>, range: Range<usize>, base: usize| {
                assert!(!range.is_empty(), "kernels must only see non-empty ranges");
                let mut guard = visited.lock().unwrap();
                for (offset, idx) in range.clone().enumerate() {
                    // The payload value doubles as the flattened index
                    assert_eq!(sub[idx] as usize, base + offset);
                    guard[base + offset] += 1;
                }
            });

            let counts = visited.into_inner().unwrap();
            assert!(
                counts.iter().all(|&c| c == 1),
                "coverage violated for shape {:?} min_step {}: {:?}",
                shape,
                min_step,
                counts
            );
        }
    }
}

#[test]
fn task_sizes_differ_by_at_most_one() {
    let arrays: Vec<Vec<u8>> = vec![vec![0; 13], vec![], vec![0; 8], vec![0; 1], vec![0; 29]];
    for threads in 1..=12 {
        let part = NestedPartition::with_threads(&arrays, 1, threads);
        let sizes: Vec<usize> = (0..part.task_count())
            .map(|t| part.task_range(t).len())
            .collect();
        let lo = *sizes.iter().min().unwrap();
        let hi = *sizes.iter().max().unwrap();
        assert!(hi - lo <= 1, "threads {}: sizes {:?}", threads, sizes);
    }
}

#[test]
fn partition_ignores_trailing_empty_arrays() {
    let with_tail = vec![vec![1u8, 2, 3, 4], vec![], vec![]];
    let without_tail = vec![vec![1u8, 2, 3, 4]];

    let a = NestedPartition::with_threads(&with_tail, 1, 2);
    let b = NestedPartition::with_threads(&without_tail, 1, 2);
    assert_eq!(a.task_count(), b.task_count());
    for t in 0..a.task_count() {
        assert_eq!(a.task_range(t), b.task_range(t));
        assert_eq!(a.task_start(t), b.task_start(t));
    }
}

// ============================================================================
// Reduce laws
// ============================================================================

#[test]
fn reduce_of_identity_kernel_is_identity() {
    let arrays = vec![vec![0u8; 10], vec![0; 5], vec![]];
    let result = reduce_nested(
        &arrays,
        1,
        0u64,
        |_sub: &Vec<u8>, _range: Range<usize>, _base: usize| 0u64,
        |a, b| a + b,
    );
    assert_eq!(result, 0);
}

#[test]
fn reduce_of_range_length_is_total() {
    let shapes: &[Vec<usize>] = &[vec![6], vec![3, 0, 2, 1], vec![50, 50], vec![1; 33]];
    for shape in shapes {
        let arrays: Vec<Vec<u8>> = shape.iter().map(|&n| vec![0; n]).collect();
        for min_step in [1usize, 4, 16] {
            let total = reduce_nested(
                &arrays,
                min_step,
                0usize,
                |_sub: &Vec<u8>, range: Range<usize>, _base: usize| range.len(),
                |a, b| a + b,
            );
            assert_eq!(total, shape.iter().sum::<usize>());
        }
    }
}

#[test]
fn reduce_folds_every_subrange_of_a_task() {
    // A task spanning several sub-arrays must fold all of them, not keep
    // only the last kernel result.
    let arrays: Vec<Vec<u8>> = (0..20).map(|i| vec![0u8; 1 + i % 3]).collect();
    let expected: usize = arrays.iter().map(Vec::len).sum();

    // min_step large enough to force a single task over many sub-arrays
    let total = reduce_nested(
        &arrays,
        1000,
        0usize,
        |_sub: &Vec<u8>, range: Range<usize>, _base: usize| range.len(),
        |a, b| a + b,
    );
    assert_eq!(total, expected);
}

#[test]
fn sequential_fallback_matches_parallel_reduce() {
    let arrays = vec![vec![2u64, 3], vec![], vec![5, 7, 11], vec![13]];

    let seq_cell = std::cell::Cell::new(0u64);
    sequential_for_each_nested(&arrays, 1, |sub: &Vec<u64>, range: Range<usize>, _base: usize| {
        seq_cell.set(seq_cell.get() + range.clone().map(|i| sub[i]).sum::<u64>());
    });
    let seq_sum = seq_cell.get();

    let par_sum = reduce_nested(
        &arrays,
        1,
        0u64,
        |sub: &Vec<u64>, range: Range<usize>, _base: usize| {
            range.clone().map(|i| sub[i]).sum::<u64>()
        },
        |a, b| a + b,
    );

    assert_eq!(seq_sum, 41);
    assert_eq!(par_sum, seq_sum);
}

// ============================================================================
// Ragged scene view
// ============================================================================

#[test]
fn scene_quad_counts_reduce_over_geometries() {
    let mut scene = common::unit_quad_scene();
    // A second, larger geometry and a detached slot
    let big = common::stacked_quad_scene(9);
    let detached = scene.attach(
        QuadGeometry::new(vec![Vec3::ZERO; 4], vec![[0, 1, 2, 3]]).unwrap(),
    );
    scene.detach(detached);
    for geom_id in 0..big.geometry_count() as u32 {
        if let Some(geometry) = big.geometry(geom_id) {
            scene.attach(geometry.clone());
        }
    }

    let total = reduce_nested(
        &scene,
        1,
        0usize,
        |_geom: &QuadGeometry, range: Range<usize>, _base: usize| range.len(),
        |a, b| a + b,
    );
    assert_eq!(total, 10);
}
