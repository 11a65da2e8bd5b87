//! # ALICE-RT
//!
//! **A.L.I.C.E. RT - Adaptive Lane-Interleaved Core Engine for raytracing**
//!
//! The compute core of a ray-tracing kernel suite: SIMD quad intersection
//! kernels and a nested-parallel iteration engine for ragged primitive
//! collections.
//!
//! ## Features
//!
//! - **Nested parallelism**: load-balanced `for_each`/`reduce` over an
//!   "array of arrays" with statically partitioned, exactly balanced tasks
//! - **Quad kernels**: one ray vs. 4 quads and 8 rays vs. 4 quads, with
//!   interchangeable Möller-Trumbore and Plücker formulations
//! - **Watertight splitting**: the two triangle halves of a quad share their
//!   diagonal and report exactly one hit
//! - **Filter callbacks**: per-geometry intersection/occlusion filters invoked
//!   from inside the kernels
//! - **Traversal statistics**: per-thread counters, compiled out by default
//!
//! ## Example
//!
//! ```rust
//! use alice_rt::prelude::*;
//!
//! // Build a scene with one unit quad in the XY plane
//! let mut scene = Scene::new();
//! let verts = vec![
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(1.0, 0.0, 0.0),
//!     Vec3::new(1.0, 1.0, 0.0),
//!     Vec3::new(0.0, 1.0, 0.0),
//! ];
//! let geom_id = scene.attach(QuadGeometry::new(verts, vec![[0, 1, 2, 3]]).unwrap());
//!
//! // Intersect a ray against the packed records
//! let records = scene.pack_geometry(geom_id);
//! let mut ray = Ray::new(Vec3::new(0.5, 0.5, -1.0), Vec3::Z);
//! let ctx = IntersectContext::new(&scene);
//! let pre = RayPrecalc::new(&ray);
//! for quad in &records {
//!     QuadIntersector1::<Moeller>::intersect(&pre, &mut ray, &ctx, quad);
//! }
//! assert!((ray.tfar - 1.0).abs() < 1e-6);
//! ```
//!
//! ## Author
//!
//! Moroya Sakamoto

#![warn(missing_docs)]

pub mod parallel;
pub mod quad;
pub mod scene;
pub mod simd;
pub mod stats;
pub mod types;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::parallel::{
        for_each_nested, reduce_nested, sequential_for_each_nested, NestedKernel,
        NestedPartition, Ragged, SubArray, MAX_TASKS,
    };
    pub use crate::quad::{
        Moeller, Pluecker, Quad4, QuadIntersector1, QuadIntersector8, QuadKernel, RayPrecalc,
    };
    pub use crate::scene::{
        FilterFn, HitCandidate, IntersectContext, QuadGeometry, Scene, SceneError,
    };
    pub use crate::simd::{Vec3x4, Vec3x8};
    pub use crate::stats::TravStats;
    pub use crate::types::{Ray, RayPacket8, INVALID_ID};
    pub use glam::Vec3;
}

// Re-exports for convenience
pub use quad::{Quad4, QuadIntersector1, QuadIntersector8};
pub use scene::{IntersectContext, Scene};
pub use types::{Ray, RayPacket8};
