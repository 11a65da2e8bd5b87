//! Core ray types: single rays and 8-wide ray packets
//!
//! A `Ray` carries both the query interval and the committed hit: `tfar` is
//! the current nearest-hit distance and only ever decreases while a ray is
//! traversed. `RayPacket8` is the SoA form of eight rays; packet validity is
//! an external `u8` bitmask owned by the traversal, never stored here.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;
use serde::{Deserialize, Serialize};
use wide::f32x8;

use crate::simd::{f32x8_lane, f32x8_with_lane, Vec3x8};

/// Sentinel id marking "no geometry / no hit"
pub const INVALID_ID: u32 = u32::MAX;

/// A single ray with its mutable nearest-hit record
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ray {
    /// Ray origin
    pub origin: Vec3,
    /// Ray direction (not required to be normalised)
    pub direction: Vec3,
    /// Start of the valid interval along the ray
    pub tnear: f32,
    /// End of the valid interval; doubles as the current nearest-hit distance
    pub tfar: f32,
    /// Barycentric u of the committed hit
    pub u: f32,
    /// Barycentric v of the committed hit
    pub v: f32,
    /// Unnormalised geometric normal of the committed hit
    pub ng: Vec3,
    /// Geometry id of the committed hit, [`INVALID_ID`] when none
    pub geom_id: u32,
    /// Primitive id of the committed hit
    pub prim_id: u32,
    /// Instance id of the committed hit
    pub inst_id: u32,
}

impl Ray {
    /// Create a ray over the interval `[0, +inf)`
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Ray::with_range(origin, direction, 0.0, f32::INFINITY)
    }

    /// Create a ray over an explicit `[tnear, tfar)` interval
    #[inline]
    pub fn with_range(origin: Vec3, direction: Vec3, tnear: f32, tfar: f32) -> Self {
        Ray {
            origin,
            direction,
            tnear,
            tfar,
            u: 0.0,
            v: 0.0,
            ng: Vec3::ZERO,
            geom_id: INVALID_ID,
            prim_id: INVALID_ID,
            inst_id: INVALID_ID,
        }
    }

    /// Point along the ray at parameter `t`
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// True once a hit has been committed to this ray
    #[inline]
    pub fn has_hit(&self) -> bool {
        self.geom_id != INVALID_ID
    }
}

/// Eight rays in structure-of-arrays layout
#[derive(Debug, Clone, Copy)]
pub struct RayPacket8 {
    /// Ray origins (8-wide)
    pub org: Vec3x8,
    /// Ray directions (8-wide)
    pub dir: Vec3x8,
    /// Interval starts (8-wide)
    pub tnear: f32x8,
    /// Interval ends / nearest-hit distances (8-wide)
    pub tfar: f32x8,
    /// Barycentric u of committed hits (8-wide)
    pub u: f32x8,
    /// Barycentric v of committed hits (8-wide)
    pub v: f32x8,
    /// Unnormalised geometric normals of committed hits (8-wide)
    pub ng: Vec3x8,
    /// Geometry ids of committed hits, [`INVALID_ID`] when none
    pub geom_ids: [u32; 8],
    /// Primitive ids of committed hits
    pub prim_ids: [u32; 8],
    /// Instance ids of committed hits
    pub inst_ids: [u32; 8],
}

impl RayPacket8 {
    /// Pack eight scalar rays
    pub fn from_rays(rays: [Ray; 8]) -> Self {
        RayPacket8 {
            org: Vec3x8::from_vecs(std::array::from_fn(|i| rays[i].origin)),
            dir: Vec3x8::from_vecs(std::array::from_fn(|i| rays[i].direction)),
            tnear: f32x8::new(std::array::from_fn(|i| rays[i].tnear)),
            tfar: f32x8::new(std::array::from_fn(|i| rays[i].tfar)),
            u: f32x8::new(std::array::from_fn(|i| rays[i].u)),
            v: f32x8::new(std::array::from_fn(|i| rays[i].v)),
            ng: Vec3x8::from_vecs(std::array::from_fn(|i| rays[i].ng)),
            geom_ids: std::array::from_fn(|i| rays[i].geom_id),
            prim_ids: std::array::from_fn(|i| rays[i].prim_id),
            inst_ids: std::array::from_fn(|i| rays[i].inst_id),
        }
    }

    /// Extract lane `k` as a scalar ray
    pub fn extract(&self, k: usize) -> Ray {
        Ray {
            origin: self.org.extract(k),
            direction: self.dir.extract(k),
            tnear: f32x8_lane(self.tnear, k),
            tfar: f32x8_lane(self.tfar, k),
            u: f32x8_lane(self.u, k),
            v: f32x8_lane(self.v, k),
            ng: self.ng.extract(k),
            geom_id: self.geom_ids[k],
            prim_id: self.prim_ids[k],
            inst_id: self.inst_ids[k],
        }
    }

    /// Write a scalar ray's hit state back into lane `k`
    pub fn write_back(&mut self, k: usize, ray: &Ray) {
        self.tfar = f32x8_with_lane(self.tfar, k, ray.tfar);
        self.u = f32x8_with_lane(self.u, k, ray.u);
        self.v = f32x8_with_lane(self.v, k, ray.v);
        self.ng = self.ng.with_lane(k, ray.ng);
        self.geom_ids[k] = ray.geom_id;
        self.prim_ids[k] = ray.prim_id;
        self.inst_ids[k] = ray.inst_id;
    }
}
