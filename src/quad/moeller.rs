//! Möller-Trumbore quad kernel
//!
//! The classic cross-product formulation: per triangle, `p = D x e2`,
//! `det = e1 . p`, barycentrics and distance recovered by one reciprocal.
//! Backface culling is disabled; zero-determinant lanes produce non-finite
//! barycentrics and fall out of the comparison chain, so no explicit epsilon
//! test is needed.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;
use wide::{f32x4, f32x8, CmpGe, CmpLe, CmpLt};

use super::{combine_halves_4, combine_halves_8, QuadHit4, QuadHit8, QuadKernel};
use crate::simd::{Vec3x4, Vec3x8};

/// Möller-Trumbore formulation marker
#[derive(Debug, Clone, Copy)]
pub struct Moeller;

fn tri_hit_4(
    org: Vec3x4,
    dir: Vec3x4,
    tnear: f32x4,
    tfar: f32x4,
    a: Vec3x4,
    b: Vec3x4,
    c: Vec3x4,
) -> QuadHit4 {
    let e1 = b - a;
    let e2 = c - a;
    let ng = e1.cross(e2);

    let p = dir.cross(e2);
    let det = e1.dot(p);
    let inv_det = f32x4::ONE / det;

    let tvec = org - a;
    let u = tvec.dot(p) * inv_det;
    let q = tvec.cross(e1);
    let v = dir.dot(q) * inv_det;
    let t = e2.dot(q) * inv_det;

    let zero = f32x4::ZERO;
    let mask = u.cmp_ge(zero)
        & v.cmp_ge(zero)
        & (u + v).cmp_le(f32x4::ONE)
        & t.cmp_ge(tnear)
        & t.cmp_lt(tfar);

    QuadHit4 { mask, t, u, v, ng }
}

fn tri_hit_8(
    org: Vec3x8,
    dir: Vec3x8,
    tnear: f32x8,
    tfar: f32x8,
    a: Vec3x8,
    b: Vec3x8,
    c: Vec3x8,
) -> QuadHit8 {
    let e1 = b - a;
    let e2 = c - a;
    let ng = e1.cross(e2);

    let p = dir.cross(e2);
    let det = e1.dot(p);
    let inv_det = f32x8::ONE / det;

    let tvec = org - a;
    let u = tvec.dot(p) * inv_det;
    let q = tvec.cross(e1);
    let v = dir.dot(q) * inv_det;
    let t = e2.dot(q) * inv_det;

    let zero = f32x8::ZERO;
    let mask = u.cmp_ge(zero)
        & v.cmp_ge(zero)
        & (u + v).cmp_le(f32x8::ONE)
        & t.cmp_ge(tnear)
        & t.cmp_lt(tfar);

    QuadHit8 { mask, t, u, v, ng }
}

impl QuadKernel for Moeller {
    #[inline]
    fn quad_hit_4(
        org: Vec3x4,
        dir: Vec3x4,
        tnear: f32x4,
        tfar: f32x4,
        v0: Vec3x4,
        v1: Vec3x4,
        v2: Vec3x4,
        v3: Vec3x4,
    ) -> QuadHit4 {
        let first = tri_hit_4(org, dir, tnear, tfar, v0, v1, v3);
        let second = tri_hit_4(org, dir, tnear, tfar, v2, v3, v1);
        combine_halves_4(first, second)
    }

    #[inline]
    fn quad_hit_8(
        org: Vec3x8,
        dir: Vec3x8,
        tnear: f32x8,
        tfar: f32x8,
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        v3: Vec3,
    ) -> QuadHit8 {
        let v0 = Vec3x8::splat(v0);
        let v1 = Vec3x8::splat(v1);
        let v2 = Vec3x8::splat(v2);
        let v3 = Vec3x8::splat(v3);
        let first = tri_hit_8(org, dir, tnear, tfar, v0, v1, v3);
        let second = tri_hit_8(org, dir, tnear, tfar, v2, v3, v1);
        combine_halves_8(first, second)
    }
}
