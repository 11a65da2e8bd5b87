//! Plücker quad kernel
//!
//! Decides inside/outside with three signed edge products per triangle,
//! evaluated on origin-translated vertices: `w = D . (a' x b')`. A point is
//! inside when all three weights share a sign. The shared-diagonal products
//! of the two quad halves are exact negations of each other, so the sign
//! decision is consistent across the diagonal and the split is watertight
//! even where Möller's reciprocal form would round differently.
//!
//! Distance and barycentrics are reconstructed from the weights: the weight
//! sum equals `Ng . D`, so `t = (Ng . a') / (w_a + w_b + w_c)`.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;
use wide::{f32x4, f32x8, CmpGe, CmpLe, CmpLt};

use super::{combine_halves_4, combine_halves_8, QuadHit4, QuadHit8, QuadKernel};
use crate::simd::{Vec3x4, Vec3x8};

/// Plücker formulation marker
#[derive(Debug, Clone, Copy)]
pub struct Pluecker;

fn tri_hit_4(
    org: Vec3x4,
    dir: Vec3x4,
    tnear: f32x4,
    tfar: f32x4,
    a: Vec3x4,
    b: Vec3x4,
    c: Vec3x4,
) -> QuadHit4 {
    let a = a - org;
    let b = b - org;
    let c = c - org;

    // Signed edge products; w_a is the barycentric weight of vertex a
    let w_a = b.cross(c).dot(dir);
    let w_b = c.cross(a).dot(dir);
    let w_c = a.cross(b).dot(dir);
    let uvw = w_a + w_b + w_c;

    let zero = f32x4::ZERO;
    let all_pos = w_a.cmp_ge(zero) & w_b.cmp_ge(zero) & w_c.cmp_ge(zero);
    let all_neg = w_a.cmp_le(zero) & w_b.cmp_le(zero) & w_c.cmp_le(zero);
    let inside = all_pos | all_neg;

    let ng = (b - a).cross(c - a);
    let inv_uvw = f32x4::ONE / uvw;
    let t = ng.dot(a) * inv_uvw;
    let u = w_b * inv_uvw;
    let v = w_c * inv_uvw;

    // Fully degenerate lanes (uvw == 0) produce a non-finite t and fail the
    // range test.
    let mask = inside & t.cmp_ge(tnear) & t.cmp_lt(tfar);

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
    let a = a - org;
    let b = b - org;
    let c = c - org;

    let w_a = b.cross(c).dot(dir);
    let w_b = c.cross(a).dot(dir);
    let w_c = a.cross(b).dot(dir);
    let uvw = w_a + w_b + w_c;

    let zero = f32x8::ZERO;
    let all_pos = w_a.cmp_ge(zero) & w_b.cmp_ge(zero) & w_c.cmp_ge(zero);
    let all_neg = w_a.cmp_le(zero) & w_b.cmp_le(zero) & w_c.cmp_le(zero);
    let inside = all_pos | all_neg;

    let ng = (b - a).cross(c - a);
    let inv_uvw = f32x8::ONE / uvw;
    let t = ng.dot(a) * inv_uvw;
    let u = w_b * inv_uvw;
    let v = w_c * inv_uvw;

    let mask = inside & t.cmp_ge(tnear) & t.cmp_lt(tfar);

    QuadHit8 { mask, t, u, v, ng }
}

impl QuadKernel for Pluecker {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::mask4_to_bits;

    fn hit_unit_quad(origin: Vec3, dir: Vec3, tfar: f32) -> QuadHit4 {
        Pluecker::quad_hit_4(
            Vec3x4::splat(origin),
            Vec3x4::splat(dir),
            f32x4::ZERO,
            f32x4::splat(tfar),
            Vec3x4::splat(Vec3::new(0.0, 0.0, 0.0)),
            Vec3x4::splat(Vec3::new(1.0, 0.0, 0.0)),
            Vec3x4::splat(Vec3::new(1.0, 1.0, 0.0)),
            Vec3x4::splat(Vec3::new(0.0, 1.0, 0.0)),
        )
    }

    #[test]
    fn test_center_hit() {
        let hit = hit_unit_quad(Vec3::new(0.5, 0.5, -1.0), Vec3::Z, f32::INFINITY);
        assert_eq!(mask4_to_bits(hit.mask), 0b1111);
        assert!((hit.t.to_array()[0] - 1.0).abs() < 1e-6);
        assert!((hit.u.to_array()[0] - 0.5).abs() < 1e-6);
        assert!((hit.v.to_array()[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_second_half_uv_remap() {
        let hit = hit_unit_quad(Vec3::new(0.25, 0.8, -1.0), Vec3::Z, f32::INFINITY);
        assert_eq!(mask4_to_bits(hit.mask), 0b1111);
        assert!((hit.u.to_array()[0] - 0.25).abs() < 1e-6);
        assert!((hit.v.to_array()[0] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_reversed_orientation_still_hits() {
        // Approaching from the back face; culling is disabled
        let hit = hit_unit_quad(Vec3::new(0.5, 0.5, 1.0), -Vec3::Z, f32::INFINITY);
        assert_eq!(mask4_to_bits(hit.mask), 0b1111);
        assert!((hit.t.to_array()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_outside_misses() {
        let hit = hit_unit_quad(Vec3::new(1.5, 0.5, -1.0), Vec3::Z, f32::INFINITY);
        assert_eq!(mask4_to_bits(hit.mask), 0);
    }

    #[test]
    fn test_degenerate_zero_quad_misses() {
        let zero = Vec3x4::zero();
        let hit = Pluecker::quad_hit_4(
            Vec3x4::splat(Vec3::new(0.0, 0.0, -1.0)),
            Vec3x4::splat(Vec3::Z),
            f32x4::ZERO,
            f32x4::splat(f32::INFINITY),
            zero,
            zero,
            zero,
            zero,
        );
        assert_eq!(mask4_to_bits(hit.mask), 0);
    }

    #[test]
    fn test_diagonal_crossing_single_hit() {
        // Rays sampled along the shared diagonal v1 v3 hit exactly one half
        for s in 0..16 {
            let f = s as f32 / 15.0;
            let target = Vec3::new(1.0 - f, f, 0.0);
            let origin = Vec3::new(target.x, target.y, -1.0);
            let hit = hit_unit_quad(origin, Vec3::Z, f32::INFINITY);
            assert_eq!(
                mask4_to_bits(hit.mask),
                0b1111,
                "diagonal sample {} missed",
                s
            );
            assert!((hit.t.to_array()[0] - 1.0).abs() < 1e-6);
        }
    }
}
