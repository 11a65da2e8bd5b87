//! Quad intersectors: one ray vs. 4 quads, 8 rays vs. 4 quads
//!
//! `QuadIntersector1` runs the record's four lanes in parallel against one
//! ray. `QuadIntersector8` flips the axes: it walks the record one scalar
//! quad at a time and broadcasts each quad's vertices across the eight ray
//! lanes. Both are generic over the geometric formulation and over whether
//! filter callbacks participate (`FILTER = false` compiles them out).
//!
//! Author: Moroya Sakamoto

use std::marker::PhantomData;

use wide::f32x4;

use super::epilogue;
use super::{Quad4, QuadHit8, QuadKernel, RayPrecalc};
use crate::scene::IntersectContext;
use crate::simd::mask8_from_bits;
use crate::stats;
use crate::types::{Ray, RayPacket8};

/// Intersects 4-wide quad records with a single ray
pub struct QuadIntersector1<V: QuadKernel, const FILTER: bool = true> {
    _variant: PhantomData<V>,
}

impl<V: QuadKernel, const FILTER: bool> QuadIntersector1<V, FILTER> {
    /// Intersect the ray with the record and update its nearest hit
    pub fn intersect(pre: &RayPrecalc, ray: &mut Ray, ctx: &IntersectContext, quad: &Quad4) {
        stats::count_normal_prims(1, quad.valid_mask().count_ones());
        let (v0, v1, v2, v3) = quad.gather(ctx.scene);
        let hit = V::quad_hit_4(
            pre.org,
            pre.dir,
            f32x4::splat(ray.tnear),
            f32x4::splat(ray.tfar),
            v0,
            v1,
            v2,
            v3,
        );
        epilogue::commit_nearest::<FILTER>(ray, ctx, quad, hit);
    }

    /// Whether any quad of the record occludes the ray
    pub fn occluded(pre: &RayPrecalc, ray: &Ray, ctx: &IntersectContext, quad: &Quad4) -> bool {
        stats::count_shadow_prims(1, quad.valid_mask().count_ones());
        let (v0, v1, v2, v3) = quad.gather(ctx.scene);
        let hit = V::quad_hit_4(
            pre.org,
            pre.dir,
            f32x4::splat(ray.tnear),
            f32x4::splat(ray.tfar),
            v0,
            v1,
            v2,
            v3,
        );
        epilogue::any_hit::<FILTER>(ctx, quad, hit)
    }

    /// Intersect a set of rays with a batch of records
    ///
    /// Walks the set bits of `valid`, snapshots each ray's `tfar`, tests the
    /// ray against every record, and returns the bitmask of rays whose
    /// `tfar` strictly decreased. An aborted context stops the remaining
    /// rays.
    pub fn intersect_batch(
        pres: &[RayPrecalc],
        valid: u32,
        rays: &mut [Ray],
        ctx: &IntersectContext,
        quads: &[Quad4],
    ) -> u32 {
        let mut result = 0;
        let mut bits = valid;
        while bits != 0 {
            if ctx.is_aborted() {
                break;
            }
            let i = bits.trailing_zeros() as usize;
            bits &= bits - 1;

            let old_far = rays[i].tfar;
            for quad in quads {
                if ctx.is_aborted() {
                    break;
                }
                Self::intersect(&pres[i], &mut rays[i], ctx, quad);
            }
            if rays[i].tfar < old_far {
                result |= 1 << i;
            }
        }
        result
    }

    /// Occlusion-test a set of rays against a batch of records
    ///
    /// Returns the bitmask of occluded rays; each ray stops at its first
    /// occluding record.
    pub fn occluded_batch(
        pres: &[RayPrecalc],
        valid: u32,
        rays: &[Ray],
        ctx: &IntersectContext,
        quads: &[Quad4],
    ) -> u32 {
        let mut result = 0;
        let mut bits = valid;
        while bits != 0 {
            if ctx.is_aborted() {
                break;
            }
            let i = bits.trailing_zeros() as usize;
            bits &= bits - 1;

            for quad in quads {
                if ctx.is_aborted() {
                    break;
                }
                if Self::occluded(&pres[i], &rays[i], ctx, quad) {
                    result |= 1 << i;
                    break;
                }
            }
        }
        result
    }
}

/// Intersects 4-wide quad records with an 8-wide ray packet
pub struct QuadIntersector8<V: QuadKernel, const FILTER: bool = true> {
    _variant: PhantomData<V>,
}

impl<V: QuadKernel, const FILTER: bool> QuadIntersector8<V, FILTER> {
    /// Intersect the active packet lanes with the record
    ///
    /// `active` is the packet's external validity bitmask; inactive lanes
    /// are never touched.
    pub fn intersect(
        active: u32,
        packet: &mut RayPacket8,
        ctx: &IntersectContext,
        quad: &Quad4,
    ) {
        if active == 0 {
            return;
        }
        let active_mask = mask8_from_bits(active);
        for lane in 0..Quad4::LANES {
            if !quad.valid(lane) {
                continue;
            }
            stats::count_normal_prims(active.count_ones(), 1);
            let geom_id = quad.geom_ids[lane];
            let v0 = ctx.scene.vertex(geom_id, quad.v0[lane]);
            let v1 = ctx.scene.vertex(geom_id, quad.v1[lane]);
            let v2 = ctx.scene.vertex(geom_id, quad.v2[lane]);
            let v3 = ctx.scene.vertex(geom_id, quad.v3[lane]);

            let hit = V::quad_hit_8(
                packet.org,
                packet.dir,
                packet.tnear,
                packet.tfar,
                v0,
                v1,
                v2,
                v3,
            );
            let hit = QuadHit8 {
                mask: hit.mask & active_mask,
                ..hit
            };
            epilogue::commit_nearest_packet::<FILTER>(
                packet,
                ctx,
                geom_id,
                quad.prim_ids[lane],
                hit,
            );
            if ctx.is_aborted() {
                return;
            }
        }
    }

    /// Occlusion-test the active packet lanes against the record
    ///
    /// Returns the bitmask of lanes the record occludes. The quad loop
    /// short-circuits as soon as every active lane is occluded.
    pub fn occluded(
        active: u32,
        packet: &RayPacket8,
        ctx: &IntersectContext,
        quad: &Quad4,
    ) -> u32 {
        let mut live = active;
        let mut occluded = 0;
        for lane in 0..Quad4::LANES {
            if live == 0 {
                break;
            }
            if !quad.valid(lane) {
                continue;
            }
            stats::count_shadow_prims(live.count_ones(), 1);
            let geom_id = quad.geom_ids[lane];
            let v0 = ctx.scene.vertex(geom_id, quad.v0[lane]);
            let v1 = ctx.scene.vertex(geom_id, quad.v1[lane]);
            let v2 = ctx.scene.vertex(geom_id, quad.v2[lane]);
            let v3 = ctx.scene.vertex(geom_id, quad.v3[lane]);

            let hit = V::quad_hit_8(
                packet.org,
                packet.dir,
                packet.tnear,
                packet.tfar,
                v0,
                v1,
                v2,
                v3,
            );
            let hit = QuadHit8 {
                mask: hit.mask & mask8_from_bits(live),
                ..hit
            };
            let newly = epilogue::any_hit_packet::<FILTER>(ctx, geom_id, quad.prim_ids[lane], hit);
            occluded |= newly;
            live &= !newly;
            if ctx.is_aborted() {
                break;
            }
        }
        occluded
    }

    /// Intersect one lane of the packet, behaving as the single-ray path
    pub fn intersect_one(
        pre: &RayPrecalc,
        packet: &mut RayPacket8,
        k: usize,
        ctx: &IntersectContext,
        quad: &Quad4,
    ) {
        let mut ray = packet.extract(k);
        QuadIntersector1::<V, FILTER>::intersect(pre, &mut ray, ctx, quad);
        packet.write_back(k, &ray);
    }

    /// Occlusion-test one lane of the packet
    pub fn occluded_one(
        pre: &RayPrecalc,
        packet: &RayPacket8,
        k: usize,
        ctx: &IntersectContext,
        quad: &Quad4,
    ) -> bool {
        let ray = packet.extract(k);
        QuadIntersector1::<V, FILTER>::occluded(pre, &ray, ctx, quad)
    }
}
