//! Post-intersection epilogues: filter invocation and hit commit
//!
//! The epilogues are the only place user code re-enters the kernels. They
//! reduce the tentative lane set, consult the geometry's filter callback
//! when the `FILTER` parameter and the context allow it, and either commit
//! the candidate into the ray or drop the lane and continue the reduction.
//! A filter may raise the context abort flag; the epilogues return
//! immediately and the enclosing loops skip further work.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;

use super::{Quad4, QuadHit4, QuadHit8};
use crate::scene::{HitCandidate, IntersectContext};
use crate::simd::{f32x8_with_lane, mask4_to_bits, mask8_to_bits};
use crate::types::{Ray, RayPacket8};

/// Commit the nearest accepted lane of a 4-wide hit into the ray
///
/// Lane reduction: the minimum-t lane wins, the lowest lane index breaking
/// exact ties; a rejecting filter masks the lane off and the reduction
/// restarts over the remainder.
pub(crate) fn commit_nearest<const FILTER: bool>(
    ray: &mut Ray,
    ctx: &IntersectContext,
    quad: &Quad4,
    hit: QuadHit4,
) {
    let mut bits = mask4_to_bits(hit.mask) & quad.valid_mask();
    if bits == 0 {
        return;
    }

    let t = hit.t.to_array();
    let u = hit.u.to_array();
    let v = hit.v.to_array();
    let (ng_x, ng_y, ng_z) = hit.ng.to_arrays();

    while bits != 0 {
        let mut lane = 0;
        let mut best = f32::INFINITY;
        let mut rest = bits;
        while rest != 0 {
            let l = rest.trailing_zeros() as usize;
            rest &= rest - 1;
            if t[l] < best {
                best = t[l];
                lane = l;
            }
        }

        let candidate = HitCandidate {
            t: t[lane],
            u: u[lane],
            v: v[lane],
            ng: Vec3::new(ng_x[lane], ng_y[lane], ng_z[lane]),
            geom_id: quad.geom_ids[lane],
            prim_id: quad.prim_ids[lane],
        };

        if FILTER && ctx.enable_filters {
            if let Some(filter) = ctx.scene.intersection_filter(candidate.geom_id) {
                if !filter(ctx, &candidate) {
                    if ctx.is_aborted() {
                        return;
                    }
                    bits &= !(1 << lane);
                    continue;
                }
            }
        }

        ray.tfar = candidate.t;
        ray.u = candidate.u;
        ray.v = candidate.v;
        ray.ng = candidate.ng;
        ray.geom_id = candidate.geom_id;
        ray.prim_id = candidate.prim_id;
        ray.inst_id = ctx.inst_id;
        return;
    }
}

/// Occlusion test over a 4-wide hit: true when any lane survives its filter
pub(crate) fn any_hit<const FILTER: bool>(
    ctx: &IntersectContext,
    quad: &Quad4,
    hit: QuadHit4,
) -> bool {
    let mut bits = mask4_to_bits(hit.mask) & quad.valid_mask();
    if bits == 0 {
        return false;
    }
    if !(FILTER && ctx.enable_filters) {
        return true;
    }

    let t = hit.t.to_array();
    let u = hit.u.to_array();
    let v = hit.v.to_array();
    let (ng_x, ng_y, ng_z) = hit.ng.to_arrays();

    while bits != 0 {
        let lane = bits.trailing_zeros() as usize;
        bits &= bits - 1;

        let geom_id = quad.geom_ids[lane];
        match ctx.scene.occlusion_filter(geom_id) {
            // No filter registered: the hit is opaque
            None => return true,
            Some(filter) => {
                let candidate = HitCandidate {
                    t: t[lane],
                    u: u[lane],
                    v: v[lane],
                    ng: Vec3::new(ng_x[lane], ng_y[lane], ng_z[lane]),
                    geom_id,
                    prim_id: quad.prim_ids[lane],
                };
                if filter(ctx, &candidate) {
                    return true;
                }
                if ctx.is_aborted() {
                    return false;
                }
            }
        }
    }
    false
}

/// Commit every accepted lane of an 8-wide hit into the packet
///
/// The packet path tests one scalar quad at a time, so geometry and
/// primitive ids are scalars here. Each ray lane commits independently.
pub(crate) fn commit_nearest_packet<const FILTER: bool>(
    packet: &mut RayPacket8,
    ctx: &IntersectContext,
    geom_id: u32,
    prim_id: u32,
    hit: QuadHit8,
) {
    let bits = mask8_to_bits(hit.mask);
    if bits == 0 {
        return;
    }

    let t = hit.t.to_array();
    let u = hit.u.to_array();
    let v = hit.v.to_array();
    let (ng_x, ng_y, ng_z) = hit.ng.to_arrays();

    let mut rest = bits;
    while rest != 0 {
        let lane = rest.trailing_zeros() as usize;
        rest &= rest - 1;

        let candidate = HitCandidate {
            t: t[lane],
            u: u[lane],
            v: v[lane],
            ng: Vec3::new(ng_x[lane], ng_y[lane], ng_z[lane]),
            geom_id,
            prim_id,
        };

        if FILTER && ctx.enable_filters {
            if let Some(filter) = ctx.scene.intersection_filter(geom_id) {
                if !filter(ctx, &candidate) {
                    if ctx.is_aborted() {
                        return;
                    }
                    continue;
                }
            }
        }

        packet.tfar = f32x8_with_lane(packet.tfar, lane, candidate.t);
        packet.u = f32x8_with_lane(packet.u, lane, candidate.u);
        packet.v = f32x8_with_lane(packet.v, lane, candidate.v);
        packet.ng = packet.ng.with_lane(lane, candidate.ng);
        packet.geom_ids[lane] = geom_id;
        packet.prim_ids[lane] = prim_id;
        packet.inst_ids[lane] = ctx.inst_id;
    }
}

/// Occlusion test over an 8-wide hit: returns the bitmask of occluded lanes
pub(crate) fn any_hit_packet<const FILTER: bool>(
    ctx: &IntersectContext,
    geom_id: u32,
    prim_id: u32,
    hit: QuadHit8,
) -> u32 {
    let bits = mask8_to_bits(hit.mask);
    if bits == 0 {
        return 0;
    }
    if !(FILTER && ctx.enable_filters) {
        return bits;
    }
    let Some(filter) = ctx.scene.occlusion_filter(geom_id) else {
        return bits;
    };

    let t = hit.t.to_array();
    let u = hit.u.to_array();
    let v = hit.v.to_array();
    let (ng_x, ng_y, ng_z) = hit.ng.to_arrays();

    let mut occluded = 0;
    let mut rest = bits;
    while rest != 0 {
        let lane = rest.trailing_zeros() as usize;
        rest &= rest - 1;

        let candidate = HitCandidate {
            t: t[lane],
            u: u[lane],
            v: v[lane],
            ng: Vec3::new(ng_x[lane], ng_y[lane], ng_z[lane]),
            geom_id,
            prim_id,
        };
        if filter(ctx, &candidate) {
            occluded |= 1 << lane;
        }
        if ctx.is_aborted() {
            break;
        }
    }
    occluded
}
