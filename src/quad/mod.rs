//! Indexed quad records and SIMD intersection kernels
//!
//! A [`Quad4`] packs four indexed quads in SoA layout; the intersectors test
//! them against one ray (4-wide) or broadcast single quads across an 8-wide
//! ray packet. Two interchangeable geometric formulations share one
//! contract: [`Moeller`] (Möller-Trumbore) and [`Pluecker`] (Plücker edge
//! products).
//!
//! Every quad is split into the triangles `(v0, v1, v3)` and `(v2, v3, v1)`
//! sharing the diagonal `v1 v3`. The second half's barycentrics are remapped
//! to `(1-u, 1-v)` so callers see a single quad parameterisation, and a ray
//! crossing the shared diagonal reports exactly one hit.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;
use wide::{f32x4, f32x8, CmpLt};

use crate::scene::Scene;
use crate::simd::{Vec3x4, Vec3x8};
use crate::types::{Ray, RayPacket8, INVALID_ID};

mod epilogue;
mod intersector;
mod moeller;
mod pluecker;

pub use intersector::{QuadIntersector1, QuadIntersector8};
pub use moeller::Moeller;
pub use pluecker::Pluecker;

/// Four indexed quads in structure-of-arrays layout
///
/// Each lane holds four vertex indices plus the owning geometry and
/// primitive ids. Inactive lanes carry [`INVALID_ID`] and gather to a
/// degenerate all-zero quad that no kernel accepts. Packed records keep
/// their active lanes as a prefix.
#[derive(Debug, Clone, Copy)]
pub struct Quad4 {
    /// First vertex index per lane
    pub v0: [u32; 4],
    /// Second vertex index per lane
    pub v1: [u32; 4],
    /// Third vertex index per lane
    pub v2: [u32; 4],
    /// Fourth vertex index per lane
    pub v3: [u32; 4],
    /// Geometry id per lane, [`INVALID_ID`] for inactive lanes
    pub geom_ids: [u32; 4],
    /// Primitive id per lane
    pub prim_ids: [u32; 4],
}

impl Quad4 {
    /// Lane count of one record
    pub const LANES: usize = 4;

    /// Pack up to four `(geom_id, prim_id)` references into one record
    ///
    /// Unused lanes, missing geometries, and out-of-range primitive ids stay
    /// inactive.
    pub fn pack(scene: &Scene, items: &[(u32, u32)]) -> Self {
        let mut record = Quad4 {
            v0: [0; 4],
            v1: [0; 4],
            v2: [0; 4],
            v3: [0; 4],
            geom_ids: [INVALID_ID; 4],
            prim_ids: [INVALID_ID; 4],
        };
        for (lane, &(geom_id, prim_id)) in items.iter().take(Self::LANES).enumerate() {
            let Some(geometry) = scene.geometry(geom_id) else {
                continue;
            };
            if prim_id as usize >= geometry.quad_count() {
                continue;
            }
            let [a, b, c, d] = geometry.quad(prim_id as usize);
            record.v0[lane] = a;
            record.v1[lane] = b;
            record.v2[lane] = c;
            record.v3[lane] = d;
            record.geom_ids[lane] = geom_id;
            record.prim_ids[lane] = prim_id;
        }
        record
    }

    /// Whether lane `lane` references a primitive
    #[inline]
    pub fn valid(&self, lane: usize) -> bool {
        self.geom_ids[lane] != INVALID_ID
    }

    /// Bitmask of active lanes
    #[inline]
    pub fn valid_mask(&self) -> u32 {
        let mut mask = 0;
        for lane in 0..Self::LANES {
            if self.valid(lane) {
                mask |= 1 << lane;
            }
        }
        mask
    }

    /// Resolve the four vertex vectors of all lanes by gathering from the
    /// scene's vertex buffers
    ///
    /// Inactive lanes produce an all-zero quad whose degenerate triangles
    /// the kernels' non-hit predicate rejects.
    pub fn gather(&self, scene: &Scene) -> (Vec3x4, Vec3x4, Vec3x4, Vec3x4) {
        let mut p0 = [Vec3::ZERO; 4];
        let mut p1 = [Vec3::ZERO; 4];
        let mut p2 = [Vec3::ZERO; 4];
        let mut p3 = [Vec3::ZERO; 4];
        for lane in 0..Self::LANES {
            if self.valid(lane) {
                let geom_id = self.geom_ids[lane];
                p0[lane] = scene.vertex(geom_id, self.v0[lane]);
                p1[lane] = scene.vertex(geom_id, self.v1[lane]);
                p2[lane] = scene.vertex(geom_id, self.v2[lane]);
                p3[lane] = scene.vertex(geom_id, self.v3[lane]);
            }
        }
        (
            Vec3x4::from_vecs(p0),
            Vec3x4::from_vecs(p1),
            Vec3x4::from_vecs(p2),
            Vec3x4::from_vecs(p3),
        )
    }
}

/// Result of testing one ray against four quads
#[derive(Debug, Clone, Copy)]
pub struct QuadHit4 {
    /// Lanes with a tentative hit (SIMD mask)
    pub mask: f32x4,
    /// Hit distances
    pub t: f32x4,
    /// Barycentric u over the quad parameterisation
    pub u: f32x4,
    /// Barycentric v over the quad parameterisation
    pub v: f32x4,
    /// Unnormalised geometric normals
    pub ng: Vec3x4,
}

/// Result of testing eight rays against one quad
#[derive(Debug, Clone, Copy)]
pub struct QuadHit8 {
    /// Lanes with a tentative hit (SIMD mask)
    pub mask: f32x8,
    /// Hit distances
    pub t: f32x8,
    /// Barycentric u over the quad parameterisation
    pub u: f32x8,
    /// Barycentric v over the quad parameterisation
    pub v: f32x8,
    /// Unnormalised geometric normals
    pub ng: Vec3x8,
}

/// Geometric formulation of the quad test
///
/// Implementations evaluate both triangle halves and merge them through the
/// shared half-combining step, so every variant inherits the same
/// watertight tie-break.
pub trait QuadKernel {
    /// Test one ray (broadcast 4-wide) against four quads
    fn quad_hit_4(
        org: Vec3x4,
        dir: Vec3x4,
        tnear: f32x4,
        tfar: f32x4,
        v0: Vec3x4,
        v1: Vec3x4,
        v2: Vec3x4,
        v3: Vec3x4,
    ) -> QuadHit4;

    /// Test eight rays against one quad (vertices broadcast 8-wide)
    fn quad_hit_8(
        org: Vec3x8,
        dir: Vec3x8,
        tnear: f32x8,
        tfar: f32x8,
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        v3: Vec3,
    ) -> QuadHit8;
}

/// Merge the two triangle halves of a quad (4-wide)
///
/// Per lane the closer half wins; on an exact diagonal tie the first half
/// wins, so a ray crossing the shared diagonal yields one hit. The second
/// half's barycentrics arrive in its own triangle frame and are remapped to
/// the quad parameterisation here.
pub(crate) fn combine_halves_4(first: QuadHit4, second: QuadHit4) -> QuadHit4 {
    let remapped_u = f32x4::ONE - second.u;
    let remapped_v = f32x4::ONE - second.v;
    let take_second = second.mask & (!first.mask | second.t.cmp_lt(first.t));
    QuadHit4 {
        mask: first.mask | second.mask,
        t: take_second.blend(second.t, first.t),
        u: take_second.blend(remapped_u, first.u),
        v: take_second.blend(remapped_v, first.v),
        ng: Vec3x4::blend(take_second, second.ng, first.ng),
    }
}

/// Merge the two triangle halves of a quad (8-wide)
pub(crate) fn combine_halves_8(first: QuadHit8, second: QuadHit8) -> QuadHit8 {
    let remapped_u = f32x8::ONE - second.u;
    let remapped_v = f32x8::ONE - second.v;
    let take_second = second.mask & (!first.mask | second.t.cmp_lt(first.t));
    QuadHit8 {
        mask: first.mask | second.mask,
        t: take_second.blend(second.t, first.t),
        u: take_second.blend(remapped_u, first.u),
        v: take_second.blend(remapped_v, first.v),
        ng: Vec3x8::blend(take_second, second.ng, first.ng),
    }
}

/// Per-ray quantities cached across leaf visits
///
/// Broadcasting origin and direction once per traversal amortises the splat
/// over every quad record the ray visits.
#[derive(Debug, Clone, Copy)]
pub struct RayPrecalc {
    pub(crate) org: Vec3x4,
    pub(crate) dir: Vec3x4,
}

impl RayPrecalc {
    /// Precompute for a scalar ray
    #[inline]
    pub fn new(ray: &Ray) -> Self {
        RayPrecalc {
            org: Vec3x4::splat(ray.origin),
            dir: Vec3x4::splat(ray.direction),
        }
    }

    /// Precompute for lane `k` of a packet
    #[inline]
    pub fn from_packet_lane(packet: &RayPacket8, k: usize) -> Self {
        RayPrecalc {
            org: Vec3x4::splat(packet.org.extract(k)),
            dir: Vec3x4::splat(packet.dir.extract(k)),
        }
    }
}
