//! Common test helpers for ALICE-RT integration tests
//!
//! Author: Moroya Sakamoto

use alice_rt::prelude::*;

// ============================================================================
// Standard scenes
// ============================================================================

/// Scene holding the unit quad (0,0,0)-(1,0,0)-(1,1,0)-(0,1,0) in the XY plane
pub fn unit_quad_scene() -> Scene {
    let mut scene = Scene::new();
    scene.attach(
        QuadGeometry::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2, 3]],
        )
        .expect("unit quad indices are valid"),
    );
    scene
}

/// Scene with `count` unit quads stacked along +Z at z = 1, 2, 3, ...
pub fn stacked_quad_scene(count: usize) -> Scene {
    let mut verts = Vec::with_capacity(count * 4);
    let mut quads = Vec::with_capacity(count);
    for q in 0..count {
        let z = (q + 1) as f32;
        let base = verts.len() as u32;
        verts.push(Vec3::new(0.0, 0.0, z));
        verts.push(Vec3::new(1.0, 0.0, z));
        verts.push(Vec3::new(1.0, 1.0, z));
        verts.push(Vec3::new(0.0, 1.0, z));
        quads.push([base, base + 1, base + 2, base + 3]);
    }
    let mut scene = Scene::new();
    scene.attach(QuadGeometry::new(verts, quads).expect("stacked quad indices are valid"));
    scene
}

// ============================================================================
// Deterministic pseudo-random inputs
// ============================================================================

/// Hash a sequence index into [0, 1) without a rand dependency
pub fn unit_hash(seed: u32, index: u32) -> f32 {
    let t = (seed.wrapping_mul(7919).wrapping_add(index) as f32) * 0.618_034;
    (t.sin() * 43758.547).fract().abs()
}

/// Hash a sequence index into [-extent, extent]
pub fn signed_hash(seed: u32, index: u32, extent: f32) -> f32 {
    (unit_hash(seed, index) * 2.0 - 1.0) * extent
}

/// Deterministic well-conditioned quad: a unit-ish quad pushed and tilted
/// away from the origin, convex and planar by construction
pub fn random_quad(seed: u32) -> [Vec3; 4] {
    let center = Vec3::new(
        signed_hash(seed, 0, 2.0),
        signed_hash(seed, 1, 2.0),
        2.0 + unit_hash(seed, 2) * 3.0,
    );
    // Two non-degenerate in-plane axes
    let tangent = Vec3::new(1.0, signed_hash(seed, 3, 0.4), signed_hash(seed, 4, 0.4)).normalize();
    let helper = Vec3::new(signed_hash(seed, 5, 0.4), 1.0, signed_hash(seed, 6, 0.4));
    let bitangent = tangent.cross(helper).normalize();

    let half_u = 0.5 + unit_hash(seed, 7);
    let half_v = 0.5 + unit_hash(seed, 8);
    [
        center - tangent * half_u - bitangent * half_v,
        center + tangent * half_u - bitangent * half_v,
        center + tangent * half_u + bitangent * half_v,
        center - tangent * half_u + bitangent * half_v,
    ]
}

/// A ray aimed at an interior point of the quad's first triangle half,
/// staying clear of the shared diagonal's grazing band
pub fn ray_into_quad(seed: u32, corners: &[Vec3; 4]) -> Ray {
    let a = 0.05 + unit_hash(seed, 10) * 0.4;
    let b = 0.05 + unit_hash(seed, 11) * 0.4;
    let target =
        corners[0] + (corners[1] - corners[0]) * a + (corners[3] - corners[0]) * b;
    let origin = Vec3::new(
        signed_hash(seed, 12, 1.0),
        signed_hash(seed, 13, 1.0),
        -1.0 - unit_hash(seed, 14),
    );
    Ray::new(origin, (target - origin).normalize())
}

/// Build a one-record scene from explicit quad corners
pub fn scene_from_corners(corners: &[Vec3; 4]) -> Scene {
    let mut scene = Scene::new();
    scene.attach(
        QuadGeometry::new(corners.to_vec(), vec![[0, 1, 2, 3]])
            .expect("corner indices are valid"),
    );
    scene
}
