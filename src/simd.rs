//! SIMD type definitions for 4-wide and 8-wide evaluation
//!
//! This module provides SIMD-friendly vector types for the intersection
//! kernels: 4 lanes for quad records, 8 lanes for ray packets, mapping to
//! SSE/NEON and AVX2 registers respectively.
//!
//! Masks are carried as `f32x4`/`f32x8` values whose active lanes have all
//! bits set (the representation comparison ops produce), so they compose with
//! `blend` and bitwise ops and collapse to scalar bitmasks via `move_mask`.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;
use wide::{f32x4, f32x8};

/// All-bits-set lane value used to build SIMD masks
const LANE_ON: f32 = f32::from_bits(u32::MAX);

// ============================================================================
// 4-wide vectors
// ============================================================================

/// 4 3D vectors packed for SIMD processing
///
/// Structure-of-Arrays (SoA) layout:
/// - x: [x0, x1, x2, x3]
/// - y: [y0, y1, y2, y3]
/// - z: [z0, z1, z2, z3]
#[derive(Clone, Copy, Debug)]
pub struct Vec3x4 {
    /// X components (4-wide)
    pub x: f32x4,
    /// Y components (4-wide)
    pub y: f32x4,
    /// Z components (4-wide)
    pub z: f32x4,
}

impl Vec3x4 {
    /// Create from 4 separate Vec3 values
    #[inline]
    pub fn from_vecs(v: [Vec3; 4]) -> Self {
        Vec3x4 {
            x: f32x4::new([v[0].x, v[1].x, v[2].x, v[3].x]),
            y: f32x4::new([v[0].y, v[1].y, v[2].y, v[3].y]),
            z: f32x4::new([v[0].z, v[1].z, v[2].z, v[3].z]),
        }
    }

    /// Create with all lanes set to the same vector
    #[inline]
    pub fn splat(v: Vec3) -> Self {
        Vec3x4 {
            x: f32x4::splat(v.x),
            y: f32x4::splat(v.y),
            z: f32x4::splat(v.z),
        }
    }

    /// Create from raw x, y, z arrays
    #[inline]
    pub fn new(x: [f32; 4], y: [f32; 4], z: [f32; 4]) -> Self {
        Vec3x4 {
            x: f32x4::new(x),
            y: f32x4::new(y),
            z: f32x4::new(z),
        }
    }

    /// Zero vector for all 4 lanes
    #[inline]
    pub fn zero() -> Self {
        Vec3x4 {
            x: f32x4::ZERO,
            y: f32x4::ZERO,
            z: f32x4::ZERO,
        }
    }

    /// Dot product with another Vec3x4
    #[inline]
    pub fn dot(self, other: Self) -> f32x4 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product with another Vec3x4
    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Vec3x4 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Per-lane select: lanes where `mask` is set take `t`, others `f`
    #[inline]
    pub fn blend(mask: f32x4, t: Self, f: Self) -> Self {
        Vec3x4 {
            x: mask.blend(t.x, f.x),
            y: mask.blend(t.y, f.y),
            z: mask.blend(t.z, f.z),
        }
    }

    /// Extract one lane as a scalar vector
    #[inline]
    pub fn extract(self, lane: usize) -> Vec3 {
        Vec3::new(
            self.x.to_array()[lane],
            self.y.to_array()[lane],
            self.z.to_array()[lane],
        )
    }

    /// Extract results back to arrays
    #[inline]
    pub fn to_arrays(self) -> ([f32; 4], [f32; 4], [f32; 4]) {
        (self.x.to_array(), self.y.to_array(), self.z.to_array())
    }
}

impl std::ops::Add for Vec3x4 {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Vec3x4 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl std::ops::Sub for Vec3x4 {
    type Output = Self;
    #[inline]
    fn sub(self, other: Self) -> Self {
        Vec3x4 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl std::ops::Mul<f32x4> for Vec3x4 {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f32x4) -> Self {
        Vec3x4 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl std::ops::Neg for Vec3x4 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Vec3x4 {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

// ============================================================================
// 8-wide vectors
// ============================================================================

/// 8 3D vectors packed for SIMD processing
///
/// Structure-of-Arrays (SoA) layout, one `f32x8` per component.
#[derive(Clone, Copy, Debug)]
pub struct Vec3x8 {
    /// X components (8-wide)
    pub x: f32x8,
    /// Y components (8-wide)
    pub y: f32x8,
    /// Z components (8-wide)
    pub z: f32x8,
}

impl Vec3x8 {
    /// Create from 8 separate Vec3 values
    #[inline]
    pub fn from_vecs(v: [Vec3; 8]) -> Self {
        Vec3x8 {
            x: f32x8::new([v[0].x, v[1].x, v[2].x, v[3].x, v[4].x, v[5].x, v[6].x, v[7].x]),
            y: f32x8::new([v[0].y, v[1].y, v[2].y, v[3].y, v[4].y, v[5].y, v[6].y, v[7].y]),
            z: f32x8::new([v[0].z, v[1].z, v[2].z, v[3].z, v[4].z, v[5].z, v[6].z, v[7].z]),
        }
    }

    /// Create with all lanes set to the same vector
    #[inline]
    pub fn splat(v: Vec3) -> Self {
        Vec3x8 {
            x: f32x8::splat(v.x),
            y: f32x8::splat(v.y),
            z: f32x8::splat(v.z),
        }
    }

    /// Zero vector for all 8 lanes
    #[inline]
    pub fn zero() -> Self {
        Vec3x8 {
            x: f32x8::ZERO,
            y: f32x8::ZERO,
            z: f32x8::ZERO,
        }
    }

    /// Dot product with another Vec3x8
    #[inline]
    pub fn dot(self, other: Self) -> f32x8 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product with another Vec3x8
    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Vec3x8 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Per-lane select: lanes where `mask` is set take `t`, others `f`
    #[inline]
    pub fn blend(mask: f32x8, t: Self, f: Self) -> Self {
        Vec3x8 {
            x: mask.blend(t.x, f.x),
            y: mask.blend(t.y, f.y),
            z: mask.blend(t.z, f.z),
        }
    }

    /// Extract one lane as a scalar vector
    #[inline]
    pub fn extract(self, lane: usize) -> Vec3 {
        Vec3::new(
            self.x.to_array()[lane],
            self.y.to_array()[lane],
            self.z.to_array()[lane],
        )
    }

    /// Replace one lane with a scalar vector
    #[inline]
    pub fn with_lane(self, lane: usize, v: Vec3) -> Self {
        Vec3x8 {
            x: f32x8_with_lane(self.x, lane, v.x),
            y: f32x8_with_lane(self.y, lane, v.y),
            z: f32x8_with_lane(self.z, lane, v.z),
        }
    }

    /// Extract results back to arrays
    #[inline]
    pub fn to_arrays(self) -> ([f32; 8], [f32; 8], [f32; 8]) {
        (self.x.to_array(), self.y.to_array(), self.z.to_array())
    }
}

impl std::ops::Add for Vec3x8 {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Vec3x8 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl std::ops::Sub for Vec3x8 {
    type Output = Self;
    #[inline]
    fn sub(self, other: Self) -> Self {
        Vec3x8 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl std::ops::Mul<f32x8> for Vec3x8 {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f32x8) -> Self {
        Vec3x8 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl std::ops::Neg for Vec3x8 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Vec3x8 {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

// ============================================================================
// Mask and lane helpers
// ============================================================================

/// Build a 4-wide SIMD mask from the low 4 bits of a scalar mask
#[inline]
pub fn mask4_from_bits(bits: u32) -> f32x4 {
    let mut lanes = [0.0f32; 4];
    for (i, lane) in lanes.iter_mut().enumerate() {
        if bits & (1 << i) != 0 {
            *lane = LANE_ON;
        }
    }
    f32x4::new(lanes)
}

/// Build an 8-wide SIMD mask from the low 8 bits of a scalar mask
#[inline]
pub fn mask8_from_bits(bits: u32) -> f32x8 {
    let mut lanes = [0.0f32; 8];
    for (i, lane) in lanes.iter_mut().enumerate() {
        if bits & (1 << i) != 0 {
            *lane = LANE_ON;
        }
    }
    f32x8::new(lanes)
}

/// Collapse a 4-wide SIMD mask to its scalar lane bitmask
#[inline]
pub fn mask4_to_bits(mask: f32x4) -> u32 {
    (mask.move_mask() as u32) & 0xf
}

/// Collapse an 8-wide SIMD mask to its scalar lane bitmask
#[inline]
pub fn mask8_to_bits(mask: f32x8) -> u32 {
    (mask.move_mask() as u32) & 0xff
}

/// Read one lane of an `f32x8`
#[inline]
pub fn f32x8_lane(v: f32x8, lane: usize) -> f32 {
    v.to_array()[lane]
}

/// Replace one lane of an `f32x8`
#[inline]
pub fn f32x8_with_lane(v: f32x8, lane: usize, value: f32) -> f32x8 {
    let mut a = v.to_array();
    a[lane] = value;
    f32x8::new(a)
}
