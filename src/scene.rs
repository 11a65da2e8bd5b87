//! Minimal scene surface consumed by the intersectors
//!
//! The kernels only need three things from a scene: positional vertex
//! lookups, per-geometry filter callbacks, and a stable geometry id space
//! with detachable slots. `Scene` provides exactly that, plus a [`Ragged`]
//! view (geometry -> primitive list) so build and refit passes can walk all
//! primitives with the nested-parallel drivers.
//!
//! Author: Moroya Sakamoto

use std::any::Any;
use std::cell::Cell;
use std::sync::Arc;

use glam::Vec3;
use thiserror::Error;

use crate::parallel::{Ragged, SubArray};
use crate::quad::Quad4;
use crate::types::INVALID_ID;

/// Scene construction errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// A quad references a vertex index past the end of the vertex buffer
    #[error("quad {quad} references vertex {index}, but only {vertex_count} vertices exist")]
    VertexIndexOutOfRange {
        /// Offending quad index
        quad: usize,
        /// Offending vertex index
        index: u32,
        /// Size of the vertex buffer
        vertex_count: usize,
    },
}

/// Candidate hit handed to filter callbacks before it is committed
#[derive(Debug, Clone, Copy)]
pub struct HitCandidate {
    /// Hit distance along the ray
    pub t: f32,
    /// Barycentric u over the quad parameterisation
    pub u: f32,
    /// Barycentric v over the quad parameterisation
    pub v: f32,
    /// Unnormalised geometric normal
    pub ng: Vec3,
    /// Geometry id of the candidate
    pub geom_id: u32,
    /// Primitive id of the candidate
    pub prim_id: u32,
}

/// Filter callback: return `true` to accept the candidate, `false` to reject
///
/// Filters run on whichever thread drives the ray, so they must be
/// `Send + Sync`. The context is shared immutably; the only sanctioned
/// context mutation is [`IntersectContext::request_abort`]. State beyond the
/// ray must live in interior-mutable user data the callback owns.
pub type FilterFn = dyn for<'a> Fn(&IntersectContext<'a>, &HitCandidate) -> bool + Send + Sync;

/// One quad mesh: a vertex buffer plus four vertex indices per primitive
#[derive(Clone)]
pub struct QuadGeometry {
    vertices: Vec<Vec3>,
    quads: Vec<[u32; 4]>,
    intersection_filter: Option<Arc<FilterFn>>,
    occlusion_filter: Option<Arc<FilterFn>>,
}

impl QuadGeometry {
    /// Create a geometry, validating every vertex index up front
    pub fn new(vertices: Vec<Vec3>, quads: Vec<[u32; 4]>) -> Result<Self, SceneError> {
        for (q, indices) in quads.iter().enumerate() {
            for &index in indices {
                if index as usize >= vertices.len() {
                    return Err(SceneError::VertexIndexOutOfRange {
                        quad: q,
                        index,
                        vertex_count: vertices.len(),
                    });
                }
            }
        }
        Ok(QuadGeometry {
            vertices,
            quads,
            intersection_filter: None,
            occlusion_filter: None,
        })
    }

    /// Attach an intersection filter callback
    pub fn with_intersection_filter(mut self, filter: Arc<FilterFn>) -> Self {
        self.intersection_filter = Some(filter);
        self
    }

    /// Attach an occlusion filter callback
    pub fn with_occlusion_filter(mut self, filter: Arc<FilterFn>) -> Self {
        self.occlusion_filter = Some(filter);
        self
    }

    /// Number of quads
    #[inline]
    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    /// Number of vertices
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex indices of quad `prim_id`
    #[inline]
    pub fn quad(&self, prim_id: usize) -> [u32; 4] {
        self.quads[prim_id]
    }

    /// Position of vertex `idx`, or a zero sentinel for out-of-range input
    #[inline]
    pub fn vertex(&self, idx: u32) -> Vec3 {
        self.vertices.get(idx as usize).copied().unwrap_or(Vec3::ZERO)
    }

    /// Mutable vertex buffer access for refit passes
    pub fn vertices_mut(&mut self) -> &mut [Vec3] {
        &mut self.vertices
    }
}

impl SubArray for QuadGeometry {
    #[inline]
    fn len(&self) -> usize {
        self.quads.len()
    }
}

/// A slot vector of geometries; detached slots stay allocated but absent
#[derive(Default)]
pub struct Scene {
    geometries: Vec<Option<QuadGeometry>>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Scene::default()
    }

    /// Attach a geometry and return its id
    pub fn attach(&mut self, geometry: QuadGeometry) -> u32 {
        self.geometries.push(Some(geometry));
        (self.geometries.len() - 1) as u32
    }

    /// Detach a geometry, leaving an absent slot; returns whether it existed
    pub fn detach(&mut self, geom_id: u32) -> bool {
        match self.geometries.get_mut(geom_id as usize) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    /// Number of geometry slots (attached or absent)
    #[inline]
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Look up a geometry by id
    #[inline]
    pub fn geometry(&self, geom_id: u32) -> Option<&QuadGeometry> {
        self.geometries.get(geom_id as usize)
    }

    /// Mutable geometry access for refit passes
    pub fn geometry_mut(&mut self, geom_id: u32) -> Option<&mut QuadGeometry> {
        self.geometries.get_mut(geom_id as usize)?.as_mut()
    }

    /// Position of vertex `idx` of geometry `geom_id`
    ///
    /// Out-of-range ids resolve to a zero sentinel rather than reading out of
    /// bounds; the degenerate result cannot produce a spurious hit.
    #[inline]
    pub fn vertex(&self, geom_id: u32, idx: u32) -> Vec3 {
        match self.geometry(geom_id) {
            Some(geometry) => geometry.vertex(idx),
            None => Vec3::ZERO,
        }
    }

    /// Intersection filter of geometry `geom_id`, if any
    #[inline]
    pub fn intersection_filter(&self, geom_id: u32) -> Option<&FilterFn> {
        self.geometry(geom_id)?.intersection_filter.as_deref()
    }

    /// Occlusion filter of geometry `geom_id`, if any
    #[inline]
    pub fn occlusion_filter(&self, geom_id: u32) -> Option<&FilterFn> {
        self.geometry(geom_id)?.occlusion_filter.as_deref()
    }

    /// Pack one geometry's quads into 4-wide leaf records
    ///
    /// The tail record pads its unused lanes with inactive sentinels.
    pub fn pack_geometry(&self, geom_id: u32) -> Vec<Quad4> {
        let Some(geometry) = self.geometry(geom_id) else {
            return Vec::new();
        };
        let mut records = Vec::with_capacity(geometry.quad_count().div_ceil(4));
        let mut items = Vec::with_capacity(4);
        for prim_id in 0..geometry.quad_count() as u32 {
            items.push((geom_id, prim_id));
            if items.len() == 4 {
                records.push(Quad4::pack(self, &items));
                items.clear();
            }
        }
        if !items.is_empty() {
            records.push(Quad4::pack(self, &items));
        }
        records
    }
}

impl Ragged for Scene {
    type Sub = QuadGeometry;

    #[inline]
    fn len(&self) -> usize {
        self.geometries.len()
    }

    #[inline]
    fn get(&self, i: usize) -> Option<&QuadGeometry> {
        self.geometries.get(i)
    }
}

/// Per-traversal context threaded through the intersectors
///
/// Carries the scene, the filter-enable flag, optional user ray-extension
/// data for filter callbacks, and the out-of-band abort flag a filter may
/// raise to stop an entire traversal batch. One context serves one
/// traversal thread; it is not shared across threads.
pub struct IntersectContext<'a> {
    /// Scene being traversed
    pub scene: &'a Scene,
    /// Instance id stamped into committed hits
    pub inst_id: u32,
    /// Whether filter callbacks run at all
    pub enable_filters: bool,
    /// User ray-extension data visible to filter callbacks
    pub user: Option<&'a (dyn Any + Sync)>,
    abort: Cell<bool>,
}

impl<'a> IntersectContext<'a> {
    /// Create a context with filters enabled and no user data
    pub fn new(scene: &'a Scene) -> Self {
        IntersectContext {
            scene,
            inst_id: INVALID_ID,
            enable_filters: true,
            user: None,
            abort: Cell::new(false),
        }
    }

    /// Attach user ray-extension data
    pub fn with_user(mut self, user: &'a (dyn Any + Sync)) -> Self {
        self.user = Some(user);
        self
    }

    /// Raise the abort flag; sibling rays in the batch skip further work
    #[inline]
    pub fn request_abort(&self) {
        self.abort.set(true);
    }

    /// Whether a filter requested traversal abort
    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.abort.get()
    }
}
