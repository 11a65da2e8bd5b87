//! Per-thread traversal statistics
//!
//! Counts primitive visits on the intersect (`normal`) and occlusion
//! (`shadow`) paths, parameterised by the number of active rays and
//! primitives per entry. Each thread increments its own registered counter block;
//! [`gather`] folds the blocks on demand. With the `stats` cargo feature
//! disabled every call compiles to nothing.
//!
//! Author: Moroya Sakamoto

/// Snapshot of the traversal counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TravStats {
    /// Primitive visits on the intersect path (rays x primitives)
    pub normal_trav_prims: u64,
    /// Primitive visits on the occlusion path (rays x primitives)
    pub shadow_trav_prims: u64,
}

#[cfg(feature = "stats")]
mod imp {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex, OnceLock};

    use super::TravStats;

    #[derive(Default)]
    pub(super) struct Counters {
        normal: AtomicU64,
        shadow: AtomicU64,
    }

    fn registry() -> &'static Mutex<Vec<Arc<Counters>>> {
        static REGISTRY: OnceLock<Mutex<Vec<Arc<Counters>>>> = OnceLock::new();
        REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
    }

    thread_local! {
        static LOCAL: Arc<Counters> = {
            let counters = Arc::new(Counters::default());
            registry()
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(Arc::clone(&counters));
            counters
        };
    }

    pub(super) fn add_normal(count: u64) {
        LOCAL.with(|c| c.normal.fetch_add(count, Ordering::Relaxed));
    }

    pub(super) fn add_shadow(count: u64) {
        LOCAL.with(|c| c.shadow.fetch_add(count, Ordering::Relaxed));
    }

    pub(super) fn gather() -> TravStats {
        let guard = registry()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut total = TravStats::default();
        for counters in guard.iter() {
            total.normal_trav_prims += counters.normal.load(Ordering::Relaxed);
            total.shadow_trav_prims += counters.shadow.load(Ordering::Relaxed);
        }
        total
    }

    pub(super) fn reset() {
        let guard = registry()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for counters in guard.iter() {
            counters.normal.store(0, Ordering::Relaxed);
            counters.shadow.store(0, Ordering::Relaxed);
        }
    }
}

/// Record `rays x prims` primitive visits on the intersect path
#[inline(always)]
pub fn count_normal_prims(rays: u32, prims: u32) {
    #[cfg(feature = "stats")]
    imp::add_normal(rays as u64 * prims as u64);
    #[cfg(not(feature = "stats"))]
    let _ = (rays, prims);
}

/// Record `rays x prims` primitive visits on the occlusion path
#[inline(always)]
pub fn count_shadow_prims(rays: u32, prims: u32) {
    #[cfg(feature = "stats")]
    imp::add_shadow(rays as u64 * prims as u64);
    #[cfg(not(feature = "stats"))]
    let _ = (rays, prims);
}

/// Fold every thread's counters into one snapshot
///
/// Always returns zeros when the `stats` feature is disabled.
pub fn gather() -> TravStats {
    #[cfg(feature = "stats")]
    {
        imp::gather()
    }
    #[cfg(not(feature = "stats"))]
    {
        TravStats::default()
    }
}

/// Zero every thread's counters
pub fn reset() {
    #[cfg(feature = "stats")]
    imp::reset();
}
