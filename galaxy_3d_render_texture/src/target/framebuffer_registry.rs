//! Process-wide framebuffer bookkeeping
//!
//! Framebuffers can only be deleted while their own context is current, but a
//! context teardown notification carries no reference to the render targets
//! that used it. Every framebuffer created by a render target is therefore
//! tracked here, in exactly one of two places:
//!
//! - **owned**: in the per-target map of a live render target (keyed by the
//!   target's slot in the active index)
//! - **stale**: its target was dropped while the owning context was not
//!   current; it waits for that context to be torn down
//!
//! Context ids are only unique within a backend, so both places record the
//! backend each framebuffer belongs to and a sweep only touches entries of
//! the backend that reported the teardown.
//!
//! Once deleted it is forgotten. A single sweep routine handles both the
//! teardown notification and the opportunistic cleanup done when a target is
//! dropped.
//!
//! All of it lives behind one mutex, initialized on first use and alive until
//! process exit.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};

use crate::backend::{BackendId, ContextId, FramebufferHandle, GraphicsBackend};

new_key_type! {
    /// Slot of a live render target in the active index
    pub struct TargetKey;
}

/// Name under which the teardown callback is registered with backends
pub(crate) const CONTEXT_DESTROY_CALLBACK: &str = "galaxy3d::FramebufferRegistry";

/// Framebuffer whose render target is gone, waiting for its context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaleEntry {
    /// Backend the context belongs to
    pub backend: BackendId,
    /// Context that owns the framebuffer
    pub context: ContextId,
    /// Framebuffer name on that context
    pub framebuffer: FramebufferHandle,
}

/// Lifecycle state of a framebuffer as tracked by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferState {
    /// Cached by a live render target
    Owned,
    /// Detached from its dropped render target, not yet deleted
    Stale,
    /// Deleted, or never created by a render target
    Destroyed,
}

/// Per-target framebuffer cache
pub(crate) type FramebufferMap = FxHashMap<ContextId, FramebufferHandle>;

/// Active index slot of one render target
struct TargetEntry {
    backend: BackendId,
    framebuffers: FramebufferMap,
}

// ===== INTERNAL STATE =====

static REGISTRY: OnceLock<Mutex<RegistryState>> = OnceLock::new();

/// Everything guarded by the registry lock
pub(crate) struct RegistryState {
    /// Active index: one framebuffer map per live render target
    targets: SlotMap<TargetKey, TargetEntry>,
    /// Framebuffers of dropped render targets
    stale: FxHashSet<StaleEntry>,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            targets: SlotMap::with_key(),
            stale: FxHashSet::default(),
        }
    }

    /// Acquire the registry lock
    ///
    /// Poisoning is ignored: every mutation leaves the state consistent, and
    /// teardown must still run after a panic elsewhere.
    pub(crate) fn lock() -> MutexGuard<'static, RegistryState> {
        REGISTRY
            .get_or_init(|| Mutex::new(RegistryState::new()))
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an empty framebuffer map for a new render target on `backend`
    pub(crate) fn register_target(&mut self, backend: BackendId) -> TargetKey {
        self.targets.insert(TargetEntry {
            backend,
            framebuffers: FramebufferMap::default(),
        })
    }

    /// Remove a render target from the active index, returning its map
    pub(crate) fn unregister_target(&mut self, key: TargetKey) -> FramebufferMap {
        self.targets
            .remove(key)
            .map(|entry| entry.framebuffers)
            .unwrap_or_default()
    }

    /// Cached framebuffer of a target on a context
    pub(crate) fn framebuffer(&self, key: TargetKey, context: ContextId) -> Option<FramebufferHandle> {
        self.targets.get(key).and_then(|entry| entry.framebuffers.get(&context).copied())
    }

    /// Number of framebuffers cached by a target
    pub(crate) fn framebuffer_count(&self, key: TargetKey) -> usize {
        self.targets.get(key).map_or(0, |entry| entry.framebuffers.len())
    }

    /// Cache a freshly created framebuffer
    ///
    /// If the target already caches a framebuffer for `context` nothing is
    /// inserted and the existing handle is returned; the caller still owns
    /// `framebuffer` in that case.
    pub(crate) fn insert_framebuffer(
        &mut self,
        key: TargetKey,
        context: ContextId,
        framebuffer: FramebufferHandle,
    ) -> Option<FramebufferHandle> {
        let map = &mut self.targets.get_mut(key)?.framebuffers;
        if let Some(existing) = map.get(&context) {
            return Some(*existing);
        }
        map.insert(context, framebuffer);
        None
    }

    /// Move the framebuffers of a dropped target into the stale set
    pub(crate) fn demote(&mut self, backend: BackendId, framebuffers: FramebufferMap) {
        self.stale.extend(
            framebuffers
                .into_iter()
                .map(|(context, framebuffer)| StaleEntry { backend, context, framebuffer }),
        );
    }

    /// Delete every tracked framebuffer that belongs to `context` of `backend`
    ///
    /// `context` must be current on the calling thread. At most one entry per
    /// live target can match; any number of stale entries can. Entries of
    /// other backends are left alone. Returns the number of framebuffers
    /// deleted.
    pub(crate) fn sweep_context(&mut self, backend: &dyn GraphicsBackend, context: ContextId) -> usize {
        let backend_id = backend.backend_id();
        let mut deleted = 0;

        for entry in self.targets.values_mut().filter(|entry| entry.backend == backend_id) {
            if let Some(framebuffer) = entry.framebuffers.remove(&context) {
                backend.delete_framebuffer(framebuffer);
                deleted += 1;
            }
        }

        self.stale.retain(|entry| {
            if entry.backend != backend_id || entry.context != context {
                return true;
            }
            backend.delete_framebuffer(entry.framebuffer);
            deleted += 1;
            false
        });

        deleted
    }

    fn state_of(
        &self,
        backend: BackendId,
        context: ContextId,
        framebuffer: FramebufferHandle,
    ) -> FramebufferState {
        if self.stale.contains(&StaleEntry { backend, context, framebuffer }) {
            return FramebufferState::Stale;
        }
        let owned = self.targets.values().any(|entry| {
            entry.backend == backend && entry.framebuffers.get(&context) == Some(&framebuffer)
        });
        if owned {
            FramebufferState::Owned
        } else {
            FramebufferState::Destroyed
        }
    }
}

/// Teardown callback registered with every backend a render target uses
///
/// Runs with the dying context current and deletes everything tracked for it.
pub fn context_destroy_callback(backend: &dyn GraphicsBackend) {
    let mut registry = RegistryState::lock();

    let Some(context) = backend.active_context_id() else {
        return;
    };

    let deleted = registry.sweep_context(backend, context);
    if deleted > 0 {
        crate::engine_debug!("galaxy3d::FramebufferRegistry",
            "Context {} destroyed: deleted {} framebuffer(s)", context, deleted);
    }
}

/// Clear the registry (test builds only)
#[cfg(test)]
pub(crate) fn reset_for_testing() {
    let mut registry = RegistryState::lock();
    registry.targets.clear();
    registry.stale.clear();
}

// ===== PUBLIC API =====

/// Read-only view of the process-wide framebuffer registry
pub struct FramebufferRegistry;

impl FramebufferRegistry {
    /// Number of live render targets in the active index
    pub fn target_count() -> usize {
        RegistryState::lock().targets.len()
    }

    /// Number of framebuffers cached by live render targets
    pub fn owned_count() -> usize {
        RegistryState::lock()
            .targets
            .values()
            .map(|entry| entry.framebuffers.len())
            .sum()
    }

    /// Number of stale framebuffers waiting for their context
    pub fn stale_count() -> usize {
        RegistryState::lock().stale.len()
    }

    /// Snapshot of the stale entries
    pub fn stale_entries() -> Vec<StaleEntry> {
        RegistryState::lock().stale.iter().copied().collect()
    }

    /// Lifecycle state of a framebuffer created on `context` of `backend`
    pub fn state_of(
        backend: BackendId,
        context: ContextId,
        framebuffer: FramebufferHandle,
    ) -> FramebufferState {
        RegistryState::lock().state_of(backend, context, framebuffer)
    }
}

#[cfg(test)]
#[path = "framebuffer_registry_tests.rs"]
mod tests;
