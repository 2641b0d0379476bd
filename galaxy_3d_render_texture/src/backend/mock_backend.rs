/// Mock GraphicsBackend for unit tests (no GPU required)
///
/// Emulates what matters for cross-context framebuffer management:
/// - contexts with unique ids, current per thread
/// - framebuffers owned by the context that created them
/// - renderbuffers shared by all contexts
/// - teardown callbacks fired with the dying context current
///
/// Misuse (deleting a framebuffer from the wrong context, deleting twice) is
/// counted instead of panicking so tests can assert it never happens.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::backend::{
    BackendId, Capabilities, ContextDestroyCallback, ContextId, ContextRegistry, FramebufferApi,
    FramebufferHandle, FramebufferStatus, FramebufferTarget, GraphicsContext,
    RenderbufferHandle, TextureHandle,
};
use crate::error::{Error, Result};

/// GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT
pub const STATUS_INCOMPLETE_ATTACHMENT: u32 = 0x8CD6;
/// GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT
pub const STATUS_MISSING_ATTACHMENT: u32 = 0x8CD7;

// ============================================================================
// Mock state
// ============================================================================

/// A framebuffer as the mock driver sees it
#[derive(Debug, Clone)]
pub struct MockFramebuffer {
    pub context: ContextId,
    pub color: Option<TextureHandle>,
    pub depth: Option<RenderbufferHandle>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Bindings {
    read: Option<FramebufferHandle>,
    draw: Option<FramebufferHandle>,
}

struct MockState {
    next_context: u64,
    next_framebuffer: u32,
    next_renderbuffer: u32,
    live_contexts: FxHashSet<ContextId>,
    current: FxHashMap<ThreadId, ContextId>,
    bindings: FxHashMap<ContextId, Bindings>,
    framebuffers: FxHashMap<FramebufferHandle, MockFramebuffer>,
    renderbuffers: FxHashMap<RenderbufferHandle, (u32, u32)>,
    callbacks: Vec<(&'static str, ContextDestroyCallback)>,
    capabilities: Capabilities,

    fail_context_creation: bool,
    fail_framebuffer_creation: bool,
    fail_renderbuffer_creation: bool,
    force_incomplete: bool,

    contexts_created: usize,
    framebuffers_created: usize,
    framebuffers_deleted: usize,
    renderbuffers_created: usize,
    renderbuffers_deleted: usize,
    wrong_context_deletions: usize,
    unknown_deletions: usize,
}

impl MockState {
    fn new() -> Self {
        Self {
            next_context: 1,
            next_framebuffer: 1,
            next_renderbuffer: 1,
            live_contexts: FxHashSet::default(),
            current: FxHashMap::default(),
            bindings: FxHashMap::default(),
            framebuffers: FxHashMap::default(),
            renderbuffers: FxHashMap::default(),
            callbacks: Vec::new(),
            capabilities: Capabilities::FRAMEBUFFER_OBJECT | Capabilities::SEPARATE_READ_DRAW,
            fail_context_creation: false,
            fail_framebuffer_creation: false,
            fail_renderbuffer_creation: false,
            force_incomplete: false,
            contexts_created: 0,
            framebuffers_created: 0,
            framebuffers_deleted: 0,
            renderbuffers_created: 0,
            renderbuffers_deleted: 0,
            wrong_context_deletions: 0,
            unknown_deletions: 0,
        }
    }

    fn current_context(&self) -> Option<ContextId> {
        self.current.get(&thread::current().id()).copied()
    }
}

// ============================================================================
// MockBackend
// ============================================================================

/// Cloneable handle to a shared mock driver
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(MockState::new())) }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a concrete mock context (not current)
    pub fn create_mock_context(&self) -> Result<MockContext> {
        let mut state = self.state();
        if state.fail_context_creation {
            return Err(Error::BackendError("mock context creation disabled".to_string()));
        }
        let id = ContextId(state.next_context);
        state.next_context += 1;
        state.contexts_created += 1;
        state.live_contexts.insert(id);
        state.bindings.insert(id, Bindings::default());
        Ok(MockContext { backend: self.clone(), id })
    }

    /// Destroy a context: fire teardown callbacks with it current, then forget it
    pub fn destroy_context(&self, id: ContextId) {
        let thread = thread::current().id();
        let (callbacks, previous) = {
            let mut state = self.state();
            if !state.live_contexts.contains(&id) {
                return;
            }
            let previous = state.current.insert(thread, id);
            (state.callbacks.clone(), previous)
        };

        // Mock lock released: callbacks call back into the backend
        for (_, callback) in callbacks {
            callback(self);
        }

        let mut state = self.state();
        state.live_contexts.remove(&id);
        state.bindings.remove(&id);
        state.current.retain(|_, current| *current != id);
        if let Some(previous) = previous.filter(|previous| *previous != id) {
            state.current.insert(thread, previous);
        }
    }

    fn set_current(&self, id: ContextId, active: bool) -> Result<()> {
        let mut state = self.state();
        if !state.live_contexts.contains(&id) {
            return Err(Error::BackendError(format!("context {} is not alive", id)));
        }
        let thread = thread::current().id();
        if active {
            state.current.insert(thread, id);
        } else if state.current.get(&thread) == Some(&id) {
            state.current.remove(&thread);
        }
        Ok(())
    }

    // ===== FAILURE INJECTION =====

    pub fn set_fail_context_creation(&self, fail: bool) {
        self.state().fail_context_creation = fail;
    }

    pub fn set_fail_framebuffer_creation(&self, fail: bool) {
        self.state().fail_framebuffer_creation = fail;
    }

    pub fn set_fail_renderbuffer_creation(&self, fail: bool) {
        self.state().fail_renderbuffer_creation = fail;
    }

    pub fn set_force_incomplete(&self, incomplete: bool) {
        self.state().force_incomplete = incomplete;
    }

    pub fn set_capabilities(&self, capabilities: Capabilities) {
        self.state().capabilities = capabilities;
    }

    // ===== INSPECTION =====

    pub fn callback_count(&self) -> usize {
        self.state().callbacks.len()
    }

    pub fn contexts_created(&self) -> usize {
        self.state().contexts_created
    }

    pub fn live_context_count(&self) -> usize {
        self.state().live_contexts.len()
    }

    pub fn framebuffers_created(&self) -> usize {
        self.state().framebuffers_created
    }

    pub fn framebuffers_deleted(&self) -> usize {
        self.state().framebuffers_deleted
    }

    pub fn live_framebuffer_count(&self) -> usize {
        self.state().framebuffers.len()
    }

    /// Framebuffers still alive on a context (destroyed contexts included)
    pub fn live_framebuffers_on(&self, context: ContextId) -> usize {
        self.state().framebuffers.values().filter(|fb| fb.context == context).count()
    }

    pub fn framebuffer(&self, framebuffer: FramebufferHandle) -> Option<MockFramebuffer> {
        self.state().framebuffers.get(&framebuffer).cloned()
    }

    pub fn renderbuffers_created(&self) -> usize {
        self.state().renderbuffers_created
    }

    pub fn renderbuffers_deleted(&self) -> usize {
        self.state().renderbuffers_deleted
    }

    pub fn renderbuffer_size(&self, renderbuffer: RenderbufferHandle) -> Option<(u32, u32)> {
        self.state().renderbuffers.get(&renderbuffer).copied()
    }

    pub fn wrong_context_deletions(&self) -> usize {
        self.state().wrong_context_deletions
    }

    pub fn unknown_deletions(&self) -> usize {
        self.state().unknown_deletions
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ContextRegistry
// ============================================================================

impl ContextRegistry for MockBackend {
    /// Clones share one driver, so they share one identity
    fn backend_id(&self) -> BackendId {
        BackendId(Arc::as_ptr(&self.state) as *const () as usize)
    }

    fn active_context_id(&self) -> Option<ContextId> {
        self.state().current_context()
    }

    fn create_context(&self) -> Result<Box<dyn GraphicsContext>> {
        Ok(Box::new(self.create_mock_context()?))
    }

    fn register_context_destroy_callback(&self, name: &'static str, callback: ContextDestroyCallback) {
        let mut state = self.state();
        match state.callbacks.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = callback,
            None => state.callbacks.push((name, callback)),
        }
    }
}

// ============================================================================
// FramebufferApi
// ============================================================================

impl FramebufferApi for MockBackend {
    fn capabilities(&self) -> Capabilities {
        self.state().capabilities
    }

    fn create_framebuffer(&self) -> Result<FramebufferHandle> {
        let mut state = self.state();
        let Some(context) = state.current_context() else {
            return Err(Error::BackendError("no current context".to_string()));
        };
        if state.fail_framebuffer_creation {
            return Err(Error::BackendError("mock framebuffer creation disabled".to_string()));
        }
        let handle = FramebufferHandle::from_raw(state.next_framebuffer)
            .ok_or_else(|| Error::BackendError("framebuffer names exhausted".to_string()))?;
        state.next_framebuffer += 1;
        state.framebuffers_created += 1;
        state.framebuffers.insert(handle, MockFramebuffer { context, color: None, depth: None });
        Ok(handle)
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferHandle) {
        let mut state = self.state();
        let current = state.current_context();
        let owner = state.framebuffers.get(&framebuffer).map(|fb| fb.context);
        match owner {
            None => state.unknown_deletions += 1,
            Some(owner) if Some(owner) != current => state.wrong_context_deletions += 1,
            Some(owner) => {
                state.framebuffers.remove(&framebuffer);
                state.framebuffers_deleted += 1;
                if let Some(bindings) = state.bindings.get_mut(&owner) {
                    if bindings.read == Some(framebuffer) {
                        bindings.read = None;
                    }
                    if bindings.draw == Some(framebuffer) {
                        bindings.draw = None;
                    }
                }
            }
        }
    }

    fn bind_framebuffer(&self, target: FramebufferTarget, framebuffer: Option<FramebufferHandle>) {
        let mut state = self.state();
        let Some(context) = state.current_context() else {
            return;
        };
        if let Some(bindings) = state.bindings.get_mut(&context) {
            match target {
                FramebufferTarget::Framebuffer => {
                    bindings.read = framebuffer;
                    bindings.draw = framebuffer;
                }
                FramebufferTarget::Read => bindings.read = framebuffer,
                FramebufferTarget::Draw => bindings.draw = framebuffer,
            }
        }
    }

    fn framebuffer_binding(&self, target: FramebufferTarget) -> Option<FramebufferHandle> {
        let state = self.state();
        let bindings = state.current_context().and_then(|context| state.bindings.get(&context))?;
        match target {
            FramebufferTarget::Framebuffer | FramebufferTarget::Draw => bindings.draw,
            FramebufferTarget::Read => bindings.read,
        }
    }

    fn attach_color_texture(&self, texture: TextureHandle) {
        let mut state = self.state();
        let bound = state.current_context()
            .and_then(|context| state.bindings.get(&context))
            .and_then(|bindings| bindings.draw);
        if let Some(fb) = bound.and_then(|bound| state.framebuffers.get_mut(&bound)) {
            fb.color = Some(texture);
        }
    }

    fn attach_depth_renderbuffer(&self, renderbuffer: RenderbufferHandle) {
        let mut state = self.state();
        let bound = state.current_context()
            .and_then(|context| state.bindings.get(&context))
            .and_then(|bindings| bindings.draw);
        if let Some(fb) = bound.and_then(|bound| state.framebuffers.get_mut(&bound)) {
            fb.depth = Some(renderbuffer);
        }
    }

    fn framebuffer_status(&self) -> FramebufferStatus {
        let state = self.state();
        if state.force_incomplete {
            return FramebufferStatus::Incomplete(STATUS_INCOMPLETE_ATTACHMENT);
        }
        let bound = state.current_context()
            .and_then(|context| state.bindings.get(&context))
            .and_then(|bindings| bindings.draw)
            .and_then(|bound| state.framebuffers.get(&bound));
        match bound {
            Some(fb) if fb.color.is_some() => FramebufferStatus::Complete,
            _ => FramebufferStatus::Incomplete(STATUS_MISSING_ATTACHMENT),
        }
    }

    fn create_renderbuffer(&self) -> Result<RenderbufferHandle> {
        let mut state = self.state();
        if state.fail_renderbuffer_creation {
            return Err(Error::BackendError("mock renderbuffer creation disabled".to_string()));
        }
        let handle = RenderbufferHandle::from_raw(state.next_renderbuffer)
            .ok_or_else(|| Error::BackendError("renderbuffer names exhausted".to_string()))?;
        state.next_renderbuffer += 1;
        state.renderbuffers_created += 1;
        state.renderbuffers.insert(handle, (0, 0));
        Ok(handle)
    }

    fn allocate_depth_storage(&self, renderbuffer: RenderbufferHandle, width: u32, height: u32) {
        if let Some(size) = self.state().renderbuffers.get_mut(&renderbuffer) {
            *size = (width, height);
        }
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferHandle) {
        let mut state = self.state();
        if state.renderbuffers.remove(&renderbuffer).is_some() {
            state.renderbuffers_deleted += 1;
        } else {
            state.unknown_deletions += 1;
        }
    }
}

// ============================================================================
// MockContext
// ============================================================================

/// Mock context; dropping it destroys the context
pub struct MockContext {
    backend: MockBackend,
    id: ContextId,
}

impl GraphicsContext for MockContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn set_active(&self, active: bool) -> Result<()> {
        self.backend.set_current(self.id, active)
    }
}

impl Drop for MockContext {
    fn drop(&mut self) {
        self.backend.destroy_context(self.id);
    }
}
