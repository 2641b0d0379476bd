/// Render target: an offscreen texture usable from any graphics context.
///
/// A render target renders into a texture through one framebuffer object per
/// context. The framebuffer for a context is created the first time the
/// target is activated there and rebound on later activations. Framebuffers
/// are deleted on their own context: immediately when that context is torn
/// down, or when the target is dropped while that context is current.
/// Otherwise they are handed to the framebuffer registry as stale entries.

use std::sync::Arc;
use crate::backend::transient_context::TransientContext;
use crate::backend::{
    Capabilities, ContextId, FramebufferHandle, FramebufferStatus, FramebufferTarget,
    GraphicsBackend, GraphicsContext, RenderbufferHandle, TextureHandle,
};
use crate::engine::Engine;
use crate::error::Result;
use crate::{engine_bail, engine_err};
use super::framebuffer_registry::{
    context_destroy_callback, RegistryState, TargetKey, CONTEXT_DESTROY_CALLBACK,
};

const SOURCE: &str = "galaxy3d::RenderTarget";

/// Descriptor for configuring a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetDesc {
    /// Width in pixels (must be positive)
    pub width: u32,
    /// Height in pixels (must be positive)
    pub height: u32,
    /// Texture rendered into (color attachment 0)
    pub texture: TextureHandle,
    /// Allocate a depth renderbuffer of the same size
    pub depth_buffer: bool,
}

/// Framebuffer bindings saved around creation in `configure`
enum SavedBindings {
    Separate {
        read: Option<FramebufferHandle>,
        draw: Option<FramebufferHandle>,
    },
    Combined(Option<FramebufferHandle>),
}

/// Offscreen render target backed by per-context framebuffer objects
pub struct RenderTarget {
    backend: Arc<dyn GraphicsBackend>,
    /// Slot of our framebuffer map in the registry
    key: TargetKey,
    texture: Option<TextureHandle>,
    width: u32,
    height: u32,
    depth_buffer: Option<RenderbufferHandle>,
    /// Created only when activated with no context current
    backup_context: Option<Box<dyn GraphicsContext>>,
}

impl RenderTarget {
    /// Create a render target on the engine's backend
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if the engine has no backend.
    pub fn new() -> Result<Self> {
        Ok(Self::with_backend(Engine::backend()?))
    }

    /// Create a render target on an explicit backend
    ///
    /// No graphics resource is created; safe to call with no context.
    pub fn with_backend(backend: Arc<dyn GraphicsBackend>) -> Self {
        backend.register_context_destroy_callback(CONTEXT_DESTROY_CALLBACK, context_destroy_callback);
        let key = RegistryState::lock().register_target(backend.backend_id());

        Self {
            backend,
            key,
            texture: None,
            width: 0,
            height: 0,
            depth_buffer: None,
            backup_context: None,
        }
    }

    /// Whether the engine's backend supports framebuffer objects
    ///
    /// `false` when no backend is registered.
    pub fn is_available() -> bool {
        if !Engine::has_backend() {
            return false;
        }
        match Engine::backend() {
            Ok(backend) => Self::is_available_with(backend.as_ref()),
            Err(_) => false,
        }
    }

    /// Whether `backend` supports framebuffer objects
    ///
    /// Activates a transient context if none is current.
    pub fn is_available_with(backend: &dyn GraphicsBackend) -> bool {
        match TransientContext::acquire(backend) {
            Ok(_context) => backend.capabilities().contains(Capabilities::FRAMEBUFFER_OBJECT),
            Err(_) => false,
        }
    }

    /// Set size, texture and depth buffer
    ///
    /// With a context current the framebuffer for that context is created
    /// right away and the caller's framebuffer bindings are restored.
    /// Without one, creation waits for the first `activate(true)`.
    ///
    /// # Errors
    ///
    /// - `InvalidResource`: zero size, or target already configured
    /// - `NoActiveContext`: a transient context was needed for the depth
    ///   buffer and could not be created
    /// - `AllocationFailed` / `IncompleteFramebuffer`: see `activate`
    ///
    /// On error the target is left unconfigured and `configure` may be
    /// called again, with the same or a different size.
    pub fn configure(&mut self, desc: &RenderTargetDesc) -> Result<()> {
        if self.texture.is_some() {
            engine_bail!(SOURCE, InvalidResource,
                "Render target already configured ({}x{})", self.width, self.height);
        }
        if desc.width == 0 || desc.height == 0 {
            engine_bail!(SOURCE, InvalidResource,
                "Invalid render target size {}x{}", desc.width, desc.height);
        }

        if desc.depth_buffer {
            let context = TransientContext::acquire(self.backend.as_ref())?;
            let depth = self.backend.create_renderbuffer().map_err(|e| {
                engine_err!(SOURCE, AllocationFailed,
                    "Failed to create render target depth buffer: {}", e)
            })?;
            self.backend.allocate_depth_storage(depth, desc.width, desc.height);
            self.depth_buffer = Some(depth);

            crate::engine_debug!(SOURCE, "Created depth buffer {} ({}x{}{})",
                depth, desc.width, desc.height,
                if context.is_owned() { ", transient context" } else { "" });
        }

        self.texture = Some(desc.texture);
        self.width = desc.width;
        self.height = desc.height;

        let Some(context) = self.backend.active_context_id() else {
            return Ok(());
        };

        let saved = self.save_bindings();
        let result = self.create_framebuffer(context);
        self.restore_bindings(saved);

        if result.is_err() {
            self.unconfigure();
        }
        result
    }

    /// Bind the framebuffer for the current context, or the default framebuffer
    ///
    /// `activate(false)` always succeeds. `activate(true)` with no context
    /// current creates (once) and activates a backup context owned by this
    /// target. A framebuffer already cached for the context is rebound
    /// without allocating; otherwise one is created.
    ///
    /// # Errors
    ///
    /// - `NoActiveContext`: no context current and the backup context failed
    /// - `InvalidResource`: the target was never configured
    /// - `AllocationFailed`: the API returned no framebuffer
    /// - `IncompleteFramebuffer`: the attachments were rejected
    pub fn activate(&mut self, active: bool) -> Result<()> {
        if !active {
            self.backend.bind_framebuffer(FramebufferTarget::Framebuffer, None);
            return Ok(());
        }

        let context = match self.backend.active_context_id() {
            Some(context) => context,
            None => self.activate_backup_context()?,
        };

        {
            let registry = RegistryState::lock();
            if let Some(framebuffer) = registry.framebuffer(self.key, context) {
                self.backend.bind_framebuffer(FramebufferTarget::Framebuffer, Some(framebuffer));
                return Ok(());
            }
        }

        self.create_framebuffer(context)
    }

    /// Notify that the texture contents changed
    ///
    /// Nothing to do: rendering goes straight into the texture.
    pub fn update_texture(&mut self, _texture: TextureHandle) {}

    /// Texture rendered into, once configured
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Configured size in pixels ((0, 0) before `configure`)
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Depth renderbuffer, if one was requested
    pub fn depth_buffer(&self) -> Option<RenderbufferHandle> {
        self.depth_buffer
    }

    /// Whether a backup context had to be created
    pub fn has_backup_context(&self) -> bool {
        self.backup_context.is_some()
    }

    /// Framebuffer cached for `context`
    pub fn framebuffer(&self, context: ContextId) -> Option<FramebufferHandle> {
        RegistryState::lock().framebuffer(self.key, context)
    }

    /// Number of contexts this target currently has a framebuffer on
    pub fn framebuffer_count(&self) -> usize {
        RegistryState::lock().framebuffer_count(self.key)
    }

    /// Forget the configuration after a failed `configure`
    fn unconfigure(&mut self) {
        if let Some(depth) = self.depth_buffer.take() {
            self.backend.delete_renderbuffer(depth);
        }
        self.texture = None;
        self.width = 0;
        self.height = 0;
    }

    fn activate_backup_context(&mut self) -> Result<ContextId> {
        if self.backup_context.is_none() {
            let context = self.backend.create_context().map_err(|e| {
                engine_err!(SOURCE, NoActiveContext,
                    "Failed to activate render target (failed to create backup context: {})", e)
            })?;
            crate::engine_debug!(SOURCE, "Created backup context {}", context.id());
            self.backup_context = Some(context);
        }

        if let Some(context) = &self.backup_context {
            context.set_active(true).map_err(|e| {
                engine_err!(SOURCE, NoActiveContext,
                    "Failed to activate render target (backup context unusable: {})", e)
            })?;
        }

        match self.backend.active_context_id() {
            Some(context) => Ok(context),
            None => Err(engine_err!(SOURCE, NoActiveContext,
                "Failed to activate render target (backup context did not become current)")),
        }
    }

    /// Create, validate and cache the framebuffer for `context`
    ///
    /// `context` must be current. On success the framebuffer stays bound.
    fn create_framebuffer(&self, context: ContextId) -> Result<()> {
        let Some(texture) = self.texture else {
            engine_bail!(SOURCE, InvalidResource,
                "Render target used before configure()");
        };

        let framebuffer = self.backend.create_framebuffer().map_err(|e| {
            engine_err!(SOURCE, AllocationFailed,
                "Failed to create render target framebuffer: {}", e)
        })?;

        self.backend.bind_framebuffer(FramebufferTarget::Framebuffer, Some(framebuffer));
        self.backend.attach_color_texture(texture);
        if let Some(depth) = self.depth_buffer {
            self.backend.attach_depth_renderbuffer(depth);
        }

        if let FramebufferStatus::Incomplete(status) = self.backend.framebuffer_status() {
            self.backend.bind_framebuffer(FramebufferTarget::Framebuffer, None);
            self.backend.delete_framebuffer(framebuffer);
            engine_bail!(SOURCE, IncompleteFramebuffer,
                "Failed to link texture {} to framebuffer (status 0x{:04X})", texture, status);
        }

        let existing = RegistryState::lock().insert_framebuffer(self.key, context, framebuffer);
        if let Some(existing) = existing {
            crate::engine_warn!(SOURCE,
                "Framebuffer already cached for context {}, discarding {}", context, framebuffer);
            self.backend.delete_framebuffer(framebuffer);
            self.backend.bind_framebuffer(FramebufferTarget::Framebuffer, Some(existing));
            return Ok(());
        }

        crate::engine_debug!(SOURCE, "Created framebuffer {} on context {} ({}x{})",
            framebuffer, context, self.width, self.height);

        Ok(())
    }

    fn save_bindings(&self) -> SavedBindings {
        if self.backend.capabilities().contains(Capabilities::SEPARATE_READ_DRAW) {
            SavedBindings::Separate {
                read: self.backend.framebuffer_binding(FramebufferTarget::Read),
                draw: self.backend.framebuffer_binding(FramebufferTarget::Draw),
            }
        } else {
            SavedBindings::Combined(self.backend.framebuffer_binding(FramebufferTarget::Framebuffer))
        }
    }

    fn restore_bindings(&self, saved: SavedBindings) {
        match saved {
            SavedBindings::Separate { read, draw } => {
                self.backend.bind_framebuffer(FramebufferTarget::Read, read);
                self.backend.bind_framebuffer(FramebufferTarget::Draw, draw);
            }
            SavedBindings::Combined(framebuffer) => {
                self.backend.bind_framebuffer(FramebufferTarget::Framebuffer, framebuffer);
            }
        }
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        {
            let mut registry = RegistryState::lock();

            let framebuffers = registry.unregister_target(self.key);

            if let Some(depth) = self.depth_buffer.take() {
                self.backend.delete_renderbuffer(depth);
            }

            let demoted = framebuffers.len();
            registry.demote(self.backend.backend_id(), framebuffers);

            // Only the current context's entries can be deleted right now
            let reclaimed = match self.backend.active_context_id() {
                Some(context) => registry.sweep_context(self.backend.as_ref(), context),
                None => 0,
            };

            if demoted > 0 || reclaimed > 0 {
                crate::engine_debug!(SOURCE,
                    "Render target dropped: {} framebuffer(s) detached, {} deleted", demoted, reclaimed);
            }
        }

        // Destroying the backup context re-enters the registry lock
        drop(self.backup_context.take());
    }
}

#[cfg(test)]
#[path = "render_target_tests.rs"]
mod tests;
