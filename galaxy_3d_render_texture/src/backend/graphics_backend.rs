/// GraphicsBackend traits - the platform layer consumed by render targets
///
/// The backend is split in two halves:
/// - `ContextRegistry`: which context is current, context creation, and
///   "about to be destroyed" notifications
/// - `FramebufferApi`: the framebuffer/renderbuffer primitives, always
///   acting on the context current on the calling thread
///
/// Anything implementing both is a `GraphicsBackend`.

use crate::backend::{
    BackendId, Capabilities, ContextId, FramebufferHandle, FramebufferStatus, FramebufferTarget,
    RenderbufferHandle, TextureHandle,
};
use crate::error::Result;

/// Callback invoked right before a context is destroyed
///
/// The dying context is current on the calling thread for the whole call, and
/// its resources are still valid.
pub type ContextDestroyCallback = fn(&dyn GraphicsBackend);

/// A graphics context owned by the caller
///
/// Dropping the box destroys the context. The backend must run every
/// registered `ContextDestroyCallback` (with this context current) before the
/// context's resources become invalid.
pub trait GraphicsContext: Send {
    /// Identity of this context
    fn id(&self) -> ContextId;

    /// Make this context current on the calling thread, or release it
    fn set_active(&self, active: bool) -> Result<()>;
}

/// Context bookkeeping half of the backend
pub trait ContextRegistry: Send + Sync {
    /// Identity shared by every handle to this backend
    ///
    /// Defaults to the address of the backend object. Backends that hand out
    /// several handles to the same driver state must override it.
    fn backend_id(&self) -> BackendId {
        BackendId(self as *const Self as *const () as usize)
    }

    /// Context current on the calling thread, if any
    fn active_context_id(&self) -> Option<ContextId>;

    /// Create a new context (not made current)
    fn create_context(&self) -> Result<Box<dyn GraphicsContext>>;

    /// Register a teardown callback under `name`
    ///
    /// Registering an already used name replaces the previous callback, so
    /// repeated registration never fires a callback twice per teardown.
    fn register_context_destroy_callback(&self, name: &'static str, callback: ContextDestroyCallback);
}

/// Framebuffer primitives half of the backend
///
/// Every call acts on the context current on the calling thread. Attachment
/// and status calls act on the framebuffer bound to
/// `FramebufferTarget::Framebuffer`.
pub trait FramebufferApi: Send + Sync {
    /// Optional features supported by the current context
    fn capabilities(&self) -> Capabilities;

    /// Create a framebuffer object
    fn create_framebuffer(&self) -> Result<FramebufferHandle>;

    /// Delete a framebuffer object created on the current context
    fn delete_framebuffer(&self, framebuffer: FramebufferHandle);

    /// Bind a framebuffer, or the default framebuffer when `None`
    fn bind_framebuffer(&self, target: FramebufferTarget, framebuffer: Option<FramebufferHandle>);

    /// Currently bound framebuffer (`None` for the default framebuffer)
    fn framebuffer_binding(&self, target: FramebufferTarget) -> Option<FramebufferHandle>;

    /// Attach a 2D texture (mip level 0) as color attachment 0
    fn attach_color_texture(&self, texture: TextureHandle);

    /// Attach a renderbuffer as the depth attachment
    fn attach_depth_renderbuffer(&self, renderbuffer: RenderbufferHandle);

    /// Completeness of the bound framebuffer
    fn framebuffer_status(&self) -> FramebufferStatus;

    /// Create a renderbuffer
    fn create_renderbuffer(&self) -> Result<RenderbufferHandle>;

    /// Allocate depth storage for a renderbuffer
    fn allocate_depth_storage(&self, renderbuffer: RenderbufferHandle, width: u32, height: u32);

    /// Delete a renderbuffer
    ///
    /// Renderbuffers are shared between contexts, so this does not require a
    /// particular context to be current.
    fn delete_renderbuffer(&self, renderbuffer: RenderbufferHandle);
}

/// Complete backend: context registry plus framebuffer primitives
pub trait GraphicsBackend: ContextRegistry + FramebufferApi {}

impl<T: ContextRegistry + FramebufferApi> GraphicsBackend for T {}
