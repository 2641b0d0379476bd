//! Render target module
//!
//! Offscreen render targets and the process-wide registry that tracks their
//! per-context framebuffers.

pub(crate) mod framebuffer_registry;
mod render_target;

pub use framebuffer_registry::{
    context_destroy_callback, FramebufferRegistry, FramebufferState, StaleEntry, TargetKey,
};
pub use render_target::{RenderTarget, RenderTargetDesc};
