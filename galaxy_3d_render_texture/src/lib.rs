/*!
# Galaxy 3D Render Texture

Offscreen render targets backed by framebuffer objects, usable from any
graphics context.

A framebuffer object only exists on the context that created it and can only
be deleted while that context is current. Contexts and render targets have
independent lifetimes, so this crate keeps one framebuffer per
(target, context) pair and makes sure each one is eventually deleted on its
own context, whichever of the two dies first.

## Architecture

- **GraphicsBackend**: the context registry and framebuffer primitives this
  crate consumes (implemented by the platform layer)
- **RenderTarget**: lazily creates and rebinds per-context framebuffers
- **FramebufferRegistry**: process-wide index of live and stale framebuffers,
  swept when a context is destroyed
- **Engine**: backend singleton and logger
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod backend;
pub mod target;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton and its configuration
    pub use crate::engine::{Config, Engine};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend traits and handle types
    pub mod backend {
        pub use crate::backend::*;
    }

    // Render targets and the framebuffer registry
    pub mod target {
        pub use crate::target::*;
    }
}
