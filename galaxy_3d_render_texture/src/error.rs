//! Error types for the Galaxy3D render texture crate
//!
//! Every fallible operation returns a [`Result`]. Failures are local and
//! recoverable: the caller may retry, resize or abandon the render target.

use std::fmt;

/// Result type for Galaxy3D operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (driver, lock poisoning, etc.)
    BackendError(String),

    /// The graphics API returned a null handle for a framebuffer or renderbuffer
    AllocationFailed(String),

    /// The framebuffer rejected its attachments
    IncompleteFramebuffer(String),

    /// No context is current and none could be created
    NoActiveContext(String),

    /// Invalid resource or argument (size, unconfigured target, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, backend singleton)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::AllocationFailed(msg) => write!(f, "Allocation failed: {}", msg),
            Error::IncompleteFramebuffer(msg) => write!(f, "Incomplete framebuffer: {}", msg),
            Error::NoActiveContext(msg) => write!(f, "No active context: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR entry and build the matching [`Error`] variant
///
/// # Example
///
/// ```ignore
/// let err = engine_err!("galaxy3d::RenderTarget", AllocationFailed,
///     "failed to create framebuffer: {}", reason);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $variant:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::$variant(message)
    }};
}

/// Log an ERROR entry and return the matching [`Error`] variant
///
/// # Example
///
/// ```ignore
/// engine_bail!("galaxy3d::RenderTarget", InvalidResource,
///     "invalid size {}x{}", width, height);
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $variant:ident, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $variant, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
