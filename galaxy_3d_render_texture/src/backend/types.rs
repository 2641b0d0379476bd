/// Handle and enum types shared by backends and render targets

use std::fmt;
use std::num::NonZeroU32;
use bitflags::bitflags;

/// Stable identity of a graphics context
///
/// Unique for the lifetime of the context and never handed to a different
/// context afterwards. "No context" is expressed as `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

/// Identity of a backend instance
///
/// Context ids are only unique within one backend, so everything tracked
/// per context is keyed by (backend, context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(pub usize);

/// Framebuffer object name (never zero)
///
/// Only meaningful on the context that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferHandle(pub NonZeroU32);

/// Renderbuffer name used for depth storage (never zero)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderbufferHandle(pub NonZeroU32);

/// Texture name used as the color attachment (never zero)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub NonZeroU32);

impl FramebufferHandle {
    /// Build from a raw API name, `None` for the zero sentinel
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Raw API name
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

impl RenderbufferHandle {
    /// Build from a raw API name, `None` for the zero sentinel
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Raw API name
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

impl TextureHandle {
    /// Build from a raw API name, `None` for the zero sentinel
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Raw API name
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Display for FramebufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RenderbufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Framebuffer binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    /// Both read and draw bindings
    Framebuffer,
    /// Read binding only
    Read,
    /// Draw binding only
    Draw,
}

/// Result of a completeness query on the bound framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    /// Ready to render into
    Complete,
    /// Rejected attachments, with the raw API status code
    Incomplete(u32),
}

bitflags! {
    /// Optional features reported by a backend
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Framebuffer objects are supported at all
        const FRAMEBUFFER_OBJECT = 1 << 0;
        /// Read and draw framebuffer bindings can be queried and set separately
        const SEPARATE_READ_DRAW = 1 << 1;
    }
}
