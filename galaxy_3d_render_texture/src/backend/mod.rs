/// Backend module - the platform layer consumed by render targets

// Module declarations
pub mod types;
pub mod graphics_backend;
pub(crate) mod transient_context;

// Re-export everything from graphics_backend.rs
pub use graphics_backend::*;

// Re-export handle and enum types
pub use types::*;

// Mock backend for tests (no GPU required)
#[cfg(test)]
pub mod mock_backend;
