/// Scoped context activation for calls that need *some* context current

use crate::backend::{GraphicsBackend, GraphicsContext};
use crate::error::Result;

/// Guard that makes sure a context is current for its lifetime
///
/// If a context is already current the guard does nothing. Otherwise it
/// creates a context, activates it, and destroys it when dropped.
pub(crate) struct TransientContext {
    context: Option<Box<dyn GraphicsContext>>,
}

impl TransientContext {
    /// Make a context current on this thread if none is
    ///
    /// # Errors
    ///
    /// `NoActiveContext` if a context had to be created and creation or
    /// activation failed.
    pub(crate) fn acquire(backend: &dyn GraphicsBackend) -> Result<Self> {
        if backend.active_context_id().is_some() {
            return Ok(Self { context: None });
        }

        let context = backend.create_context().map_err(|e| {
            crate::engine_err!("galaxy3d::TransientContext", NoActiveContext,
                "Failed to create transient context: {}", e)
        })?;
        context.set_active(true).map_err(|e| {
            crate::engine_err!("galaxy3d::TransientContext", NoActiveContext,
                "Failed to activate transient context {}: {}", context.id(), e)
        })?;

        crate::engine_trace!("galaxy3d::TransientContext", "Using transient context {}", context.id());

        Ok(Self { context: Some(context) })
    }

    /// Whether this guard created its own context
    pub(crate) fn is_owned(&self) -> bool {
        self.context.is_some()
    }
}

impl Drop for TransientContext {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            if let Err(e) = context.set_active(false) {
                crate::engine_warn!("galaxy3d::TransientContext",
                    "Failed to release transient context {}: {}", context.id(), e);
            }
        }
    }
}
