/// Galaxy3D Engine - Singleton manager for the graphics backend and logger
///
/// Render targets created with `RenderTarget::new()` and the availability
/// probe fetch the backend from here. State lives in thread-safe statics
/// (OnceLock + RwLock).

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::SystemTime;
use crate::backend::GraphicsBackend;
use crate::error::{Error, Result};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Minimum severity forwarded to the logger (index into LogSeverity order)
static MIN_SEVERITY: AtomicU8 = AtomicU8::new(0);

/// Internal state structure holding the engine singletons
struct EngineState {
    /// Backend singleton
    backend: RwLock<Option<Arc<dyn GraphicsBackend>>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            backend: RwLock::new(None),
        }
    }
}

fn severity_index(severity: LogSeverity) -> u8 {
    match severity {
        LogSeverity::Trace => 0,
        LogSeverity::Debug => 1,
        LogSeverity::Info => 2,
        LogSeverity::Warn => 3,
        LogSeverity::Error => 4,
    }
}

// ===== CONFIGURATION =====

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Entries below this severity are dropped before reaching the logger
    pub min_log_severity: LogSeverity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_log_severity: if cfg!(debug_assertions) {
                LogSeverity::Debug
            } else {
                LogSeverity::Info
            },
        }
    }
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```ignore
/// use galaxy_3d_render_texture::galaxy3d::Engine;
/// use galaxy_3d_render_texture::galaxy3d::target::{RenderTarget, RenderTargetDesc};
///
/// Engine::initialize()?;
/// Engine::create_backend(platform_backend)?;
///
/// let mut target = RenderTarget::new()?;
/// target.configure(&RenderTargetDesc { width: 256, height: 256, texture, depth_buffer: true })?;
/// target.activate(true)?;
///
/// Engine::shutdown();
/// # Ok::<(), galaxy_3d_render_texture::galaxy3d::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("galaxy3d::Engine", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!("galaxy3d::Engine", "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!("galaxy3d::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    /// Initialize the engine with the default configuration
    ///
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// Currently always succeeds, but returns Result for future extensibility.
    pub fn initialize() -> Result<()> {
        Self::initialize_with_config(Config::default())
    }

    /// Initialize the engine and apply `config`
    ///
    /// Calling it again on an initialized engine only re-applies the config.
    pub fn initialize_with_config(config: Config) -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        MIN_SEVERITY.store(severity_index(config.min_log_severity), Ordering::Relaxed);
        Ok(())
    }

    /// Drop the backend singleton
    ///
    /// Render targets already created keep their own reference to the
    /// backend and stay usable.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut backend) = state.backend.write() {
                *backend = None;
            }
        }
    }

    /// Register the graphics backend singleton
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - A backend already exists
    /// - The backend lock is poisoned
    pub fn create_backend<B: GraphicsBackend + 'static>(backend: B) -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let mut lock = state.backend.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Backend lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("Backend already exists. Call Engine::destroy_backend() first.".to_string())
            ));
        }

        *lock = Some(Arc::new(backend));

        crate::engine_info!("galaxy3d::Engine", "Graphics backend registered");

        Ok(())
    }

    /// Get the backend singleton
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or no backend has
    /// been created.
    pub fn backend() -> Result<Arc<dyn GraphicsBackend>> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let lock = state.backend.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Backend lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Backend not created. Call Engine::create_backend() first.".to_string())
            ))
    }

    /// Whether a backend singleton is registered (no error logging)
    pub fn has_backend() -> bool {
        ENGINE_STATE.get()
            .and_then(|state| state.backend.read().ok().map(|lock| lock.is_some()))
            .unwrap_or(false)
    }

    /// Remove the backend singleton, allowing a new one to be created
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized
    pub fn destroy_backend() -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized".to_string())
            ))?;

        let mut lock = state.backend.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Backend lock poisoned".to_string())
            ))?;

        *lock = None;

        crate::engine_info!("galaxy3d::Engine", "Graphics backend destroyed");

        Ok(())
    }

    /// Reset all singletons and the framebuffer registry (test builds only)
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut backend) = state.backend.write() {
                *backend = None;
            }
        }
        crate::target::framebuffer_registry::reset_for_testing();
        MIN_SEVERITY.store(0, Ordering::Relaxed);
    }

    // ===== LOGGING API =====

    /// Replace the logger
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to DefaultLogger
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Log without file:line (used by engine_trace!..engine_warn!)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Log with file:line (used by engine_error!)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }

    fn dispatch(entry: LogEntry) {
        if severity_index(entry.severity) < MIN_SEVERITY.load(Ordering::Relaxed) {
            return;
        }
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&entry);
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
