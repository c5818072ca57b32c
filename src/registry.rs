//! A race-free, lazily constructed singleton slot.
//!
//! A [`Registry<T>`] owns exactly one `T`, built on first request by a plain
//! constructor function. It is meant to live in a `static` so that every part of
//! the process reaches the same instance through the same access point.
//!
//! # Examples
//!
//! ```
//! use singleton_bus::Registry;
//!
//! static GREETING: Registry<String> = Registry::new(|| "Hello, World!".to_string());
//!
//! let first = GREETING.get_instance();
//! let second = GREETING.get_instance();
//! assert!(std::ptr::eq(first, second));
//! assert_eq!(first, "Hello, World!");
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use crate::RegistryEvent;

/// Type alias for the user-supplied tracing callback.
///
/// The callback receives a reference to a `RegistryEvent` every time the registry is
/// interacted with. It must be thread-safe because the registry itself is globally shared.
pub type TraceCallback = dyn Fn(&RegistryEvent) + Send + Sync + 'static;

/// Holds the single instance of `T` plus the means to build it.
pub struct Registry<T> {
    cell: OnceLock<T>,
    init: fn() -> T,
    trace: Mutex<Option<Arc<TraceCallback>>>,
}

impl<T> Registry<T> {
    /// Creates an empty registry. Nothing is constructed until the first
    /// [`get_instance`](Registry::get_instance) call.
    pub const fn new(init: fn() -> T) -> Self {
        Self {
            cell: OnceLock::new(),
            init,
            trace: Mutex::new(None),
        }
    }
}

impl<T: Send + Sync + 'static> Registry<T> {
    // -------------------------------------------------------------------------------------------------
    // Tracing
    // -------------------------------------------------------------------------------------------------

    /// Set a tracing callback for registry operations.
    ///
    /// # Lock Poisoning Recovery
    ///
    /// If the trace lock is poisoned (due to a panic while holding the lock),
    /// this method automatically recovers by extracting the inner value.
    pub fn set_trace_callback(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        let mut guard = self.trace.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(Arc::new(callback));
    }

    /// Clear the tracing callback.
    pub fn clear_trace_callback(&self) {
        let mut guard = self.trace.lock().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    /// Invokes the current callback, if any.
    ///
    /// The callback is cloned out and the trace lock released before it runs, so a
    /// callback may itself call back into this registry.
    fn emit_event(&self, event: &RegistryEvent) {
        let callback = self
            .trace
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    // -------------------------------------------------------------------------------------------------
    // Access
    // -------------------------------------------------------------------------------------------------

    /// Returns the single instance, constructing it on the first call.
    ///
    /// Concurrent first callers block until the one running constructor finishes;
    /// all of them receive the same reference. Later calls never run the
    /// constructor again, so state accumulated in the instance is preserved.
    ///
    /// If the constructor panics the slot stays empty and the next call retries.
    pub fn get_instance(&self) -> &T {
        let type_name = std::any::type_name::<T>();
        let mut constructed = false;

        let instance = self.cell.get_or_init(|| {
            constructed = true;
            (self.init)()
        });

        if constructed {
            tracing::debug!(type_name, "singleton constructed");
            self.emit_event(&RegistryEvent::Construct { type_name });
        }

        self.emit_event(&RegistryEvent::Get {
            type_name,
            constructed,
        });

        instance
    }

    /// Returns the instance only if it has already been constructed.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("type_name", &std::any::type_name::<T>())
            .field("instance", &self.cell.get())
            .finish()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
