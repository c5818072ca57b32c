//! Macros for declaring singletons.
//!
//! This module provides a macro-based way to give a type a single,
//! process-wide instance behind a named access point.

/// Declares a module holding a lazily constructed singleton.
///
/// The macro generates a module containing:
/// - A static [`Registry`](crate::Registry) for the type (hidden)
/// - Free functions delegating to it
///
/// The initializer runs at most once, on the first `get_instance()` call, no
/// matter how many threads race for it.
///
/// # Examples
///
/// ```rust
/// use singleton_bus::define_singleton;
///
/// pub struct Counter {
///     start: u32,
/// }
///
/// define_singleton!(pub counter: Counter = Counter { start: 10 });
///
/// fn main() {
///     assert!(!counter::is_initialized());
///     let a = counter::get_instance();
///     let b = counter::get_instance();
///     assert!(std::ptr::eq(a, b));
///     assert_eq!(a.start, 10);
/// }
/// ```
///
/// The generated module glob-imports its parent, so the type and the
/// initializer may name anything in scope where the macro is invoked at
/// module level.
///
/// # Multiple Singletons
///
/// Each invocation is independent, even for the same type:
///
/// ```rust
/// use singleton_bus::{define_singleton, Bus, BusConfig};
/// use std::time::Duration;
///
/// define_singleton!(left: Bus = Bus::new(BusConfig::default().with_transmit_delay(Duration::ZERO)));
/// define_singleton!(right: Bus = Bus::new(BusConfig::default().with_transmit_delay(Duration::ZERO)));
///
/// fn main() {
///     assert_ne!(left::get_instance().instance_id(), right::get_instance().instance_id());
/// }
/// ```
#[macro_export]
macro_rules! define_singleton {
    ($(#[$meta:meta])* $vis:vis $name:ident : $ty:ty = $init:expr) => {
        $(#[$meta])*
        #[allow(dead_code)]
        $vis mod $name {
            #[allow(unused_imports)]
            use super::*;

            // The one slot for this singleton (module-private)
            static REGISTRY: $crate::Registry<$ty> = $crate::Registry::new(|| $init);

            /// Returns the single instance, constructing it on first use.
            pub fn get_instance() -> &'static $ty {
                REGISTRY.get_instance()
            }

            /// Returns the instance if it has already been constructed.
            pub fn get() -> ::std::option::Option<&'static $ty> {
                REGISTRY.get()
            }

            pub fn is_initialized() -> bool {
                REGISTRY.is_initialized()
            }

            /// Access to the underlying registry, e.g. to hand it to an entity.
            pub fn registry() -> &'static $crate::Registry<$ty> {
                &REGISTRY
            }

            /// Set a tracing callback for this singleton.
            pub fn set_trace_callback(
                callback: impl Fn(&$crate::RegistryEvent) + Send + Sync + 'static,
            ) {
                REGISTRY.set_trace_callback(callback)
            }

            /// Clear the tracing callback.
            pub fn clear_trace_callback() {
                REGISTRY.clear_trace_callback()
            }
        }
    };
}
