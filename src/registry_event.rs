/// Events emitted by a singleton registry during operations.
///
/// These events are passed to the tracing callback set via `set_trace_callback`.
/// The `Clone` derive allows callbacks to store or forward events if needed.
///
/// # Examples
///
/// ```rust
/// use singleton_bus::RegistryEvent;
///
/// let event = RegistryEvent::Construct { type_name: "singleton_bus::bus::Bus" };
/// println!("{:?}", event);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// The singleton instance was built. Emitted at most once per registry.
    Construct {
        /// The type name of the constructed value (e.g., "singleton_bus::bus::Bus")
        type_name: &'static str,
    },

    /// The singleton instance was requested.
    Get {
        /// The type name that was requested
        type_name: &'static str,
        /// Whether this request was the one that ran the constructor
        constructed: bool,
    },
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::Construct { type_name } => {
                write!(f, "construct {{ type_name: {} }}", type_name)
            }
            RegistryEvent::Get {
                type_name,
                constructed,
            } => {
                write!(
                    f,
                    "get {{ type_name: {}, constructed: {} }}",
                    type_name, constructed
                )
            }
        }
    }
}
