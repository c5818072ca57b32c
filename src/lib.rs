//! # Singleton Bus
//!
//! A single simulated communication bus, shared by every thread in the process
//! through one access point and written under a reentrant lock.
//!
//! - [`Registry`] holds exactly one instance of a type and builds it lazily,
//!   race-free, on first request.
//! - [`Bus`] serializes writes: [`Bus::send`] holds the lock for the whole
//!   simulated transmission, so two sends never overlap.
//! - [`Entity`] is a named thread that obtains the bus through a registry and
//!   sends its name.
//!
//! ## Quick Start
//!
//! ```rust
//! use singleton_bus::{define_singleton, launch_entities, Bus, BusConfig};
//! use std::time::Duration;
//!
//! define_singleton!(demo_bus: Bus = Bus::new(
//!     BusConfig::default().with_transmit_delay(Duration::from_millis(5))
//! ));
//!
//! fn main() {
//!     let handles = launch_entities(3, demo_bus::registry(), None).unwrap();
//!     for handle in handles {
//!         let report = handle.join().unwrap();
//!         assert_eq!(report.instance(), demo_bus::get_instance().instance_id());
//!     }
//!     assert_eq!(demo_bus::get_instance().transmission_count(), 3);
//! }
//! ```
//!
//! ## Main Items
//!
//! - [`system_bus`] - The process-wide bus with the default configuration
//! - [`define_singleton!`] - Declare another singleton access point
//! - [`Bus::lease`] - Hold the bus across several sends
//! - [`Bus::send_timeout`] - Bounded, validating send

mod bus;
mod config;
mod entity;
mod error;
mod identity;
mod macros;
mod registry;
mod registry_event;

pub use bus::{Bus, BusLease, Transmission, TransmitCallback};
pub use config::{BusConfig, DEFAULT_LOG_CAPACITY, DEFAULT_MAX_PAYLOAD_LEN, DEFAULT_TRANSMIT_DELAY};
pub use entity::{
    launch_entities, Entity, EntityCallback, EntityEvent, EntityHandle, EntityReport, EntityState,
};
pub use error::{BusError, EntityError, LaunchError};
pub use identity::InstanceId;
pub use registry::{Registry, TraceCallback};
pub use registry_event::RegistryEvent;

define_singleton!(
    /// The process-wide bus, built with [`BusConfig::default`] on first use.
    pub system_bus: Bus = Bus::default()
);
