//! Error types for the bus and the entities that drive it.

use std::time::Duration;

use thiserror::Error;

use crate::EntityHandle;

/// Failures of the bounded bus operations.
///
/// The plain [`Bus::send`](crate::Bus::send) never fails; these come from
/// [`Bus::send_timeout`](crate::Bus::send_timeout) and
/// [`Bus::try_lease_for`](crate::Bus::try_lease_for). In every case the bus
/// state is left untouched and the lock is not held.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    /// The lock stayed with another thread for the whole wait.
    #[error("Bus lock not acquired within {waited:?}")]
    LockTimeout { waited: Duration },

    /// The payload was rejected before the lock was requested.
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },
}

/// Failures of an entity thread.
#[derive(Debug, Error)]
pub enum EntityError {
    /// The OS refused to start the thread.
    #[error("Failed to spawn entity thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The entity body panicked before finishing.
    #[error("Entity panicked: {name}")]
    Panicked { name: String },
}

/// A batch launch that stopped partway.
///
/// Entities started before the failure are running; `started` holds their
/// handles so the caller can still join them.
#[derive(Debug, Error)]
#[error("Started {} of {requested} entities: {source}", .started.len())]
pub struct LaunchError {
    pub requested: usize,
    pub started: Vec<EntityHandle>,
    #[source]
    pub source: EntityError,
}
