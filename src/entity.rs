//! Entities: independently scheduled threads that write to the bus.
//!
//! An [`Entity`] is created with a name and the registry that owns the bus.
//! Once started it runs on its own OS thread, asks the registry for the bus
//! and sends its name. Entities impose no ordering on each other; the bus lock
//! is the only coordination.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::{Bus, EntityError, InstanceId, LaunchError, Registry};

/// Type alias for the observer receiving entity lifecycle events.
pub type EntityCallback = dyn Fn(&EntityEvent) + Send + Sync + 'static;

/// Lifecycle of an entity. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Built, thread not yet scheduled.
    Created,
    /// Thread is executing; may be waiting for the bus lock.
    Running,
    /// Its send returned.
    Finished,
    /// The thread panicked before finishing.
    Failed,
}

/// Events reported to an entity observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityEvent {
    /// About to start the entity at `index`. Emitted by [`launch_entities`].
    Launching { index: usize, name: String },
    /// The entity received the bus from the registry.
    Obtained { name: String, instance: InstanceId },
    /// The entity's send returned.
    Finished { name: String },
}

impl fmt::Display for EntityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityEvent::Launching { index, .. } => write!(f, "Entity {} begin to run...", index),
            EntityEvent::Obtained { name, instance } => {
                write!(f, "{} obtained bus instance {}", name, instance)
            }
            EntityEvent::Finished { name } => write!(f, "{} finished", name),
        }
    }
}

/// What a finished entity hands back on join.
#[derive(Debug, Clone)]
pub struct EntityReport {
    pub name: String,
    /// The bus the entity obtained. Owned by the registry, not by the entity.
    pub bus: &'static Bus,
}

impl EntityReport {
    pub fn instance(&self) -> InstanceId {
        self.bus.instance_id()
    }
}

/// A named writer that obtains the bus through a registry.
pub struct Entity {
    name: String,
    registry: &'static Registry<Bus>,
    bus: Option<&'static Bus>,
    state: Arc<Mutex<EntityState>>,
    observer: Option<Arc<EntityCallback>>,
}

impl Entity {
    pub fn new(name: impl Into<String>, registry: &'static Registry<Bus>) -> Self {
        Self {
            name: name.into(),
            registry,
            bus: None,
            state: Arc::new(Mutex::new(EntityState::Created)),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<EntityCallback>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> EntityState {
        *self.state.lock()
    }

    /// Spawns the entity on a thread named after it.
    ///
    /// # Errors
    ///
    /// - [`EntityError::Spawn`] if the thread could not be created
    pub fn start(self) -> Result<EntityHandle, EntityError> {
        let name = self.name.clone();
        let state = Arc::clone(&self.state);

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run())?;

        Ok(EntityHandle {
            name,
            state,
            handle,
        })
    }

    fn run(mut self) -> EntityReport {
        let _unwind = FailOnUnwind(Arc::clone(&self.state));
        self.set_state(EntityState::Running);

        let bus = self.registry.get_instance();
        self.bus = Some(bus);
        self.emit(EntityEvent::Obtained {
            name: self.name.clone(),
            instance: bus.instance_id(),
        });

        bus.send(self.name.as_str());

        self.set_state(EntityState::Finished);
        self.emit(EntityEvent::Finished {
            name: self.name.clone(),
        });

        EntityReport {
            name: self.name,
            bus,
        }
    }

    fn set_state(&self, state: EntityState) {
        tracing::debug!(entity = %self.name, ?state, "entity state changed");
        *self.state.lock() = state;
    }

    fn emit(&self, event: EntityEvent) {
        tracing::info!(entity = %self.name, %event);
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}

/// Marks the entity `Failed` if its thread unwinds past this guard.
struct FailOnUnwind(Arc<Mutex<EntityState>>);

impl Drop for FailOnUnwind {
    fn drop(&mut self) {
        if thread::panicking() {
            *self.0.lock() = EntityState::Failed;
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("bus", &self.bus.map(Bus::instance_id))
            .field("state", &self.state())
            .finish()
    }
}

/// Handle to a started entity.
#[derive(Debug)]
pub struct EntityHandle {
    name: String,
    state: Arc<Mutex<EntityState>>,
    handle: JoinHandle<EntityReport>,
}

impl EntityHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> EntityState {
        *self.state.lock()
    }

    /// Waits for the entity to finish.
    ///
    /// # Errors
    ///
    /// - [`EntityError::Panicked`] if the entity thread panicked
    pub fn join(self) -> Result<EntityReport, EntityError> {
        let name = self.name;
        self.handle.join().map_err(|_| {
            tracing::error!(entity = %name, "entity thread panicked");
            EntityError::Panicked { name }
        })
    }
}

/// Starts `count` entities named `Entity_0` .. `Entity_{count-1}`.
///
/// A [`EntityEvent::Launching`] event goes to `observer` right before each one
/// is started. The entities run concurrently; join the returned handles to
/// wait for them.
///
/// # Errors
///
/// - [`LaunchError`] if a thread could not be created. Its `started` field
///   carries the handles of the entities already running.
pub fn launch_entities(
    count: usize,
    registry: &'static Registry<Bus>,
    observer: Option<Arc<EntityCallback>>,
) -> Result<Vec<EntityHandle>, LaunchError> {
    launch_with(count, registry, observer, Entity::start)
}

fn launch_with(
    count: usize,
    registry: &'static Registry<Bus>,
    observer: Option<Arc<EntityCallback>>,
    mut start: impl FnMut(Entity) -> Result<EntityHandle, EntityError>,
) -> Result<Vec<EntityHandle>, LaunchError> {
    let mut handles = Vec::with_capacity(count);

    for index in 0..count {
        let name = format!("Entity_{index}");
        if let Some(observer) = &observer {
            observer(&EntityEvent::Launching {
                index,
                name: name.clone(),
            });
        }

        let mut entity = Entity::new(name, registry);
        if let Some(observer) = &observer {
            entity = entity.with_observer(Arc::clone(observer));
        }
        match start(entity) {
            Ok(handle) => handles.push(handle),
            Err(source) => {
                tracing::error!(index, %source, "entity launch failed");
                return Err(LaunchError {
                    requested: count,
                    started: handles,
                    source,
                });
            }
        }
    }

    Ok(handles)
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
