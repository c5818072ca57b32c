//! The shared bus.
//!
//! A [`Bus`] models one physical communication line. Every write goes through
//! [`Bus::send`], which takes the bus lock, holds it for the configured
//! transmission delay, records the payload and reports the transmission before
//! releasing. Two sends never overlap.
//!
//! The lock is reentrant: a thread that already holds it (through a
//! [`BusLease`], or from inside the transmission callback) may send again
//! without deadlocking itself. Other threads stay blocked until the outermost
//! hold is released.
//!
//! # Examples
//!
//! ```
//! use singleton_bus::{Bus, BusConfig};
//! use std::time::Duration;
//!
//! let bus = Bus::new(BusConfig::default().with_transmit_delay(Duration::ZERO));
//! bus.send("Entity_0");
//! assert_eq!(bus.last_payload().as_deref(), Some("Entity_0"));
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

use crate::{BusConfig, BusError, InstanceId};

/// Type alias for the observer invoked on every completed transmission.
pub type TransmitCallback = dyn Fn(&Transmission) + Send + Sync + 'static;

/// One completed write on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    /// 1-based count of sends on this bus. Keeps rising after old records are dropped.
    pub seq: u64,
    pub payload: String,
    /// Name of the thread that sent it, if the thread was named.
    pub sender: Option<String>,
    /// Taken right after the lock was acquired.
    pub started: Instant,
    /// Taken right before the record was stored, with the lock still held.
    pub finished: Instant,
}

impl Transmission {
    /// Whether the two critical sections share any instant.
    pub fn overlaps(&self, other: &Transmission) -> bool {
        self.started < other.finished && other.started < self.finished
    }
}

impl fmt::Display for Transmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sending Single Data... {}", self.payload)
    }
}

#[derive(Debug, Default)]
struct BusState {
    last_payload: Option<String>,
    sent: u64,
    // Newest at the back, at most `BusConfig::log_capacity` entries.
    log: VecDeque<Transmission>,
}

/// A single bus whose writes are serialized by a reentrant lock.
pub struct Bus {
    id: InstanceId,
    config: BusConfig,
    // RefCell borrows never outlive a single step inside the lock, so a
    // reentrant caller never finds the state already borrowed.
    state: ReentrantMutex<RefCell<BusState>>,
    on_transmit: Mutex<Option<Arc<TransmitCallback>>>,
}

impl Bus {
    pub fn new(config: BusConfig) -> Self {
        let id = InstanceId::next();
        tracing::debug!(bus = %id, delay = ?config.transmit_delay, "bus created");
        Self {
            id,
            config,
            state: ReentrantMutex::new(RefCell::new(BusState::default())),
            on_transmit: Mutex::new(None),
        }
    }

    /// The identity token of this bus. Stable for its whole lifetime.
    pub fn instance_id(&self) -> InstanceId {
        self.id
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    // -------------------------------------------------------------------------------------------------
    // Observer
    // -------------------------------------------------------------------------------------------------

    /// Sets the callback invoked after each transmission is recorded.
    ///
    /// It runs on the sending thread while the bus lock is still held, so its
    /// output is ordered exactly like the transmissions. It may call `send`
    /// on this bus again; that call re-enters the lock.
    pub fn set_transmit_callback(&self, callback: impl Fn(&Transmission) + Send + Sync + 'static) {
        *self.on_transmit.lock() = Some(Arc::new(callback));
    }

    pub fn clear_transmit_callback(&self) {
        *self.on_transmit.lock() = None;
    }

    fn notify(&self, transmission: &Transmission) {
        let callback = self.on_transmit.lock().clone();
        if let Some(callback) = callback {
            callback(transmission);
        }
    }

    // -------------------------------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------------------------------

    /// Transmits `payload`, blocking until the bus is free.
    ///
    /// The lock is held for the full transmission delay, the record and the
    /// callback. Never fails and never validates the payload; use
    /// [`send_timeout`](Bus::send_timeout) for the bounded, validating variant.
    pub fn send(&self, payload: impl Into<String>) {
        let guard = self.state.lock();
        self.transmit(&guard, payload.into());
    }

    /// Transmits `payload`, waiting at most `timeout` for the lock.
    ///
    /// The payload is checked before the lock is requested, so a rejected
    /// payload returns immediately even while another thread holds the bus.
    ///
    /// # Errors
    ///
    /// - [`BusError::InvalidPayload`] if the payload is empty or longer than
    ///   [`BusConfig::max_payload_len`]
    /// - [`BusError::LockTimeout`] if the lock was not acquired in time
    pub fn send_timeout(
        &self,
        payload: impl Into<String>,
        timeout: Duration,
    ) -> Result<Transmission, BusError> {
        let payload = payload.into();
        self.validate(&payload)?;

        let guard = self.state.try_lock_for(timeout).ok_or_else(|| {
            tracing::warn!(bus = %self.id, ?timeout, "bus lock wait expired");
            BusError::LockTimeout { waited: timeout }
        })?;

        Ok(self.transmit(&guard, payload))
    }

    fn validate(&self, payload: &str) -> Result<(), BusError> {
        if payload.is_empty() {
            return Err(BusError::InvalidPayload {
                reason: "payload is empty".to_string(),
            });
        }
        if payload.len() > self.config.max_payload_len {
            return Err(BusError::InvalidPayload {
                reason: format!(
                    "payload is {} bytes, limit is {}",
                    payload.len(),
                    self.config.max_payload_len
                ),
            });
        }
        Ok(())
    }

    fn transmit(
        &self,
        guard: &ReentrantMutexGuard<'_, RefCell<BusState>>,
        payload: String,
    ) -> Transmission {
        let started = Instant::now();
        if !self.config.transmit_delay.is_zero() {
            thread::sleep(self.config.transmit_delay);
        }

        let transmission = {
            let mut state = guard.borrow_mut();
            state.sent += 1;
            let transmission = Transmission {
                seq: state.sent,
                payload: payload.clone(),
                sender: thread::current().name().map(str::to_owned),
                started,
                finished: Instant::now(),
            };
            state.last_payload = Some(payload);
            if self.config.log_capacity > 0 {
                if state.log.len() >= self.config.log_capacity {
                    state.log.pop_front();
                }
                state.log.push_back(transmission.clone());
            }
            transmission
        };

        tracing::info!(
            bus = %self.id,
            seq = transmission.seq,
            payload = %transmission.payload,
            "transmission recorded"
        );
        self.notify(&transmission);

        transmission
    }

    // -------------------------------------------------------------------------------------------------
    // Leases
    // -------------------------------------------------------------------------------------------------

    /// Takes the bus lock and keeps it until the returned lease is dropped.
    ///
    /// Sends from the same thread go through while the lease is alive; sends
    /// from any other thread wait for it.
    pub fn lease(&self) -> BusLease<'_> {
        BusLease {
            bus: self,
            _guard: self.state.lock(),
        }
    }

    /// Like [`lease`](Bus::lease) but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// - [`BusError::LockTimeout`] if the lock was not acquired in time
    pub fn try_lease_for(&self, timeout: Duration) -> Result<BusLease<'_>, BusError> {
        let guard = self
            .state
            .try_lock_for(timeout)
            .ok_or(BusError::LockTimeout { waited: timeout })?;
        Ok(BusLease {
            bus: self,
            _guard: guard,
        })
    }

    // -------------------------------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------------------------------

    /// The payload of the most recent transmission. Waits for the lock.
    pub fn last_payload(&self) -> Option<String> {
        self.state.lock().borrow().last_payload.clone()
    }

    /// A snapshot of the retained transmissions, oldest first.
    ///
    /// At most [`BusConfig::log_capacity`] records are kept; older ones are dropped.
    pub fn transmissions(&self) -> Vec<Transmission> {
        self.state.lock().borrow().log.iter().cloned().collect()
    }

    /// Number of sends completed on this bus, including ones no longer retained.
    pub fn transmission_count(&self) -> u64 {
        self.state.lock().borrow().sent
    }
}

impl Default for Bus {
    fn default() -> Self {
        Bus::new(BusConfig::default())
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// An explicit hold on the bus lock. Released on drop.
pub struct BusLease<'a> {
    bus: &'a Bus,
    _guard: ReentrantMutexGuard<'a, RefCell<BusState>>,
}

impl BusLease<'_> {
    /// Sends through the held lock. Same as calling [`Bus::send`] on this thread.
    pub fn send(&self, payload: impl Into<String>) {
        self.bus.send(payload);
    }
}

impl fmt::Debug for BusLease<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusLease").field("bus", &self.bus.id).finish()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
