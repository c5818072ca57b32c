use std::time::Duration;

/// How long a single transmission holds the bus by default.
pub const DEFAULT_TRANSMIT_DELAY: Duration = Duration::from_secs(3);

/// Longest payload accepted by [`Bus::send_timeout`](crate::Bus::send_timeout), in bytes.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 256;

/// How many transmission records a bus keeps by default.
pub const DEFAULT_LOG_CAPACITY: usize = 1024;

/// Tunables for a [`Bus`](crate::Bus).
///
/// # Examples
///
/// ```
/// use singleton_bus::BusConfig;
/// use std::time::Duration;
///
/// let config = BusConfig::default().with_transmit_delay(Duration::from_millis(10));
/// assert_eq!(config.transmit_delay, Duration::from_millis(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Simulated bus latency, held with the lock taken.
    pub transmit_delay: Duration,
    pub max_payload_len: usize,
    /// Retained transmission records. Oldest are dropped first; 0 keeps none.
    pub log_capacity: usize,
}

impl BusConfig {
    pub fn with_transmit_delay(mut self, delay: Duration) -> Self {
        self.transmit_delay = delay;
        self
    }

    pub fn with_max_payload_len(mut self, len: usize) -> Self {
        self.max_payload_len = len;
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            transmit_delay: DEFAULT_TRANSMIT_DELAY,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}
