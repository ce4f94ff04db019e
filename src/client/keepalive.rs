// ABOUTME: SMPP keep-alive bookkeeping for idle detection and enquire_link failure tracking
// ABOUTME: The session timer task consults it to decide when to ping and when to give up

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Configuration for SMPP keep-alive functionality
///
/// Controls the enquire_link PDUs sent while the session is idle. Built from
/// [`SessionConfig`](crate::client::SessionConfig) by the session, or
/// directly for a custom setup.
///
/// # Example
///
/// ```rust
/// use smpp_engine::client::KeepAliveConfig;
/// use std::time::Duration;
///
/// // Default configuration (30s interval, 10s timeout, 1 max failure)
/// let config = KeepAliveConfig::default();
///
/// // Custom configuration
/// let config = KeepAliveConfig::new(Duration::from_secs(60))
///     .with_timeout(Duration::from_secs(15))
///     .with_max_failures(3);
///
/// // Disabled keep-alive
/// let config = KeepAliveConfig::disabled();
/// ```
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Idle time without inbound traffic before an enquire_link is sent
    pub interval: Duration,

    /// Maximum time to wait for the enquire_link_resp
    pub timeout: Duration,

    /// Consecutive unanswered enquire_links before the session is torn down
    pub max_failures: u32,

    /// When false no enquire_link is sent automatically.
    /// `Session::enquire_link` still works.
    pub enabled: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            max_failures: 1,
            enabled: true,
        }
    }
}

impl KeepAliveConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Values below 1 are treated as 1
    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures.max(1);
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Snapshot of keep-alive health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveStatus {
    pub running: bool,
    /// Reset to 0 by any answered enquire_link
    pub consecutive_failures: u32,
    pub total_pings: u32,
    pub total_pongs: u32,
}

/// Decides when the session is idle enough to ping.
///
/// Polling model: the session timer calls [`should_ping`] on every tick,
/// records the ping with [`on_ping_sent`] and reports the outcome through
/// [`on_ping_success`] or [`on_ping_failure`].
///
/// [`should_ping`]: KeepAliveManager::should_ping
/// [`on_ping_sent`]: KeepAliveManager::on_ping_sent
/// [`on_ping_success`]: KeepAliveManager::on_ping_success
/// [`on_ping_failure`]: KeepAliveManager::on_ping_failure
#[derive(Debug)]
pub struct KeepAliveManager {
    config: KeepAliveConfig,
    last_activity: Instant,
    // An enquire_link is outstanding
    awaiting: bool,
    consecutive_failures: u32,
    total_pings: u32,
    total_pongs: u32,
}

impl KeepAliveManager {
    pub fn new(config: KeepAliveConfig) -> Self {
        Self {
            config,
            last_activity: Instant::now(),
            awaiting: false,
            consecutive_failures: 0,
            total_pings: 0,
            total_pongs: 0,
        }
    }

    /// Record inbound traffic; restarts the idle clock
    pub fn on_traffic(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Whether an enquire_link is due at `now`: enabled, nothing outstanding,
    /// and idle for at least the interval
    pub fn should_ping(&self, now: Instant) -> bool {
        self.config.enabled
            && !self.awaiting
            && !self.is_connection_failed()
            && now.saturating_duration_since(self.last_activity) >= self.config.interval
    }

    pub fn on_ping_sent(&mut self) {
        self.awaiting = true;
        self.total_pings += 1;
        debug!(total = self.total_pings, "Enquire_link sent");
    }

    pub fn on_ping_success(&mut self) {
        self.awaiting = false;
        self.consecutive_failures = 0;
        self.total_pongs += 1;
        debug!(total = self.total_pongs, "Enquire_link answered");
    }

    pub fn on_ping_failure(&mut self) {
        self.awaiting = false;
        self.consecutive_failures += 1;
        warn!(
            consecutive_failures = self.consecutive_failures,
            max_failures = self.config.max_failures,
            "Enquire_link failed"
        );
    }

    pub fn is_connection_failed(&self) -> bool {
        self.consecutive_failures >= self.config.max_failures
    }

    pub fn status(&self) -> KeepAliveStatus {
        KeepAliveStatus {
            running: self.config.enabled,
            consecutive_failures: self.consecutive_failures,
            total_pings: self.total_pings,
            total_pongs: self.total_pongs,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}
