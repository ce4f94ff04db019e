// ABOUTME: Session configuration with SMPP-typical defaults and fluent with_* setters
// ABOUTME: Covers timers, flow control, segmentation defaults and the optional parameter registry

use crate::client::keepalive::KeepAliveConfig;
use crate::datatypes::{DataCoding, TagRegistry};
use crate::segmentation::SegmentationMethod;
use std::sync::Arc;
use std::time::Duration;

/// Settings for one [`Session`](crate::client::Session).
///
/// # Example
///
/// ```rust
/// use smpp_engine::client::SessionConfig;
/// use smpp_engine::segmentation::SegmentationMethod;
/// use std::time::Duration;
///
/// let config = SessionConfig::default()
///     .with_response_timeout(Duration::from_secs(10))
///     .with_max_in_flight(16)
///     .with_segmentation_method(SegmentationMethod::Sar);
/// assert_eq!(config.max_in_flight, 16);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time before an enquire_link is sent (default: 30 seconds)
    pub enquire_link_interval: Duration,
    /// Time to wait for enquire_link_resp (default: 10 seconds)
    pub enquire_link_timeout: Duration,
    /// Consecutive unanswered enquire_links before teardown (default: 1)
    pub max_keepalive_failures: u32,
    /// Time to wait for any other response (default: 30 seconds)
    pub response_timeout: Duration,
    /// Requests awaiting a response at once (default: 64)
    pub max_in_flight: usize,
    pub segmentation_method: SegmentationMethod,
    /// Used by `Session::submit` when a message does not choose one
    pub default_data_coding: DataCoding,
    pub keepalive_enabled: bool,
    /// Optional parameter metadata used when decoding inbound PDUs
    pub tag_registry: Arc<TagRegistry>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let keepalive = KeepAliveConfig::default();
        Self {
            enquire_link_interval: keepalive.interval,
            enquire_link_timeout: keepalive.timeout,
            max_keepalive_failures: keepalive.max_failures,
            response_timeout: Duration::from_secs(30),
            max_in_flight: 64,
            segmentation_method: SegmentationMethod::Udh,
            default_data_coding: DataCoding::SmscDefault,
            keepalive_enabled: keepalive.enabled,
            tag_registry: Arc::new(TagRegistry::default()),
        }
    }
}

impl SessionConfig {
    pub fn with_enquire_link_interval(mut self, interval: Duration) -> Self {
        self.enquire_link_interval = interval;
        self
    }

    pub fn with_enquire_link_timeout(mut self, timeout: Duration) -> Self {
        self.enquire_link_timeout = timeout;
        self
    }

    pub fn with_max_keepalive_failures(mut self, max_failures: u32) -> Self {
        self.max_keepalive_failures = max_failures.max(1);
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Values below 1 are treated as 1
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn with_segmentation_method(mut self, method: SegmentationMethod) -> Self {
        self.segmentation_method = method;
        self
    }

    pub fn with_default_data_coding(mut self, data_coding: DataCoding) -> Self {
        self.default_data_coding = data_coding;
        self
    }

    pub fn with_keepalive(mut self, enabled: bool) -> Self {
        self.keepalive_enabled = enabled;
        self
    }

    pub fn with_tag_registry(mut self, registry: TagRegistry) -> Self {
        self.tag_registry = Arc::new(registry);
        self
    }

    /// The keep-alive part of this configuration
    pub fn keepalive(&self) -> KeepAliveConfig {
        KeepAliveConfig {
            interval: self.enquire_link_interval,
            timeout: self.enquire_link_timeout,
            max_failures: self.max_keepalive_failures.max(1),
            enabled: self.keepalive_enabled,
        }
    }
}
