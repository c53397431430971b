//! Silo configuration with sensible defaults.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::mailbox::OverflowPolicy;
use crate::membership::MembershipConfig;
use crate::transport::TransportConfig;

/// Default per-activation mailbox bound.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1000;

/// Default per-call timeout applied by the router.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default idle window after which an activation deactivates.
pub const DEFAULT_IDLE_DEACTIVATION: Duration = Duration::from_secs(300);

/// Default deadline for draining mailboxes on graceful stop.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Silo-wide configuration.
///
/// # Examples
///
/// ```rust
/// use strand_rt::silo::{SiloConfig, DEFAULT_MAILBOX_CAPACITY};
/// use std::time::Duration;
///
/// let config = SiloConfig::default();
/// assert_eq!(config.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
///
/// let config = SiloConfig::builder()
///     .with_mailbox_capacity(64)
///     .with_call_timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(config.mailbox_capacity, 64);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiloConfig {
    /// Bound of each activation mailbox.
    pub mailbox_capacity: usize,

    /// What producers experience when a mailbox is full.
    pub overflow: OverflowPolicy,

    /// Default per-call deadline.
    pub call_timeout: Duration,

    /// Idle window after which an activation deactivates.
    pub idle_deactivation: Duration,

    /// Drain deadline for graceful stop.
    pub shutdown_timeout: Duration,

    /// Address advertised to peers; the bound IP when absent.
    pub advertised_address: Option<String>,

    /// Membership subsystem configuration.
    pub membership: MembershipConfig,

    /// Transport subsystem configuration.
    pub transport: TransportConfig,
}

impl Default for SiloConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            overflow: OverflowPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            idle_deactivation: DEFAULT_IDLE_DEACTIVATION,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            advertised_address: None,
            membership: MembershipConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl SiloConfig {
    /// Create a new configuration builder.
    pub fn builder() -> SiloConfigBuilder {
        SiloConfigBuilder::default()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.mailbox_capacity == 0 {
            return Err("mailbox_capacity must be > 0".to_string());
        }
        if self.call_timeout.is_zero() {
            return Err("call_timeout must be > 0".to_string());
        }
        if self.idle_deactivation.is_zero() {
            return Err("idle_deactivation must be > 0".to_string());
        }
        if self.shutdown_timeout.is_zero() {
            return Err("shutdown_timeout must be > 0".to_string());
        }
        self.membership.validate()
    }
}

/// Builder for [`SiloConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct SiloConfigBuilder {
    config: SiloConfig,
}

impl SiloConfigBuilder {
    /// Set the per-activation mailbox bound.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.config.mailbox_capacity = capacity;
        self
    }

    /// Set the mailbox overflow policy.
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.config.overflow = overflow;
        self
    }

    /// Set the default per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    /// Set the idle-deactivation window.
    pub fn with_idle_deactivation(mut self, window: Duration) -> Self {
        self.config.idle_deactivation = window;
        self
    }

    /// Set the graceful-stop drain deadline.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Set the address advertised to peers.
    pub fn with_advertised_address(mut self, address: impl Into<String>) -> Self {
        self.config.advertised_address = Some(address.into());
        self
    }

    /// Set the membership configuration.
    pub fn with_membership(mut self, membership: MembershipConfig) -> Self {
        self.config.membership = membership;
        self
    }

    /// Set the transport configuration.
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.config.transport = transport;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<SiloConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
