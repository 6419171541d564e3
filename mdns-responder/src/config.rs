//! Configuration for the responder.

/// TTL (seconds) of records that change with the host's addresses
/// (A, AAAA, SRV).
pub const HOST_RECORD_TTL: u32 = 120;

/// TTL (seconds) of the slow-moving service records (PTR, TXT, NSEC).
pub const SERVICE_RECORD_TTL: u32 = 4500;

/// Hard bound on answer + additional records gathered for one datagram.
///
/// A single question matching more records than this is silently skipped so
/// per-datagram work stays bounded.
pub const MAX_RESPONSE_RECORDS: usize = 32;

/// Configuration for a [`Responder`](crate::server::Responder).
///
/// Use the builder pattern to construct a configuration:
///
/// ```rust
/// use mdns_responder::ResponderConfig;
///
/// let config = ResponderConfig::new().with_host_name("myhost");
/// assert_eq!(config.domain_name, "local");
/// ```
#[derive(Clone, Debug)]
pub struct ResponderConfig {
    /// Host name to publish, without the domain suffix (e.g. `"myhost"`).
    ///
    /// Required: an empty host name fails when the first interface comes up.
    pub host_name: String,

    /// Domain all published names live under.
    ///
    /// Default: `"local"`, the mDNS link-local domain.
    pub domain_name: String,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            host_name: String::new(),
            domain_name: "local".to_owned(),
        }
    }
}

impl ResponderConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host name to publish.
    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = host_name.into();
        self
    }

    /// Set the domain published names live under.
    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = domain_name.into();
        self
    }
}
