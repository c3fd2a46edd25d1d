//! Connection configuration types.

use std::time::Duration;

/// Cleartext IMAP port, upgraded with STARTTLS when offered.
pub const IMAP_PORT: u16 = 143;

/// Implicit-TLS IMAP port.
pub const IMAPS_PORT: u16 = 993;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Start in plaintext and upgrade with STARTTLS if the server offers it.
    StartTls,
    /// TLS from the first byte.
    #[default]
    Implicit,
}

impl Security {
    /// Derives the security mode from the port alone.
    ///
    /// Only [`IMAPS_PORT`] selects implicit TLS; every other port gets
    /// opportunistic STARTTLS.
    #[must_use]
    pub const fn from_port(port: u16) -> Self {
        if port == IMAPS_PORT {
            Self::Implicit
        } else {
            Self::StartTls
        }
    }

    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::StartTls => IMAP_PORT,
            Self::Implicit => IMAPS_PORT,
        }
    }
}

/// IMAP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode, derived from `port` unless overridden.
    pub security: Security,
    /// Bound on TCP connect, TLS handshake, greeting and authentication.
    pub connect_timeout: Duration,
    /// Bound on any single command round trip.
    pub io_timeout: Duration,
}

impl Config {
    /// Creates a configuration whose security mode follows the port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            security: Security::from_port(port),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Option<Security>,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Forces a security mode instead of deriving it from the port.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = Some(security);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        let (port, security) = match (self.port, self.security) {
            (Some(port), Some(security)) => (port, security),
            (Some(port), None) => (port, Security::from_port(port)),
            (None, Some(security)) => (security.default_port(), security),
            (None, None) => (IMAPS_PORT, Security::Implicit),
        };
        Config {
            host: self.host,
            port,
            security,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_security_from_port() {
        assert_eq!(Security::from_port(993), Security::Implicit);
        assert_eq!(Security::from_port(143), Security::StartTls);
        assert_eq!(Security::from_port(1143), Security::StartTls);
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(Security::StartTls.default_port(), 143);
        assert_eq!(Security::Implicit.default_port(), 993);
    }

    #[test]
    fn test_config_new_derives_security() {
        let config = Config::new("imap.example.com", 143);
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.security, Security::StartTls);

        let config = Config::new("imap.example.com", 993);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.io_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("imap.example.com")
            .port(143)
            .connect_timeout(Duration::from_secs(10))
            .build();

        assert_eq!(config.port, 143);
        assert_eq!(config.security, Security::StartTls);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder_default_port() {
        let config = Config::builder("imap.example.com")
            .security(Security::StartTls)
            .build();
        assert_eq!(config.port, 143);

        let config = Config::builder("imap.example.com").build();
        assert_eq!(config.port, 993);
        assert_eq!(config.security, Security::Implicit);
    }
}
