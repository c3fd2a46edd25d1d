//! Connection settings, read once at startup.

use std::time::Duration;

use mailfetch_imap::{IMAP_PORT, IMAPS_PORT, Security};

use crate::{Error, Result};

/// Default bound on connect, TLS and authentication together.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on each command round trip.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(60);

/// Where and how to reach the IMAP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapConfig {
    /// Server hostname.
    pub host: String,
    /// 143 (STARTTLS when offered) or 993 (implicit TLS).
    pub port: u16,
    /// Bound on connect, TLS and authentication together.
    pub connect_timeout: Duration,
    /// Bound on each command round trip.
    pub io_timeout: Duration,
}

impl ImapConfig {
    /// Creates a config with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the host is empty or the port is not
    /// a known IMAP port.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(Error::Config("IMAP host is required".to_string()));
        }
        if port != IMAP_PORT && port != IMAPS_PORT {
            return Err(Error::Config(format!(
                "IMAP port must be {IMAP_PORT} or {IMAPS_PORT}, got {port}"
            )));
        }
        Ok(Self {
            host,
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        })
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-command timeout.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Reads `IMAP_HOST`, `IMAP_PORT` and the optional
    /// `IMAP_CONNECT_TIMEOUT_SECS` / `IMAP_IO_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a missing or malformed variable.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`ImapConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a missing or malformed variable.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("IMAP_HOST")
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| Error::Config("IMAP_HOST is not set".to_string()))?;
        let port = lookup("IMAP_PORT")
            .ok_or_else(|| Error::Config("IMAP_PORT is not set".to_string()))?;
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| Error::Config(format!("IMAP_PORT is not a port number: {port}")))?;

        let mut config = Self::new(host, port)?;
        if let Some(secs) = seconds(&lookup, "IMAP_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = secs;
        }
        if let Some(secs) = seconds(&lookup, "IMAP_IO_TIMEOUT_SECS")? {
            config.io_timeout = secs;
        }
        Ok(config)
    }

    /// TLS mode implied by the port.
    #[must_use]
    pub fn security(&self) -> Security {
        Security::from_port(self.port)
    }

    /// Protocol-layer config for this server.
    #[must_use]
    pub fn to_imap_config(&self) -> mailfetch_imap::Config {
        mailfetch_imap::Config::builder(&self.host)
            .port(self.port)
            .security(self.security())
            .connect_timeout(self.connect_timeout)
            .io_timeout(self.io_timeout)
            .build()
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(Error::Config(format!(
            "{key} must be a positive number of seconds, got {value}"
        ))),
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
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_known_ports_only() {
        assert!(ImapConfig::new("imap.example.com", 143).is_ok());
        assert!(ImapConfig::new("imap.example.com", 993).is_ok());
        let err = ImapConfig::new("imap.example.com", 995).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("995")));
        assert!(ImapConfig::new("  ", 993).is_err());
    }

    #[test]
    fn test_security_follows_port() {
        let secure = ImapConfig::new("imap.example.com", 993).unwrap();
        assert_eq!(secure.security(), Security::Implicit);
        let plain = ImapConfig::new("imap.example.com", 143).unwrap();
        assert_eq!(plain.security(), Security::StartTls);
    }

    #[test]
    fn test_imap_config_carries_timeouts() {
        let config = ImapConfig::new("imap.example.com", 993)
            .unwrap()
            .with_io_timeout(Duration::from_secs(5))
            .to_imap_config();
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.io_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_from_vars() {
        let config = ImapConfig::from_vars(vars(&[
            ("IMAP_HOST", "imap.example.com"),
            ("IMAP_PORT", "143"),
            ("IMAP_IO_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(config.port, 143);
        assert_eq!(config.io_timeout, Duration::from_secs(15));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_from_vars_rejects_bad_input() {
        assert!(ImapConfig::from_vars(vars(&[("IMAP_PORT", "993")])).is_err());
        assert!(ImapConfig::from_vars(vars(&[("IMAP_HOST", "h")])).is_err());
        assert!(
            ImapConfig::from_vars(vars(&[("IMAP_HOST", "h"), ("IMAP_PORT", "imaps")])).is_err()
        );
        assert!(
            ImapConfig::from_vars(vars(&[("IMAP_HOST", "h"), ("IMAP_PORT", "587")])).is_err()
        );
        assert!(
            ImapConfig::from_vars(vars(&[
                ("IMAP_HOST", "h"),
                ("IMAP_PORT", "993"),
                ("IMAP_CONNECT_TIMEOUT_SECS", "0"),
            ]))
            .is_err()
        );
    }
}
