//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Well-known UDP port for NTP/SNTP servers.
pub const DEFAULT_NTP_PORT: u16 = 123;

// ============================================================================
// RequestId
// ============================================================================

/// Identifier of a single dispatched sync request
///
/// A fresh id is minted for every dispatch and travels with the reply
/// address, so outcomes can be matched to the request that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random RequestId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a RequestId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("{s}: {e}")))
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// ServerAddress
// ============================================================================

/// A validated time server address
///
/// Accepts a host name, an IPv4 literal, a bracketed or bare IPv6 literal,
/// each optionally followed by `:port`. The port defaults to
/// [`DEFAULT_NTP_PORT`].
///
/// # Examples
///
/// ```
/// use ntpsync_core::domain::ServerAddress;
///
/// let addr = ServerAddress::new("time.example.org").unwrap();
/// assert_eq!(addr.host(), "time.example.org");
/// assert_eq!(addr.port(), 123);
///
/// let addr = ServerAddress::new("[::1]:1123").unwrap();
/// assert_eq!(addr.host(), "::1");
/// assert_eq!(addr.port(), 1123);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerAddress {
    raw: String,
    host: String,
    port: u16,
}

impl ServerAddress {
    /// Parses and validates a server address
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidServerAddress` if the string is empty,
    /// contains whitespace, has an empty host, or carries an invalid port.
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let invalid = |why: &str| DomainError::InvalidServerAddress(format!("'{raw}': {why}"));

        if raw.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain whitespace"));
        }

        let (host, port) = if let Some(rest) = raw.strip_prefix('[') {
            let end = rest.find(']').ok_or_else(|| invalid("unterminated '['"))?;
            let host = &rest[..end];
            let port = match &rest[end + 1..] {
                "" => None,
                tail => Some(
                    tail.strip_prefix(':')
                        .ok_or_else(|| invalid("unexpected characters after ']'"))?,
                ),
            };
            (host, port)
        } else {
            match raw.matches(':').count() {
                0 => (raw.as_str(), None),
                1 => {
                    let (host, port) = raw.split_once(':').unwrap_or((raw.as_str(), ""));
                    (host, Some(port))
                }
                // Bare IPv6 literal without a port
                _ => (raw.as_str(), None),
            }
        };

        if host.is_empty() {
            return Err(invalid("host must not be empty"));
        }

        let port = match port {
            None => DEFAULT_NTP_PORT,
            Some(p) => match p.parse::<u16>() {
                Ok(0) | Err(_) => return Err(invalid("port must be in range 1..=65535")),
                Ok(n) => n,
            },
        };

        Ok(Self {
            host: host.to_string(),
            port,
            raw,
        })
    }

    /// Host part (without brackets for IPv6 literals)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// UDP port, [`DEFAULT_NTP_PORT`] unless given explicitly
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The address exactly as configured
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `host:port` form suitable for socket address resolution
    pub fn to_socket_target(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Display for ServerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for ServerAddress {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ServerAddress {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ServerAddress> for String {
    fn from(addr: ServerAddress) -> Self {
        addr.raw
    }
}
