use std::fmt;

use reqwest::Url;

use crate::error::{HarnessError, Result};

const DEFAULT_HTTP_PORT: u16 = 80;

/// Host and port of a server, for callers that want a raw connection rather
/// than a URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    /// Split a base URI such as `http://localhost:8880/`.
    ///
    /// Only bare base URIs are accepted: no path beyond `/`, no query, no
    /// fragment and no userinfo.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| HarnessError::InvalidServerUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };
        let url = Url::parse(uri).map_err(|e| invalid(&e.to_string()))?;

        if !matches!(url.path(), "" | "/") {
            return Err(invalid("cannot handle a path"));
        }
        if url.query().is_some() {
            return Err(invalid("cannot handle a query"));
        }
        if url.fragment().is_some() {
            return Err(invalid("cannot handle a fragment"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("cannot handle '@' credentials"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let port = url.port().unwrap_or(DEFAULT_HTTP_PORT);

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A caller-supplied `host:port` of an already-running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideAddress {
    raw: String,
    address: ServerAddress,
}

impl OverrideAddress {
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |reason: &str| HarnessError::InvalidOverride {
            value: value.to_string(),
            reason: reason.to_string(),
        };
        if value.contains('/') {
            return Err(invalid("must not contain '/'"));
        }
        let address = match value.rsplit_once(':') {
            Some((host, port)) => ServerAddress {
                host: host.to_string(),
                port: port.parse().map_err(|_| invalid("port is not a number"))?,
            },
            None => ServerAddress {
                host: value.to_string(),
                port: DEFAULT_HTTP_PORT,
            },
        };
        if address.host.is_empty() {
            return Err(invalid("missing host"));
        }
        Ok(Self {
            raw: value.to_string(),
            address,
        })
    }

    /// The configured address as a base URI, otherwise unchanged.
    pub fn uri(&self) -> String {
        format!("http://{}/", self.raw)
    }

    pub fn address(&self) -> &ServerAddress {
        &self.address
    }
}
